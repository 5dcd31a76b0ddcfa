//! In-process host implementations.
//!
//! Used by native hosts and tests in place of a browser page: a page with a
//! swappable console binding and awaitable unload, a console backed by
//! `tracing`, an event bus for `console:save` listeners, and a downloader
//! that writes artifacts into a directory.

use std::collections::HashMap;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;
use tracerlog_protocol::SaveEventDetail;

use crate::host::{Console, Downloader, EventTarget, Member, Page, UnloadHandler};
use crate::sink::{Artifact, SinkError};

/// Maximum suffix tried when an export file name is already taken.
const MAX_NAME_SUFFIX: u32 = 100;

/// A page without a browser.
pub struct HeadlessPage {
    console: RwLock<Arc<dyn Console>>,
    location: RwLock<String>,
    unload: Mutex<Vec<UnloadHandler>>,
}

impl HeadlessPage {
    pub fn new(location: impl Into<String>, console: Arc<dyn Console>) -> Self {
        Self {
            console: RwLock::new(console),
            location: RwLock::new(location.into()),
            unload: Mutex::new(Vec::new()),
        }
    }

    /// Simulates navigation within the page.
    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = location.into();
    }

    /// Runs every unload observer in registration order, waiting for each.
    ///
    /// Observers run once; a second unload finds none.
    pub async fn unload(&self) {
        let handlers =
            std::mem::take(&mut *self.unload.lock().unwrap_or_else(PoisonError::into_inner));
        tracing::debug!(observers = handlers.len(), "page unloading");
        for handler in &handlers {
            handler().await;
        }
    }
}

impl Page for HeadlessPage {
    fn console(&self) -> Arc<dyn Console> {
        Arc::clone(&self.console.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_console(&self, console: Arc<dyn Console>) {
        *self.console.write().unwrap_or_else(PoisonError::into_inner) = console;
    }

    fn location(&self) -> String {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_unload_listener(&self, handler: UnloadHandler) {
        self.unload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

/// Console methods understood by [`TracingConsole`].
const TRACING_CONSOLE_METHODS: &[&str] = &["log", "warn", "error", "debug", "info", "trace"];

/// Console that writes calls to `tracing` under the `console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn member(&self, name: &str) -> Option<Member> {
        TRACING_CONSOLE_METHODS
            .contains(&name)
            .then_some(Member::Method)
    }

    fn call(&self, method: &str, args: &[Value]) -> Option<Value> {
        let text = format_console_args(args);
        match method {
            "error" => tracing::error!(target: "console", "{text}"),
            "warn" => tracing::warn!(target: "console", "{text}"),
            "debug" => tracing::debug!(target: "console", "{text}"),
            "trace" => tracing::trace!(target: "console", "{text}"),
            "log" | "info" => tracing::info!(target: "console", "{text}"),
            _ => {}
        }
        None
    }
}

/// Joins console arguments the way a console prints them: strings bare,
/// everything else as JSON.
pub fn format_console_args(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

type Listener = dyn Fn(&SaveEventDetail) -> Result<(), String> + Send + Sync;

/// Named-event dispatcher with any number of listeners per name.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Arc<Listener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener<F>(&self, name: impl Into<String>, listener: F)
    where
        F: Fn(&SaveEventDetail) -> Result<(), String> + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.into())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

impl EventTarget for EventBus {
    /// Calls every listener of `name`. Listener failures are collected and
    /// reported together after all listeners ran.
    fn dispatch_event(&self, name: &str, detail: &SaveEventDetail) -> Result<(), SinkError> {
        // Snapshot so listeners may register further listeners.
        let listeners: Vec<Arc<Listener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default();

        let mut errors = Vec::new();
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(detail))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(_) => errors.push("listener panicked".into()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SinkError::Listener(errors.join("; ")))
        }
    }
}

/// Saves artifacts as files in a directory.
///
/// An existing file is never overwritten: a taken name gets a `-N` suffix.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn download(&self, artifact: &Artifact) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.dir)?;

        let (stem, ext) = artifact
            .file_name
            .rsplit_once('.')
            .unwrap_or((artifact.file_name.as_str(), ""));

        for n in 0..=MAX_NAME_SUFFIX {
            let name = match (n, ext) {
                (0, _) => artifact.file_name.clone(),
                (n, "") => format!("{stem}-{n}"),
                (n, ext) => format!("{stem}-{n}.{ext}"),
            };
            let path = self.dir.join(name);

            let mut file = match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(artifact.contents.as_bytes())?;

            tracing::info!(path = %path.display(), "log file saved");
            return Ok(());
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free file name for {}", artifact.file_name),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;

    use super::*;

    fn make_artifact(name: &str, contents: &str) -> Artifact {
        Artifact {
            file_name: name.into(),
            mime: "text/plain;charset=utf-8",
            contents: Arc::from(contents),
        }
    }

    #[test]
    fn page_swaps_console() {
        let page = HeadlessPage::new("https://example.com", Arc::new(TracingConsole));
        assert_eq!(page.console().member("log"), Some(Member::Method));

        struct Empty;
        impl Console for Empty {
            fn member(&self, _name: &str) -> Option<Member> {
                None
            }
            fn call(&self, _method: &str, _args: &[Value]) -> Option<Value> {
                None
            }
        }

        page.set_console(Arc::new(Empty));
        assert_eq!(page.console().member("log"), None);
    }

    #[test]
    fn page_location_updates() {
        let page = HeadlessPage::new("https://example.com/a", Arc::new(TracingConsole));
        page.set_location("https://example.com/b");
        assert_eq!(page.location(), "https://example.com/b");
    }

    #[tokio::test]
    async fn unload_runs_observers_once_in_order() {
        let page = HeadlessPage::new("about:blank", Arc::new(TracingConsole));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            page.add_unload_listener(Box::new(move || {
                let order = Arc::clone(&order);
                async move { order.lock().unwrap().push(i) }.boxed()
            }));
        }

        page.unload().await;
        page.unload().await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn tracing_console_members() {
        let console = TracingConsole;
        for method in ["log", "warn", "error", "debug", "info", "trace"] {
            assert_eq!(console.member(method), Some(Member::Method));
        }
        assert_eq!(console.member("memory"), None);
        assert_eq!(console.log(&[Value::from("hi")]), None);
    }

    #[test]
    fn format_args_like_console() {
        let args = [
            Value::from("count"),
            Value::from(42),
            Value::Null,
            serde_json::json!({"a": 1}),
        ];
        assert_eq!(format_console_args(&args), r#"count 42 null {"a":1}"#);
    }

    #[test]
    fn bus_calls_all_listeners_and_collects_errors() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        bus.add_event_listener("console:save", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Err("upload failed".into())
        });
        bus.add_event_listener("console:save", |_| panic!("listener bug"));
        let c = Arc::clone(&calls);
        bus.add_event_listener("console:save", move |detail| {
            assert_eq!(detail.logs, "[]");
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = bus
            .dispatch_event(
                "console:save",
                &SaveEventDetail {
                    logs: "[]".into(),
                },
            )
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            err.to_string(),
            "listener failed: upload failed; listener panicked"
        );
    }

    #[test]
    fn bus_ignores_other_names() {
        let bus = EventBus::new();
        bus.add_event_listener("other", |_| Err("should not run".into()));
        assert_eq!(bus.listener_count("other"), 1);
        assert_eq!(bus.listener_count("console:save"), 0);

        let detail = SaveEventDetail { logs: "[]".into() };
        assert!(bus.dispatch_event("console:save", &detail).is_ok());
    }

    #[test]
    fn downloader_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = DirectoryDownloader::new(tmp.path().join("logs"));

        downloader
            .download(&make_artifact("log_1.json", "[]"))
            .unwrap();

        let content = std::fs::read_to_string(tmp.path().join("logs/log_1.json")).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn downloader_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = DirectoryDownloader::new(tmp.path());

        downloader.download(&make_artifact("log_1.json", "first")).unwrap();
        downloader.download(&make_artifact("log_1.json", "second")).unwrap();

        assert_eq!(
            std::fs::read_to_string(tmp.path().join("log_1.json")).unwrap(),
            "first"
        );
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("log_1-1.json")).unwrap(),
            "second"
        );
    }
}
