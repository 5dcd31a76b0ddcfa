//! Interfaces to the host page.
//!
//! The engine never touches a concrete console, page or download mechanism;
//! it goes through these traits. [`crate::headless`] provides in-process
//! implementations.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracerlog_protocol::SaveEventDetail;

use crate::sink::{Artifact, SinkError};

/// What a console property resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// A callable method.
    Method,
    /// A plain value.
    Value(Value),
}

/// A console object: named methods plus plain properties.
pub trait Console: Send + Sync {
    /// Looks up a member by name. `None` if the console has no such member.
    fn member(&self, name: &str) -> Option<Member>;

    /// Invokes the method `method` with `args`.
    ///
    /// Returns `None` when the method returns no value or does not exist.
    fn call(&self, method: &str, args: &[Value]) -> Option<Value>;

    fn log(&self, args: &[Value]) -> Option<Value> {
        self.call("log", args)
    }

    fn warn(&self, args: &[Value]) -> Option<Value> {
        self.call("warn", args)
    }

    fn error(&self, args: &[Value]) -> Option<Value> {
        self.call("error", args)
    }

    fn debug(&self, args: &[Value]) -> Option<Value> {
        self.call("debug", args)
    }

    fn info(&self, args: &[Value]) -> Option<Value> {
        self.call("info", args)
    }
}

/// Observer invoked when the page is about to unload.
///
/// The host must await the returned future before letting the unload proceed.
pub type UnloadHandler = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// The page hosting the global console binding.
pub trait Page: Send + Sync {
    /// The console currently bound as the page's global console.
    fn console(&self) -> Arc<dyn Console>;

    /// Replaces the global console binding.
    fn set_console(&self, console: Arc<dyn Console>);

    /// Current page location.
    fn location(&self) -> String;

    /// Registers an unload observer.
    fn add_unload_listener(&self, handler: UnloadHandler);
}

/// Receiver of named notifications.
pub trait EventTarget: Send + Sync {
    fn dispatch_event(&self, name: &str, detail: &SaveEventDetail) -> Result<(), SinkError>;
}

/// Mechanism turning an artifact into a user download.
pub trait Downloader: Send + Sync {
    fn download(&self, artifact: &Artifact) -> Result<(), SinkError>;
}
