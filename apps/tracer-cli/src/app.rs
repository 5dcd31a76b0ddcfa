//! Wires the headless page, sinks and tracer together and feeds stdin through
//! the intercepted console.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracerlog_console_log::headless::{DirectoryDownloader, EventBus, HeadlessPage, TracingConsole};
use tracerlog_console_log::{Console, Member, Page, Tracer};
use tracerlog_protocol::constants::SAVE_EVENT;
use tracerlog_protocol::decode_batch;

use crate::config::Config;

/// One line of input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Save,
    Clear,
    Data,
    /// `<method> <text>`; `method` is `None` when the first word is not a
    /// console method, in which case the whole line is logged.
    Call {
        method: Option<&'a str>,
        text: &'a str,
    },
}

fn parse_line<'a>(line: &'a str, console: &dyn Console) -> Command<'a> {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        ":save" => Command::Save,
        ":clear" => Command::Clear,
        ":data" => Command::Data,
        _ => {
            let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
            if console.member(word) == Some(Member::Method) {
                Command::Call {
                    method: Some(word),
                    text: rest.trim_start(),
                }
            } else {
                Command::Call {
                    method: None,
                    text: line,
                }
            }
        }
    }
}

/// Runs until stdin closes, then unloads the page.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let page = Arc::new(HeadlessPage::new(config.url.clone(), Arc::new(TracingConsole)));

    let bus = Arc::new(EventBus::new());
    bus.add_event_listener(SAVE_EVENT, |detail| {
        let entries = decode_batch(&detail.logs).map_err(|e| e.to_string())?;
        tracing::info!(
            entries = entries.len(),
            bytes = detail.logs.len(),
            "console:save received"
        );
        Ok(())
    });

    let tracer = Tracer::builder(page.clone(), bus)
        .config(config.tracer.clone())
        .downloader(Arc::new(DirectoryDownloader::new(&config.output_dir)))
        .build();
    tracer.initialize();

    let console = page.console();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, console.as_ref()) {
            Command::Empty => {}
            Command::Save => {
                if let Some(report) = tracer.force_save().await {
                    tracing::info!(
                        entries = report.entries,
                        delivered = report.delivered,
                        failed = report.failures.len(),
                        "saved"
                    );
                }
            }
            Command::Clear => tracer.clear(),
            Command::Data => println!("{}", serde_json::to_string_pretty(&tracer.data())?),
            Command::Call { method, text } => {
                console.call(method.unwrap_or("log"), &[Value::from(text)]);
            }
        }
    }

    page.unload().await;
    Ok(())
}
