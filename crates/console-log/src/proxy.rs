//! Transparent console wrapper installed by [`crate::Tracer::initialize`].

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracerlog_protocol::LogLevel;

use crate::host::{Console, Member};
use crate::tracer::Inner;

/// Console decorator that records every method call before (optionally)
/// forwarding it to the original console.
///
/// Properties are delegated to the original console unchanged. Once the
/// tracer is dropped, calls go straight to the original console.
pub struct ConsoleProxy {
    tracer: Weak<Inner>,
    original: Arc<dyn Console>,
}

impl ConsoleProxy {
    pub(crate) fn new(tracer: Weak<Inner>, original: Arc<dyn Console>) -> Self {
        Self { tracer, original }
    }

    /// The console this proxy replaced.
    pub fn original(&self) -> &Arc<dyn Console> {
        &self.original
    }
}

impl Console for ConsoleProxy {
    fn member(&self, name: &str) -> Option<Member> {
        self.original.member(name)
    }

    fn call(&self, method: &str, args: &[Value]) -> Option<Value> {
        if self.original.member(method) != Some(Member::Method) {
            return None;
        }

        let Some(tracer) = self.tracer.upgrade() else {
            return self.original.call(method, args);
        };

        if let Some(ticket) = tracer.record(LogLevel::from_method(method), args) {
            ticket.detach();
        }

        if tracer.settings.pass_through() {
            self.original.call(method, args)
        } else {
            None
        }
    }
}
