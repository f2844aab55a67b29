use std::io::Write;
use std::sync::Mutex;

use log::Level;
use serde_json::{json, Value};

pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

#[derive(Default)]
pub struct JsonlSink;

impl FactsEmitter for JsonlSink {
    fn emit(&self, _subsystem: &str, _event: &str, _decision: &str, _fields: Value) {}
}

impl AuditSink for JsonlSink {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Human progress lines on stderr, `[LEVEL] msg`.
#[derive(Clone, Copy, Debug)]
pub struct StderrAudit {
    pub min_level: Level,
}

impl Default for StderrAudit {
    fn default() -> Self {
        Self {
            min_level: Level::Info,
        }
    }
}

impl AuditSink for StderrAudit {
    fn log(&self, level: Level, msg: &str) {
        if level <= self.min_level {
            eprintln!("[{level}] {msg}");
        }
    }
}

/// One JSON object per fact, one fact per line.
pub struct JsonlWriter<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonlWriter<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> FactsEmitter for JsonlWriter<W> {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let mut line = json!({
            "subsystem": subsystem,
            "event": event,
            "decision": decision,
        });
        if let (Some(obj), Some(extra)) = (line.as_object_mut(), fields.as_object()) {
            for (k, v) in extra {
                obj.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
        }
    }
}
