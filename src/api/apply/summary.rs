use serde_json::{json, Value};

use crate::api::errors::{exit_code_for, parse_id, summary_error_ids};
use crate::logging::StageLogger;
use crate::types::{Decision, ExecutionLog, StepFailure};

pub(crate) struct ApplySummary {
    fields: Value,
}

impl ApplySummary {
    pub(crate) fn new(lock_backend: &str, lock_wait_ms: Option<u64>) -> Self {
        let fields = json!({
            "lock_backend": lock_backend,
            "lock_wait_ms": lock_wait_ms,
        });
        Self { fields }
    }

    pub(crate) fn counts(mut self, log: &ExecutionLog) -> Self {
        if let Some(obj) = self.fields.as_object_mut() {
            let mut counts = serde_json::Map::new();
            for d in [
                Decision::Skipped,
                Decision::Applied,
                Decision::Repaired,
                Decision::WouldApply,
                Decision::Warned,
                Decision::Failed,
            ] {
                counts.insert(d.as_str().to_string(), json!(log.count(d)));
            }
            obj.insert("counts".to_string(), Value::Object(counts));
            obj.insert("steps_run".to_string(), json!(log.entries().len()));
        }
        self
    }

    pub(crate) fn duration(mut self, duration_ms: u64) -> Self {
        if let Some(obj) = self.fields.as_object_mut() {
            obj.insert("duration_ms".to_string(), json!(duration_ms));
        }
        self
    }

    pub(crate) fn failure(mut self, failure: Option<&StepFailure>) -> Self {
        let Some(f) = failure else {
            return self;
        };
        if let Some(obj) = self.fields.as_object_mut() {
            let primary = parse_id(&f.error_id).unwrap_or_else(|| f.kind.into());
            let chain = summary_error_ids(primary, f.kind);
            obj.insert("failed_step".to_string(), json!(f.step));
            obj.insert("error".to_string(), json!(f.msg));
            obj.insert("error_id".to_string(), json!(f.error_id));
            obj.insert(
                "exit_code".to_string(),
                json!(exit_code_for(primary)),
            );
            obj.insert("summary_error_ids".to_string(), json!(chain));
        }
        self
    }

    pub(crate) fn emit(self, slog: &StageLogger<'_>, success: bool) {
        if success {
            slog.apply_result().merge(&self.fields).emit_success();
        } else {
            slog.apply_result().merge(&self.fields).emit_failure();
        }
    }
}
