use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FioriError;

/// Structured outcome of one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// `not_found`, `timeout`, `metadata_missing`, ... or `internal`
    pub kind: String,
    pub message: String,
    /// Expected conditions (missing element, timeout, no metadata) as opposed
    /// to driver or internal faults
    #[serde(default)]
    pub expected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl ErrorPayload {
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FioriError>() {
            Some(fiori) => Self {
                kind: fiori.kind().to_string(),
                message: format!("{:#}", err),
                expected: fiori.is_expected(),
                alternatives: match fiori {
                    FioriError::NotFound { alternatives, .. } => alternatives.clone(),
                    _ => Vec::new(),
                },
            },
            None => Self {
                kind: "internal".to_string(),
                message: format!("{:#}", err),
                expected: false,
                alternatives: Vec::new(),
            },
        }
    }
}

impl CommandReport {
    pub fn from_result(command: &str, result: anyhow::Result<Value>, duration_ms: u64) -> Self {
        match result {
            Ok(data) => Self {
                command: command.to_string(),
                ok: true,
                data,
                error: None,
                duration_ms,
            },
            Err(err) => Self {
                command: command.to_string(),
                ok: false,
                data: Value::Null,
                error: Some(ErrorPayload::from_error(&err)),
                duration_ms,
            },
        }
    }

    /// Whether a failure is one of the expected, reportable kinds
    pub fn is_expected_failure(&self) -> bool {
        self.error.as_ref().map_or(false, |e| e.expected)
    }

    /// Process exit code: 0 on success, 1 for expected failures, 2 otherwise
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            None => 0,
            Some(_) if self.is_expected_failure() => 1,
            Some(_) => 2,
        }
    }
}

/// Outcome of a script run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub script: String,
    pub started_at: String,
    pub passed: usize,
    pub failed: usize,
    pub steps: Vec<CommandReport>,
}

impl RunSummary {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            started_at: chrono::Local::now().to_rfc3339(),
            passed: 0,
            failed: 0,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, report: CommandReport) {
        if report.ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.steps.push(report);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}
