//! Audit log
//!
//! Appends one JSON line per tool call start and completion.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RESULT_CHARS: usize = 1000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    call_id: &'a str,
    tool_name: &'a str,
    args: &'a Value,
    result: Option<String>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL audit trail of tool calls
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    pub async fn tool_call_start(&self, call_id: &str, tool_name: &str, args: &Value) {
        self.record(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call_start",
            call_id,
            tool_name,
            args,
            result: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;
    }

    pub async fn tool_call_complete(
        &self,
        call_id: &str,
        tool_name: &str,
        args: &Value,
        result: &Result<String>,
        duration_ms: u64,
    ) {
        let (result, error, status) = match result {
            Ok(text) => (Some(truncate(text)), None, "success"),
            Err(e) => (None, Some(e.to_string()), "error"),
        };

        self.record(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call_complete",
            call_id,
            tool_name,
            args,
            result,
            error,
            duration_ms,
            status,
        })
        .await;
    }

    // Audit failures are logged and never fail the tool call
    async fn record(&self, entry: AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_RESULT_CHARS {
        let head: String = text.chars().take(MAX_RESULT_CHARS).collect();
        format!("{}... [truncated]", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn logs_tool_call_lifecycle() {
        let temp_file = NamedTempFile::new().unwrap();
        let audit = AuditLog::new(temp_file.path());
        let args = json!({ "pool": "0xPoolAddress", "tick_a": 1, "tick_b": 2 });

        audit
            .tool_call_start("call_1", "rebalance_liquidity", &args)
            .await;
        audit
            .tool_call_complete(
                "call_1",
                "rebalance_liquidity",
                &args,
                &Ok("Liquidity position created".to_string()),
                150,
            )
            .await;
        audit
            .tool_call_complete(
                "call_2",
                "get_balance",
                &json!({}),
                &Err(Error::InvalidArgument("asset_id".to_string())),
                3,
            )
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let entries: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["entry_type"], "tool_call_start");
        assert_eq!(entries[0]["args"]["pool"], "0xPoolAddress");
        assert_eq!(entries[1]["status"], "success");
        assert_eq!(entries[1]["duration_ms"], 150);
        assert_eq!(entries[2]["status"], "error");
        assert!(entries[2]["error"].as_str().unwrap().contains("asset_id"));
    }

    #[test]
    fn truncates_long_results() {
        let long = "x".repeat(MAX_RESULT_CHARS + 10);
        let out = truncate(&long);
        assert!(out.ends_with("... [truncated]"));
        assert_eq!(truncate("short"), "short");
    }
}
