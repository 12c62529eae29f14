//! Tool-call tracing to a timestamped file.

use chrono::Local;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Writes every tool call and result to a trace file when enabled.
pub struct DebugLogger {
    enabled: bool,
    trace_file: Option<Mutex<File>>,
    trace_path: Option<PathBuf>,
}

impl DebugLogger {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = std::env::temp_dir().join(format!("ifs_cloud_mcp_trace_{}.log", timestamp));
        Self::with_path(path)
    }

    /// An enabled logger writing to `path`.
    pub fn with_path(path: PathBuf) -> Self {
        let (trace_file, trace_path) = match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
        {
            Ok(file) => {
                tracing::info!(path = %path.display(), "Trace file opened");
                (Some(Mutex::new(file)), Some(path))
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to create trace file");
                (None, None)
            }
        };

        Self {
            enabled: true,
            trace_file,
            trace_path,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            trace_file: None,
            trace_path: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn trace_path(&self) -> Option<&PathBuf> {
        self.trace_path.as_ref()
    }

    /// Log a message to the tracing subscriber and the trace file.
    pub fn log(&self, message: &str) {
        if !self.enabled {
            return;
        }

        tracing::debug!("{}", message);

        if let Some(ref file) = self.trace_file {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "[{}] {}", timestamp, message);
                let _ = f.flush();
            }
        }
    }

    pub fn log_tool_call(&self, tool_name: &str, params: &Value) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL CALL: {} | params: {}",
            tool_name,
            truncate_json(params, 1000)
        ));
    }

    pub fn log_tool_result(&self, tool_name: &str, result: &str) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL RESULT: {} | result: {}",
            tool_name,
            truncate_str(result, 1000)
        ));
    }

    pub fn log_error(&self, context: &str, error: &str) {
        if !self.enabled {
            return;
        }

        self.log(&format!("ERROR [{}]: {}", context, error));
    }
}

impl std::fmt::Debug for DebugLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLogger")
            .field("enabled", &self.enabled)
            .field("trace_path", &self.trace_path)
            .finish()
    }
}

fn truncate_json(value: &Value, max_len: usize) -> String {
    truncate_str(&value.to_string(), max_len)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...(truncated)", &s[..cut]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_str("åäö", 2), "åä...(truncated)");
        assert_eq!(truncate_str("abc", 3), "abc");
        assert_eq!(truncate_json(&json!("ab"), 10), "\"ab\"");
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let logger = DebugLogger::new(false);
        assert!(!logger.is_enabled());
        assert!(logger.trace_path().is_none());
        logger.log_tool_call("list_sites", &json!({"limit": 5}));
    }

    #[test]
    fn test_trace_file_records_tool_calls() {
        let path = std::env::temp_dir().join(format!("ifs_trace_test_{}.log", std::process::id()));
        let logger = DebugLogger::with_path(path.clone());
        logger.log_tool_call("get_work_order", &json!({"wo_no": 42}));
        logger.log_tool_result("get_work_order", "WO#42");
        logger.log_error("get_work_order", "boom");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("TOOL CALL: get_work_order | params: {\"wo_no\":42}"));
        assert!(contents.contains("TOOL RESULT: get_work_order | result: WO#42"));
        assert!(contents.contains("ERROR [get_work_order]: boom"));
        let _ = std::fs::remove_file(&path);
    }
}
