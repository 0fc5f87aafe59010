//! Leveled logging seam for orchestration code
//!
//! Orchestrators receive a `&dyn ActionLog` instead of printing directly,
//! so tests can capture and assert on the log stream. The production
//! implementation speaks the GitHub Actions workflow-command protocol.

/// Leveled log sink injected into every orchestration call.
pub trait ActionLog: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Logger for GitHub Actions runners.
///
/// Debug/warning/error lines are emitted as workflow commands
/// (`::debug::`, `::warning::`, `::error::`) so the runner files them
/// under the right annotation level; info lines print as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkflowLog;

impl WorkflowLog {
    pub fn new() -> Self {
        WorkflowLog
    }
}

impl ActionLog for WorkflowLog {
    fn debug(&self, message: &str) {
        println!("::debug::{}", escape_data(message));
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn error(&self, message: &str) {
        println!("::error::{}", escape_data(message));
    }
}

/// Escape a value for the GitHub Actions command/output protocol.
///
/// Percent must be escaped first to avoid double-escaping.
pub fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_data_newlines() {
        assert_eq!(escape_data("line1\nline2"), "line1%0Aline2");
        assert_eq!(escape_data("line1\r\nline2"), "line1%0D%0Aline2");
    }

    #[test]
    fn test_escape_data_percent_first() {
        // A literal "%0A" in the input must not collapse into a newline
        assert_eq!(escape_data("100%"), "100%25");
        assert_eq!(escape_data("%0A"), "%250A");
    }

    #[test]
    fn test_escape_data_plain_passthrough() {
        assert_eq!(escape_data("plain text"), "plain text");
        assert_eq!(escape_data(""), "");
    }
}
