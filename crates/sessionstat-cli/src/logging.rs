//! Tracing subscriber setup for the binary.

use crate::LogLevel;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive; overrides `--log-level`.
pub const LOG_ENV_VAR: &str = "SESSIONSTAT_LOG";

pub fn default_directive(level: LogLevel) -> String {
    format!(
        "warn,sessionstat_cli={level},sessionstat_runtime={level},sessionstat_engine={level}"
    )
}

/// Logs go to stderr so command output on stdout stays machine-readable.
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_scopes_workspace_crates() {
        let directive = default_directive(LogLevel::Debug);
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("sessionstat_runtime=debug"));
        assert!(directive.parse::<EnvFilter>().is_ok());
    }
}
