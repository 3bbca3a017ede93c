use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Overrides the `--log-level` directives when set, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "BOTLINK_LOG";

/// Crates whose events follow `--log-level`; everything else stays at warn.
const BOTLINK_TARGETS: [&str; 5] = [
    "botlink",
    "botlink_engine",
    "botlink_content",
    "botlink_frame",
    "botlink_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Dependencies are capped at warn; a quieter level wins.
    fn others(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            _ => "warn",
        }
    }
}

/// Filter directives for `level`: the botlink crates at `level`, the rest
/// at warn or quieter.
pub fn default_directives(level: LogLevel) -> String {
    let mut directives: Vec<String> = BOTLINK_TARGETS
        .iter()
        .map(|target| format!("{target}={}", level.as_str()))
        .collect();
    directives.push(level.others().to_string());
    directives.join(",")
}

/// Install the stderr subscriber. Engine and bridge logs share it.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(level == LogLevel::Trace);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_botlink_crates() {
        assert_eq!(
            default_directives(LogLevel::Debug),
            "botlink=debug,botlink_engine=debug,botlink_content=debug,\
             botlink_frame=debug,botlink_transport=debug,warn"
        );
    }

    #[test]
    fn error_level_quiets_dependencies_too() {
        let directives = default_directives(LogLevel::Error);
        assert!(directives.starts_with("botlink=error,"));
        assert!(directives.ends_with(",error"));
    }

    #[test]
    fn directives_parse_as_filter() {
        for level in [LogLevel::Error, LogLevel::Info, LogLevel::Trace] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
