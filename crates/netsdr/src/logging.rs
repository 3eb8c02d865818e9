use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides `--log-level` when set.
pub const LOG_ENV: &str = "NETSDR_LOG";

/// Targets `--log-level` applies to. Everything else logs at `warn`.
const NETSDR_TARGETS: [&str; 4] = ["netsdr", "netsdr_codec", "netsdr_transport", "netsdr_session"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    /// Adds command and stream-width changes.
    Debug,
    /// Adds per-frame routing.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter directives for this level, e.g. `warn,netsdr=info,...`.
    pub fn directives(self) -> String {
        let level = self.as_filter();
        let base = level.min(LevelFilter::WARN);
        NETSDR_TARGETS
            .iter()
            .fold(base.to_string(), |mut acc, target| {
                acc.push_str(&format!(",{target}={level}"));
                acc
            })
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.directives()))
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
