use colored::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Step,
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

static LEVEL_STYLE: Lazy<HashMap<LogLevel, (&'static str, Color)>> = Lazy::new(|| {
    HashMap::from([
        (LogLevel::Step, ("STEP", Color::Magenta)),
        (LogLevel::Info, ("INFO", Color::Cyan)),
        (LogLevel::Success, ("SUCCESS", Color::Green)),
        (LogLevel::Warning, ("WARNING", Color::Yellow)),
        (LogLevel::Error, ("ERROR", Color::Red)),
        (LogLevel::Debug, ("DEBUG", Color::White)),
    ])
});

static PREFIX_WIDTH: Lazy<usize> = Lazy::new(|| {
    LEVEL_STYLE
        .values()
        .map(|(label, _)| label.len() + 4)
        .max()
        .unwrap_or(11)
        + 1
});

static LOG_PREFIXES: Lazy<HashMap<LogLevel, String>> = Lazy::new(|| {
    LEVEL_STYLE
        .iter()
        .map(|(level, (label, color))| {
            let padding = PREFIX_WIDTH.saturating_sub(label.len() + 4);
            let inner = format!(" {} ", label).color(*color).bold();
            (*level, format!("[{}]{}", inner, " ".repeat(padding)))
        })
        .collect()
});

/// Installs the fmt subscriber. `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
pub fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_level(false)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::fmt()
        .event_format(format)
        .with_ansi(true)
        .with_env_filter(filter)
        .try_init();
}

pub fn log(level: LogLevel, message: &str) {
    let prefix = LOG_PREFIXES
        .get(&level)
        .cloned()
        .unwrap_or_else(|| format!("[{:<7}] ", format!("{:?}", level)));

    match level {
        LogLevel::Step => tracing::info!(target: "step", "{}{}", prefix, message),
        LogLevel::Info | LogLevel::Success => tracing::info!("{}{}", prefix, message),
        LogLevel::Warning => tracing::warn!("{}{}", prefix, message),
        LogLevel::Error => tracing::error!("{}{}", prefix, message),
        LogLevel::Debug => tracing::debug!("{}{}", prefix, message),
    }
}
