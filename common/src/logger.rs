use std::fmt;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

struct PrefixedTime {
    prefix: String,
}

impl FormatTime for PrefixedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        SystemTime.format_time(w)?;
        write!(w, " [{}]", self.prefix)
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Later calls are ignored.
pub fn init_logger(prefix: Option<String>, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    let result = match prefix {
        Some(prefix) => builder.with_timer(PrefixedTime { prefix }).try_init(),
        None => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logger already initialized");
    }
}

pub fn is_valid_level(level: &str) -> bool {
    level.parse::<Level>().is_ok()
}
