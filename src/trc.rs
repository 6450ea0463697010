//! Tracing configuration and initialization.

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Error type surfaced when subscriber installation fails.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub struct Trc {
    env_filter: EnvFilter,
    user_supplied: bool,
}

impl Default for Trc {
    fn default() -> Self {
        let maybe_env_filter = EnvFilter::try_from_env("MEDIA_SCAN_LOG")
            .or_else(|_| EnvFilter::try_from_default_env());

        match maybe_env_filter {
            // A user who set a filter wants the plain, verbose output with
            // span events, not the compact default.
            Ok(env_filter) => Self {
                env_filter,
                user_supplied: true,
            },
            Err(_) => Self {
                env_filter: EnvFilter::new("info"),
                user_supplied: false,
            },
        }
    }
}

impl Trc {
    pub fn init(self) -> Result<(), InitError> {
        if self.user_supplied {
            tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_target(false)
                .without_time()
                .compact()
                .try_init()
        }
    }
}
