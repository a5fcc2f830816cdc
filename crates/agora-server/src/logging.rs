//! Process-wide `tracing` subscriber.

use tracing_subscriber::EnvFilter;

use crate::config::Env;
use crate::error::{ServerError, ServerResult};

/// Level used when `RUST_LOG` is unset.
pub fn default_directive(env: Env) -> &'static str {
    match env {
        Env::Local | Env::Dev => "debug",
        Env::Prod => "info",
    }
}

fn filter_for(env: Env) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(env)))
}

/// Install the global subscriber: human-readable for `local` and `dev`,
/// JSON lines for `prod`. Fails if one is already installed.
pub fn init(env: Env) -> ServerResult<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter_for(env));
    let result = match env {
        Env::Local | Env::Dev => builder.with_target(true).try_init(),
        Env::Prod => builder.json().with_current_span(false).try_init(),
    };
    result.map_err(|e| ServerError::Internal(format!("logging already initialised: {e}")))?;
    tracing::debug!(%env, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_per_env() {
        assert_eq!(default_directive(Env::Local), "debug");
        assert_eq!(default_directive(Env::Dev), "debug");
        assert_eq!(default_directive(Env::Prod), "info");
    }

    #[test]
    fn second_init_fails() {
        // The first call may or may not win against other tests in the binary.
        let _ = init(Env::Local);
        assert!(init(Env::Prod).is_err());
    }
}
