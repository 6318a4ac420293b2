//! tracing subscriber setup for the `bth` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "bth_tools=debug,bth=debug,info"
    } else {
        "bth_tools=info,bth=info,warn"
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` takes precedence over `debug`.
pub fn init(debug: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(debug)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        for debug in [false, true] {
            assert!(default_directive(debug).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn test_second_init_fails_quietly() {
        let _ = init(false);
        assert!(init(true).is_err());
    }
}
