#![forbid(unsafe_code)]

//! Structured logging for the motion core.
//!
//! Events are emitted through `tracing` when the `tracing` feature is on.
//! Without it the macros below keep the same call syntax and only evaluate
//! their field expressions, so call sites need no `cfg` guards.
//!
//! Targets follow the module path:
//!
//! | Target                    | Level | Events                                  |
//! |---------------------------|-------|-----------------------------------------|
//! | `kinetic_core::clock`     | error | subscriber panics (isolated)            |
//! |                           | debug | running / idle / shutdown               |
//! |                           | trace | subscribe, unsubscribe, clamped deltas  |
//! | `kinetic_core::stage`     | info  | created, ready, torn down               |
//! |                           | debug | section mount, layout refresh, resync   |
//! | `kinetic_core::trigger`   | debug | trigger fired, trigger torn down        |
//! | `kinetic_core::reveal`    | trace | batch complete, cancelled, settled      |
//! | `kinetic_core::scroll`    | debug | enable, disable, teardown               |
//! | `kinetic_core::spring`    | warn  | non-finite state snapped to target      |
//! | `kinetic_core::loader`    | info  | loader finished                         |
//! | `kinetic_core::particles` | info  | field mounted with its particle count   |
//! | `kinetic_core::nav`       | debug | active section changed                  |
//! | `kinetic_core::cursor`    | info  | coarse pointer detected                 |
//!
//! With `tracing-json`, [`init_json_subscriber`] installs a JSON formatter
//! filtered by `KINETIC_LOG` (falling back to `RUST_LOG`, then `info`), e.g.
//! `KINETIC_LOG=kinetic_core::trigger=debug,kinetic_core::stage=info`.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Evaluates the fields of a disabled log call and discards them.
    #[doc(hidden)]
    #[macro_export]
    macro_rules! __log_fields {
        () => {};
        ($msg:literal $(, $arg:expr)* $(,)?) => {
            let _ = format_args!($msg $(, $arg)*);
        };
        ($key:ident = ? $value:expr $(, $($rest:tt)*)?) => {
            let _ = &$value;
            $crate::__log_fields!($($($rest)*)?);
        };
        ($key:ident = % $value:expr $(, $($rest:tt)*)?) => {
            let _ = &$value;
            $crate::__log_fields!($($($rest)*)?);
        };
        ($key:ident = $value:expr $(, $($rest:tt)*)?) => {
            let _ = &$value;
            $crate::__log_fields!($($($rest)*)?);
        };
        (? $key:ident $(, $($rest:tt)*)?) => {
            let _ = &$key;
            $crate::__log_fields!($($($rest)*)?);
        };
        (% $key:ident $(, $($rest:tt)*)?) => {
            let _ = &$key;
            $crate::__log_fields!($($($rest)*)?);
        };
        ($key:ident $(, $($rest:tt)*)?) => {
            let _ = &$key;
            $crate::__log_fields!($($($rest)*)?);
        };
    }

    /// Debug event; fields are evaluated and dropped.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {{ $crate::__log_fields!($($arg)*); }};
    }

    /// Error event; fields are evaluated and dropped.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {{ $crate::__log_fields!($($arg)*); }};
    }

    /// Info event; fields are evaluated and dropped.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {{ $crate::__log_fields!($($arg)*); }};
    }

    /// Trace event; fields are evaluated and dropped.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {{ $crate::__log_fields!($($arg)*); }};
    }

    /// Warn event; fields are evaluated and dropped.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {{ $crate::__log_fields!($($arg)*); }};
    }
}

/// Environment variable consulted for the JSON subscriber's filter.
pub const LOG_ENV: &str = "KINETIC_LOG";

/// Install a global JSON subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    #[test]
    fn disabled_macros_accept_field_syntax() {
        let site = "frame";
        let message = String::from("boom");
        let width = Some(3.0);
        let count = 2usize;
        crate::debug!("plain");
        crate::debug!(count, "shorthand");
        crate::trace!(elapsed_ms = 12u64, width = ?width, "mixed");
        crate::error!(site, panic = %message, "display field");
        crate::info!(?width, count = count + 1);
        crate::warn!("formatted {}", count);
    }
}
