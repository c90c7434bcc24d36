//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit filter such as `"info"` or
/// `"storm_render=trace"`. `RUST_LOG` still wins when it is set.
pub fn init_with_filter(filter: &str) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).try_init()
}

/// Check a programmer-error precondition.
///
/// A violated precondition is logged at error level and trips a debug
/// assertion. In release builds the macro evaluates to `false` so the caller
/// can bail out without touching its data structures.
macro_rules! precondition {
    ($cond:expr, $($arg:tt)+) => {{
        let held: bool = $cond;
        if !held {
            log::error!($($arg)+);
            debug_assert!(held, $($arg)+);
        }
        held
    }};
}

pub(crate) use precondition;
