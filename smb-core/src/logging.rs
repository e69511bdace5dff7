//! Logging facade shared by the SMB crates.
//!
//! With the `tracing` feature enabled the macros below are the ones exported by
//! `tracing`, so structured fields (`?value`, `key = value`) work as usual.
//! Without it every macro expands to `()` and call sites need no `cfg` guards.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, error, info, trace, warn};

/// Whether log statements are compiled in.
pub const fn enabled() -> bool {
    cfg!(feature = "tracing")
}
