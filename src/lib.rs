//!
//! prolens
//! -------
//! Client-side session layer for the ProLens camera-rental backend: credential
//! persistence, an authenticated request wrapper that owns 401 handling,
//! cross-session role-change detection, page guards and error reports.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod frontend;
pub mod identity;
pub mod links;
pub mod report;
pub mod roles;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::{ApiRequest, AuthClient, Outcome};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}
