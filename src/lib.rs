pub mod error;
pub mod config;
pub mod identity;
pub mod api;
pub mod pagination;
pub mod routing;
pub mod notify;
pub mod format;
pub mod views;
pub mod mock;
pub mod cli;

// Debug-only printing helper used by the mock backend for request traces.
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// Release builds keep the format checks but print nothing.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}
