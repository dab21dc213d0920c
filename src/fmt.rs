//! Logging facade. Mirrors the teacher crate's `fmt` shim: call sites use
//! these macros unconditionally, and the `log` / `defmt` Cargo features pick
//! which backend (if any) they compile down to.

#![allow(unused_macros, unused_imports)]

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { ::log::trace!($($arg)*); }
        #[cfg(feature = "defmt")]
        { ::defmt::trace!($($arg)*); }
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { ::log::debug!($($arg)*); }
        #[cfg(feature = "defmt")]
        { ::defmt::debug!($($arg)*); }
    }};
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { ::log::warn!($($arg)*); }
        #[cfg(feature = "defmt")]
        { ::defmt::warn!($($arg)*); }
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        { ::log::error!($($arg)*); }
        #[cfg(feature = "defmt")]
        { ::defmt::error!($($arg)*); }
    }};
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use trace;
pub(crate) use warning as warn;
