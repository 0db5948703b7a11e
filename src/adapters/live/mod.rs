//! Live adapters for real external interactions.

pub mod clock;
#[cfg(feature = "blocking")]
pub mod http;
