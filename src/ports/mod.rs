//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between code under test and something
//! nondeterministic (time, the network). Implementations live in
//! `src/adapters/`, `src/clock/` and `src/client/`.

pub mod clock;
pub mod http;

pub use clock::Clock;
pub use http::{HttpTransport, TransportError};
