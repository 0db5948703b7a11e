//! Cassettes: recorded HTTP interactions and the machinery that replays them.

pub mod format;
pub mod matcher;

#[cfg(feature = "yaml")]
pub mod recorder;
#[cfg(feature = "yaml")]
pub mod session;
#[cfg(feature = "yaml")]
pub mod store;

pub use format::{CassetteFile, Interaction, RecordMode, Request, Response};
#[cfg(feature = "yaml")]
pub use recorder::SessionStats;
#[cfg(feature = "yaml")]
pub use session::HttpSession;
