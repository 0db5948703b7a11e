//! Process-wide stack of frozen instants.
//!
//! Only the top frame is live. Frames carry the kind of scope that pushed
//! them so a one-shot wrapper can defer to an enclosing scoped block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset};

/// Who pushed a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A scoped block (`enter()` / `freeze()`).
    Scope,
    /// A one-shot wrapper around a single call.
    Wrapper,
}

#[derive(Debug)]
struct Frame {
    id: u64,
    instant: DateTime<FixedOffset>,
    kind: FrameKind,
}

static FRAMES: Mutex<Vec<Frame>> = Mutex::new(Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn frames() -> MutexGuard<'static, Vec<Frame>> {
    FRAMES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Push a frame and return its id.
pub(crate) fn push(instant: DateTime<FixedOffset>, kind: FrameKind) -> u64 {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut frames = frames();
    frames.push(Frame { id, instant, kind });
    tracing::debug!(depth = frames.len(), %instant, ?kind, "clock frozen");
    id
}

/// Remove the frame with `id`. Normally it is the top frame; if an outer
/// guard was dropped first the frame is still removed, leaving the others
/// in order.
pub(crate) fn pop(id: u64) {
    let mut frames = frames();
    match frames.iter().rposition(|f| f.id == id) {
        Some(index) if index + 1 == frames.len() => {
            frames.pop();
        }
        Some(index) => {
            tracing::warn!(
                depth = frames.len(),
                index,
                "frozen clock scope released out of order"
            );
            frames.remove(index);
        }
        None => {}
    }
    match frames.last() {
        Some(top) => tracing::debug!(depth = frames.len(), instant = %top.instant, "clock restored"),
        None => tracing::debug!("clock unfrozen"),
    }
}

/// The live frozen instant, if any.
pub(crate) fn current() -> Option<DateTime<FixedOffset>> {
    frames().last().map(|f| f.instant)
}

/// The innermost instant pushed by a scoped block, ignoring wrappers.
pub(crate) fn enclosing_scope() -> Option<DateTime<FixedOffset>> {
    frames().iter().rev().find(|f| f.kind == FrameKind::Scope).map(|f| f.instant)
}

/// Number of active frames.
pub(crate) fn depth() -> usize {
    frames().len()
}
