//! Virtualized render scheduling
//!
//! The virtualizer decides which rows are on screen; the queue decides which
//! of their pages is rendered next.

mod queue;
mod virtualizer;

pub use queue::{RenderQueue, RenderStatus};
pub use virtualizer::{Align, VirtualItem, VirtualRange, Virtualizer};
