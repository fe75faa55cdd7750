//! Error taxonomy for caller contract violations.
//!
//! Every variant signals a synchronous contract violation that the caller is
//! expected to catch and discard, never retry. Failure to find an elegant
//! overlap resolution is deliberately *not* represented here: the search
//! degrades to a guaranteed-convergent fallback, and blocked conflicts are
//! ordinary, user-visible state rather than errors.

use thiserror::Error;

use crate::item::ItemId;

/// Errors raised by grid construction and engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A grid failed a construction-time invariant (bounds, size, overlap).
    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    /// An unknown item id was passed to an operation.
    #[error("item `{id}` not found")]
    ItemNotFound { id: ItemId },

    /// A user move step was not a single cardinal cell.
    #[error("move delta ({dx}, {dy}) is not a single cardinal step")]
    InvalidMove { dx: i32, dy: i32 },

    /// A move or resize would leave the grid extent.
    #[error("position ({x}, {y}) is out of bounds for {columns} columns")]
    OutOfBounds { x: i32, y: i32, columns: i32 },

    /// A resize or insert below the 1x1 minimum.
    #[error("size {width}x{height} is below the 1x1 minimum")]
    InvalidSize { width: i32, height: i32 },
}
