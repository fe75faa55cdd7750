#![forbid(unsafe_code)]

//! Dashboard grid-layout engine.
//!
//! Given rectangular items on an integer grid and a user command that moves,
//! resizes, inserts, or removes one item a single cell at a time, the engine
//! computes the minimal-disturbance set of secondary relocations that keeps
//! the grid conflict-free, then compacts the result by floating items upward
//! into vertical gaps.
//!
//! The engine is pure and synchronous: it owns no rendering, gesture capture,
//! or persistence. Callers feed it discrete commands with integer cell
//! coordinates and consume the resulting [`LayoutShift`] — an ordered move
//! log plus the next grid — to animate and re-render.
//!
//! # Example
//!
//! ```
//! use boardgrid::{GridItem, GridLayout, LayoutEngine, Position};
//!
//! let layout = GridLayout::new(
//!     vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 1, 0, 1, 1)],
//!     2,
//! );
//! let engine = LayoutEngine::new(layout).unwrap();
//!
//! // Drag "a" one cell to the right, onto "b".
//! let engine = engine.move_item("a", &[Position::new(1, 0)]).unwrap();
//! let shift = engine.layout_shift();
//!
//! // "b" swapped into the vacated cell; the grid is conflict-free.
//! assert_eq!(shift.next.item(&"b".into()).unwrap().x, 0);
//! assert!(shift.conflict_item_ids.is_empty());
//! ```

use serde::{Deserialize, Serialize};

pub use boardgrid_core::{Direction, GridItem, GridLayout, GridRect, ItemId, LayoutError, Position};

mod conflict;
mod engine;
mod float;
mod grid;
mod search;

pub use engine::{LayoutEngine, LayoutShift};
pub use grid::Grid;
pub use search::SearchTuning;

/// Why a committed relocation happened, not just what changed.
///
/// The tag drives later reasoning: float moves are cosmetic compaction and
/// excluded from disturbance reporting, overlap moves carry the search score
/// that chose them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// The user's own single-cell step.
    User,
    /// A secondary relocation chosen by the overlap search.
    Overlap,
    /// An upward slide committed by the compaction pass.
    Float,
    /// A single-unit size change of the user's item.
    Resize,
    /// A new item entering the grid.
    Insert,
    /// An item leaving the grid.
    Remove,
}

/// One entry in the engine's move log.
///
/// `x`/`y`/`width`/`height` describe the item's footprint *after* the move
/// (for [`MoveKind::Remove`], the footprint it last occupied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub item_id: ItemId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub kind: MoveKind,
    /// Travel direction for relocations; `None` for resize/insert/remove.
    pub direction: Option<Direction>,
    /// Cells traveled along `direction`.
    pub distance: i32,
    /// Search score for [`MoveKind::Overlap`] moves, zero otherwise.
    pub score: i64,
}

impl Move {
    /// The top-left corner the item occupied before this move, when the move
    /// has a travel direction.
    #[must_use]
    pub fn origin(&self) -> Option<Position> {
        let (dx, dy) = self.direction?.delta();
        Some(Position::new(
            self.x - dx * self.distance,
            self.y - dy * self.distance,
        ))
    }

    /// The footprint the item occupied before this move, when the move has a
    /// travel direction.
    #[must_use]
    pub fn origin_rect(&self) -> Option<GridRect> {
        let origin = self.origin()?;
        Some(GridRect::new(origin.x, origin.y, self.width, self.height))
    }

    /// The footprint after this move.
    #[inline]
    #[must_use]
    pub fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.width, self.height)
    }
}
