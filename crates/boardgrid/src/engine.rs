//! Stateful, chainable engine facade.
//!
//! A [`LayoutEngine`] wraps a committed baseline layout plus a working copy
//! that pending commands mutate. Every operation returns a *new* handle
//! sharing the accumulated working state; following the returned handle
//! composes operations into one multi-step transaction. Invoking an
//! operation on the original handle instead silently discards pending work
//! and starts over from the committed baseline — non-chained calls are
//! independent attempts, not composable.
//!
//! There is no explicit commit: a caller accepts the pending state by
//! building a fresh engine from [`LayoutShift::next`], and abandons it by
//! dropping the handle.

use boardgrid_core::{GridLayout, ItemId, LayoutError, Position};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflict::find_conflicts;
use crate::float::float_items;
use crate::grid::Grid;
use crate::search::{ResolutionState, SearchTuning, resolve_overlaps};
use crate::{Direction, GridItem, Move, MoveKind};

/// The transition from one committed grid to the next: the only externally
/// visible artifact of a command sequence. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutShift<D = ()> {
    /// The committed baseline the engine started from.
    pub previous: GridLayout<D>,
    /// The working grid after all pending commands.
    pub next: GridLayout<D>,
    /// Every move applied since the baseline, in commit order.
    pub moves: Vec<Move>,
    /// Items pinned by a partial overlap, blocking the current step.
    pub conflict_item_ids: Vec<ItemId>,
}

#[derive(Debug, Clone)]
struct EngineState<D> {
    res: ResolutionState<D>,
    /// The item the current gesture manipulates; a change of item clears
    /// persisted conflicts.
    active: Option<ItemId>,
}

/// The dashboard grid-layout engine.
///
/// See the [module docs](self) for the chaining and discard rules.
#[derive(Debug, Clone)]
pub struct LayoutEngine<D: Clone = ()> {
    baseline: GridLayout<D>,
    state: EngineState<D>,
    tuning: SearchTuning,
    chained: bool,
}

impl<D: Clone> LayoutEngine<D> {
    /// Create an engine over a validated layout.
    pub fn new(layout: GridLayout<D>) -> Result<Self, LayoutError> {
        Self::with_tuning(layout, SearchTuning::default())
    }

    /// Create an engine with custom search tuning.
    pub fn with_tuning(layout: GridLayout<D>, tuning: SearchTuning) -> Result<Self, LayoutError> {
        let grid = Grid::new(layout.clone())?;
        Ok(Self {
            baseline: layout,
            state: EngineState {
                res: ResolutionState {
                    grid,
                    moves: Vec::new(),
                    move_index: 0,
                    conflicts: None,
                    overlaps: Vec::new(),
                    score: 0,
                },
                active: None,
            },
            tuning,
            chained: false,
        })
    }

    /// The working layout, including pending (uncommitted) changes.
    #[must_use]
    pub fn layout(&self) -> GridLayout<D> {
        self.state.res.grid.to_layout()
    }

    /// Package the pending state for the rendering collaborator.
    #[must_use]
    pub fn layout_shift(&self) -> LayoutShift<D> {
        let mut conflict_item_ids: Vec<ItemId> = self
            .state
            .res
            .conflicts
            .iter()
            .flat_map(|c| c.items.iter().cloned())
            .collect();
        conflict_item_ids.sort();
        LayoutShift {
            previous: self.baseline.clone(),
            next: self.state.res.grid.to_layout(),
            moves: self.state.res.moves.clone(),
            conflict_item_ids,
        }
    }

    /// Move an item along a path of destination cells, one cell per step.
    ///
    /// The path is normalized first: a prefix returning to the origin is
    /// dropped, revisiting a cell collapses the cycle, and sampling gaps are
    /// filled with single-cell steps. Fails with [`LayoutError::ItemNotFound`]
    /// for an unknown id or [`LayoutError::OutOfBounds`] when any step leaves
    /// the grid.
    pub fn move_item(
        &self,
        id: impl Into<ItemId>,
        path: &[Position],
    ) -> Result<Self, LayoutError> {
        let id: ItemId = id.into();
        let mut state = self.working_state()?;
        let item = state.res.grid.item(&id)?.clone();
        let steps = normalize_path(item.position(), path);
        debug!(item = %id, requested = path.len(), steps = steps.len(), "move command");
        let columns = state.res.grid.columns();
        for step in &steps {
            if step.x < 0 || step.y < 0 || step.x + item.width > columns {
                return Err(LayoutError::OutOfBounds {
                    x: step.x,
                    y: step.y,
                    columns,
                });
            }
        }

        if state.active.as_ref() != Some(&id) {
            state.res.conflicts = None;
        }
        state.active = Some(id.clone());
        state.res.move_index = state.res.moves.len();
        state.res.score = 0;

        for step in steps {
            let cur = state.res.grid.item(&id)?.clone();
            let dx = step.x - cur.x;
            let dy = step.y - cur.y;
            let direction =
                Direction::from_unit_delta(dx, dy).ok_or(LayoutError::InvalidMove { dx, dy })?;
            let user_move = Move {
                item_id: id.clone(),
                x: step.x,
                y: step.y,
                width: cur.width,
                height: cur.height,
                kind: MoveKind::User,
                direction: Some(direction),
                distance: 1,
                score: 0,
            };
            state.res.apply(Some(&id), user_move)?;
            state.res.conflicts =
                find_conflicts(&state.res.grid, &id, dx, dy, state.res.conflicts.as_ref())?;
            state.res = resolve_overlaps(state.res, &id, &self.tuning)?;
            if state.res.overlaps.is_empty() {
                float_items(&mut state.res, Some(&id))?;
            }
        }
        Ok(self.chain(state))
    }

    /// Resize an item along a path of `(width, height)` growth points,
    /// anchored at its fixed top-left corner.
    ///
    /// Fails with [`LayoutError::InvalidSize`] below the 1x1 minimum and
    /// [`LayoutError::OutOfBounds`] when a target exceeds the grid width.
    pub fn resize(
        &self,
        id: impl Into<ItemId>,
        path: &[(i32, i32)],
    ) -> Result<Self, LayoutError> {
        let id: ItemId = id.into();
        let mut state = self.working_state()?;
        let item = state.res.grid.item(&id)?.clone();
        let steps = normalize_size_path((item.width, item.height), path);
        debug!(item = %id, steps = steps.len(), "resize command");
        let columns = state.res.grid.columns();
        for &(width, height) in &steps {
            if width < 1 || height < 1 {
                return Err(LayoutError::InvalidSize { width, height });
            }
            if item.x + width > columns {
                return Err(LayoutError::OutOfBounds {
                    x: item.x + width - 1,
                    y: item.y,
                    columns,
                });
            }
        }

        // Resizing is not a reorder; it never produces conflicts.
        state.res.conflicts = None;
        state.active = Some(id.clone());
        state.res.move_index = state.res.moves.len();
        state.res.score = 0;

        for (width, height) in steps {
            let resize_move = Move {
                item_id: id.clone(),
                x: item.x,
                y: item.y,
                width,
                height,
                kind: MoveKind::Resize,
                direction: None,
                distance: 1,
                score: 0,
            };
            state.res.apply(Some(&id), resize_move)?;
            state.res = resolve_overlaps(state.res, &id, &self.tuning)?;
            if state.res.overlaps.is_empty() {
                float_items(&mut state.res, Some(&id))?;
            }
        }
        Ok(self.chain(state))
    }

    /// Insert a new item at its stated origin, resolving any overlaps it
    /// creates. Typically followed by chaining a [`Self::move_item`] call to
    /// walk the item to its resting cell.
    pub fn insert(&self, item: GridItem<D>) -> Result<Self, LayoutError> {
        let mut state = self.working_state()?;
        debug!(item = %item.id, x = item.x, y = item.y, "insert command");
        state.res.grid.insert(item.clone())?;

        state.res.conflicts = None;
        state.active = Some(item.id.clone());
        state.res.move_index = state.res.moves.len();
        state.res.score = 0;

        let insert_move = Move {
            item_id: item.id.clone(),
            x: item.x,
            y: item.y,
            width: item.width,
            height: item.height,
            kind: MoveKind::Insert,
            direction: None,
            distance: 0,
            score: 0,
        };
        state.res.apply(Some(&item.id), insert_move)?;
        state.res = resolve_overlaps(state.res, &item.id, &self.tuning)?;
        if state.res.overlaps.is_empty() {
            float_items(&mut state.res, Some(&item.id))?;
        }
        Ok(self.chain(state))
    }

    /// Remove an item. Its space is reclaimed by a subsequent [`Self::refloat`].
    pub fn remove(&self, id: impl Into<ItemId>) -> Result<Self, LayoutError> {
        let id: ItemId = id.into();
        let mut state = self.working_state()?;
        debug!(item = %id, "remove command");
        let removed = state.res.grid.remove(&id)?;

        state.res.conflicts = None;
        state.active = None;
        state.res.move_index = state.res.moves.len();
        state.res.score = 0;

        let remove_move = Move {
            item_id: id,
            x: removed.x,
            y: removed.y,
            width: removed.width,
            height: removed.height,
            kind: MoveKind::Remove,
            direction: None,
            distance: 0,
            score: 0,
        };
        state.res.apply(None, remove_move)?;
        Ok(self.chain(state))
    }

    /// Run the compaction pass over every item.
    pub fn refloat(&self) -> Result<Self, LayoutError> {
        let mut state = self.working_state()?;
        debug!("refloat command");
        state.res.move_index = state.res.moves.len();
        state.res.score = 0;
        float_items(&mut state.res, None)?;
        Ok(self.chain(state))
    }

    /// The working state for the next command: the accumulated transaction
    /// when chained, otherwise a fresh copy of the committed baseline.
    fn working_state(&self) -> Result<EngineState<D>, LayoutError> {
        if self.chained {
            Ok(self.state.clone())
        } else {
            Ok(EngineState {
                res: ResolutionState {
                    grid: Grid::new(self.baseline.clone())?,
                    moves: Vec::new(),
                    move_index: 0,
                    conflicts: None,
                    overlaps: Vec::new(),
                    score: 0,
                },
                active: None,
            })
        }
    }

    fn chain(&self, state: EngineState<D>) -> Self {
        Self {
            baseline: self.baseline.clone(),
            state,
            tuning: self.tuning,
            chained: true,
        }
    }
}

/// Normalize a destination-cell path: drop any prefix that returns to the
/// origin, collapse cycles to their later visit, and fill sampling gaps with
/// single-cell steps (x before y).
fn normalize_path(origin: Position, path: &[Position]) -> Vec<Position> {
    let mut kept: Vec<Position> = Vec::new();
    for &point in path {
        if point == origin {
            kept.clear();
            continue;
        }
        if let Some(i) = kept.iter().position(|&seen| seen == point) {
            kept.truncate(i + 1);
            continue;
        }
        kept.push(point);
    }

    let mut steps = Vec::new();
    let mut cur = origin;
    for point in kept {
        while cur.x != point.x {
            cur.x += (point.x - cur.x).signum();
            steps.push(cur);
        }
        while cur.y != point.y {
            cur.y += (point.y - cur.y).signum();
            steps.push(cur);
        }
    }
    steps
}

/// Normalize a `(width, height)` growth path the same way as a move path.
fn normalize_size_path(origin: (i32, i32), path: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut kept: Vec<(i32, i32)> = Vec::new();
    for &point in path {
        if point == origin {
            kept.clear();
            continue;
        }
        if let Some(i) = kept.iter().position(|&seen| seen == point) {
            kept.truncate(i + 1);
            continue;
        }
        kept.push(point);
    }

    let mut steps = Vec::new();
    let mut cur = origin;
    for point in kept {
        while cur.0 != point.0 {
            cur.0 += (point.0 - cur.0).signum();
            steps.push(cur);
        }
        while cur.1 != point.1 {
            cur.1 += (point.1 - cur.1).signum();
            steps.push(cur);
        }
    }
    steps
}
