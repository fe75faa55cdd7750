//! Vertical compaction: slide items upward into gaps.
//!
//! After a step resolves, every item except the one being manipulated is
//! probed one row upward at a time while the probe stays overlap-free, and
//! the highest reachable position is committed as a single float move. The
//! whole pass repeats because one item floating can free space for another;
//! it terminates since floating never increases total vertical extent and
//! the extent per pass is finite.

use boardgrid_core::{Direction, GridRect, ItemId, LayoutError};

use crate::search::ResolutionState;
use crate::{Move, MoveKind};

/// Float every non-active item as high as it can go.
///
/// Requires a zero-overlap grid; with overlaps outstanding (a blocked step)
/// the pass is a no-op.
pub(crate) fn float_items<D: Clone>(
    state: &mut ResolutionState<D>,
    active: Option<&ItemId>,
) -> Result<(), LayoutError> {
    if !state.overlaps.is_empty() {
        return Ok(());
    }
    loop {
        let mut moved = false;
        // Top-to-bottom, left-to-right, so the committed log is deterministic.
        let mut order: Vec<(i32, i32, ItemId)> = state
            .grid
            .items()
            .iter()
            .map(|item| (item.y, item.x, item.id.clone()))
            .collect();
        order.sort();
        for (_, _, id) in order {
            if active == Some(&id) {
                continue;
            }
            let rect = state.grid.item(&id)?.rect();
            let mut top = rect.y;
            while top > 0 {
                let probe = GridRect::new(rect.x, top - 1, rect.width, rect.height);
                if state.grid.overlapping(probe, &id).is_empty() {
                    top -= 1;
                } else {
                    break;
                }
            }
            if top < rect.y {
                let mv = Move {
                    item_id: id,
                    x: rect.x,
                    y: top,
                    width: rect.width,
                    height: rect.height,
                    kind: MoveKind::Float,
                    direction: Some(Direction::Up),
                    distance: rect.y - top,
                    score: 0,
                };
                state.apply(active, mv)?;
                moved = true;
            }
        }
        if !moved {
            return Ok(());
        }
    }
}
