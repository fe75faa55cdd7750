//! Classifies which neighbours must stay fixed during a single user step.
//!
//! When the user's item advances one cell, any item on the leading edge of
//! the new footprint that is only *partially* covered cannot be displaced
//! cleanly: pushing it would tear the layout mid-gesture. Such items are
//! tagged as conflicts and pinned for the current step. Items the new
//! footprint covers fully are swap or push candidates instead and are left
//! to the overlap search.

use boardgrid_core::{Direction, GridRect, ItemId, LayoutError};
use rustc_hash::FxHashSet;

use crate::grid::Grid;

/// Items pinned in place for the current gesture, plus the direction that
/// established them.
///
/// The set persists across repeated single-cell steps of the same gesture so
/// that swap direction stays stable while the user drags through a chain of
/// partial overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Conflicts {
    pub direction: Direction,
    pub items: FxHashSet<ItemId>,
}

/// Inspect the leading edge of an applied single-cell user step.
///
/// `dx`/`dy` is the step's signed delta; anything other than a unit cardinal
/// delta fails with [`LayoutError::InvalidMove`]. When `previous` carries a
/// direction established earlier in the same gesture, that direction is
/// reused instead of the delta-derived one to avoid direction flips during
/// chained partial overlaps.
pub(crate) fn find_conflicts<D: Clone>(
    grid: &Grid<D>,
    item_id: &ItemId,
    dx: i32,
    dy: i32,
    previous: Option<&Conflicts>,
) -> Result<Option<Conflicts>, LayoutError> {
    let derived =
        Direction::from_unit_delta(dx, dy).ok_or(LayoutError::InvalidMove { dx, dy })?;
    let direction = previous.map_or(derived, |c| c.direction);

    let rect = grid.item(item_id)?.rect();
    // The one-cell-thick slice of the new footprint at its leading edge.
    let edge = match direction {
        Direction::Up => GridRect::new(rect.x, rect.y, rect.width, 1),
        Direction::Down => GridRect::new(rect.x, rect.bottom() - 1, rect.width, 1),
        Direction::Left => GridRect::new(rect.x, rect.y, 1, rect.height),
        Direction::Right => GridRect::new(rect.right() - 1, rect.y, 1, rect.height),
    };

    let mut items = FxHashSet::default();
    for id in grid.overlapping(edge, item_id) {
        let other = grid.item(&id)?.rect();
        let extends_past_edge = match direction {
            Direction::Up => other.y < rect.y,
            Direction::Down => other.bottom() > rect.bottom(),
            Direction::Left => other.x < rect.x,
            Direction::Right => other.right() > rect.right(),
        };
        if extends_past_edge {
            items.insert(id);
        }
    }

    Ok(if items.is_empty() {
        None
    } else {
        Some(Conflicts { direction, items })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardgrid_core::{GridItem, GridLayout};

    fn grid(items: Vec<GridItem>, columns: i32) -> Grid {
        Grid::new(GridLayout::new(items, columns)).unwrap()
    }

    #[test]
    fn diagonal_zero_and_long_deltas_are_invalid() {
        let g = grid(vec![GridItem::new("a", 0, 0, 1, 1)], 3);
        for (dx, dy) in [(1, 1), (0, 0), (2, 0), (0, -2), (-1, 1)] {
            let err = find_conflicts(&g, &"a".into(), dx, dy, None).unwrap_err();
            assert_eq!(err, LayoutError::InvalidMove { dx, dy });
        }
    }

    #[test]
    fn partially_covered_item_is_a_conflict() {
        // [[A, B, B]] with A already stepped right onto B's first cell.
        let mut g = grid(
            vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 1, 0, 2, 1)],
            3,
        );
        g.move_to(&"a".into(), 1, 0).unwrap();
        let conflicts = find_conflicts(&g, &"a".into(), 1, 0, None)
            .unwrap()
            .unwrap();
        assert_eq!(conflicts.direction, Direction::Right);
        assert!(conflicts.items.contains(&"b".into()));
    }

    #[test]
    fn fully_covered_item_is_not_a_conflict() {
        // Equal-size neighbour: stepping onto it covers it fully.
        let mut g = grid(
            vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 1, 0, 1, 1)],
            3,
        );
        g.move_to(&"a".into(), 1, 0).unwrap();
        assert!(
            find_conflicts(&g, &"a".into(), 1, 0, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn vertical_partial_overlap_conflicts() {
        let mut g = grid(
            vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 0, 1, 1, 2)],
            2,
        );
        g.move_to(&"a".into(), 0, 1).unwrap();
        let conflicts = find_conflicts(&g, &"a".into(), 0, 1, None)
            .unwrap()
            .unwrap();
        assert_eq!(conflicts.direction, Direction::Down);
        assert!(conflicts.items.contains(&"b".into()));
    }

    #[test]
    fn previous_direction_is_reused() {
        // A second step downward while a rightward gesture is in flight
        // still inspects the right edge.
        let mut g = grid(
            vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 1, 1, 2, 1)],
            3,
        );
        g.move_to(&"a".into(), 1, 1).unwrap();
        let previous = Conflicts {
            direction: Direction::Right,
            items: FxHashSet::default(),
        };
        let conflicts = find_conflicts(&g, &"a".into(), 0, 1, Some(&previous))
            .unwrap()
            .unwrap();
        assert_eq!(conflicts.direction, Direction::Right);
        assert!(conflicts.items.contains(&"b".into()));
    }

    #[test]
    fn clear_edge_yields_no_conflicts() {
        let g = grid(
            vec![GridItem::new("a", 0, 0, 1, 1), GridItem::new("b", 2, 0, 1, 1)],
            3,
        );
        assert!(
            find_conflicts(&g, &"a".into(), 1, 0, None)
                .unwrap()
                .is_none()
        );
    }
}
