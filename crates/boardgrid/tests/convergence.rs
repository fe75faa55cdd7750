//! Property/fuzz-style convergence checks for the layout engine.
//!
//! Random valid grids are driven through moves, inserts, resizes, and
//! removals, asserting after each commit that the resulting layout is
//! structurally valid (in bounds, overlap-free unless the step is blocked
//! on a conflict), that floating is idempotent, and that replay from the
//! same seed is deterministic.

use boardgrid::{
    GridItem, GridLayout, ItemId, LayoutEngine, LayoutShift, Position, SearchTuning,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn next_i32_range(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max);
        if min == max {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.next_u64() % span) as i32
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }
}

/// Build an overlap-free layout by dropping each new item onto the skyline
/// of the items already placed in its column range.
fn random_layout(rng: &mut Lcg, columns: i32, count: usize) -> GridLayout {
    let mut items: Vec<GridItem> = Vec::with_capacity(count);
    for i in 0..count {
        let width = rng.next_i32_range(1, 3.min(columns));
        let height = rng.next_i32_range(1, 3);
        let x = rng.next_i32_range(0, columns - width);
        let y = items
            .iter()
            .filter(|item| item.x < x + width && x < item.x + item.width)
            .map(|item| item.y + item.height)
            .max()
            .unwrap_or(0);
        items.push(GridItem::new(format!("item-{i}"), x, y, width, height));
    }
    GridLayout::new(items, columns)
}

fn item_ids(layout: &GridLayout) -> Vec<ItemId> {
    layout.items.iter().map(|item| item.id.clone()).collect()
}

/// Pairs of distinct items whose footprints intersect.
fn overlapping_pairs(layout: &GridLayout) -> Vec<(ItemId, ItemId)> {
    let mut pairs = Vec::new();
    for (i, a) in layout.items.iter().enumerate() {
        for b in &layout.items[i + 1..] {
            if a.rect().intersects(&b.rect()) {
                pairs.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    pairs
}

fn assert_in_bounds(layout: &GridLayout) {
    for item in &layout.items {
        assert!(item.x >= 0 && item.y >= 0, "{} escaped the grid", item.id);
        assert!(
            item.x + item.width <= layout.columns,
            "{} crossed the right edge",
            item.id
        );
    }
}

/// A committed shift must be loadable as a fresh baseline; a blocked one may
/// only carry overlaps that involve the item being dragged.
fn assert_shift_valid(shift: &LayoutShift, moved: &ItemId) {
    assert_in_bounds(&shift.next);
    if shift.conflict_item_ids.is_empty() {
        LayoutEngine::new(shift.next.clone()).unwrap();
    } else {
        for (a, b) in overlapping_pairs(&shift.next) {
            assert!(
                a == *moved || b == *moved,
                "blocked step left bystanders {a} and {b} overlapping"
            );
        }
    }
}

proptest! {
    #[test]
    fn random_moves_converge(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(4, 8);
        let count = rng.choose_index(8) + 3;
        let layout = random_layout(&mut rng, columns, count);
        let rows = layout.rows();
        let ids = item_ids(&layout);
        let engine = LayoutEngine::new(layout).unwrap();

        let id = ids[rng.choose_index(ids.len())].clone();
        let item = engine.layout().item(&id).unwrap().clone();
        let target = Position::new(
            rng.next_i32_range(0, columns - item.width),
            rng.next_i32_range(0, rows + 2),
        );
        let engine = engine.move_item(id.clone(), &[target]).unwrap();
        assert_shift_valid(&engine.layout_shift(), &id);
    }

    #[test]
    fn chained_moves_converge(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(4, 6);
        let layout = random_layout(&mut rng, columns, 6);
        let rows = layout.rows();
        let ids = item_ids(&layout);
        let mut engine = LayoutEngine::new(layout).unwrap();

        // One multi-command gesture on a single item.
        let id = ids[rng.choose_index(ids.len())].clone();
        for _ in 0..3 {
            let item = engine.layout().item(&id).unwrap().clone();
            let target = Position::new(
                rng.next_i32_range(0, columns - item.width),
                rng.next_i32_range(0, rows + 2),
            );
            engine = engine.move_item(id.clone(), &[target]).unwrap();
            assert_shift_valid(&engine.layout_shift(), &id);
        }
    }

    #[test]
    fn insertions_always_resolve(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(3, 8);
        let layout = random_layout(&mut rng, columns, 5);
        let rows = layout.rows();
        let engine = LayoutEngine::new(layout).unwrap();

        let width = rng.next_i32_range(1, 3.min(columns));
        let height = rng.next_i32_range(1, 3);
        let x = rng.next_i32_range(0, columns - width);
        let y = rng.next_i32_range(0, rows);
        let engine = engine
            .insert(GridItem::new("fresh", x, y, width, height))
            .unwrap();

        let shift = engine.layout_shift();
        prop_assert!(shift.conflict_item_ids.is_empty());
        LayoutEngine::new(shift.next).unwrap();
        let inserted = engine.layout().item(&"fresh".into()).unwrap().clone();
        prop_assert_eq!((inserted.x, inserted.y), (x, y), "inserted item moved");
    }

    #[test]
    fn resizes_converge(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(3, 8);
        let layout = random_layout(&mut rng, columns, 6);
        let ids = item_ids(&layout);
        let engine = LayoutEngine::new(layout).unwrap();

        let id = ids[rng.choose_index(ids.len())].clone();
        let item = engine.layout().item(&id).unwrap().clone();
        let width = rng.next_i32_range(1, columns - item.x);
        let height = rng.next_i32_range(1, 4);
        let engine = engine.resize(id, &[(width, height)]).unwrap();

        let shift = engine.layout_shift();
        prop_assert!(shift.conflict_item_ids.is_empty());
        LayoutEngine::new(shift.next).unwrap();
    }

    #[test]
    fn removal_then_refloat_stays_valid(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(3, 6);
        let layout = random_layout(&mut rng, columns, 6);
        let ids = item_ids(&layout);
        let engine = LayoutEngine::new(layout).unwrap();

        let id = ids[rng.choose_index(ids.len())].clone();
        let engine = engine.remove(id.clone()).unwrap().refloat().unwrap();
        let shift = engine.layout_shift();
        prop_assert!(shift.next.item(&id).is_none());
        LayoutEngine::new(shift.next).unwrap();
    }

    #[test]
    fn refloat_is_idempotent(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(3, 6);
        let layout = random_layout(&mut rng, columns, 6);
        let ids = item_ids(&layout);
        let engine = LayoutEngine::new(layout).unwrap();

        let id = ids[rng.choose_index(ids.len())].clone();
        let engine = engine.remove(id).unwrap().refloat().unwrap();
        let once = engine.layout();
        let moves_once = engine.layout_shift().moves.len();
        let engine = engine.refloat().unwrap();
        prop_assert_eq!(engine.layout(), once);
        prop_assert_eq!(engine.layout_shift().moves.len(), moves_once);
    }

    #[test]
    fn replay_is_deterministic(seed in any::<u64>()) {
        let run = |seed: u64| -> LayoutShift {
            let mut rng = Lcg::new(seed);
            let columns = rng.next_i32_range(4, 8);
            let layout = random_layout(&mut rng, columns, 6);
            let rows = layout.rows();
            let ids = item_ids(&layout);
            let engine = LayoutEngine::new(layout).unwrap();
            let id = ids[rng.choose_index(ids.len())].clone();
            let item = engine.layout().item(&id).unwrap().clone();
            let target = Position::new(
                rng.next_i32_range(0, columns - item.width),
                rng.next_i32_range(0, rows + 2),
            );
            engine.move_item(id, &[target]).unwrap().layout_shift()
        };
        prop_assert_eq!(run(seed), run(seed));
    }

    #[test]
    fn narrow_tuning_still_converges(seed in any::<u64>()) {
        let mut rng = Lcg::new(seed);
        let columns = rng.next_i32_range(4, 6);
        let layout = random_layout(&mut rng, columns, 5);
        let rows = layout.rows();
        let ids = item_ids(&layout);
        let tuning = SearchTuning {
            frontier_width: 2,
            max_rounds: 30,
            ..SearchTuning::default()
        };
        let engine = LayoutEngine::with_tuning(layout, tuning).unwrap();

        let id = ids[rng.choose_index(ids.len())].clone();
        let item = engine.layout().item(&id).unwrap().clone();
        let target = Position::new(
            rng.next_i32_range(0, columns - item.width),
            rng.next_i32_range(0, rows + 2),
        );
        let engine = engine.move_item(id.clone(), &[target]).unwrap();
        assert_shift_valid(&engine.layout_shift(), &id);
    }
}
