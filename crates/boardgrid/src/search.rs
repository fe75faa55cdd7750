//! Branch-and-bound resolution of transient overlaps.
//!
//! A user step that lands on other items leaves the grid with a non-empty
//! overlap set. The search explores sequences of secondary relocations that
//! eliminate every overlap, scored to minimize perceived disruption, and
//! commits the cheapest converged sequence. Branches clone the grid they
//! mutate, so no two live branches ever share state.
//!
//! The frontier holds open solutions — a resolution state plus one candidate
//! move not yet applied — ordered by projected score. Each round expands only
//! the best few, which bounds the branching factor and keeps worst-case
//! latency predictable at the cost of occasionally missing a globally
//! optimal (but rarely perceptibly different) resolution.
//!
//! Non-convergence is never an error. When conflicts make convergence
//! structurally impossible the unresolved state is handed back, and when the
//! round budget runs out without conflicts a push-everything-down fallback
//! finishes the job (unbounded vertical space makes it always terminate).

use boardgrid_core::{Direction, GridRect, ItemId, LayoutError};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::conflict::Conflicts;
use crate::grid::Grid;
use crate::{Move, MoveKind};

/// Tuning knobs for the overlap search.
///
/// The defaults are empirically tuned. None of the values is load-bearing on
/// its own: the convergence and latency properties hold across a range, and
/// the test suite exercises non-default tunings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTuning {
    /// Open solutions expanded per round.
    pub frontier_width: usize,
    /// Hard cap on expansion rounds before the fallback takes over.
    pub max_rounds: usize,
    /// Penalty per secondary overlap a candidate's path creates.
    pub overlap_penalty: i64,
    /// Penalty for resting entirely above the vertical span the gesture has
    /// touched.
    pub above_span_penalty: i64,
    /// Penalty for resting entirely outside the gesture's horizontal span.
    pub beside_span_penalty: i64,
    /// Penalty for moving against the direction of the issuer's last move
    /// when the candidate is not a true swap.
    pub alternation_penalty: i64,
    /// Weight applied to accumulated displacement when a candidate moves
    /// against it.
    pub gradient_weight: i64,
    /// Base score for swapping directly with the user's item.
    pub swap_base: i64,
    /// Base score for moving into genuinely vacant space.
    pub vacant_base: i64,
    /// Base score for moving into space vacated by a non-user item.
    pub vacated_base: i64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            frontier_width: 5,
            max_rounds: 100,
            overlap_penalty: 50,
            above_span_penalty: 500,
            beside_span_penalty: 50,
            alternation_penalty: 10,
            gradient_weight: 1,
            swap_base: 10,
            vacant_base: 20,
            vacated_base: 40,
        }
    }
}

/// Working state threaded through one resolution branch.
///
/// `move_index` marks where the current command's moves begin within the
/// shared log; earlier committed moves from prior chained commands are
/// preserved but never re-scored.
#[derive(Debug, Clone)]
pub(crate) struct ResolutionState<D> {
    pub grid: Grid<D>,
    pub moves: Vec<Move>,
    pub move_index: usize,
    pub conflicts: Option<Conflicts>,
    /// Live `(item, issuer)` pairs: items currently intersecting something,
    /// keyed with the item whose move caused the intersection. Insertion
    /// ordered for deterministic expansion.
    pub overlaps: Vec<(ItemId, ItemId)>,
    pub score: i64,
}

impl<D: Clone> ResolutionState<D> {
    /// Commit a move: mutate the grid, refresh the overlap map, append to
    /// the log, and absorb the move's score.
    ///
    /// `active` is the item the current command manipulates; it is never
    /// keyed as an overlap (it cannot be displaced), so a mover landing on
    /// it is re-keyed as the one that must escape.
    pub fn apply(&mut self, active: Option<&ItemId>, mv: Move) -> Result<(), LayoutError> {
        match mv.kind {
            MoveKind::Resize => self.grid.resize(&mv.item_id, mv.width, mv.height)?,
            // The facade mutates the grid before logging these.
            MoveKind::Insert | MoveKind::Remove => {}
            _ => self.grid.move_to(&mv.item_id, mv.x, mv.y)?,
        }
        self.score += mv.score;
        if mv.kind == MoveKind::Remove {
            self.prune_overlaps(&mv.item_id)?;
        } else {
            self.refresh_overlaps(&mv.item_id, active)?;
        }
        self.moves.push(mv);
        Ok(())
    }

    /// Recompute the overlap map after `mover` changed footprint.
    fn refresh_overlaps(
        &mut self,
        mover: &ItemId,
        active: Option<&ItemId>,
    ) -> Result<(), LayoutError> {
        let mut next: Vec<(ItemId, ItemId)> = Vec::with_capacity(self.overlaps.len());
        for (item, issuer) in &self.overlaps {
            if item == mover {
                // Re-keyed below if the mover still intersects something.
                continue;
            }
            let hits = self.grid.overlaps_of(item)?;
            if hits.is_empty() {
                continue;
            }
            // Keep the recorded issuer while it still applies, otherwise
            // re-attribute to a current intersector.
            let issuer = if hits.contains(issuer) {
                issuer.clone()
            } else {
                hits[0].clone()
            };
            next.push((item.clone(), issuer));
        }
        for hit in self.grid.overlaps_of(mover)? {
            if active == Some(&hit) {
                // The mover landed on the manipulated item; the mover itself
                // must escape next.
                if !next.iter().any(|(item, _)| item == mover) {
                    next.push((mover.clone(), hit));
                }
            } else if let Some(entry) = next.iter_mut().find(|(item, _)| item == &hit) {
                entry.1 = mover.clone();
            } else {
                next.push((hit, mover.clone()));
            }
        }
        self.overlaps = next;
        Ok(())
    }

    /// Drop overlap entries that referenced a removed item.
    fn prune_overlaps(&mut self, removed: &ItemId) -> Result<(), LayoutError> {
        let mut next = Vec::with_capacity(self.overlaps.len());
        for (item, issuer) in &self.overlaps {
            if item == removed {
                continue;
            }
            let hits = self.grid.overlaps_of(item)?;
            if hits.is_empty() {
                continue;
            }
            let issuer = if hits.contains(issuer) {
                issuer.clone()
            } else {
                hits[0].clone()
            };
            next.push((item.clone(), issuer));
        }
        self.overlaps = next;
        Ok(())
    }

    fn is_conflicted(&self, id: &ItemId) -> bool {
        self.conflicts
            .as_ref()
            .is_some_and(|c| c.items.contains(id))
    }

    fn has_unresolved_overlap(&self, id: &ItemId) -> bool {
        self.overlaps.iter().any(|(item, _)| item == id)
    }
}

/// An open solution: a state plus one candidate move not yet applied.
struct OpenSolution<D> {
    state: ResolutionState<D>,
    pending: Option<Move>,
}

impl<D> OpenSolution<D> {
    fn projected_score(&self) -> i64 {
        self.state.score + self.pending.as_ref().map_or(0, |m| m.score)
    }
}

/// Resolve every outstanding overlap in `state`, or return it unresolved
/// when conflicts make convergence structurally impossible.
pub(crate) fn resolve_overlaps<D: Clone>(
    state: ResolutionState<D>,
    active: &ItemId,
    tuning: &SearchTuning,
) -> Result<ResolutionState<D>, LayoutError> {
    if state.overlaps.is_empty() {
        return Ok(state);
    }

    let mut best: Option<ResolutionState<D>> = None;
    let mut frontier: Vec<OpenSolution<D>> = vec![OpenSolution {
        state: state.clone(),
        pending: None,
    }];
    let mut memo: FxHashSet<(ItemId, i32, i32, i64)> = FxHashSet::default();

    let mut rounds = 0;
    while !frontier.is_empty() && rounds < tuning.max_rounds {
        rounds += 1;
        frontier.sort_by_key(|open| open.projected_score());
        let take = frontier.len().min(tuning.frontier_width);
        let batch: Vec<OpenSolution<D>> = frontier.drain(..take).collect();
        trace!(round = rounds, expanded = take, open = frontier.len(), "search round");

        for open in batch {
            let mut st = open.state;
            if let Some(pending) = open.pending {
                st.apply(Some(active), pending)?;
            }
            if st.overlaps.is_empty() {
                if best.as_ref().is_none_or(|b| st.score < b.score) {
                    trace!(score = st.score, "accepted candidate solution");
                    best = Some(st);
                }
                continue;
            }
            if let Some(b) = &best {
                if st.score >= b.score {
                    continue;
                }
            }
            expand(&st, active, tuning, &mut memo, best.as_ref().map(|b| b.score), &mut frontier);
        }

        if let Some(b) = &best {
            let bound = b.score;
            frontier.retain(|open| open.projected_score() < bound);
        }
    }

    match best {
        Some(resolved) => Ok(resolved),
        None => {
            if state
                .conflicts
                .as_ref()
                .is_some_and(|c| !c.items.is_empty())
            {
                // Blocked: resolution is deferred until the gesture clears
                // the conflict by moving further.
                debug!("overlap search blocked by conflicts; step left unresolved");
                Ok(state)
            } else {
                debug!(rounds, "overlap search exhausted; using push-down fallback");
                push_down_fallback(state, active)
            }
        }
    }
}

/// Generate candidate moves for every outstanding overlap of `st`.
fn expand<D: Clone>(
    st: &ResolutionState<D>,
    active: &ItemId,
    tuning: &SearchTuning,
    memo: &mut FxHashSet<(ItemId, i32, i32, i64)>,
    bound: Option<i64>,
    frontier: &mut Vec<OpenSolution<D>>,
) {
    for (overlap, issuer) in &st.overlaps {
        if st.is_conflicted(overlap) {
            continue;
        }
        for direction in Direction::ALL {
            let Some(candidate) = plan_escape(st, overlap, issuer, direction, active, tuning)
            else {
                continue;
            };
            let projected = st.score + candidate.score;
            if bound.is_some_and(|b| projected >= b) {
                continue;
            }
            // A state reached again through a different move ordering is not
            // worth re-deriving.
            if !memo.insert((candidate.item_id.clone(), candidate.x, candidate.y, projected)) {
                continue;
            }
            frontier.push(OpenSolution {
                state: st.clone(),
                pending: Some(candidate),
            });
        }
    }
}

/// Plan the move that relocates `overlap` fully clear of `issuer` in the
/// given direction, or `None` when the candidate is inadmissible.
fn plan_escape<D: Clone>(
    st: &ResolutionState<D>,
    overlap: &ItemId,
    issuer: &ItemId,
    direction: Direction,
    active: &ItemId,
    tuning: &SearchTuning,
) -> Option<Move> {
    let cur = st.grid.item(overlap).ok()?.rect();
    let isr = st.grid.item(issuer).ok()?.rect();

    let (x, y) = match direction {
        Direction::Up => (cur.x, isr.y - cur.height),
        Direction::Down => (cur.x, isr.bottom()),
        Direction::Left => (isr.x - cur.width, cur.y),
        Direction::Right => (isr.right(), cur.y),
    };
    if x < 0 || y < 0 || x + cur.width > st.grid.columns() {
        return None;
    }
    if x == cur.x && y == cur.y {
        return None;
    }
    let dest = GridRect::new(x, y, cur.width, cur.height);

    // Oscillation guard: never undo the item's immediately preceding move.
    if let Some(last) = st.moves[st.move_index..]
        .iter()
        .rev()
        .find(|m| &m.item_id == overlap && m.direction.is_some())
    {
        if last.origin() == Some(dest.position()) {
            return None;
        }
    }

    // Sweep the whole travel corridor, not just the destination.
    let path = cur.union(&dest);
    let mut secondary = 0i64;
    for hit in st.grid.overlapping(path, overlap) {
        if &hit == issuer {
            continue;
        }
        if &hit == active || st.is_conflicted(&hit) || st.has_unresolved_overlap(&hit) {
            return None;
        }
        secondary += 1;
    }

    let dx = x - cur.x;
    let dy = y - cur.y;
    let distance = dx.abs() + dy.abs();

    let user_vacated = st.moves[st.move_index..]
        .iter()
        .rev()
        .find(|m| &m.item_id == active && m.direction.is_some())
        .and_then(Move::origin_rect);
    let is_user_swap =
        issuer == active && user_vacated.is_some_and(|vacated| vacated.intersects(&dest));

    let base = if is_user_swap {
        tuning.swap_base
    } else if secondary > 0 {
        // Contested push: penalties alone make it the worst category.
        0
    } else if vacated_by_other(st, &dest, active, overlap) {
        tuning.vacated_base
    } else {
        tuning.vacant_base
    };

    let mut penalties = i64::from(distance);
    penalties += tuning.overlap_penalty * secondary;

    if let Some((vspan, hspan)) = gesture_span(st, active) {
        if dest.bottom() <= vspan.0 {
            penalties += tuning.above_span_penalty;
        }
        if dest.right() <= hspan.0 || dest.x >= hspan.1 {
            penalties += tuning.beside_span_penalty;
        }
    }

    // Discourage churn against the item's accumulated displacement.
    let (gx, gy) = gradient(st, overlap);
    if dx != 0 && gx != 0 && dx.signum() != gx.signum() {
        penalties += tuning.gradient_weight * i64::from(gx.abs());
    }
    if dy != 0 && gy != 0 && dy.signum() != gy.signum() {
        penalties += tuning.gradient_weight * i64::from(gy.abs());
    }

    // Alternating against the issuer's own travel reads as back-and-forth
    // unless the candidate takes the space the issuer vacated.
    if let Some(issuer_last) = st.moves[st.move_index..]
        .iter()
        .rev()
        .find(|m| &m.item_id == issuer && m.direction.is_some())
    {
        let takes_vacated = issuer_last
            .origin_rect()
            .is_some_and(|vacated| vacated.intersects(&dest));
        if issuer_last.direction != Some(direction) && !takes_vacated {
            penalties += tuning.alternation_penalty;
        }
    }

    Some(Move {
        item_id: overlap.clone(),
        x,
        y,
        width: cur.width,
        height: cur.height,
        kind: MoveKind::Overlap,
        direction: Some(direction),
        distance,
        score: base + penalties,
    })
}

/// Whether `dest` lies in space some non-user item vacated earlier in the
/// current command.
fn vacated_by_other<D: Clone>(
    st: &ResolutionState<D>,
    dest: &GridRect,
    active: &ItemId,
    mover: &ItemId,
) -> bool {
    st.moves[st.move_index..].iter().any(|m| {
        &m.item_id != active
            && &m.item_id != mover
            && m.origin_rect().is_some_and(|vacated| vacated.intersects(dest))
    })
}

/// Net displacement of `id` accumulated over the current command.
fn gradient<D: Clone>(st: &ResolutionState<D>, id: &ItemId) -> (i32, i32) {
    let mut gx = 0;
    let mut gy = 0;
    for m in &st.moves[st.move_index..] {
        if &m.item_id == id {
            if let Some(origin) = m.origin() {
                gx += m.x - origin.x;
                gy += m.y - origin.y;
            }
        }
    }
    (gx, gy)
}

/// The vertical and horizontal extents the user's gesture has touched during
/// the current command: `((top, bottom), (left, right))`, half-open.
fn gesture_span<D: Clone>(
    st: &ResolutionState<D>,
    active: &ItemId,
) -> Option<((i32, i32), (i32, i32))> {
    let mut span: Option<GridRect> = None;
    for m in &st.moves[st.move_index..] {
        if &m.item_id != active {
            continue;
        }
        match m.kind {
            MoveKind::User | MoveKind::Resize | MoveKind::Insert => {
                let mut touched = m.rect();
                if let Some(origin) = m.origin_rect() {
                    touched = touched.union(&origin);
                }
                span = Some(span.map_or(touched, |acc| acc.union(&touched)));
            }
            _ => {}
        }
    }
    span.map(|rect| ((rect.y, rect.bottom()), (rect.x, rect.right())))
}

/// Guaranteed-convergent fallback: push every overlapping item straight down
/// past whatever it intersects. Every push strictly lowers an item and new
/// overlaps only appear below, so the loop terminates.
fn push_down_fallback<D: Clone>(
    mut state: ResolutionState<D>,
    active: &ItemId,
) -> Result<ResolutionState<D>, LayoutError> {
    while let Some((overlap, _)) = state.overlaps.first().cloned() {
        let cur = state.grid.item(&overlap)?.rect();
        let clear_y = state
            .grid
            .overlaps_of(&overlap)?
            .iter()
            .map(|id| state.grid.item(id).map(|item| item.rect().bottom()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max()
            .unwrap_or(cur.y);
        if clear_y <= cur.y {
            // Stale entry; the refresh below would have dropped it anyway.
            state.overlaps.remove(0);
            continue;
        }
        let mv = Move {
            item_id: overlap.clone(),
            x: cur.x,
            y: clear_y,
            width: cur.width,
            height: cur.height,
            kind: MoveKind::Overlap,
            direction: Some(Direction::Down),
            distance: clear_y - cur.y,
            score: 0,
        };
        state.apply(Some(active), mv)?;
    }
    Ok(state)
}
