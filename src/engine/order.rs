//! Painter's-order resolver.
//!
//! Items that overlap on screen are ordered by half-plane tests on their
//! world-space footprints instead of by a depth value:
//!
//! 1. take the first pending item as *candidate*;
//! 2. scan the other pending items that overlap it in screen X;
//! 3. if one lies strictly behind the candidate it becomes the candidate
//!    and the scan restarts;
//! 4. a full scan with nothing behind → the candidate is drawn and leaves
//!    the pending set.
//!
//! Pairs whose X ranges do not overlap are never compared.  Footprints that
//! cross each other give no answer and are treated as independent; a chain
//! of candidates that loops back on itself is broken by accepting the
//! current candidate as-is.

use std::{collections::VecDeque, ops::Range};

use tracing::debug;

use crate::fixed::FxVec2;

/// Anything the resolver can order.
pub trait Ordered {
    /// Screen columns covered, half-open.
    fn x_range(&self) -> Range<i32>;
    /// World-space segment the item occupies.
    fn footprint(&self) -> (FxVec2, FxVec2);
}

/// Work done by one [`Resolver::resolve`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Footprint side tests between overlapping items.
    pub comparisons: u32,
    /// Times a scan restarted with a new candidate.
    pub restarts: u32,
    /// Candidate chains broken because they looped.
    pub cycles: u32,
}

/// Reusable scratch for ordering; keeps its allocations between frames.
#[derive(Default)]
pub struct Resolver {
    /// Items already handed to the draw callback.
    certain: Vec<bool>,
    /// Pending items in submission order (drawn ones are skipped lazily).
    queue: VecDeque<usize>,
    /// Round stamp of the candidate chain each item joined.
    visited: Vec<u32>,
    round: u32,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `draw(i)` once for every index of `items`, back to front as
    /// seen from `viewer`.
    pub fn resolve<T: Ordered>(
        &mut self,
        items: &[T],
        viewer: FxVec2,
        mut draw: impl FnMut(usize),
    ) -> ResolveStats {
        let n = items.len();
        let mut stats = ResolveStats::default();

        self.certain.clear();
        self.certain.resize(n, false);
        self.visited.clear();
        self.visited.resize(n, 0);
        self.round = 0;
        self.queue.clear();
        self.queue.extend(0..n);

        loop {
            while matches!(self.queue.front(), Some(&i) if self.certain[i]) {
                self.queue.pop_front();
            }
            let Some(&first) = self.queue.front() else {
                break;
            };

            self.round += 1;
            let mut cand = first;
            self.visited[cand] = self.round;

            'scan: loop {
                let cand_range = items[cand].x_range();
                for &other in &self.queue {
                    if other == cand || self.certain[other] {
                        continue;
                    }
                    if !overlaps(&cand_range, &items[other].x_range()) {
                        continue;
                    }
                    stats.comparisons += 1;
                    if is_behind(&items[other], &items[cand], viewer) != Some(true) {
                        continue;
                    }
                    if self.visited[other] == self.round {
                        stats.cycles += 1;
                        debug!(candidate = cand, other, "painter's order cycle, keeping candidate");
                        break 'scan;
                    }
                    self.visited[other] = self.round;
                    cand = other;
                    stats.restarts += 1;
                    continue 'scan;
                }
                break;
            }

            self.certain[cand] = true;
            draw(cand);
        }
        stats
    }
}

#[inline(always)]
fn overlaps(a: &Range<i32>, b: &Range<i32>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Sign of `p` relative to the infinite line through `line`.
#[inline(always)]
fn side_of(line: (FxVec2, FxVec2), p: FxVec2) -> i32 {
    (line.1 - line.0).cross(p - line.0).signum() as i32
}

/// Side of `line` holding both of `seg`'s endpoints; an endpoint lying on
/// the line takes the other one's side.  `None` when `seg` straddles the
/// line or lies on it.
#[inline]
fn seg_side(line: (FxVec2, FxVec2), seg: (FxVec2, FxVec2)) -> Option<i32> {
    let (a, b) = (side_of(line, seg.0), side_of(line, seg.1));
    match (a, b) {
        (0, 0) => None,
        (s, 0) | (0, s) => Some(s),
        (s, t) if s == t => Some(s),
        _ => None,
    }
}

/// `Some(true)` if `a` must be drawn before `b`, `Some(false)` if after,
/// `None` if no order can be derived from the footprints.
pub fn is_behind<A: Ordered, B: Ordered>(a: &A, b: &B, viewer: FxVec2) -> Option<bool> {
    let fa = a.footprint();
    let fb = b.footprint();

    // a entirely on one side of b's line: a is in front iff it shares
    // the viewer's side
    if let Some(s) = seg_side(fb, fa) {
        let v = side_of(fb, viewer);
        if v != 0 {
            return Some(s != v);
        }
    }
    // b's line passes between a's endpoints: test b against a's line
    if let Some(s) = seg_side(fa, fb) {
        let v = side_of(fa, viewer);
        if v != 0 {
            return Some(s == v);
        }
    }
    None
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
