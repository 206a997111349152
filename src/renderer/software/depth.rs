//! Per-column occlusion records.
//!
//! Every wall the column compositor paints leaves one entry on the floor
//! or ceiling list of its column: *beyond `depth`, nothing is visible
//! below (floor) / above (ceiling) row `limit`*.  Sprites are clipped
//! against the entries nearer than themselves.
//!
//! Entries live in one arena per bound; a column owns the contiguous slot
//! range it appended.  Hits arrive near to far, so each list is ordered
//! nearest-first by construction and never sorted.

use std::ops::Range;

use tracing::trace;

use crate::fixed::Fixed;

/// Which list an occluder belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Lower wall: hides rows at and below `limit`.
    Floor,
    /// Upper wall: hides rows above `limit`.
    Ceiling,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthEntry {
    pub depth: Fixed,
    pub limit: i16,
}

#[derive(Default)]
struct Lists {
    entries: Vec<DepthEntry>,
    cols: Vec<Range<u32>>,
}

impl Lists {
    fn reset(&mut self, width: usize) {
        self.entries.clear();
        self.cols.clear();
        self.cols.resize(width, 0..0);
    }

    fn begin(&mut self, x: usize) {
        let at = self.entries.len() as u32;
        self.cols[x] = at..at;
    }

    fn push(&mut self, x: usize, e: DepthEntry) {
        debug_assert_eq!(
            self.cols[x].end as usize,
            self.entries.len(),
            "occluders must be pushed for the current column"
        );
        debug_assert!(
            self.column(x).last().is_none_or(|last| last.depth <= e.depth),
            "occluders must arrive near to far"
        );
        if self.entries.len() == self.entries.capacity() {
            trace!(len = self.entries.len(), "occlusion pool grows");
        }
        self.entries.push(e);
        self.cols[x].end += 1;
    }

    #[inline]
    fn column(&self, x: usize) -> &[DepthEntry] {
        let r = &self.cols[x];
        &self.entries[r.start as usize..r.end as usize]
    }
}

/// Occluder lists for every column of one frame.
#[derive(Default)]
pub struct DepthRecords {
    height: i32,
    floor: Lists,
    ceil: Lists,
}

impl DepthRecords {
    /// Drop every record; the arenas keep their capacity.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.height = height as i32;
        self.floor.reset(width);
        self.ceil.reset(width);
    }

    /// Start (or restart) the lists of column `x`.
    pub fn begin_column(&mut self, x: usize) {
        self.floor.begin(x);
        self.ceil.begin(x);
    }

    pub fn push(&mut self, x: usize, bound: Bound, depth: Fixed, limit: i32) {
        let e = DepthEntry {
            depth,
            limit: limit.clamp(0, self.height) as i16,
        };
        match bound {
            Bound::Floor => self.floor.push(x, e),
            Bound::Ceiling => self.ceil.push(x, e),
        }
    }

    /// Records of column `x`, nearest first.
    pub fn column(&self, x: usize, bound: Bound) -> &[DepthEntry] {
        match bound {
            Bound::Floor => self.floor.column(x),
            Bound::Ceiling => self.ceil.column(x),
        }
    }

    /// Rows `top .. bottom` of column `x` left open by every occluder
    /// nearer than `depth`.
    pub fn clip(&self, x: usize, depth: Fixed) -> (i32, i32) {
        let mut top = 0;
        let mut bottom = self.height;
        for e in self.ceil.column(x).iter().take_while(|e| e.depth < depth) {
            top = top.max(e.limit as i32);
        }
        for e in self.floor.column(x).iter().take_while(|e| e.depth < depth) {
            bottom = bottom.min(e.limit as i32);
        }
        (top, bottom)
    }

    /// Total records held.
    pub fn len(&self) -> usize {
        self.floor.entries.len() + self.ceil.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
