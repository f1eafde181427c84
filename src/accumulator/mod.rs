// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Accumulates the range tombstones of a streamed partition and tells which tombstone applies
//! to each clustering row.


use std::mem;

use log::debug;
use log::trace;
use log::warn;

use crate::bound::invert_kind;
use crate::bound::BoundComparator;
use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::container::RangeTombstoneSet;
use crate::range_tombstone::RangeTombstone;
use crate::tombstone::Tombstone;

/// Working sets this large are reported, once per doubling.
const LARGE_WORKING_SET: usize = 1024;

/// Determines the tombstone of every clustering row of a streamed partition.
///
/// Range tombstones and rows must be fed in increasing position: after `apply(rt)` or
/// `tombstone_for_row(ck)`, a later call may not present a position before `rt`'s start bound
/// or before `ck`. For a reversed accumulator "increasing" means decreasing clustering order.
/// Debug builds panic when this is violated.
///
/// Held range tombstones are cut into disjoint pieces, each carrying the strongest marker
/// applied to it. A piece is dropped as soon as the position passes its end, so the working set
/// is bounded by the ranges open at one position, not by the length of the stream.
///
/// # Examples
///
/// ```
/// use range_tombstone::schema::encode_bigint;
/// use range_tombstone::schema::ColumnType;
/// use range_tombstone::ClusteringKeyPrefix;
/// use range_tombstone::ClusteringSchema;
/// use range_tombstone::RangeTombstone;
/// use range_tombstone::RangeTombstoneAccumulator;
/// use range_tombstone::Tombstone;
///
/// let schema = ClusteringSchema::new([("id", ColumnType::BigInt)]);
/// let ck = |v: i64| ClusteringKeyPrefix::new(vec![encode_bigint(v)]);
///
/// let mut acc = RangeTombstoneAccumulator::new(&schema, false);
/// acc.set_partition_tombstone(Tombstone::new(5, 0));
///
/// assert_eq!(acc.tombstone_for_row(&ck(1)), Tombstone::new(5, 0));
/// acc.apply(RangeTombstone::inclusive(ck(2), ck(4), Tombstone::new(10, 0)));
/// assert_eq!(acc.tombstone_for_row(&ck(3)), Tombstone::new(10, 0));
/// assert_eq!(acc.tombstone_for_row(&ck(5)), Tombstone::new(5, 0));
/// ```
#[derive(Debug, Clone)]
pub struct RangeTombstoneAccumulator<C> {
    cmp: BoundComparator<C>,
    partition_tombstone: Tombstone,
    range_tombstones: RangeTombstoneSet<C>,
    /// Marker of the piece covering the last position, if any.
    covering_tombstone: Tombstone,
    current_tombstone: Tombstone,
    reversed: bool,
    #[cfg(debug_assertions)]
    last_position: Option<(ClusteringKeyPrefix, i32)>,
}

impl<C> RangeTombstoneAccumulator<C>
where C: Collation + Clone
{
    /// Create an accumulator for a stream in clustering order, or in reversed clustering order
    /// if `reversed`.
    pub fn new(collation: C, reversed: bool) -> Self {
        let mut cmp = BoundComparator::new(collation);
        if reversed {
            cmp = cmp.reversed();
        }

        Self {
            range_tombstones: RangeTombstoneSet::new(cmp.clone()),
            cmp,
            partition_tombstone: Tombstone::none(),
            covering_tombstone: Tombstone::none(),
            current_tombstone: Tombstone::none(),
            reversed,
            #[cfg(debug_assertions)]
            last_position: None,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_partition_tombstone(&mut self, t: Tombstone) {
        self.partition_tombstone = t;
        self.update_current_tombstone();
    }

    pub fn partition_tombstone(&self) -> Tombstone {
        self.partition_tombstone
    }

    /// The tombstone at the last position fed.
    pub fn current_tombstone(&self) -> Tombstone {
        self.current_tombstone
    }

    /// Return the strongest of the partition tombstone and the range tombstones covering `ck`.
    pub fn tombstone_for_row(&mut self, ck: &ClusteringKeyPrefix) -> Tombstone {
        self.check_monotonic(ck, 0);
        self.drop_unneeded_tombstones(ck, 0);
        self.current_tombstone
    }

    /// Add a range tombstone, given in clustering order even for a reversed accumulator.
    pub fn apply(&mut self, mut rt: RangeTombstone) {
        if self.reversed {
            rt.flip();
        }

        let start = rt.start.clone();
        let w = rt.start_kind.weight();

        self.check_monotonic(&start, w);
        self.drop_unneeded_tombstones(&start, w);
        self.trim_first(&rt);
        self.merge(rt);
        self.update_covering_tombstone(&start, w);

        let len = self.range_tombstones.len();
        if len >= LARGE_WORKING_SET && len.is_power_of_two() {
            warn!(
                "RangeTombstoneAccumulator holds {} range tombstones at {}",
                len, start
            );
        }
    }

    /// Drop every held range tombstone, keeping the partition tombstone.
    ///
    /// The next call may start at any position.
    pub fn clear(&mut self) {
        debug!(
            "clear RangeTombstoneAccumulator: {} range tombstones dropped",
            self.range_tombstones.len()
        );

        self.range_tombstones.clear();
        self.covering_tombstone = Tombstone::none();
        self.update_current_tombstone();

        #[cfg(debug_assertions)]
        {
            self.last_position = None;
        }
    }

    /// Number of disjoint range tombstone pieces held.
    pub fn len(&self) -> usize {
        self.range_tombstones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range_tombstones.is_empty()
    }

    /// The held pieces, in stream order.
    pub fn range_tombstones(&self) -> impl Iterator<Item = &RangeTombstone> + '_ {
        self.range_tombstones.iter()
    }

    pub fn memory_usage(&self) -> usize {
        self.range_tombstones.memory_usage()
    }

    fn update_current_tombstone(&mut self) {
        let mut t = self.partition_tombstone;
        t.apply(self.covering_tombstone);
        self.current_tombstone = t;
    }

    /// Pieces are disjoint and none ends before the position, so only the first one can cover
    /// it.
    fn update_covering_tombstone(&mut self, prefix: &ClusteringKeyPrefix, w: i32) {
        self.covering_tombstone = match self.range_tombstones.first() {
            Some(first) if !self.cmp.less(prefix, w, &first.start, first.start_kind.weight()) => {
                first.tomb
            }
            _ => Tombstone::none(),
        };
        self.update_current_tombstone();
    }

    fn drop_unneeded_tombstones(&mut self, prefix: &ClusteringKeyPrefix, w: i32) {
        loop {
            let passed = match self.range_tombstones.first() {
                Some(first) => self.cmp.less(&first.end, first.end_kind.weight(), prefix, w),
                None => false,
            };
            if !passed {
                break;
            }
            if let Some(rt) = self.range_tombstones.pop_first() {
                trace!("drop passed range tombstone: {}", rt);
            }
        }

        self.update_covering_tombstone(prefix, w);
    }

    /// Cut the part of the first piece that lies before `rt`, it can no longer match anything.
    fn trim_first(&mut self, rt: &RangeTombstone) {
        let started_before = match self.range_tombstones.first() {
            Some(first) => self.cmp.compare(first.start_bound(), rt.start_bound()).is_lt(),
            None => false,
        };
        if !started_before {
            return;
        }

        if let Some(mut first) = self.range_tombstones.pop_first() {
            first.start = rt.start.clone();
            first.start_kind = rt.start_kind;
            self.range_tombstones.insert(first);
        }
    }

    /// Merge `rt` into the pieces it overlaps, keeping the pieces disjoint.
    fn merge(&mut self, rt: RangeTombstone) {
        let mut overlapping = Vec::new();
        loop {
            let overlaps = match self.range_tombstones.first() {
                Some(first) => self.cmp.compare(first.start_bound(), rt.end_bound()).is_le(),
                None => false,
            };
            if !overlaps {
                break;
            }
            if let Some(piece) = self.range_tombstones.pop_first() {
                overlapping.push(piece);
            }
        }

        let mut merged = Vec::with_capacity(overlapping.len() + 2);
        let mut pending = Some(rt);

        for mut piece in overlapping {
            let Some(mut src) = pending.take() else {
                merged.push(piece);
                continue;
            };

            // The gap before this piece is covered by `src` only.
            if self.cmp.compare(src.start_bound(), piece.start_bound()).is_lt() {
                merged.push(RangeTombstone::new(
                    src.start.clone(),
                    src.start_kind,
                    piece.start.clone(),
                    invert_kind(piece.start_kind),
                    src.tomb,
                ));
                src.start = piece.start.clone();
                src.start_kind = piece.start_kind;
            }

            // `apply()` must be called on the range that reaches further.
            if self.cmp.compare(piece.end_bound(), src.end_bound()).is_lt() {
                let end = mem::replace(&mut src.end, piece.end.clone());
                let end_kind = mem::replace(&mut src.end_kind, piece.end_kind);
                pending = Some(RangeTombstone::new(
                    piece.end.clone(),
                    invert_kind(piece.end_kind),
                    end,
                    end_kind,
                    src.tomb,
                ));
            }

            merged.extend(piece.apply(&self.cmp, src));
            merged.push(piece);
        }

        merged.extend(pending);

        // Back to front, so that every piece lands at the front of the set.
        for piece in merged.into_iter().rev() {
            if !piece.is_empty() {
                self.range_tombstones.insert(piece);
            }
        }
    }

    #[cfg(debug_assertions)]
    fn check_monotonic(&mut self, prefix: &ClusteringKeyPrefix, w: i32) {
        if let Some((last, last_w)) = &self.last_position {
            assert!(
                !self.cmp.less(prefix, w, last, *last_w),
                "RangeTombstoneAccumulator fed out of order: {} weight {} after {} weight {}",
                prefix,
                w,
                last,
                last_w
            );
        }
        self.last_position = Some((prefix.clone(), w));
    }

    #[cfg(not(debug_assertions))]
    fn check_monotonic(&mut self, _prefix: &ClusteringKeyPrefix, _w: i32) {}
}
