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

//! Defines [`RangeTombstone`], a deletion of every clustering key between two bounds.


use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::mem;

use serde::Deserialize;
use serde::Serialize;

use crate::bound::flip_bound_kind;
use crate::bound::invert_kind;
use crate::bound::BoundComparator;
use crate::bound::BoundKind;
use crate::bound::BoundView;
use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::errors::RangeTombstoneError;
use crate::tombstone::Tombstone;

/// A ranged deletion: every key between `start` and `end` is deleted by `tomb`.
///
/// A range tombstone with a no-op `tomb` is empty; producers are expected to drop those.
///
/// `PartialEq` is structural over the prefix bytes. Use [`Self::equal`] to compare under a
/// collation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RangeTombstone {
    pub start: ClusteringKeyPrefix,
    pub start_kind: BoundKind,
    pub end: ClusteringKeyPrefix,
    pub end_kind: BoundKind,
    pub tomb: Tombstone,
}

impl RangeTombstone {
    pub fn new(
        start: ClusteringKeyPrefix,
        start_kind: BoundKind,
        end: ClusteringKeyPrefix,
        end_kind: BoundKind,
        tomb: Tombstone,
    ) -> Self {
        Self {
            start,
            start_kind,
            end,
            end_kind,
            tomb,
        }
    }

    pub fn from_bounds(start: BoundView<'_>, end: BoundView<'_>, tomb: Tombstone) -> Self {
        Self::new(start.prefix.clone(), start.kind, end.prefix.clone(), end.kind, tomb)
    }

    /// Delete `[start, end]`, both ends inclusive.
    pub fn inclusive(start: ClusteringKeyPrefix, end: ClusteringKeyPrefix, tomb: Tombstone) -> Self {
        Self::new(start, BoundKind::InclStart, end, BoundKind::InclEnd, tomb)
    }

    pub fn start_bound(&self) -> BoundView<'_> {
        BoundView::new(&self.start, self.start_kind)
    }

    pub fn end_bound(&self) -> BoundView<'_> {
        BoundView::new(&self.end, self.end_kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tomb.is_empty()
    }

    pub fn equal<C: Collation>(&self, collation: &C, other: &Self) -> bool {
        self.tomb == other.tomb
            && self.start_bound().equal(collation, other.start_bound())
            && self.end_bound().equal(collation, other.end_bound())
    }

    /// Check that the start bound does not sort after the end bound.
    pub fn validate<C: Collation>(&self, cmp: &BoundComparator<C>) -> Result<(), RangeTombstoneError> {
        if cmp.compare(self.start_bound(), self.end_bound()).is_gt() {
            return Err(RangeTombstoneError::Inverted {
                start: self.start_bound().to_string(),
                end: self.end_bound().to_string(),
            });
        }
        Ok(())
    }

    /// Return true if the range deletes exactly one clustering row.
    pub fn is_single_clustering_row_tombstone<C: Collation>(
        collation: &C,
        start: &ClusteringKeyPrefix,
        start_kind: BoundKind,
        end: &ClusteringKeyPrefix,
        end_kind: BoundKind,
    ) -> bool {
        start.is_full(collation)
            && start_kind == BoundKind::InclStart
            && end_kind == BoundKind::InclEnd
            && start.equal(collation, end)
    }

    /// Swap the start and the end so that the range can be used in a reversed stream.
    pub fn flip(&mut self) {
        mem::swap(&mut self.start, &mut self.end);
        mem::swap(&mut self.start_kind, &mut self.end_kind);
        self.start_kind = flip_bound_kind(self.start_kind);
        self.end_kind = flip_bound_kind(self.end_kind);
    }

    /// Merge `src` into `self`. Both must start at the same bound.
    ///
    /// - If `src.tomb` is not stronger than `self.tomb`, `src` is discarded.
    /// - If it is stronger and reaches at least as far as `self`, `self` becomes `src`.
    /// - Otherwise `src` deletes `[start, src.end]` with the stronger marker: `self` is cut to
    ///   start right after `src.end` and `src` is returned as the remainder, which never
    ///   overlaps the updated `self`.
    ///
    /// To merge without losing any deletion, call it on the range with the later end.
    pub fn apply<C: Collation>(
        &mut self,
        cmp: &BoundComparator<C>,
        src: RangeTombstone,
    ) -> Option<RangeTombstone> {
        debug_assert!(
            cmp.compare(self.start_bound(), src.start_bound()).is_eq(),
            "apply: start bounds differ: {} vs {}",
            self.start_bound(),
            src.start_bound()
        );

        if src.tomb <= self.tomb {
            return None;
        }

        if cmp.compare(src.end_bound(), self.end_bound()).is_ge() {
            *self = src;
            return None;
        }

        self.start = src.end.clone();
        self.start_kind = invert_kind(src.end_kind);
        Some(src)
    }

    /// Feed the hash of this range tombstone to `h`.
    ///
    /// A single-row range in the canonical inclusive form only feeds its start and its marker,
    /// which is how a row deletion was hashed before ranges carried bound kinds.
    pub fn feed_hash<H: Hasher, C: Collation>(&self, h: &mut H, collation: &C) {
        self.start.feed_hash(h, collation);
        if !self.start.equal(collation, &self.end)
            || self.start_kind != BoundKind::InclStart
            || self.end_kind != BoundKind::InclEnd
        {
            self.start_kind.hash(h);
            self.end.feed_hash(h, collation);
            self.end_kind.hash(h);
        }
        self.tomb.hash(h);
    }

    /// Heap bytes owned by the two bounds.
    pub fn memory_usage(&self) -> usize {
        self.start.memory_usage() + self.end.memory_usage()
    }
}

impl fmt::Display for RangeTombstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{range_tombstone: start={}, kind={}, end={}, kind={}, tombstone={}}}",
            self.start, self.start_kind, self.end, self.end_kind, self.tomb
        )
    }
}
