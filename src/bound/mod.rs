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

//! Range boundaries: [`BoundKind`], [`BoundView`] and the [`BoundComparator`].

mod compare;

use std::fmt;

pub use compare::BoundComparator;
use serde::Deserialize;
use serde::Serialize;

use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::errors::InvalidBoundKind;

/// Backs [`BoundView::bottom`] and [`BoundView::top`].
static EMPTY_PREFIX: ClusteringKeyPrefix = ClusteringKeyPrefix::empty();

/// The kind of a range boundary: start or end, inclusive or exclusive.
///
/// The discriminants are the serialized values. Values 2 to 5 are reserved.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BoundKind {
    ExclEnd = 0,
    InclStart = 1,
    InclEnd = 6,
    ExclStart = 7,
}

impl BoundKind {
    /// The tie-breaking weight of this kind against a key with the same prefix.
    ///
    /// Start bounds sort before the rows they include and end bounds after them; a bare key
    /// has weight 0.
    pub fn weight(self) -> i32 {
        match self {
            BoundKind::ExclEnd => -2,
            BoundKind::InclStart => -1,
            BoundKind::InclEnd => 1,
            BoundKind::ExclStart => 2,
        }
    }

    pub fn is_start(self) -> bool {
        matches!(self, BoundKind::InclStart | BoundKind::ExclStart)
    }

    pub fn is_end(self) -> bool {
        !self.is_start()
    }

    pub fn is_inclusive(self) -> bool {
        matches!(self, BoundKind::InclStart | BoundKind::InclEnd)
    }
}

/// Return the kind of the bound on the other side of the same point.
///
/// The end bound right before a start bound, or the start bound right after an end bound:
/// `excl_end <-> incl_start`, `incl_end <-> excl_start`.
pub fn invert_kind(k: BoundKind) -> BoundKind {
    match k {
        BoundKind::ExclEnd => BoundKind::InclStart,
        BoundKind::InclStart => BoundKind::ExclEnd,
        BoundKind::InclEnd => BoundKind::ExclStart,
        BoundKind::ExclStart => BoundKind::InclEnd,
    }
}

/// Swap start and end of a kind, for ranges read in reversed order.
pub fn flip_bound_kind(k: BoundKind) -> BoundKind {
    match k {
        BoundKind::ExclEnd => BoundKind::ExclStart,
        BoundKind::InclEnd => BoundKind::InclStart,
        BoundKind::ExclStart => BoundKind::ExclEnd,
        BoundKind::InclStart => BoundKind::InclEnd,
    }
}

impl TryFrom<u8> for BoundKind {
    type Error = InvalidBoundKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BoundKind::ExclEnd),
            1 => Ok(BoundKind::InclStart),
            2..=5 => Err(InvalidBoundKind::Reserved(value)),
            6 => Ok(BoundKind::InclEnd),
            7 => Ok(BoundKind::ExclStart),
            _ => Err(InvalidBoundKind::Unknown(value)),
        }
    }
}

impl From<BoundKind> for u8 {
    fn from(k: BoundKind) -> Self {
        k as u8
    }
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoundKind::ExclEnd => "excl_end",
            BoundKind::InclStart => "incl_start",
            BoundKind::InclEnd => "incl_end",
            BoundKind::ExclStart => "excl_start",
        };
        write!(f, "{}", s)
    }
}

/// A boundary borrowing its prefix from the range tombstone (or key) that owns it.
#[derive(Debug, Clone, Copy)]
pub struct BoundView<'a> {
    pub prefix: &'a ClusteringKeyPrefix,
    pub kind: BoundKind,
}

impl<'a> BoundView<'a> {
    pub fn new(prefix: &'a ClusteringKeyPrefix, kind: BoundKind) -> Self {
        Self { prefix, kind }
    }

    /// The start of the whole key space.
    pub fn bottom() -> BoundView<'static> {
        BoundView::new(&EMPTY_PREFIX, BoundKind::InclStart)
    }

    /// The end of the whole key space.
    pub fn top() -> BoundView<'static> {
        BoundView::new(&EMPTY_PREFIX, BoundKind::InclEnd)
    }

    pub fn weight(&self) -> i32 {
        self.kind.weight()
    }

    pub fn equal<C: Collation>(&self, collation: &C, other: BoundView<'_>) -> bool {
        self.kind == other.kind && self.prefix.equal(collation, other.prefix)
    }

    /// Return true if `other` is the bound on the other side of the same point, e.g. the
    /// `excl_end` right before this `incl_start`. Two such ranges touch without overlapping.
    pub fn adjacent<C: Collation>(&self, collation: &C, other: BoundView<'_>) -> bool {
        invert_kind(other.kind) == self.kind && self.prefix.equal(collation, other.prefix)
    }
}

impl fmt::Display for BoundView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{bound: prefix={}, kind={}}}", self.prefix, self.kind)
    }
}
