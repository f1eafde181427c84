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

//! Defines the [`Tombstone`] deletion marker.

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Timestamp of a marker that deletes nothing.
pub const MISSING_TIMESTAMP: i64 = i64::MIN;

/// A deletion event: a write timestamp and the wall-clock time the deletion happened.
///
/// Markers are totally ordered: a later `timestamp` wins, and on equal timestamps the later
/// `deletion_time` wins. The default marker is a no-op that loses against every live marker.
///
/// # Examples
///
/// ```
/// use range_tombstone::Tombstone;
///
/// let mut t = Tombstone::none();
/// assert!(t.is_empty());
///
/// t.apply(Tombstone::new(5, 100));
/// t.apply(Tombstone::new(3, 200));
/// assert_eq!(t, Tombstone::new(5, 100));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tombstone {
    pub timestamp: i64,
    pub deletion_time: i64,
}

impl Default for Tombstone {
    fn default() -> Self {
        Self::none()
    }
}

impl Tombstone {
    pub const fn new(timestamp: i64, deletion_time: i64) -> Self {
        Self {
            timestamp,
            deletion_time,
        }
    }

    /// The marker that deletes nothing.
    pub const fn none() -> Self {
        Self {
            timestamp: MISSING_TIMESTAMP,
            deletion_time: i64::MIN,
        }
    }

    /// Return true if this marker deletes something.
    pub fn is_live(&self) -> bool {
        self.timestamp != MISSING_TIMESTAMP
    }

    pub fn is_empty(&self) -> bool {
        !self.is_live()
    }

    /// Keep the stronger one of `self` and `other`.
    pub fn apply(&mut self, other: Tombstone) {
        if *self < other {
            *self = other;
        }
    }
}

impl PartialOrd for Tombstone {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tombstone {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.deletion_time).cmp(&(other.timestamp, other.deletion_time))
    }
}

impl fmt::Display for Tombstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_live() {
            write!(
                f,
                "{{tombstone: timestamp={}, deletion_time={}}}",
                self.timestamp, self.deletion_time
            )
        } else {
            write!(f, "{{tombstone: none}}")
        }
    }
}
