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

//! # Range Tombstone
//!
//! Range deletions over an ordered, clustered key space, as used inside a row-oriented storage
//! engine.
//!
//! ## Core Components
//!
//! - [`BoundKind`], [`BoundView`]: one edge of a range, a key prefix with start/end and
//!   inclusive/exclusive semantics.
//! - [`BoundComparator`]: the total order of bounds and keys of different prefix lengths, on top
//!   of a [`Collation`] such as [`ClusteringSchema`].
//! - [`RangeTombstone`]: a deleted range, and the pairwise merge of two ranges starting at the
//!   same bound.
//! - [`RangeTombstoneSet`]: range tombstones ordered by start bound, with stable handles.
//! - [`RangeTombstoneAccumulator`]: a single pass over range tombstones and rows in key order,
//!   answering which tombstone deletes each row.
//!
//! ## Usage Example
//!
//! ```rust
//! use range_tombstone::schema::encode_int;
//! use range_tombstone::schema::ColumnType;
//! use range_tombstone::ClusteringKeyPrefix;
//! use range_tombstone::ClusteringSchema;
//! use range_tombstone::RangeTombstone;
//! use range_tombstone::RangeTombstoneAccumulator;
//! use range_tombstone::Tombstone;
//!
//! let schema = ClusteringSchema::new([("day", ColumnType::Int), ("hour", ColumnType::Int)]);
//! let ck = |v: &[i32]| ClusteringKeyPrefix::new(v.iter().map(|x| encode_int(*x)).collect());
//!
//! let mut acc = RangeTombstoneAccumulator::new(&schema, false);
//!
//! // Delete every hour of day 2.
//! acc.apply(RangeTombstone::inclusive(ck(&[2]), ck(&[2]), Tombstone::new(10, 0)));
//!
//! assert_eq!(acc.tombstone_for_row(&ck(&[2, 23])), Tombstone::new(10, 0));
//! assert!(acc.tombstone_for_row(&ck(&[3, 0])).is_empty());
//! ```

use std::io;

use futures_util::stream::BoxStream;

pub mod accumulator;
pub mod bound;
pub mod clustering;
pub mod container;
pub mod errors;
pub mod range_tombstone;
pub mod stream;
pub mod tombstone;

pub use crate::accumulator::RangeTombstoneAccumulator;
pub use crate::bound::flip_bound_kind;
pub use crate::bound::invert_kind;
pub use crate::bound::BoundComparator;
pub use crate::bound::BoundKind;
pub use crate::bound::BoundView;
pub use crate::clustering::schema;
pub use crate::clustering::schema::ClusteringSchema;
pub use crate::clustering::ClusteringKeyPrefix;
pub use crate::clustering::Collation;
pub use crate::container::RangeTombstoneSet;
pub use crate::container::SlotId;
pub use crate::range_tombstone::RangeTombstone;
pub use crate::stream::rows_with_tombstones;
pub use crate::stream::Fragment;
pub use crate::tombstone::Tombstone;

/// A boxed stream that yields `Result` of items or an `io::Error`.
pub type IOResultStream<T> = BoxStream<'static, Result<T, io::Error>>;
