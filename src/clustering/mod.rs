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

//! Clustering key prefixes and the collation that orders them.
//!
//! A [`ClusteringKeyPrefix`] is an opaque tuple of serialized column values. This crate never
//! interprets the bytes itself: every comparison goes through a [`Collation`].

pub mod schema;

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::mem;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

/// Defines the per-column ordering of clustering key components.
pub trait Collation {
    /// Number of clustering columns of a full key.
    fn clustering_columns(&self) -> usize;

    /// Compare the serialized values of the `column`-th clustering column.
    fn compare_component(&self, column: usize, a: &[u8], b: &[u8]) -> Ordering;

    /// Feed the serialized value of the `column`-th clustering column into `h`.
    ///
    /// Values that [`Self::compare_component`] finds equal must feed the same data. The default
    /// feeds the raw bytes, which is correct for collations that compare equal only on equal
    /// bytes.
    fn hash_component<H: Hasher>(&self, _column: usize, value: &[u8], h: &mut H) {
        value.hash(h);
    }
}

impl<C> Collation for &C
where C: Collation + ?Sized
{
    fn clustering_columns(&self) -> usize {
        (**self).clustering_columns()
    }

    fn compare_component(&self, column: usize, a: &[u8], b: &[u8]) -> Ordering {
        (**self).compare_component(column, a, b)
    }

    fn hash_component<H: Hasher>(&self, column: usize, value: &[u8], h: &mut H) {
        (**self).hash_component(column, value, h)
    }
}

impl<C> Collation for Arc<C>
where C: Collation + ?Sized
{
    fn clustering_columns(&self) -> usize {
        (**self).clustering_columns()
    }

    fn compare_component(&self, column: usize, a: &[u8], b: &[u8]) -> Ordering {
        (**self).compare_component(column, a, b)
    }

    fn hash_component<H: Hasher>(&self, column: usize, value: &[u8], h: &mut H) {
        (**self).hash_component(column, value, h)
    }
}

/// An ordered, possibly partial, tuple of clustering column values.
///
/// `Hash` and `PartialEq` are structural over the component bytes. Use [`Self::equal`] for
/// equality under a collation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClusteringKeyPrefix {
    components: Vec<Vec<u8>>,
}

impl ClusteringKeyPrefix {
    pub fn new(components: Vec<Vec<u8>>) -> Self {
        Self { components }
    }

    pub const fn empty() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Vec<u8>] {
        &self.components
    }

    /// Return true if this prefix names a single row, i.e. it has a value for every clustering
    /// column.
    pub fn is_full<C: Collation>(&self, collation: &C) -> bool {
        self.len() == collation.clustering_columns()
    }

    /// Compare the shared leading components of two prefixes, stopping at the first difference
    /// or at the end of the shorter one.
    pub fn prefix_compare<C: Collation>(&self, collation: &C, other: &Self) -> Ordering {
        for (column, (a, b)) in self.components.iter().zip(other.components.iter()).enumerate() {
            let ord = collation.compare_component(column, a, b);
            if ord.is_ne() {
                return ord;
            }
        }
        Ordering::Equal
    }

    pub fn equal<C: Collation>(&self, collation: &C, other: &Self) -> bool {
        self.len() == other.len() && self.prefix_compare(collation, other).is_eq()
    }

    /// Feed this prefix into `h` so that prefixes [`Self::equal`] under `collation` hash alike.
    pub fn feed_hash<H: Hasher, C: Collation>(&self, h: &mut H, collation: &C) {
        self.len().hash(h);
        for (column, c) in self.components.iter().enumerate() {
            collation.hash_component(column, c, h);
        }
    }

    /// Heap bytes owned by this prefix.
    pub fn memory_usage(&self) -> usize {
        self.components.capacity() * mem::size_of::<Vec<u8>>()
            + self.components.iter().map(|c| c.capacity()).sum::<usize>()
    }
}

impl From<Vec<Vec<u8>>> for ClusteringKeyPrefix {
    fn from(components: Vec<Vec<u8>>) -> Self {
        Self::new(components)
    }
}

impl fmt::Display for ClusteringKeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            for byte in c {
                write!(f, "{:02x}", byte)?;
            }
        }
        write!(f, "]")
    }
}
