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

//! Errors for data received from outside the crate.
//!
//! Misuse of the API, such as feeding the accumulator out of order, is a programming error
//! and panics instead.

/// A byte that does not name an active [`BoundKind`](crate::BoundKind).
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum InvalidBoundKind {
    /// Values 2 to 5 are kept free for a richer bound vocabulary.
    #[error("bound kind {0} is reserved")]
    Reserved(u8),

    #[error("unknown bound kind {0}")]
    Unknown(u8),
}

/// A clustering key prefix that does not fit a [`ClusteringSchema`](crate::ClusteringSchema).
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum PrefixError {
    #[error("prefix has {len} components but the schema has only {max} clustering columns")]
    TooManyComponents { len: usize, max: usize },

    #[error("component {column} must be {expected} bytes, got {got}")]
    InvalidLength {
        column: usize,
        expected: usize,
        got: usize,
    },
}

#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum RangeTombstoneError {
    /// The start bound sorts after the end bound, the range is empty.
    #[error("range tombstone start {start} is after its end {end}")]
    Inverted { start: String, end: String },
}
