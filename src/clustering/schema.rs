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

//! A concrete [`Collation`] built from a list of typed clustering columns.
//!
//! The schema is plain serde data, so it is usually configured as JSON:
//!
//! ```
//! use range_tombstone::ClusteringSchema;
//!
//! let schema: ClusteringSchema = serde_json::from_str(
//!     r#"{"columns": [
//!         {"name": "day", "column_type": "int"},
//!         {"name": "ts", "column_type": "bigint", "order": "desc"}
//!     ]}"#,
//! )
//! .unwrap();
//! assert_eq!(schema.columns().len(), 2);
//! ```

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::errors::PrefixError;

/// Type of the serialized value of a clustering column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Arbitrary bytes, ordered lexicographically.
    Blob,
    /// UTF-8 text, ordered by code point (which is byte order for UTF-8).
    Utf8,
    /// 4-byte big-endian signed integer.
    Int,
    /// 8-byte big-endian signed integer.
    BigInt,
}

impl ColumnType {
    /// The serialized width of fixed-width types.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            ColumnType::Blob | ColumnType::Utf8 => None,
            ColumnType::Int => Some(4),
            ColumnType::BigInt => Some(8),
        }
    }

    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            ColumnType::Blob | ColumnType::Utf8 => a.cmp(b),
            ColumnType::Int => match (<[u8; 4]>::try_from(a), <[u8; 4]>::try_from(b)) {
                (Ok(a), Ok(b)) => i32::from_be_bytes(a).cmp(&i32::from_be_bytes(b)),
                _ => a.cmp(b),
            },
            ColumnType::BigInt => match (<[u8; 8]>::try_from(a), <[u8; 8]>::try_from(b)) {
                (Ok(a), Ok(b)) => i64::from_be_bytes(a).cmp(&i64::from_be_bytes(b)),
                _ => a.cmp(b),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusteringColumn {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub order: ClusteringOrder,
}

/// The clustering columns of a table, in key order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusteringSchema {
    columns: Vec<ClusteringColumn>,
}

impl ClusteringSchema {
    /// Build a schema of ascending columns.
    pub fn new<N>(columns: impl IntoIterator<Item = (N, ColumnType)>) -> Self
    where N: Into<String> {
        let columns = columns
            .into_iter()
            .map(|(name, column_type)| ClusteringColumn {
                name: name.into(),
                column_type,
                order: ClusteringOrder::Asc,
            })
            .collect();
        Self { columns }
    }

    pub fn from_columns(columns: Vec<ClusteringColumn>) -> Self {
        Self { columns }
    }

    /// Set the clustering order of the column at `index`.
    ///
    /// An `index` past the last column leaves the schema unchanged.
    pub fn with_order(mut self, index: usize, order: ClusteringOrder) -> Self {
        if let Some(column) = self.columns.get_mut(index) {
            column.order = order;
        }
        self
    }

    pub fn columns(&self) -> &[ClusteringColumn] {
        &self.columns
    }

    /// Check that every component of `prefix` is a valid value of its column.
    pub fn validate_prefix(&self, prefix: &ClusteringKeyPrefix) -> Result<(), PrefixError> {
        if prefix.len() > self.columns.len() {
            return Err(PrefixError::TooManyComponents {
                len: prefix.len(),
                max: self.columns.len(),
            });
        }

        for (column, (def, value)) in self.columns.iter().zip(prefix.components()).enumerate() {
            if let Some(expected) = def.column_type.fixed_len() {
                if value.len() != expected {
                    return Err(PrefixError::InvalidLength {
                        column,
                        expected,
                        got: value.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Collation for ClusteringSchema {
    fn clustering_columns(&self) -> usize {
        self.columns.len()
    }

    fn compare_component(&self, column: usize, a: &[u8], b: &[u8]) -> Ordering {
        // Components past the declared columns are compared as raw bytes.
        let Some(def) = self.columns.get(column) else {
            return a.cmp(b);
        };

        let ord = def.column_type.compare(a, b);
        match def.order {
            ClusteringOrder::Asc => ord,
            ClusteringOrder::Desc => ord.reverse(),
        }
    }
}

pub fn encode_int(v: i32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub fn encode_bigint(v: i64) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_column_type_compare() {
        assert_eq!(
            ColumnType::BigInt.compare(&encode_bigint(-1), &encode_bigint(1)),
            Ordering::Less
        );
        assert_eq!(
            ColumnType::Int.compare(&encode_int(300), &encode_int(2)),
            Ordering::Greater
        );
        assert_eq!(ColumnType::Utf8.compare(b"ab", b"b"), Ordering::Less);
        assert_eq!(ColumnType::Blob.compare(b"ab", b"a"), Ordering::Greater);

        // Raw bytes of a negative number sort after a positive one.
        assert_eq!(
            ColumnType::Blob.compare(&encode_bigint(-1), &encode_bigint(1)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_schema_descending_column() {
        let s = ClusteringSchema::new([("a", ColumnType::Int), ("b", ColumnType::Int)])
            .with_order(1, ClusteringOrder::Desc);

        assert_eq!(
            s.compare_component(0, &encode_int(1), &encode_int(2)),
            Ordering::Less
        );
        assert_eq!(
            s.compare_component(1, &encode_int(1), &encode_int(2)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_with_order_out_of_range() {
        let s = ClusteringSchema::new([("a", ColumnType::Int)]);
        let got = s.clone().with_order(1, ClusteringOrder::Desc);

        assert_eq!(got.columns(), s.columns());
        assert_eq!(
            got.compare_component(0, &encode_int(1), &encode_int(2)),
            Ordering::Less
        );
    }

    #[test]
    fn test_validate_prefix() {
        let s = ClusteringSchema::new([("a", ColumnType::Int), ("b", ColumnType::Utf8)]);

        let ok = ClusteringKeyPrefix::new(vec![encode_int(1), b"x".to_vec()]);
        assert_eq!(s.validate_prefix(&ok), Ok(()));
        assert_eq!(s.validate_prefix(&ClusteringKeyPrefix::empty()), Ok(()));

        let too_long = ClusteringKeyPrefix::new(vec![encode_int(1), b"x".to_vec(), vec![]]);
        assert_eq!(
            s.validate_prefix(&too_long),
            Err(PrefixError::TooManyComponents { len: 3, max: 2 })
        );

        let bad_int = ClusteringKeyPrefix::new(vec![encode_bigint(1)]);
        assert_eq!(
            s.validate_prefix(&bad_int),
            Err(PrefixError::InvalidLength {
                column: 0,
                expected: 4,
                got: 8
            })
        );
    }

    #[test]
    fn test_schema_serde() -> anyhow::Result<()> {
        let s: ClusteringSchema = serde_json::from_str(
            r#"{"columns": [
                {"name": "a", "column_type": "int"},
                {"name": "b", "column_type": "utf8", "order": "desc"}
            ]}"#,
        )?;

        let want = ClusteringSchema::new([("a", ColumnType::Int), ("b", ColumnType::Utf8)])
            .with_order(1, ClusteringOrder::Desc);
        assert_eq!(want, s);

        let back: ClusteringSchema = serde_json::from_str(&serde_json::to_string(&s)?)?;
        assert_eq!(s, back);
        Ok(())
    }
}
