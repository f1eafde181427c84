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

use std::cmp::Ordering;

use crate::bound::BoundView;
use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::range_tombstone::RangeTombstone;

/// Orders bounds and keys of possibly different prefix lengths.
///
/// A position is a `(prefix, weight)` pair; a bare key is the position `(key, 0)`.
/// Prefixes are compared component by component. When one prefix is a prefix of the other:
///
/// - with equal lengths, the smaller weight sorts first;
/// - otherwise the shorter prefix covers every key extending it, so its bound sorts before
///   all of them if its weight is `<= 0` (a start, or an exclusive end) and after all of them
///   otherwise.
///
/// This lets a bound on `(a, b)` be ordered against a bound on `(a, b, c, d)`.
#[derive(Debug, Clone)]
pub struct BoundComparator<C> {
    collation: C,
    reversed: bool,
}

impl<C> BoundComparator<C>
where C: Collation
{
    pub fn new(collation: C) -> Self {
        Self {
            collation,
            reversed: false,
        }
    }

    /// Return a comparator for a stream read in reversed clustering order.
    ///
    /// Only the per-column order is reversed; the weight rule is kept so that a range
    /// tombstone that has been [flipped](RangeTombstone::flip) still starts before the rows
    /// it covers.
    pub fn reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn collation(&self) -> &C {
        &self.collation
    }

    /// Compare two `(prefix, weight)` positions.
    pub fn compare_prefix_weight(
        &self,
        p1: &ClusteringKeyPrefix,
        w1: i32,
        p2: &ClusteringKeyPrefix,
        w2: i32,
    ) -> Ordering {
        let res = p1.prefix_compare(&self.collation, p2);
        if res.is_ne() {
            return if self.reversed { res.reverse() } else { res };
        }

        let d1 = p1.len();
        let d2 = p2.len();

        match d1.cmp(&d2) {
            Ordering::Equal => w1.cmp(&w2),
            Ordering::Less => {
                if w1 <= 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            Ordering::Greater => {
                if w2 > 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        }
    }

    pub fn less(&self, p1: &ClusteringKeyPrefix, w1: i32, p2: &ClusteringKeyPrefix, w2: i32) -> bool {
        self.compare_prefix_weight(p1, w1, p2, w2).is_lt()
    }

    pub fn compare(&self, b1: BoundView<'_>, b2: BoundView<'_>) -> Ordering {
        self.compare_prefix_weight(b1.prefix, b1.weight(), b2.prefix, b2.weight())
    }

    /// Compare a bound with the position of a key.
    pub fn compare_bound_prefix(&self, b: BoundView<'_>, p: &ClusteringKeyPrefix) -> Ordering {
        self.compare_prefix_weight(b.prefix, b.weight(), p, 0)
    }

    /// Compare the position of a key with a bound.
    pub fn compare_prefix_bound(&self, p: &ClusteringKeyPrefix, b: BoundView<'_>) -> Ordering {
        self.compare_prefix_weight(p, 0, b.prefix, b.weight())
    }

    /// Order range tombstones by their start bound only.
    pub fn compare_starts(&self, rt1: &RangeTombstone, rt2: &RangeTombstone) -> Ordering {
        self.compare(rt1.start_bound(), rt2.start_bound())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bound::BoundKind;
    use crate::clustering::schema::encode_bigint;
    use crate::clustering::schema::ClusteringSchema;
    use crate::clustering::schema::ColumnType;

    fn ck(values: &[i64]) -> ClusteringKeyPrefix {
        ClusteringKeyPrefix::new(values.iter().map(|v| encode_bigint(*v)).collect())
    }

    fn schema() -> ClusteringSchema {
        ClusteringSchema::new([
            ("a", ColumnType::BigInt),
            ("b", ColumnType::BigInt),
            ("c", ColumnType::BigInt),
            ("d", ColumnType::BigInt),
        ])
    }

    const WEIGHTS: [i32; 5] = [-2, -1, 0, 1, 2];

    #[test]
    fn test_compare_different_components() {
        let cmp = BoundComparator::new(schema());

        for w1 in WEIGHTS {
            for w2 in WEIGHTS {
                assert_eq!(
                    cmp.compare_prefix_weight(&ck(&[1, 9]), w1, &ck(&[2]), w2),
                    Ordering::Less
                );
            }
        }
    }

    #[test]
    fn test_compare_same_length_by_weight() {
        let cmp = BoundComparator::new(schema());
        let p = ck(&[1, 2]);

        for w1 in WEIGHTS {
            for w2 in WEIGHTS {
                assert_eq!(cmp.compare_prefix_weight(&p, w1, &p, w2), w1.cmp(&w2));
            }
        }
    }

    #[test]
    fn test_compare_shorter_prefix() {
        let cmp = BoundComparator::new(schema());
        let short = ck(&[1, 2]);
        let long = ck(&[1, 2, 3, 4]);

        for w_long in WEIGHTS {
            // A start or exclusive end on the shorter prefix precedes every extension of it.
            for w_short in [-2, -1, 0] {
                assert!(cmp.less(&short, w_short, &long, w_long));
                assert!(!cmp.less(&long, w_long, &short, w_short));
            }
            // An inclusive end or exclusive start on it follows every extension.
            for w_short in [1, 2] {
                assert!(cmp.less(&long, w_long, &short, w_short));
                assert!(!cmp.less(&short, w_short, &long, w_long));
            }
        }
    }

    #[test]
    fn test_compare_is_consistent() {
        let cmp = BoundComparator::new(schema());
        let prefixes = [ck(&[]), ck(&[1]), ck(&[1, 2]), ck(&[1, 3]), ck(&[2])];

        let mut positions = vec![];
        for p in &prefixes {
            for w in WEIGHTS {
                positions.push((p, w));
            }
        }

        for (p1, w1) in &positions {
            assert_eq!(cmp.compare_prefix_weight(p1, *w1, p1, *w1), Ordering::Equal);

            for (p2, w2) in &positions {
                let a = cmp.compare_prefix_weight(p1, *w1, p2, *w2);
                let b = cmp.compare_prefix_weight(p2, *w2, p1, *w1);
                assert_eq!(a, b.reverse(), "{} {} vs {} {}", p1, w1, p2, w2);

                // Transitivity of the strict part.
                for (p3, w3) in &positions {
                    if a.is_lt() && cmp.less(p2, *w2, p3, *w3) {
                        assert!(cmp.less(p1, *w1, p3, *w3));
                    }
                }
            }
        }
    }

    #[test]
    fn test_compare_bounds_and_keys() {
        let cmp = BoundComparator::new(schema());
        let p = ck(&[5]);
        let row = ck(&[5, 1, 1, 1]);

        let incl_start = BoundView::new(&p, BoundKind::InclStart);
        let excl_start = BoundView::new(&p, BoundKind::ExclStart);
        let incl_end = BoundView::new(&p, BoundKind::InclEnd);
        let excl_end = BoundView::new(&p, BoundKind::ExclEnd);

        assert_eq!(cmp.compare_bound_prefix(incl_start, &row), Ordering::Less);
        assert_eq!(cmp.compare_bound_prefix(incl_end, &row), Ordering::Greater);
        assert_eq!(cmp.compare_prefix_bound(&row, excl_start), Ordering::Less);
        assert_eq!(cmp.compare_prefix_bound(&row, excl_end), Ordering::Greater);

        // On the exact key.
        assert_eq!(cmp.compare_bound_prefix(incl_start, &p), Ordering::Less);
        assert_eq!(cmp.compare_bound_prefix(excl_start, &p), Ordering::Greater);
        assert_eq!(cmp.compare(excl_end, incl_start), Ordering::Less);
        assert_eq!(cmp.compare(incl_end, excl_start), Ordering::Less);

        assert_eq!(cmp.compare(BoundView::bottom(), incl_start), Ordering::Less);
        assert_eq!(cmp.compare(BoundView::top(), incl_end), Ordering::Greater);
    }

    #[test]
    fn test_reversed() {
        let cmp = BoundComparator::new(schema()).reversed();
        assert!(cmp.is_reversed());

        assert_eq!(
            cmp.compare_prefix_weight(&ck(&[1]), 0, &ck(&[2]), 0),
            Ordering::Greater
        );

        // The weight rule is not reversed.
        let p = ck(&[1]);
        assert_eq!(cmp.compare_prefix_weight(&p, -1, &p, 0), Ordering::Less);
        assert!(cmp.less(&p, -1, &ck(&[1, 7]), 0));
        assert!(cmp.less(&ck(&[1, 7]), 0, &p, 1));

        assert!(!cmp.clone().reversed().is_reversed());
    }
}
