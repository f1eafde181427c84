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

//! Drive a [`RangeTombstoneAccumulator`] over a stream of mutation fragments.

use std::io;

use futures::Stream;
use futures_util::future;
use futures_util::StreamExt;
use log::debug;

use crate::accumulator::RangeTombstoneAccumulator;
use crate::bound::BoundComparator;
use crate::clustering::ClusteringKeyPrefix;
use crate::clustering::Collation;
use crate::range_tombstone::RangeTombstone;
use crate::tombstone::Tombstone;
use crate::IOResultStream;

/// A piece of a streamed partition, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Begins a new partition with its partition tombstone.
    PartitionStart(Tombstone),

    /// A range tombstone, in clustering order even for a reversed stream.
    RangeTombstone(RangeTombstone),

    /// A clustering row.
    Row(ClusteringKeyPrefix),
}

/// A row key and the tombstone that applies to it.
pub type RowTombstone = (ClusteringKeyPrefix, Tombstone);

/// A stream of rows with their effective tombstone.
pub type RowTombstoneStream = IOResultStream<RowTombstone>;

/// Resolve the tombstone of every row in a single ordered stream of fragments.
///
/// Range tombstones whose start is after their end are reported as
/// [`io::ErrorKind::InvalidData`]; the stream continues after an error.
pub fn rows_with_tombstones<C, S>(collation: C, reversed: bool, fragments: S) -> RowTombstoneStream
where
    C: Collation + Clone + Send + 'static,
    S: Stream<Item = Result<Fragment, io::Error>> + Send + 'static,
{
    let validator = BoundComparator::new(collation.clone());
    let mut acc = RangeTombstoneAccumulator::new(collation, reversed);

    let strm = fragments.filter_map(move |res| {
        let out = match res {
            Err(e) => Some(Err(e)),
            Ok(Fragment::PartitionStart(t)) => {
                debug!("rows_with_tombstones: new partition with {}", t);
                acc.clear();
                acc.set_partition_tombstone(t);
                None
            }
            Ok(Fragment::RangeTombstone(rt)) => match rt.validate(&validator) {
                Ok(()) => {
                    acc.apply(rt);
                    None
                }
                Err(e) => Some(Err(io::Error::new(io::ErrorKind::InvalidData, e))),
            },
            Ok(Fragment::Row(ck)) => {
                let t = acc.tombstone_for_row(&ck);
                Some(Ok((ck, t)))
            }
        };
        future::ready(out)
    });

    strm.boxed()
}
