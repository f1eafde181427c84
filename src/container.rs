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

//! An ordered set of range tombstones with stable handles.
//!
//! Elements live in an arena of slots and never move unless asked to. The order is kept in a
//! separate sorted index of links, and each link names the slot its element currently occupies.
//! Moving an element to another slot only rewrites its link: the index and every other element
//! stay untouched.

use std::collections::VecDeque;
use std::fmt;

use log::trace;

use crate::bound::BoundComparator;
use crate::clustering::Collation;
use crate::range_tombstone::RangeTombstone;

/// Handle of an element in a [`RangeTombstoneSet`]: the arena slot it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Index entry of an element. Unlike its slot, it does not change when the element moves.
type Link = usize;

#[derive(Debug, Clone)]
struct Node {
    link: Link,
    rt: RangeTombstone,
}

/// Range tombstones ordered by start bound.
///
/// Elements with equal start bounds are kept in insertion order. Taking the first element and
/// inserting at the front are `O(1)` besides the `O(log n)` search.
#[derive(Debug, Clone)]
pub struct RangeTombstoneSet<C> {
    cmp: BoundComparator<C>,
    slots: Vec<Option<Node>>,

    /// Vacant slots. May also hold slots that `relocate` has since filled, these are skipped.
    free: Vec<usize>,

    /// Slot of every link.
    links: Vec<usize>,
    free_links: Vec<Link>,

    /// Links sorted by the start bound of their element.
    order: VecDeque<Link>,
}

impl<C> RangeTombstoneSet<C>
where C: Collation
{
    pub fn new(cmp: BoundComparator<C>) -> Self {
        Self {
            cmp,
            slots: Vec::new(),
            free: Vec::new(),
            links: Vec::new(),
            free_links: Vec::new(),
            order: VecDeque::new(),
        }
    }

    pub fn comparator(&self) -> &BoundComparator<C> {
        &self.cmp
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn insert(&mut self, rt: RangeTombstone) -> SlotId {
        let pos = self.order.partition_point(|link| {
            self.cmp.compare_starts(self.linked(*link), &rt).is_le()
        });

        let link = match self.free_links.pop() {
            Some(link) => link,
            None => {
                self.links.push(0);
                self.links.len() - 1
            }
        };

        let slot = self.vacant_slot();
        self.slots[slot] = Some(Node { link, rt });
        self.links[link] = slot;

        self.order.insert(pos, link);
        SlotId(slot)
    }

    pub fn get(&self, id: SlotId) -> Option<&RangeTombstone> {
        self.slots.get(id.0).and_then(|s| s.as_ref()).map(|n| &n.rt)
    }

    /// Return true if `id` refers to an element currently in the set.
    pub fn is_linked(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: SlotId) -> Option<RangeTombstone> {
        let link = self.slots.get(id.0)?.as_ref()?.link;
        let pos = self.position(link)?;
        self.order.remove(pos);
        self.release(link)
    }

    pub fn first(&self) -> Option<&RangeTombstone> {
        self.order.front().map(|link| self.linked(*link))
    }

    pub fn pop_first(&mut self) -> Option<RangeTombstone> {
        let link = self.order.pop_front()?;
        self.release(link)
    }

    /// Iterate over the elements in start bound order.
    pub fn iter(&self) -> impl Iterator<Item = &RangeTombstone> + '_ {
        self.order.iter().map(|link| self.linked(*link))
    }

    /// Iterate over the handles and elements in start bound order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (SlotId, &RangeTombstone)> + '_ {
        self.order
            .iter()
            .map(|link| (SlotId(self.links[*link]), self.linked(*link)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.links.clear();
        self.free_links.clear();
        self.order.clear();
    }

    /// Move the element at `from` into the vacant slot `to`.
    ///
    /// `to` may be one past the last slot. The order of elements is unchanged and the handle
    /// `from` becomes vacant.
    ///
    /// # Panics
    ///
    /// Panics if `from` is not linked, `to` is occupied or `to` is beyond the end of the arena.
    pub fn relocate(&mut self, from: SlotId, to: SlotId) {
        assert!(self.is_linked(from), "relocate: {} is not linked", from);
        assert!(!self.is_linked(to), "relocate: {} is occupied", to);

        if to.0 == self.slots.len() {
            self.slots.push(None);
        } else if to.0 > self.slots.len() {
            panic!("relocate: {} is beyond the arena", to);
        }

        let Some(node) = self.slots[from.0].take() else {
            unreachable!("linked {} is vacant", from);
        };
        self.links[node.link] = to.0;
        self.slots[to.0] = Some(node);
        self.free.push(from.0);

        trace!("relocated range tombstone from {} to {}", from, to);
    }

    /// Move every element into the lowest slots and release the rest of the arena.
    ///
    /// Returns the moves performed as `(from, to)`.
    pub fn compact(&mut self) -> Vec<(SlotId, SlotId)> {
        let mut moves = Vec::new();

        let mut vacant = 0;
        for from in 0..self.slots.len() {
            if self.slots[from].is_none() {
                continue;
            }
            while vacant < from && self.slots[vacant].is_some() {
                vacant += 1;
            }
            if vacant < from {
                if let Some(node) = self.slots[from].take() {
                    self.links[node.link] = vacant;
                    self.slots[vacant] = Some(node);
                    moves.push((SlotId(from), SlotId(vacant)));
                }
            }
        }

        self.slots.truncate(self.order.len());
        self.free.clear();

        trace!(
            "compacted range tombstone set: moved {} of {}",
            moves.len(),
            self.order.len()
        );
        moves
    }

    /// Heap bytes owned by the elements.
    pub fn memory_usage(&self) -> usize {
        self.iter().map(|rt| rt.memory_usage()).sum()
    }

    fn linked(&self, link: Link) -> &RangeTombstone {
        let slot = self.links[link];
        match &self.slots[slot] {
            Some(node) => &node.rt,
            None => unreachable!("link {} points at vacant {}", link, SlotId(slot)),
        }
    }

    /// Find the index entry of a link.
    fn position(&self, link: Link) -> Option<usize> {
        let rt = self.linked(link);
        let first = self
            .order
            .partition_point(|x| self.cmp.compare_starts(self.linked(*x), rt).is_lt());
        self.order
            .range(first..)
            .position(|x| *x == link)
            .map(|i| first + i)
    }

    fn vacant_slot(&mut self) -> usize {
        while let Some(i) = self.free.pop() {
            if matches!(self.slots.get(i), Some(None)) {
                return i;
            }
        }
        self.slots.push(None);
        self.slots.len() - 1
    }

    fn release(&mut self, link: Link) -> Option<RangeTombstone> {
        let slot = self.links[link];
        self.free_links.push(link);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        Some(node.rt)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clustering::schema::encode_bigint;
    use crate::clustering::schema::ClusteringSchema;
    use crate::clustering::schema::ColumnType;
    use crate::clustering::ClusteringKeyPrefix;
    use crate::Tombstone;

    fn ck(values: &[i64]) -> ClusteringKeyPrefix {
        ClusteringKeyPrefix::new(values.iter().map(|v| encode_bigint(*v)).collect())
    }

    fn rt(start: i64, end: i64, ts: i64) -> RangeTombstone {
        RangeTombstone::inclusive(ck(&[start]), ck(&[end]), Tombstone::new(ts, 0))
    }

    fn new_set() -> RangeTombstoneSet<ClusteringSchema> {
        let s = ClusteringSchema::new([("a", ColumnType::BigInt)]);
        RangeTombstoneSet::new(BoundComparator::new(s))
    }

    fn timestamps<C: Collation>(set: &RangeTombstoneSet<C>) -> Vec<i64> {
        set.iter().map(|r| r.tomb.timestamp).collect()
    }

    #[test]
    fn test_insert_ordered() {
        let mut set = new_set();
        assert!(set.is_empty());
        assert_eq!(set.first(), None);

        set.insert(rt(5, 6, 5));
        set.insert(rt(1, 9, 1));
        set.insert(rt(3, 3, 3));

        assert_eq!(set.len(), 3);
        assert_eq!(timestamps(&set), vec![1, 3, 5]);
        assert_eq!(set.first(), Some(&rt(1, 9, 1)));
    }

    #[test]
    fn test_insert_equal_starts_keeps_insertion_order() {
        let mut set = new_set();

        set.insert(rt(1, 5, 10));
        set.insert(rt(1, 3, 20));
        set.insert(rt(1, 4, 30));

        assert_eq!(timestamps(&set), vec![10, 20, 30]);
    }

    #[test]
    fn test_remove_and_reuse_slot() {
        let mut set = new_set();

        let a = set.insert(rt(1, 1, 1));
        let b = set.insert(rt(2, 2, 2));
        let c = set.insert(rt(3, 3, 3));

        assert_eq!(set.remove(b), Some(rt(2, 2, 2)));
        assert!(!set.is_linked(b));
        assert_eq!(set.remove(b), None);
        assert_eq!(timestamps(&set), vec![1, 3]);

        // The vacant slot is reused.
        let d = set.insert(rt(0, 0, 0));
        assert_eq!(d, b);
        assert_eq!(timestamps(&set), vec![0, 1, 3]);

        assert!(set.is_linked(a));
        assert!(set.is_linked(c));
        assert_eq!(set.get(c), Some(&rt(3, 3, 3)));
    }

    #[test]
    fn test_remove_among_equal_starts() {
        let mut set = new_set();

        let _a = set.insert(rt(1, 5, 10));
        let b = set.insert(rt(1, 3, 20));
        let _c = set.insert(rt(1, 4, 30));

        assert_eq!(set.remove(b), Some(rt(1, 3, 20)));
        assert_eq!(timestamps(&set), vec![10, 30]);
    }

    #[test]
    fn test_pop_first() {
        let mut set = new_set();

        set.insert(rt(2, 2, 2));
        set.insert(rt(1, 1, 1));

        assert_eq!(set.pop_first(), Some(rt(1, 1, 1)));
        assert_eq!(set.pop_first(), Some(rt(2, 2, 2)));
        assert_eq!(set.pop_first(), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_relocate() {
        let mut set = new_set();

        let a = set.insert(rt(1, 1, 1));
        let b = set.insert(rt(2, 2, 2));
        let c = set.insert(rt(3, 3, 3));
        set.remove(a);

        set.relocate(c, a);
        assert!(!set.is_linked(c));
        assert_eq!(set.get(a), Some(&rt(3, 3, 3)));
        assert_eq!(timestamps(&set), vec![2, 3]);

        // Relocate to a new slot at the end of the arena.
        let end = SlotId(3);
        set.relocate(b, end);
        assert_eq!(set.get(end), Some(&rt(2, 2, 2)));
        assert_eq!(
            set.iter_with_ids().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![end, a]
        );

        // Vacated slots are reused, filled ones are not.
        assert_eq!(set.insert(rt(4, 4, 4)), b);
        assert_eq!(set.insert(rt(5, 5, 5)), c);
        assert_eq!(set.insert(rt(6, 6, 6)), SlotId(4));
        assert_eq!(set.get(a), Some(&rt(3, 3, 3)));
        assert_eq!(timestamps(&set), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_relocate_keeps_links() {
        let mut set = new_set();

        let ids = (0..4).map(|i| set.insert(rt(i, i, i))).collect::<Vec<_>>();
        set.remove(ids[0]);

        // Element 2 moves twice, its position in the order does not change.
        set.relocate(ids[2], ids[0]);
        set.relocate(ids[0], SlotId(4));
        assert_eq!(
            set.iter_with_ids().map(|(id, r)| (id, r.tomb.timestamp)).collect::<Vec<_>>(),
            vec![(ids[1], 1), (SlotId(4), 2), (ids[3], 3)]
        );

        assert_eq!(set.remove(SlotId(4)), Some(rt(2, 2, 2)));
        assert_eq!(set.pop_first(), Some(rt(1, 1, 1)));
        assert_eq!(timestamps(&set), vec![3]);
    }

    #[test]
    fn test_front_churn() {
        let mut set = new_set();
        let n = 20_000;

        // Pieces arrive back to front, as the accumulator inserts them.
        for i in (0..n).rev() {
            set.insert(rt(i, i, i));
        }

        // Replace the first piece over and over, the way trimming does.
        for i in 0..n {
            let first = set.pop_first();
            assert_eq!(first.as_ref().map(|r| r.tomb.timestamp), Some(i));
            if let Some(mut r) = first {
                r.tomb.deletion_time = 1;
                set.insert(r);
            }
            let popped = set.pop_first();
            assert_eq!(popped.map(|r| r.tomb), Some(Tombstone::new(i, 1)));
        }

        assert!(set.is_empty());
    }

    #[test]
    #[should_panic(expected = "is occupied")]
    fn test_relocate_to_occupied_slot() {
        let mut set = new_set();

        let a = set.insert(rt(1, 1, 1));
        let b = set.insert(rt(2, 2, 2));
        set.relocate(a, b);
    }

    #[test]
    fn test_compact() {
        let mut set = new_set();

        let ids = (0..6).map(|i| set.insert(rt(i, i, i))).collect::<Vec<_>>();
        set.remove(ids[0]);
        set.remove(ids[2]);
        set.remove(ids[3]);

        let moves = set.compact();
        assert_eq!(moves, vec![(SlotId(1), SlotId(0)), (SlotId(4), SlotId(1)), (SlotId(5), SlotId(2))]);

        assert_eq!(timestamps(&set), vec![1, 4, 5]);
        assert_eq!(set.get(SlotId(2)), Some(&rt(5, 5, 5)));
        assert!(!set.is_linked(SlotId(3)));

        let id = set.insert(rt(9, 9, 9));
        assert_eq!(id, SlotId(3));
        assert_eq!(timestamps(&set), vec![1, 4, 5, 9]);

        assert_eq!(set.compact(), vec![]);
    }

    #[test]
    fn test_clear_and_memory_usage() {
        let mut set = new_set();
        assert_eq!(set.memory_usage(), 0);

        let r = rt(1, 2, 3);
        let usage = r.memory_usage();
        set.insert(r);
        assert_eq!(set.memory_usage(), usage);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.memory_usage(), 0);
    }
}
