//! Text anchors.
//!
//! An anchor marks a position in the document that follows edits: text
//! inserted before it pushes it forward, text removed before it pulls it
//! back. Text removed around it deletes it unless it was created to survive
//! deletion.
//!
//! ## Learning: Handles Into a Slab
//!
//! Callers hold `TextAnchor`, a copyable (index, generation) pair. The data
//! lives in a slab owned by the document. The same slab nodes form a treap
//! ordered by offset.
//!
//! ## Learning: Offset Deltas
//!
//! A node does not store its offset. It stores the distance from the
//! anchor before it, and each subtree caches the sum of those distances.
//! An anchor's offset is the sum over everything left of it, found by
//! walking up to the root. An edit splits out the anchors it touches, so
//! every anchor behind the edit moves by changing a single length.

use quire_buffer::{AnchorMovementType, OffsetChangeMapEntry};

use crate::{DocumentError, DocumentResult, InvariantViolation};

/// Handle to an anchor created by `Document::create_anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextAnchor {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct AnchorData {
    movement: AnchorMovementType,
    survive_deletion: bool,
}

#[derive(Debug, Clone)]
struct Node {
    generation: u32,
    data: Option<AnchorData>,
    // distance from the previous anchor in document order
    length: usize,
    // sum of `length` over the subtree
    total: usize,
    priority: u64,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// All live anchors of one document, ordered by offset.
#[derive(Debug, Clone)]
pub(crate) struct AnchorStore {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
    seed: u64,
}

impl Default for AnchorStore {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl AnchorStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Offset of the last anchor in document order.
    pub(crate) fn last_offset(&self) -> Option<usize> {
        self.root.map(|root| self.nodes[root].total)
    }

    pub(crate) fn create(&mut self, offset: usize, movement: AnchorMovementType, survive_deletion: bool) -> TextAnchor {
        let (left, right) = self.split(self.root, 0, offset, true);
        let before = self.total(left);
        let idx = self.allocate(AnchorData {
            movement,
            survive_deletion,
        });
        self.nodes[idx].length = offset - before;
        self.nodes[idx].total = offset - before;
        if right.is_some() {
            let first = self.first_length(right);
            self.set_first_length(right, before + first - offset);
        }
        let joined = self.merge(left, Some(idx));
        let root = self.merge(joined, right);
        self.set_root(root);
        self.len += 1;
        self.handle(idx)
    }

    pub(crate) fn is_deleted(&self, anchor: TextAnchor) -> bool {
        self.data(anchor).is_err()
    }

    pub(crate) fn offset(&self, anchor: TextAnchor) -> DocumentResult<usize> {
        self.data(anchor)?;
        Ok(self.offset_at(anchor.index as usize))
    }

    pub(crate) fn movement(&self, anchor: TextAnchor) -> DocumentResult<AnchorMovementType> {
        Ok(self.data(anchor)?.movement)
    }

    pub(crate) fn survive_deletion(&self, anchor: TextAnchor) -> DocumentResult<bool> {
        Ok(self.data(anchor)?.survive_deletion)
    }

    pub(crate) fn set_movement(&mut self, anchor: TextAnchor, movement: AnchorMovementType) -> DocumentResult<()> {
        self.data_mut(anchor)?.movement = movement;
        Ok(())
    }

    pub(crate) fn set_survive_deletion(&mut self, anchor: TextAnchor, survive_deletion: bool) -> DocumentResult<()> {
        self.data_mut(anchor)?.survive_deletion = survive_deletion;
        Ok(())
    }

    /// Drops an anchor the caller no longer needs.
    pub(crate) fn remove(&mut self, anchor: TextAnchor) -> DocumentResult<()> {
        self.data(anchor)?;
        let idx = anchor.index as usize;

        // the next anchor takes over the distance
        let length = self.nodes[idx].length;
        if let Some(next) = self.next_at(idx) {
            self.nodes[next].length += length;
            self.pull_up(Some(next));
        }
        self.nodes[idx].length = 0;
        self.pull_up(Some(idx));

        let parent = self.nodes[idx].parent;
        let merged = self.merge(self.nodes[idx].left, self.nodes[idx].right);
        match parent {
            None => self.set_root(merged),
            Some(parent) => {
                if self.nodes[parent].left == Some(idx) {
                    self.nodes[parent].left = merged;
                } else {
                    self.nodes[parent].right = merged;
                }
                self.pull_up(Some(parent));
            }
        }
        self.release(idx);
        self.len -= 1;
        Ok(())
    }

    /// Moves every anchor through one map entry. Anchors deleted by the
    /// entry are appended to `deleted`.
    pub(crate) fn apply(&mut self, entry: &OffsetChangeMapEntry, deleted: &mut Vec<TextAnchor>) {
        let offset = entry.offset();
        let removal = entry.removal_length();
        let insertion = entry.insertion_length();
        if self.root.is_none() || (removal == 0 && insertion == 0) {
            return;
        }

        // the affected run: anchors at a pure insertion point, or strictly
        // inside the removed range
        let (left, rest) = self.split(self.root, 0, offset, removal > 0);
        let base = self.total(left);
        let (middle, right) = if removal == 0 {
            self.split(rest, base, offset, true)
        } else {
            self.split(rest, base, offset + removal, false)
        };
        let right_first = self.total(middle) + self.first_length(right);

        let mut before = Vec::new();
        let mut after = Vec::new();
        for idx in self.in_order(middle) {
            let Some(data) = &self.nodes[idx].data else { continue };
            if removal > 0 && !data.survive_deletion && !entry.removal_never_causes_anchor_deletion() {
                deleted.push(self.handle(idx));
                self.release(idx);
                self.len -= 1;
                continue;
            }
            let stays_before = match data.movement {
                AnchorMovementType::BeforeInsertion => true,
                AnchorMovementType::AfterInsertion => false,
                AnchorMovementType::Default => entry.default_anchor_movement_is_before_insertion(),
            };
            if stays_before {
                before.push(idx);
            } else {
                after.push(idx);
            }
        }

        let mut middle = None;
        let mut end = base;
        for (run, target) in [(before, offset), (after, offset + insertion)] {
            for idx in run {
                self.reset(idx, target - end);
                end = target;
                middle = self.merge(middle, Some(idx));
            }
        }
        if right.is_some() {
            // old absolute offset base + right_first, shifted by the change
            self.set_first_length(right, base + right_first + insertion - removal - end);
        }

        let joined = self.merge(left, middle);
        let root = self.merge(joined, right);
        self.set_root(root);
    }

    /// Verifies the treap links, heap order, cached sums and the count of
    /// live anchors.
    pub(crate) fn check_properties(&self) -> Result<(), InvariantViolation> {
        let mut count = 0;
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        if let Some(root) = self.root {
            if self.nodes[root].parent.is_some() {
                return Err(InvariantViolation(format!("anchor root {root} has a parent")));
            }
        }
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.data.is_none() {
                return Err(InvariantViolation(format!("released anchor {idx} is still linked")));
            }
            let total = self.total(node.left) + node.length + self.total(node.right);
            if node.total != total {
                return Err(InvariantViolation(format!(
                    "anchor {idx} caches {} but its subtree sums to {total}",
                    node.total
                )));
            }
            for child in [node.left, node.right].into_iter().flatten() {
                if self.nodes[child].parent != Some(idx) {
                    return Err(InvariantViolation(format!("anchor {child} has a stale parent")));
                }
                if self.nodes[child].priority > node.priority {
                    return Err(InvariantViolation(format!("anchor {child} outranks its parent {idx}")));
                }
                stack.push(child);
            }
            count += 1;
        }
        let live = self.nodes.iter().filter(|node| node.data.is_some()).count();
        if count != self.len || live != self.len {
            return Err(InvariantViolation(format!(
                "{live} live anchors, {count} linked, {} counted",
                self.len
            )));
        }
        Ok(())
    }

    // Slab

    fn allocate(&mut self, data: AnchorData) -> usize {
        let priority = self.next_priority();
        let node = Node {
            generation: 0,
            data: Some(data),
            length: 0,
            total: 0,
            priority,
            parent: None,
            left: None,
            right: None,
        };
        match self.free.pop() {
            Some(idx) => {
                let generation = self.nodes[idx].generation;
                self.nodes[idx] = Node { generation, ..node };
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.data = None;
        node.generation = node.generation.wrapping_add(1);
        node.parent = None;
        node.left = None;
        node.right = None;
        self.free.push(idx);
    }

    fn handle(&self, idx: usize) -> TextAnchor {
        TextAnchor {
            index: idx as u32,
            generation: self.nodes[idx].generation,
        }
    }

    fn data(&self, anchor: TextAnchor) -> DocumentResult<&AnchorData> {
        self.nodes
            .get(anchor.index as usize)
            .filter(|node| node.generation == anchor.generation)
            .and_then(|node| node.data.as_ref())
            .ok_or(DocumentError::AnchorDeleted)
    }

    fn data_mut(&mut self, anchor: TextAnchor) -> DocumentResult<&mut AnchorData> {
        self.nodes
            .get_mut(anchor.index as usize)
            .filter(|node| node.generation == anchor.generation)
            .and_then(|node| node.data.as_mut())
            .ok_or(DocumentError::AnchorDeleted)
    }

    // xorshift64
    fn next_priority(&mut self) -> u64 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.seed = x;
        x
    }

    // Treap

    fn total(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].total)
    }

    fn offset_at(&self, idx: usize) -> usize {
        let mut offset = self.total(self.nodes[idx].left) + self.nodes[idx].length;
        let mut node = idx;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].right == Some(node) {
                offset += self.total(self.nodes[parent].left) + self.nodes[parent].length;
            }
            node = parent;
        }
        offset
    }

    fn next_at(&self, idx: usize) -> Option<usize> {
        if let Some(mut node) = self.nodes[idx].right {
            while let Some(left) = self.nodes[node].left {
                node = left;
            }
            return Some(node);
        }
        let mut node = idx;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].left == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    fn in_order(&self, root: Option<usize>) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = Vec::new();
        let mut node = root;
        while node.is_some() || !stack.is_empty() {
            while let Some(idx) = node {
                stack.push(idx);
                node = self.nodes[idx].left;
            }
            if let Some(idx) = stack.pop() {
                order.push(idx);
                node = self.nodes[idx].right;
            }
        }
        order
    }

    // Recomputes the cached sum and adopts the children.
    fn pull(&mut self, idx: usize) {
        let (left, right) = (self.nodes[idx].left, self.nodes[idx].right);
        self.nodes[idx].total = self.total(left) + self.nodes[idx].length + self.total(right);
        for child in [left, right].into_iter().flatten() {
            self.nodes[child].parent = Some(idx);
        }
    }

    fn pull_up(&mut self, mut node: Option<usize>) {
        while let Some(idx) = node {
            self.pull(idx);
            node = self.nodes[idx].parent;
        }
    }

    fn set_root(&mut self, root: Option<usize>) {
        if let Some(idx) = root {
            self.nodes[idx].parent = None;
        }
        self.root = root;
    }

    // Makes `idx` a lone node of the given length.
    fn reset(&mut self, idx: usize, length: usize) {
        let node = &mut self.nodes[idx];
        node.length = length;
        node.total = length;
        node.parent = None;
        node.left = None;
        node.right = None;
    }

    fn first_length(&self, root: Option<usize>) -> usize {
        let Some(mut node) = root else { return 0 };
        while let Some(left) = self.nodes[node].left {
            node = left;
        }
        self.nodes[node].length
    }

    fn set_first_length(&mut self, root: Option<usize>, length: usize) {
        let mut path = Vec::new();
        let mut node = root;
        while let Some(idx) = node {
            path.push(idx);
            node = self.nodes[idx].left;
        }
        if let Some(&first) = path.last() {
            self.nodes[first].length = length;
        }
        for &idx in path.iter().rev() {
            self.pull(idx);
        }
    }

    /// Splits a subtree whose offsets start at `base` into the anchors
    /// before `key` (at or before it when `inclusive`) and the rest. The
    /// first node of the second part keeps its distance to the last node of
    /// the first.
    fn split(&mut self, node: Option<usize>, base: usize, key: usize, inclusive: bool) -> (Option<usize>, Option<usize>) {
        let Some(idx) = node else { return (None, None) };
        let offset = base + self.total(self.nodes[idx].left) + self.nodes[idx].length;
        let goes_left = if inclusive { offset <= key } else { offset < key };
        if goes_left {
            let (inner, rest) = self.split(self.nodes[idx].right, offset, key, inclusive);
            self.nodes[idx].right = inner;
            self.pull(idx);
            (Some(idx), rest)
        } else {
            let (rest, inner) = self.split(self.nodes[idx].left, base, key, inclusive);
            self.nodes[idx].left = inner;
            self.pull(idx);
            (rest, Some(idx))
        }
    }

    /// Joins two subtrees, every anchor of `a` before every anchor of `b`.
    fn merge(&mut self, a: Option<usize>, b: Option<usize>) -> Option<usize> {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(a), Some(b)) => {
                if self.nodes[a].priority >= self.nodes[b].priority {
                    let right = self.merge(self.nodes[a].right, Some(b));
                    self.nodes[a].right = right;
                    self.pull(a);
                    Some(a)
                } else {
                    let left = self.merge(Some(a), self.nodes[b].left);
                    self.nodes[b].left = left;
                    self.pull(b);
                    Some(b)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnchorMovementType::{AfterInsertion, BeforeInsertion};

    fn apply(store: &mut AnchorStore, entry: OffsetChangeMapEntry) -> Vec<TextAnchor> {
        let mut deleted = Vec::new();
        store.apply(&entry, &mut deleted);
        store.check_properties().unwrap();
        deleted
    }

    #[test]
    fn test_insertion_moves_anchors() {
        let mut store = AnchorStore::new();
        let before = store.create(2, AnchorMovementType::Default, false);
        let at_before = store.create(5, BeforeInsertion, false);
        let at_after = store.create(5, AfterInsertion, false);
        let at_default = store.create(5, AnchorMovementType::Default, false);
        let later = store.create(8, AnchorMovementType::Default, false);

        assert!(apply(&mut store, OffsetChangeMapEntry::new(5, 0, 3)).is_empty());
        assert_eq!(store.offset(before).unwrap(), 2);
        assert_eq!(store.offset(at_before).unwrap(), 5);
        assert_eq!(store.offset(at_after).unwrap(), 8);
        assert_eq!(store.offset(at_default).unwrap(), 8);
        assert_eq!(store.offset(later).unwrap(), 11);
    }

    #[test]
    fn test_default_follows_entry_flag() {
        let mut store = AnchorStore::new();
        let anchor = store.create(4, AnchorMovementType::Default, false);
        apply(&mut store, OffsetChangeMapEntry::with_flags(4, 0, 2, false, true));
        assert_eq!(store.offset(anchor).unwrap(), 4);
    }

    #[test]
    fn test_removal_deletes_inner_anchors() {
        let mut store = AnchorStore::new();
        let at_start = store.create(2, AnchorMovementType::Default, false);
        let inside = store.create(3, AnchorMovementType::Default, false);
        let survivor = store.create(4, AfterInsertion, true);
        let at_end = store.create(6, AnchorMovementType::Default, false);

        let deleted = apply(&mut store, OffsetChangeMapEntry::new(2, 4, 1));
        assert_eq!(deleted, vec![inside]);
        assert!(store.is_deleted(inside));
        assert_eq!(store.offset(inside), Err(DocumentError::AnchorDeleted));

        assert_eq!(store.offset(at_start).unwrap(), 2);
        assert_eq!(store.offset(survivor).unwrap(), 3);
        assert_eq!(store.offset(at_end).unwrap(), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_removal_never_causes_deletion_flag() {
        let mut store = AnchorStore::new();
        let anchor = store.create(3, AnchorMovementType::Default, false);
        let deleted = apply(&mut store, OffsetChangeMapEntry::with_flags(1, 4, 0, true, false));
        assert!(deleted.is_empty());
        assert_eq!(store.offset(anchor).unwrap(), 1);
    }

    #[test]
    fn test_survivors_split_by_movement() {
        let mut store = AnchorStore::new();
        let after = store.create(3, AfterInsertion, true);
        let before = store.create(4, BeforeInsertion, true);
        apply(&mut store, OffsetChangeMapEntry::new(2, 4, 5));
        assert_eq!(store.offset(before).unwrap(), 2);
        assert_eq!(store.offset(after).unwrap(), 7);
    }

    #[test]
    fn test_slot_reuse_invalidates_old_handle() {
        let mut store = AnchorStore::new();
        let old = store.create(1, AnchorMovementType::Default, false);
        store.remove(old).unwrap();
        let new = store.create(1, AnchorMovementType::Default, false);
        assert_ne!(old, new);
        assert!(store.is_deleted(old));
        assert!(!store.is_deleted(new));
        assert_eq!(store.set_movement(old, AfterInsertion), Err(DocumentError::AnchorDeleted));
    }

    #[test]
    fn test_remove_keeps_neighbours_in_place() {
        let mut store = AnchorStore::new();
        let anchors: Vec<_> = [1, 4, 4, 9, 12]
            .into_iter()
            .map(|offset| store.create(offset, AnchorMovementType::Default, false))
            .collect();
        store.remove(anchors[1]).unwrap();
        store.remove(anchors[4]).unwrap();
        store.check_properties().unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.offset(anchors[0]).unwrap(), 1);
        assert_eq!(store.offset(anchors[2]).unwrap(), 4);
        assert_eq!(store.offset(anchors[3]).unwrap(), 9);
        assert_eq!(store.last_offset(), Some(9));
        assert_eq!(store.remove(anchors[1]), Err(DocumentError::AnchorDeleted));
    }

    #[test]
    fn test_many_anchors_shift_together() {
        let mut store = AnchorStore::new();
        let anchors: Vec<_> = (0..1000)
            .map(|i| store.create(i * 2, AnchorMovementType::Default, false))
            .collect();
        store.check_properties().unwrap();

        apply(&mut store, OffsetChangeMapEntry::new(10, 0, 5));
        assert_eq!(store.offset(anchors[4]).unwrap(), 8);
        assert_eq!(store.offset(anchors[5]).unwrap(), 15);
        assert_eq!(store.offset(anchors[999]).unwrap(), 2003);
        assert_eq!(store.last_offset(), Some(2003));
    }

    #[test]
    fn test_setters() {
        let mut store = AnchorStore::new();
        let anchor = store.create(0, AnchorMovementType::Default, false);
        store.set_movement(anchor, BeforeInsertion).unwrap();
        store.set_survive_deletion(anchor, true).unwrap();
        assert_eq!(store.movement(anchor).unwrap(), BeforeInsertion);
        assert!(store.survive_deletion(anchor).unwrap());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn anchors_follow_single_entries(
                offsets in prop::collection::vec(0..50usize, 0..30),
                offset in 0..50usize,
                removal in 0..10usize,
                insertion in 0..10usize,
            ) {
                let mut store = AnchorStore::new();
                let anchors: Vec<_> = offsets
                    .iter()
                    .map(|&o| store.create(o, AnchorMovementType::Default, true))
                    .collect();
                let entry = OffsetChangeMapEntry::new(offset, removal, insertion);
                let mut deleted = Vec::new();
                store.apply(&entry, &mut deleted);

                prop_assert!(deleted.is_empty());
                prop_assert!(store.check_properties().is_ok());
                for (anchor, &old) in anchors.iter().zip(&offsets) {
                    prop_assert_eq!(
                        store.offset(*anchor).unwrap(),
                        entry.get_new_offset(old, AnchorMovementType::Default)
                    );
                }
            }

            #[test]
            fn anchors_match_model_across_operations(
                operations in prop::collection::vec((0..4u8, 0..60usize, 0..8usize, 0..8usize), 1..60),
            ) {
                let movements = [AnchorMovementType::Default, BeforeInsertion, AfterInsertion];
                let mut store = AnchorStore::new();
                let mut model: Vec<(TextAnchor, usize, AnchorMovementType)> = Vec::new();

                for (kind, a, b, c) in operations {
                    match kind {
                        0 | 1 => {
                            let movement = movements[b % 3];
                            model.push((store.create(a, movement, true), a, movement));
                        }
                        2 if !model.is_empty() => {
                            let (anchor, ..) = model.remove(a % model.len());
                            store.remove(anchor).unwrap();
                        }
                        _ => {
                            let entry = OffsetChangeMapEntry::new(a, b, c);
                            let mut deleted = Vec::new();
                            store.apply(&entry, &mut deleted);
                            prop_assert!(deleted.is_empty());
                            for (_, offset, movement) in &mut model {
                                *offset = entry.get_new_offset(*offset, *movement);
                            }
                        }
                    }

                    prop_assert!(store.check_properties().is_ok());
                    prop_assert_eq!(store.len(), model.len());
                    for (anchor, offset, _) in &model {
                        prop_assert_eq!(store.offset(*anchor).unwrap(), *offset);
                    }
                    prop_assert_eq!(store.last_offset(), model.iter().map(|&(_, offset, _)| offset).max());
                }
            }
        }
    }
}
