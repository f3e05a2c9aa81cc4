//! Line tree.
//!
//! A red-black tree over the lines of a document, ordered by position. Every
//! node is one line and caches two aggregates for its subtree: the number of
//! lines and the number of characters. Line-by-number, line-by-offset,
//! offset-of-line and number-of-line are all O(log n), and an edit that
//! touches one line only refreshes the aggregates on its path to the root.
//!
//! ## Learning: Arena Instead of Pointers
//!
//! Parent links would need `Rc<RefCell<..>>` plus `Weak` in safe Rust.
//! Storing the nodes in a `Vec` and linking them by index keeps the whole
//! tree in one allocation with no reference counting. Handles given out to
//! callers (`LineId`) carry a generation, so a handle to a removed line
//! can't silently alias a recycled slot.

use std::iter;

use quire_buffer::BufferError;

use crate::line::DocumentLine;
use crate::{DocumentError, DocumentResult, InvariantViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone)]
struct LineNode {
    generation: u32,
    deleted: bool,
    total_length: usize,
    delimiter_length: usize,
    color: Color,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    // aggregates over the subtree rooted here
    node_total_count: usize,
    node_total_length: usize,
}

impl LineNode {
    fn new(generation: u32, total_length: usize) -> Self {
        Self {
            generation,
            deleted: false,
            total_length,
            delimiter_length: 0,
            color: Color::Black,
            parent: None,
            left: None,
            right: None,
            node_total_count: 1,
            node_total_length: total_length,
        }
    }
}

/// Stable handle to a line.
///
/// Stays valid while the line exists, no matter how many lines are inserted
/// or removed around it. Once the line is removed every lookup through the
/// handle fails with `DocumentError::LineDeleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId {
    index: u32,
    generation: u32,
}

/// Lengths of one line, as fed to `LineTree::rebuild_tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineLengths {
    /// Length including the delimiter
    pub total_length: usize,
    /// 0, 1 or 2
    pub delimiter_length: usize,
}

impl LineLengths {
    pub fn new(total_length: usize, delimiter_length: usize) -> Self {
        Self {
            total_length,
            delimiter_length,
        }
    }
}

/// Ordered collection of the lines of a document.
///
/// Always holds at least one line.
#[derive(Debug, Clone)]
pub struct LineTree {
    nodes: Vec<LineNode>,
    free: Vec<usize>,
    root: usize,
}

impl LineTree {
    /// A tree with a single empty line.
    pub fn new() -> Self {
        Self {
            nodes: vec![LineNode::new(0, 0)],
            free: Vec::new(),
            root: 0,
        }
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.nodes[self.root].node_total_count
    }

    /// Sum of all total line lengths.
    pub fn text_length(&self) -> usize {
        self.nodes[self.root].node_total_length
    }

    /// Returns true if `id` refers to a line still in the tree.
    pub fn contains(&self, id: LineId) -> bool {
        self.nodes
            .get(id.index as usize)
            .is_some_and(|node| !node.deleted && node.generation == id.generation)
    }

    /// Looks up a line by handle.
    pub fn line(&self, id: LineId) -> DocumentResult<DocumentLine<'_>> {
        Ok(DocumentLine::new(self, self.resolve(id)?))
    }

    /// Looks up a line by its 1-based number.
    pub fn get_by_number(&self, number: usize) -> DocumentResult<DocumentLine<'_>> {
        let line_count = self.line_count();
        let out_of_range = DocumentError::LineNumberOutOfRange {
            line: number,
            line_count,
        };
        if number == 0 || number > line_count {
            return Err(out_of_range);
        }
        self.node_at_index(number - 1)
            .map(|idx| DocumentLine::new(self, idx))
            .ok_or(out_of_range)
    }

    /// The line containing `offset`. The end offset of the document belongs
    /// to the last line.
    pub fn get_by_offset(&self, offset: usize) -> DocumentResult<DocumentLine<'_>> {
        let text_length = self.text_length();
        self.index_by_offset(offset)
            .map(|idx| DocumentLine::new(self, idx))
            .ok_or_else(|| BufferError::OffsetOutOfRange { offset, text_length }.into())
    }

    /// The first line.
    pub fn first_line(&self) -> DocumentLine<'_> {
        DocumentLine::new(self, self.first_index())
    }

    /// The last line.
    pub fn last_line(&self) -> DocumentLine<'_> {
        DocumentLine::new(self, self.right_most(self.root))
    }

    /// All lines in document order.
    pub fn lines(&self) -> impl Iterator<Item = DocumentLine<'_>> + '_ {
        iter::successors(Some(self.first_line()), |line| line.next_line())
    }

    /// Start offset of a line.
    pub fn offset_of(&self, id: LineId) -> DocumentResult<usize> {
        Ok(self.offset_at(self.resolve(id)?))
    }

    /// 1-based number of a line.
    pub fn line_number_of(&self, id: LineId) -> DocumentResult<usize> {
        Ok(self.line_number_at(self.resolve(id)?))
    }

    /// The line after `id`, or `None` for the last line.
    pub fn next_line(&self, id: LineId) -> DocumentResult<Option<LineId>> {
        Ok(self.next_at(self.resolve(id)?).map(|idx| self.id_at(idx)))
    }

    /// The line before `id`, or `None` for the first line.
    pub fn previous_line(&self, id: LineId) -> DocumentResult<Option<LineId>> {
        Ok(self.previous_at(self.resolve(id)?).map(|idx| self.id_at(idx)))
    }

    /// Inserts a new line of `total_length` characters directly after `id`.
    pub fn insert_line_after(&mut self, id: LineId, total_length: usize) -> DocumentResult<LineId> {
        let idx = self.resolve(id)?;
        let new = self.insert_line_after_index(idx, total_length);
        Ok(self.id_at(new))
    }

    /// Detaches a line from the tree. Its handle reports `LineDeleted` from
    /// now on.
    pub fn remove_line(&mut self, id: LineId) -> DocumentResult<()> {
        let idx = self.resolve(id)?;
        self.remove_line_at(idx);
        Ok(())
    }

    /// Replaces the whole tree with `lines` in O(n).
    ///
    /// The first line keeps its handle; every other line currently in the
    /// tree is deleted. The result is perfectly balanced, with red nodes
    /// exactly on the deepest level when that level is not full.
    pub fn rebuild_tree(&mut self, lines: &[LineLengths]) {
        let first = self.first_index();
        let old: Vec<usize> = iter::successors(self.next_at(first), |&idx| self.next_at(idx)).collect();
        for idx in old {
            self.release(idx);
        }

        let (head, rest) = match lines.split_first() {
            Some((head, rest)) => (*head, rest),
            None => (LineLengths::default(), &[][..]),
        };
        let generation = self.nodes[first].generation;
        self.nodes[first] = LineNode::new(generation, head.total_length);
        self.nodes[first].delimiter_length = head.delimiter_length;

        let mut order = Vec::with_capacity(rest.len() + 1);
        order.push(first);
        for line in rest {
            let idx = self.alloc(line.total_length);
            self.nodes[idx].delimiter_length = line.delimiter_length;
            order.push(idx);
        }

        let height = Self::get_tree_height(order.len());
        if let Some(root) = self.build_tree(&order, 0, order.len(), height) {
            self.nodes[root].color = Color::Black;
            self.root = root;
        }
    }

    /// Height of a perfectly balanced tree with `size` nodes.
    pub fn get_tree_height(size: usize) -> usize {
        if size == 0 {
            0
        } else {
            Self::get_tree_height(size / 2) + 1
        }
    }

    /// Actual height of the tree (number of nodes on the longest root path).
    pub fn tree_height(&self) -> usize {
        self.height_of(Some(self.root))
    }

    /// Verifies the red-black properties, parent links, aggregates and
    /// arena bookkeeping.
    pub fn check_properties(&self) -> Result<(), InvariantViolation> {
        let root = &self.nodes[self.root];
        if root.parent.is_some() {
            return Err(InvariantViolation("root has a parent".into()));
        }
        if root.color != Color::Black {
            return Err(InvariantViolation("root is red".into()));
        }
        self.check_node(self.root)?;

        let live = self.nodes.len() - self.free.len();
        if live != root.node_total_count {
            return Err(InvariantViolation(format!(
                "{live} live nodes but {} lines in the tree",
                root.node_total_count
            )));
        }
        if let Some(&idx) = self.free.iter().find(|&&idx| !self.nodes[idx].deleted) {
            return Err(InvariantViolation(format!("free slot {idx} is not deleted")));
        }
        Ok(())
    }

    // ==================== Index Level ====================

    pub(crate) fn resolve(&self, id: LineId) -> DocumentResult<usize> {
        if self.contains(id) {
            Ok(id.index as usize)
        } else {
            Err(DocumentError::LineDeleted)
        }
    }

    pub(crate) fn id_at(&self, idx: usize) -> LineId {
        LineId {
            index: idx as u32,
            generation: self.nodes[idx].generation,
        }
    }

    pub(crate) fn total_length_at(&self, idx: usize) -> usize {
        self.nodes[idx].total_length
    }

    pub(crate) fn delimiter_length_at(&self, idx: usize) -> usize {
        self.nodes[idx].delimiter_length
    }

    pub(crate) fn first_index(&self) -> usize {
        self.left_most(self.root)
    }

    pub(crate) fn index_by_offset(&self, offset: usize) -> Option<usize> {
        let text_length = self.text_length();
        if offset > text_length {
            None
        } else if offset == text_length {
            Some(self.right_most(self.root))
        } else {
            self.node_at_offset(offset)
        }
    }

    pub(crate) fn offset_at(&self, idx: usize) -> usize {
        let mut offset = self.subtree_length(self.nodes[idx].left);
        let mut node = idx;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].right == Some(node) {
                offset += self.subtree_length(self.nodes[parent].left) + self.nodes[parent].total_length;
            }
            node = parent;
        }
        offset
    }

    pub(crate) fn line_number_at(&self, idx: usize) -> usize {
        let mut index = self.subtree_count(self.nodes[idx].left);
        let mut node = idx;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].right == Some(node) {
                index += self.subtree_count(self.nodes[parent].left) + 1;
            }
            node = parent;
        }
        index + 1
    }

    pub(crate) fn next_at(&self, idx: usize) -> Option<usize> {
        if let Some(right) = self.nodes[idx].right {
            return Some(self.left_most(right));
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

    pub(crate) fn previous_at(&self, idx: usize) -> Option<usize> {
        if let Some(left) = self.nodes[idx].left {
            return Some(self.right_most(left));
        }
        let mut node = idx;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].right == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    pub(crate) fn insert_line_after_index(&mut self, idx: usize, total_length: usize) -> usize {
        let new = self.alloc(total_length);
        match self.nodes[idx].right {
            None => self.insert_as_right(idx, new),
            Some(right) => {
                let left_most = self.left_most(right);
                self.insert_as_left(left_most, new);
            }
        }
        new
    }

    pub(crate) fn remove_line_at(&mut self, idx: usize) {
        debug_assert!(self.line_count() > 1, "cannot remove the only line");
        if self.line_count() == 1 {
            return;
        }
        self.remove_node(idx);
        self.release(idx);
    }

    pub(crate) fn set_total_length(&mut self, idx: usize, total_length: usize) {
        self.nodes[idx].total_length = total_length;
        self.update_after_children_change(idx);
    }

    pub(crate) fn set_delimiter_length(&mut self, idx: usize, delimiter_length: usize) {
        self.nodes[idx].delimiter_length = delimiter_length;
    }

    // ==================== Arena ====================

    fn alloc(&mut self, total_length: usize) -> usize {
        match self.free.pop() {
            Some(idx) => {
                let generation = self.nodes[idx].generation;
                self.nodes[idx] = LineNode::new(generation, total_length);
                idx
            }
            None => {
                self.nodes.push(LineNode::new(0, total_length));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.deleted = true;
        node.generation = node.generation.wrapping_add(1);
        node.parent = None;
        node.left = None;
        node.right = None;
        self.free.push(idx);
    }

    // ==================== Navigation ====================

    fn subtree_count(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].node_total_count)
    }

    fn subtree_length(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].node_total_length)
    }

    fn left_most(&self, mut node: usize) -> usize {
        while let Some(left) = self.nodes[node].left {
            node = left;
        }
        node
    }

    fn right_most(&self, mut node: usize) -> usize {
        while let Some(right) = self.nodes[node].right {
            node = right;
        }
        node
    }

    fn node_at_index(&self, mut index: usize) -> Option<usize> {
        let mut node = self.root;
        loop {
            let left_count = self.subtree_count(self.nodes[node].left);
            if index < left_count {
                node = self.nodes[node].left?;
            } else {
                index -= left_count;
                if index == 0 {
                    return Some(node);
                }
                index -= 1;
                node = self.nodes[node].right?;
            }
        }
    }

    fn node_at_offset(&self, mut offset: usize) -> Option<usize> {
        let mut node = self.root;
        loop {
            let left_length = self.subtree_length(self.nodes[node].left);
            if offset < left_length {
                node = self.nodes[node].left?;
                continue;
            }
            offset -= left_length;
            if offset < self.nodes[node].total_length {
                return Some(node);
            }
            offset -= self.nodes[node].total_length;
            node = self.nodes[node].right?;
        }
    }

    fn height_of(&self, node: Option<usize>) -> usize {
        match node {
            None => 0,
            Some(idx) => {
                1 + self
                    .height_of(self.nodes[idx].left)
                    .max(self.height_of(self.nodes[idx].right))
            }
        }
    }

    fn color_of(&self, node: Option<usize>) -> Color {
        node.map_or(Color::Black, |idx| self.nodes[idx].color)
    }

    fn sibling(&self, node: Option<usize>, parent: usize) -> Option<usize> {
        if node == self.nodes[parent].left {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        }
    }

    // ==================== Aggregates ====================

    fn recompute_aggregates(&mut self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        let count = 1 + self.subtree_count(node.left) + self.subtree_count(node.right);
        let length = node.total_length + self.subtree_length(node.left) + self.subtree_length(node.right);
        let node = &mut self.nodes[idx];
        let changed = node.node_total_count != count || node.node_total_length != length;
        node.node_total_count = count;
        node.node_total_length = length;
        changed
    }

    // Walks towards the root, stopping as soon as a node's aggregates
    // come out unchanged.
    fn update_after_children_change(&mut self, idx: usize) {
        let mut node = idx;
        while self.recompute_aggregates(node) {
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
    }

    // ==================== Red-Black Insert ====================

    fn insert_as_left(&mut self, parent: usize, new: usize) {
        self.nodes[parent].left = Some(new);
        self.attach(parent, new);
    }

    fn insert_as_right(&mut self, parent: usize, new: usize) {
        self.nodes[parent].right = Some(new);
        self.attach(parent, new);
    }

    fn attach(&mut self, parent: usize, new: usize) {
        self.nodes[new].parent = Some(parent);
        self.nodes[new].color = Color::Red;
        self.update_after_children_change(parent);
        self.fix_tree_on_insert(new);
    }

    fn fix_tree_on_insert(&mut self, mut node: usize) {
        let Some(mut parent) = self.nodes[node].parent else {
            self.nodes[node].color = Color::Black;
            return;
        };
        if self.nodes[parent].color == Color::Black {
            return;
        }
        // a red parent is never the root
        let Some(mut grandparent) = self.nodes[parent].parent else {
            self.nodes[parent].color = Color::Black;
            return;
        };
        let uncle = self.sibling(Some(parent), grandparent);
        if let Some(uncle) = uncle.filter(|&uncle| self.nodes[uncle].color == Color::Red) {
            self.nodes[parent].color = Color::Black;
            self.nodes[uncle].color = Color::Black;
            self.nodes[grandparent].color = Color::Red;
            self.fix_tree_on_insert(grandparent);
            return;
        }

        let parent_is_left = self.nodes[grandparent].left == Some(parent);
        if parent_is_left && self.nodes[parent].right == Some(node) {
            self.rotate_left(parent);
            node = parent;
        } else if !parent_is_left && self.nodes[parent].left == Some(node) {
            self.rotate_right(parent);
            node = parent;
        }
        let Some(p) = self.nodes[node].parent else { return };
        parent = p;
        let Some(g) = self.nodes[parent].parent else { return };
        grandparent = g;

        self.nodes[parent].color = Color::Black;
        self.nodes[grandparent].color = Color::Red;
        if self.nodes[parent].left == Some(node) && self.nodes[grandparent].left == Some(parent) {
            self.rotate_right(grandparent);
        } else {
            self.rotate_left(grandparent);
        }
    }

    // ==================== Red-Black Delete ====================

    fn remove_node(&mut self, removed: usize) {
        if let (Some(_), Some(right)) = (self.nodes[removed].left, self.nodes[removed].right) {
            // Swap in the in-order successor, which has no left child.
            let left_most = self.left_most(right);
            self.remove_node(left_most);

            // removing left_most may have rotated around `removed`
            self.replace_node(removed, Some(left_most));
            let left = self.nodes[removed].left;
            let right = self.nodes[removed].right;
            self.nodes[left_most].left = left;
            if let Some(left) = left {
                self.nodes[left].parent = Some(left_most);
            }
            self.nodes[left_most].right = right;
            if let Some(right) = right {
                self.nodes[right].parent = Some(left_most);
            }
            self.nodes[left_most].color = self.nodes[removed].color;

            self.update_after_children_change(left_most);
            if let Some(parent) = self.nodes[left_most].parent {
                self.update_after_children_change(parent);
            }
            return;
        }

        let parent = self.nodes[removed].parent;
        let child = self.nodes[removed].left.or(self.nodes[removed].right);
        self.replace_node(removed, child);
        if let Some(parent) = parent {
            self.update_after_children_change(parent);
        }
        if self.nodes[removed].color == Color::Black {
            match child {
                Some(child) if self.nodes[child].color == Color::Red => {
                    self.nodes[child].color = Color::Black;
                }
                _ => self.fix_tree_on_delete(child, parent),
            }
        }
    }

    fn fix_tree_on_delete(&mut self, node: Option<usize>, parent: Option<usize>) {
        let Some(parent) = parent else { return };
        let Some(mut sibling) = self.sibling(node, parent) else {
            debug_assert!(false, "black node without sibling");
            return;
        };

        if self.nodes[sibling].color == Color::Red {
            self.nodes[parent].color = Color::Red;
            self.nodes[sibling].color = Color::Black;
            if node == self.nodes[parent].left {
                self.rotate_left(parent);
            } else {
                self.rotate_right(parent);
            }
            sibling = match self.sibling(node, parent) {
                Some(sibling) => sibling,
                None => return,
            };
        }

        let sibling_left = self.color_of(self.nodes[sibling].left);
        let sibling_right = self.color_of(self.nodes[sibling].right);
        if self.nodes[parent].color == Color::Black
            && self.nodes[sibling].color == Color::Black
            && sibling_left == Color::Black
            && sibling_right == Color::Black
        {
            self.nodes[sibling].color = Color::Red;
            let grandparent = self.nodes[parent].parent;
            self.fix_tree_on_delete(Some(parent), grandparent);
            return;
        }

        if self.nodes[parent].color == Color::Red
            && self.nodes[sibling].color == Color::Black
            && sibling_left == Color::Black
            && sibling_right == Color::Black
        {
            self.nodes[sibling].color = Color::Red;
            self.nodes[parent].color = Color::Black;
            return;
        }

        let node_is_left = node == self.nodes[parent].left;
        if node_is_left
            && self.nodes[sibling].color == Color::Black
            && sibling_left == Color::Red
            && sibling_right == Color::Black
        {
            self.nodes[sibling].color = Color::Red;
            if let Some(left) = self.nodes[sibling].left {
                self.nodes[left].color = Color::Black;
            }
            self.rotate_right(sibling);
        } else if !node_is_left
            && self.nodes[sibling].color == Color::Black
            && sibling_right == Color::Red
            && sibling_left == Color::Black
        {
            self.nodes[sibling].color = Color::Red;
            if let Some(right) = self.nodes[sibling].right {
                self.nodes[right].color = Color::Black;
            }
            self.rotate_left(sibling);
        }
        let Some(sibling) = self.sibling(node, parent) else { return };

        self.nodes[sibling].color = self.nodes[parent].color;
        self.nodes[parent].color = Color::Black;
        if node_is_left {
            if let Some(right) = self.nodes[sibling].right {
                self.nodes[right].color = Color::Black;
            }
            self.rotate_left(parent);
        } else {
            if let Some(left) = self.nodes[sibling].left {
                self.nodes[left].color = Color::Black;
            }
            self.rotate_right(parent);
        }
    }

    // ==================== Rotations ====================

    fn replace_node(&mut self, replaced: usize, new: Option<usize>) {
        let parent = self.nodes[replaced].parent;
        match parent {
            None => {
                debug_assert!(new.is_some(), "line tree cannot become empty");
                if let Some(new) = new {
                    self.root = new;
                }
            }
            Some(parent) => {
                if self.nodes[parent].left == Some(replaced) {
                    self.nodes[parent].left = new;
                } else {
                    self.nodes[parent].right = new;
                }
            }
        }
        if let Some(new) = new {
            self.nodes[new].parent = parent;
        }
        self.nodes[replaced].parent = None;
    }

    fn rotate_left(&mut self, p: usize) {
        // p             q
        //  \           /
        //   q   =>    p
        //  /           \
        // x             x
        let Some(q) = self.nodes[p].right else { return };
        self.replace_node(p, Some(q));
        let x = self.nodes[q].left;
        self.nodes[p].right = x;
        if let Some(x) = x {
            self.nodes[x].parent = Some(p);
        }
        self.nodes[q].left = Some(p);
        self.nodes[p].parent = Some(q);
        self.update_after_children_change(p);
    }

    fn rotate_right(&mut self, p: usize) {
        //     p       q
        //    /         \
        //   q    =>     p
        //    \         /
        //     x       x
        let Some(q) = self.nodes[p].left else { return };
        self.replace_node(p, Some(q));
        let x = self.nodes[q].right;
        self.nodes[p].left = x;
        if let Some(x) = x {
            self.nodes[x].parent = Some(p);
        }
        self.nodes[q].right = Some(p);
        self.nodes[p].parent = Some(q);
        self.update_after_children_change(p);
    }

    // ==================== Rebuild ====================

    fn build_tree(&mut self, order: &[usize], start: usize, end: usize, subtree_height: usize) -> Option<usize> {
        if start == end {
            return None;
        }
        let middle = (start + end) / 2;
        let node = order[middle];
        let left = self.build_tree(order, start, middle, subtree_height.saturating_sub(1));
        let right = self.build_tree(order, middle + 1, end, subtree_height.saturating_sub(1));

        self.nodes[node].left = left;
        if let Some(left) = left {
            self.nodes[left].parent = Some(node);
        }
        self.nodes[node].right = right;
        if let Some(right) = right {
            self.nodes[right].parent = Some(node);
        }
        self.nodes[node].parent = None;
        self.nodes[node].color = if subtree_height == 1 {
            Color::Red
        } else {
            Color::Black
        };
        self.recompute_aggregates(node);
        Some(node)
    }

    // ==================== Checks ====================

    // Returns the black height of the subtree.
    fn check_node(&self, idx: usize) -> Result<usize, InvariantViolation> {
        let node = &self.nodes[idx];
        if node.deleted {
            return Err(InvariantViolation(format!("deleted node {idx} is still linked")));
        }
        if node.delimiter_length > 2 || node.delimiter_length > node.total_length {
            return Err(InvariantViolation(format!(
                "node {idx} has delimiter length {} with total length {}",
                node.delimiter_length, node.total_length
            )));
        }
        let left = self.check_child(idx, node.left)?;
        let right = self.check_child(idx, node.right)?;
        if left != right {
            return Err(InvariantViolation(format!(
                "node {idx} has black heights {left} and {right}"
            )));
        }

        let count = 1 + self.subtree_count(node.left) + self.subtree_count(node.right);
        let length = node.total_length + self.subtree_length(node.left) + self.subtree_length(node.right);
        if node.node_total_count != count || node.node_total_length != length {
            return Err(InvariantViolation(format!(
                "node {idx} caches ({}, {}) but its subtree has ({count}, {length})",
                node.node_total_count, node.node_total_length
            )));
        }
        Ok(left + usize::from(node.color == Color::Black))
    }

    fn check_child(&self, parent: usize, child: Option<usize>) -> Result<usize, InvariantViolation> {
        let Some(child) = child else { return Ok(1) };
        if self.nodes[child].parent != Some(parent) {
            return Err(InvariantViolation(format!("node {child} has a wrong parent link")));
        }
        if self.nodes[parent].color == Color::Red && self.nodes[child].color == Color::Red {
            return Err(InvariantViolation(format!("red node {parent} has red child {child}")));
        }
        self.check_node(child)
    }
}

impl Default for LineTree {
    fn default() -> Self {
        Self::new()
    }
}
