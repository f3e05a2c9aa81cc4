//! The document.
//!
//! ## Learning: Composition over Inheritance
//!
//! `Document` composes the pieces of this crate and the buffer crate: a
//! `TextBuffer` for the characters, a `LineTree` for line structure, an
//! anchor store, a version chain and one observer list per event. Every
//! edit goes through `replace`, which keeps all of them in step.
//!
//! ## Learning: Update Groups
//!
//! Edits are grouped with `begin_update`/`end_update` (or `run_update`).
//! `changing`/`changed` fire for each edit; `text_changed` and the property
//! notifications fire once, when the outermost group ends. A single edit
//! outside a group is wrapped in one implicitly.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use quire_buffer::{
    AnchorMovementType, DocumentChangeEventArgs, NewLine, NewLineIter, OffsetChangeMap,
    OffsetChangeMappingType, RopeTextSource, Segment, SharedText, StringTextSource, TextBuffer,
    TextLocation, TextSource, Version, VersionProvider,
};
use ropey::Rope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::{AnchorStore, TextAnchor};
use crate::config::DocumentConfig;
use crate::event::{DocumentProperty, EventList, ObserverList};
use crate::line::DocumentLine;
use crate::line_manager::LineManager;
use crate::line_tracker::{LineTracker, LineTrackerHandle};
use crate::line_tree::{LineId, LineTree};
use crate::{DocumentError, DocumentResult, InvariantViolation};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe source of snapshots of one document.
///
/// ## Learning: Sharing Across Threads
///
/// `Document` itself is single-threaded. A `SnapshotSource` is the part that
/// may travel: it holds the latest published rope and version behind a
/// mutex, and because `Rope` clones are O(1), taking a snapshot only holds
/// the lock for a pointer copy.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    latest: Arc<Mutex<(Rope, Version)>>,
}

impl SnapshotSource {
    fn new(rope: Rope, version: Version) -> Self {
        Self {
            latest: Arc::new(Mutex::new((rope, version))),
        }
    }

    /// Snapshot of the text as of the last completed edit.
    pub fn create_snapshot(&self) -> RopeTextSource {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        RopeTextSource::with_version(latest.0.clone(), latest.1.clone())
    }

    /// Version of the last completed edit.
    pub fn version(&self) -> Version {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.1.clone()
    }

    pub(crate) fn publish(&self, rope: Rope, version: Version) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = (rope, version);
    }
}

/// A text document with line structure, anchors, versions and change
/// notifications.
///
/// # Thread Safety
///
/// A document belongs to the thread that created it. Its observer lists
/// hold `Rc`s, so `Document` is neither `Send` nor `Sync` and handing it to
/// another thread does not compile:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<quire_core::Document>();
/// ```
///
/// Readers on other threads go through a [`SnapshotSource`].
pub struct Document {
    id: DocumentId,
    config: DocumentConfig,
    buffer: TextBuffer,
    lines: LineTree,
    anchors: AnchorStore,
    versions: VersionProvider,
    snapshots: SnapshotSource,
    trackers: ObserverList<RefCell<dyn LineTracker>>,

    update_depth: usize,
    in_document_changing: bool,
    fire_text_changed: bool,
    old_text_length: usize,
    old_line_count: usize,

    changing: EventList<DocumentChangeEventArgs>,
    changed: EventList<DocumentChangeEventArgs>,
    text_changed: EventList<()>,
    property_changed: EventList<DocumentProperty>,
    update_started: EventList<()>,
    update_finished: EventList<()>,
    anchor_deleted: EventList<TextAnchor>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::with_config("", DocumentConfig::default())
    }

    /// Creates a document holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self::with_config(text, DocumentConfig::default())
    }

    /// Creates a document holding `text` with the given configuration.
    pub fn with_config(text: &str, config: DocumentConfig) -> Self {
        let buffer = TextBuffer::from(text);
        let mut lines = LineTree::new();
        LineManager::new(&mut lines, &buffer, &[]).rebuild();
        let versions = VersionProvider::new();
        let snapshots = SnapshotSource::new(buffer.snapshot(), versions.current_version());
        let old_text_length = buffer.len_chars();
        let old_line_count = lines.line_count();

        Self {
            id: DocumentId::new(),
            config,
            buffer,
            lines,
            anchors: AnchorStore::new(),
            versions,
            snapshots,
            trackers: ObserverList::new(),
            update_depth: 0,
            in_document_changing: false,
            fire_text_changed: false,
            old_text_length,
            old_line_count,
            changing: EventList::new(),
            changed: EventList::new(),
            text_changed: EventList::new(),
            property_changed: EventList::new(),
            update_started: EventList::new(),
            update_finished: EventList::new(),
            anchor_deleted: EventList::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// The underlying buffer, for read access to the rope.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    // Events

    /// Fires before each edit is applied. Handlers see the old text.
    pub fn changing(&self) -> &EventList<DocumentChangeEventArgs> {
        &self.changing
    }

    /// Fires after each edit, once lines, anchors and trackers are updated.
    pub fn changed(&self) -> &EventList<DocumentChangeEventArgs> {
        &self.changed
    }

    /// Fires once at the end of an update group that changed the text.
    pub fn text_changed(&self) -> &EventList<()> {
        &self.text_changed
    }

    /// Fires at the end of an update group for each property that changed.
    pub fn property_changed(&self) -> &EventList<DocumentProperty> {
        &self.property_changed
    }

    pub fn update_started(&self) -> &EventList<()> {
        &self.update_started
    }

    pub fn update_finished(&self) -> &EventList<()> {
        &self.update_finished
    }

    /// Fires for each anchor deleted by an edit, after the edit is applied.
    pub fn anchor_deleted(&self) -> &EventList<TextAnchor> {
        &self.anchor_deleted
    }

    // Text

    /// The whole text.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Replaces the whole text. The line tree is rebuilt.
    pub fn set_text(&mut self, text: &str) -> DocumentResult<()> {
        self.replace(0, self.buffer.len_chars(), text)
    }

    pub fn text_length(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    pub fn char_at(&self, offset: usize) -> DocumentResult<char> {
        Ok(self.buffer.char_at(offset)?)
    }

    pub fn text_range(&self, offset: usize, length: usize) -> DocumentResult<String> {
        Ok(self.buffer.text_range(offset, length)?)
    }

    pub fn text_segment(&self, segment: &dyn Segment) -> DocumentResult<String> {
        self.text_range(segment.offset(), segment.length())
    }

    // UTF-16
    //
    // Offsets count chars. Hosts that address text in UTF-16 code units
    // convert at the boundary.

    /// Length of the text in UTF-16 code units.
    pub fn utf16_length(&self) -> usize {
        self.buffer.len_utf16()
    }

    /// The UTF-16 code unit offset of the char offset `offset`.
    pub fn utf16_offset(&self, offset: usize) -> DocumentResult<usize> {
        Ok(self.buffer.char_to_utf16(offset)?)
    }

    /// The char offset of a UTF-16 code unit offset. An offset inside a
    /// surrogate pair resolves to the char the pair encodes.
    pub fn offset_from_utf16(&self, utf16_offset: usize) -> DocumentResult<usize> {
        Ok(self.buffer.utf16_to_char(utf16_offset)?)
    }

    // Editing

    /// Inserts `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> DocumentResult<()> {
        self.replace(offset, 0, text)
    }

    /// Inserts `text` at `offset`. With `BeforeInsertion`, anchors with
    /// default movement at `offset` stay in front of the new text.
    pub fn insert_with_movement(
        &mut self,
        offset: usize,
        text: &str,
        movement: AnchorMovementType,
    ) -> DocumentResult<()> {
        let mapping = match movement {
            AnchorMovementType::BeforeInsertion => OffsetChangeMappingType::KeepAnchorBeforeInsertion,
            _ => OffsetChangeMappingType::Normal,
        };
        self.replace_with_mapping(offset, 0, text, mapping)
    }

    /// Removes `length` characters at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> DocumentResult<()> {
        self.replace(offset, length, "")
    }

    /// Replaces `length` characters at `offset` with `text`.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> DocumentResult<()> {
        self.replace_shared(offset, length, StringTextSource::shared(text), None)
    }

    /// Replaces text, remapping offsets inside the change as `mapping` says.
    pub fn replace_with_mapping(
        &mut self,
        offset: usize,
        length: usize,
        text: &str,
        mapping: OffsetChangeMappingType,
    ) -> DocumentResult<()> {
        let map = OffsetChangeMap::for_replace(mapping, offset, length, text.chars().count());
        self.replace_shared(offset, length, StringTextSource::shared(text), map)
    }

    /// Replaces text, remapping offsets inside the change through `map`.
    /// The map must describe exactly this change.
    pub fn replace_with_map(
        &mut self,
        offset: usize,
        length: usize,
        text: &str,
        map: OffsetChangeMap,
    ) -> DocumentResult<()> {
        self.replace_shared(offset, length, StringTextSource::shared(text), Some(map))
    }

    /// Replaces text with the contents of another text source. The source is
    /// snapshotted first, so later changes to it don't leak into the
    /// document's history.
    pub fn replace_source(
        &mut self,
        offset: usize,
        length: usize,
        text: &dyn TextSource,
        map: Option<OffsetChangeMap>,
    ) -> DocumentResult<()> {
        self.replace_shared(offset, length, text.create_snapshot(), map)
    }

    fn replace_shared(
        &mut self,
        offset: usize,
        length: usize,
        text: SharedText,
        map: Option<OffsetChangeMap>,
    ) -> DocumentResult<()> {
        self.begin_update()?;
        self.in_document_changing = true;
        let result = self
            .buffer
            .check_range(offset, length)
            .map_err(DocumentError::from)
            .and_then(|()| self.do_replace(offset, length, text, map));
        self.in_document_changing = false;
        let ended = self.end_update();
        result.and(ended)
    }

    fn do_replace(
        &mut self,
        offset: usize,
        length: usize,
        inserted: SharedText,
        map: Option<OffsetChangeMap>,
    ) -> DocumentResult<()> {
        let insertion_length = inserted.text_length();
        if length == 0 && insertion_length == 0 {
            return Ok(());
        }

        // a plain one-for-one character replace leaves every anchor in place
        let map = match map {
            None if length == 1 && insertion_length == 1 => Some(OffsetChangeMap::empty()),
            map => map,
        };

        let removed: SharedText = if length == 0 {
            StringTextSource::shared("")
        } else if length < self.config.removed_text_copy_threshold {
            StringTextSource::shared(self.buffer.text_range(offset, length)?)
        } else {
            Arc::new(RopeTextSource::new(self.buffer.slice_rope(offset, length)?))
        };
        let args = Arc::new(DocumentChangeEventArgs::new(
            offset,
            removed,
            Arc::clone(&inserted),
            map,
        )?);
        tracing::trace!(offset, removed = length, inserted = insertion_length, "replacing text");

        self.changing.emit(self, &args);
        self.fire_text_changed = true;
        self.versions.append_change(Arc::clone(&args));

        let trackers = self.trackers.snapshot();
        if offset == 0 && length == self.buffer.len_chars() {
            self.buffer.clear();
            self.insert_into_buffer(0, &*inserted)?;
            LineManager::new(&mut self.lines, &self.buffer, &trackers).rebuild();
        } else {
            self.buffer.remove_range(offset, length)?;
            LineManager::new(&mut self.lines, &self.buffer, &trackers).remove(offset, length)?;
            self.insert_into_buffer(offset, &*inserted)?;
            LineManager::new(&mut self.lines, &self.buffer, &trackers).insert(offset, insertion_length)?;
        }
        self.snapshots
            .publish(self.buffer.snapshot(), self.versions.current_version());

        let mut deleted = Vec::new();
        match args.offset_change_map_or_none() {
            None => self.anchors.apply(&args.create_single_change_map_entry(), &mut deleted),
            Some(map) => {
                for entry in map.iter() {
                    self.anchors.apply(entry, &mut deleted);
                }
            }
        }

        if self.config.check_invariants {
            if let Err(violation) = self.check_invariants() {
                panic!("{violation}");
            }
        }

        LineManager::new(&mut self.lines, &self.buffer, &trackers).change_complete(&args);
        for anchor in &deleted {
            self.anchor_deleted.emit(self, anchor);
        }
        self.changed.emit(self, &args);
        Ok(())
    }

    fn insert_into_buffer(&mut self, offset: usize, text: &dyn TextSource) -> DocumentResult<()> {
        match text.as_rope() {
            Some(rope) => self.buffer.insert_rope(offset, rope)?,
            None => self.buffer.insert_text(offset, &text.text())?,
        }
        Ok(())
    }

    // Update groups

    /// Starts an update group. Groups nest.
    pub fn begin_update(&mut self) -> DocumentResult<()> {
        if self.in_document_changing {
            return Err(DocumentError::ChangeDuringChange);
        }
        self.update_depth += 1;
        if self.update_depth == 1 {
            self.update_started.emit(self, &());
        }
        Ok(())
    }

    /// Ends an update group. Ending the outermost group fires the coalesced
    /// change notifications.
    pub fn end_update(&mut self) -> DocumentResult<()> {
        if self.in_document_changing {
            return Err(DocumentError::EndUpdateDuringChange);
        }
        match self.update_depth {
            0 => Err(DocumentError::NoUpdateActive),
            1 => {
                self.fire_change_events();
                self.update_depth = 0;
                self.update_finished.emit(self, &());
                Ok(())
            }
            _ => {
                self.update_depth -= 1;
                Ok(())
            }
        }
    }

    /// Runs `f` inside an update group. The group is ended even when `f`
    /// fails.
    pub fn run_update<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> DocumentResult<R>,
    ) -> DocumentResult<R> {
        self.begin_update()?;
        let result = f(self);
        let ended = self.end_update();
        result.and_then(|value| ended.map(|()| value))
    }

    pub fn is_in_update(&self) -> bool {
        self.update_depth > 0
    }

    fn fire_change_events(&mut self) {
        if !self.fire_text_changed {
            return;
        }
        self.fire_text_changed = false;
        self.text_changed.emit(self, &());
        self.property_changed.emit(self, &DocumentProperty::Text);

        let text_length = self.text_length();
        if text_length != self.old_text_length {
            self.old_text_length = text_length;
            self.property_changed.emit(self, &DocumentProperty::TextLength);
        }
        let line_count = self.line_count();
        if line_count != self.old_line_count {
            self.old_line_count = line_count;
            self.property_changed.emit(self, &DocumentProperty::LineCount);
        }
        tracing::debug!(document = %self.id, text_length, line_count, "update finished");
    }

    // Lines

    pub fn line_tree(&self) -> &LineTree {
        &self.lines
    }

    /// The line with the given 1-based number.
    pub fn line_by_number(&self, number: usize) -> DocumentResult<DocumentLine<'_>> {
        self.lines.get_by_number(number)
    }

    /// The line containing `offset`.
    pub fn line_by_offset(&self, offset: usize) -> DocumentResult<DocumentLine<'_>> {
        self.lines.get_by_offset(offset)
    }

    /// The line behind a handle, or `LineDeleted`.
    pub fn line(&self, id: LineId) -> DocumentResult<DocumentLine<'_>> {
        self.lines.line(id)
    }

    pub fn lines(&self) -> impl Iterator<Item = DocumentLine<'_>> + '_ {
        self.lines.lines()
    }

    pub fn is_line_deleted(&self, id: LineId) -> bool {
        !self.lines.contains(id)
    }

    pub fn offset_of_line(&self, id: LineId) -> DocumentResult<usize> {
        self.lines.offset_of(id)
    }

    /// Offset of a 1-based line and column. Column 0 means the start of
    /// the line; columns past the end clamp to the end of the line.
    pub fn offset_of(&self, line: usize, column: usize) -> DocumentResult<usize> {
        let line = self.line_by_number(line)?;
        Ok(if column == 0 {
            line.offset()
        } else if column > line.length() {
            line.end_offset()
        } else {
            line.offset() + column - 1
        })
    }

    pub fn offset_of_location(&self, location: TextLocation) -> DocumentResult<usize> {
        self.offset_of(location.line, location.column)
    }

    /// Line and column of `offset`.
    pub fn location(&self, offset: usize) -> DocumentResult<TextLocation> {
        let line = self.line_by_offset(offset)?;
        Ok(TextLocation::new(line.line_number(), offset - line.offset() + 1))
    }

    /// Delimiter to use when adding a line after line `number`: the line's
    /// own delimiter, the previous line's for the last line, or the
    /// configured default.
    pub fn newline_for_line(&self, number: usize) -> DocumentResult<NewLine> {
        let mut line = self.line_by_number(number)?;
        if line.delimiter_length() == 0 {
            match line.previous_line() {
                Some(previous) => line = previous,
                None => return Ok(self.config.default_newline),
            }
        }
        let delimiter = self.text_range(line.end_offset(), line.delimiter_length())?;
        Ok(NewLine::from_delimiter(&delimiter).unwrap_or(self.config.default_newline))
    }

    // Versions

    pub fn version(&self) -> Version {
        self.versions.current_version()
    }

    /// O(1) snapshot of the whole text, tagged with the current version.
    pub fn create_snapshot(&self) -> RopeTextSource {
        RopeTextSource::with_version(self.buffer.snapshot(), self.version())
    }

    /// Snapshot of a range. Range snapshots carry no version.
    pub fn create_snapshot_range(&self, offset: usize, length: usize) -> DocumentResult<RopeTextSource> {
        Ok(RopeTextSource::new(self.buffer.slice_rope(offset, length)?))
    }

    /// A handle other threads can take snapshots from.
    pub fn snapshot_source(&self) -> SnapshotSource {
        self.snapshots.clone()
    }

    // Line trackers

    /// Registers a line tracker. It is notified of every structural change
    /// until the returned handle is dropped.
    pub fn add_line_tracker<T: LineTracker + 'static>(&self, tracker: Rc<RefCell<T>>) -> LineTrackerHandle {
        let subscription = self.trackers.add(tracker);
        tracing::debug!(document = %self.id, trackers = self.trackers.len(), "line tracker added");
        LineTrackerHandle::new(subscription)
    }

    // Anchors

    /// Creates an anchor at `offset` with default movement that is deleted
    /// when the text around it is removed.
    pub fn create_anchor(&mut self, offset: usize) -> DocumentResult<TextAnchor> {
        self.create_anchor_with(offset, AnchorMovementType::Default, false)
    }

    pub fn create_anchor_with(
        &mut self,
        offset: usize,
        movement: AnchorMovementType,
        survive_deletion: bool,
    ) -> DocumentResult<TextAnchor> {
        self.buffer.check_offset(offset)?;
        Ok(self.anchors.create(offset, movement, survive_deletion))
    }

    pub fn anchor_offset(&self, anchor: TextAnchor) -> DocumentResult<usize> {
        self.anchors.offset(anchor)
    }

    pub fn anchor_location(&self, anchor: TextAnchor) -> DocumentResult<TextLocation> {
        self.location(self.anchor_offset(anchor)?)
    }

    /// The line the anchor is on.
    pub fn anchor_line(&self, anchor: TextAnchor) -> DocumentResult<DocumentLine<'_>> {
        self.line_by_offset(self.anchor_offset(anchor)?)
    }

    pub fn anchor_is_deleted(&self, anchor: TextAnchor) -> bool {
        self.anchors.is_deleted(anchor)
    }

    pub fn anchor_movement(&self, anchor: TextAnchor) -> DocumentResult<AnchorMovementType> {
        self.anchors.movement(anchor)
    }

    pub fn anchor_survives_deletion(&self, anchor: TextAnchor) -> DocumentResult<bool> {
        self.anchors.survive_deletion(anchor)
    }

    pub fn set_anchor_movement(
        &mut self,
        anchor: TextAnchor,
        movement: AnchorMovementType,
    ) -> DocumentResult<()> {
        self.anchors.set_movement(anchor, movement)
    }

    pub fn set_anchor_survive_deletion(&mut self, anchor: TextAnchor, survive_deletion: bool) -> DocumentResult<()> {
        self.anchors.set_survive_deletion(anchor, survive_deletion)
    }

    /// Drops an anchor. No `anchor_deleted` event fires.
    pub fn remove_anchor(&mut self, anchor: TextAnchor) -> DocumentResult<()> {
        self.anchors.remove(anchor)
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    // Checks

    /// Verifies the line tree against the buffer and the anchor order.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.lines.check_properties()?;

        let text_length = self.buffer.len_chars();
        if self.lines.text_length() != text_length {
            return Err(InvariantViolation(format!(
                "line tree covers {} characters, buffer has {text_length}",
                self.lines.text_length()
            )));
        }

        let mut expected = Vec::new();
        let mut last_delimiter_end = 0;
        for delimiter in NewLineIter::new(self.buffer.rope().chars(), 0) {
            let end = delimiter.offset + delimiter.length;
            expected.push((end - last_delimiter_end, delimiter.length));
            last_delimiter_end = end;
        }
        expected.push((text_length - last_delimiter_end, 0));
        let actual: Vec<_> = self
            .lines
            .lines()
            .map(|line| (line.total_length(), line.delimiter_length()))
            .collect();
        if actual != expected {
            return Err(InvariantViolation(format!(
                "line lengths {actual:?} do not match the text, expected {expected:?}"
            )));
        }

        self.anchors.check_properties()?;
        if let Some(offset) = self.anchors.last_offset().filter(|&offset| offset > text_length) {
            return Err(InvariantViolation(format!(
                "anchor at {offset} is past the end of the text ({text_length})"
            )));
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("text_length", &self.text_length())
            .field("line_count", &self.line_count())
            .field("version", &self.version())
            .field("update_depth", &self.update_depth)
            .finish()
    }
}

impl TextSource for Document {
    fn text_length(&self) -> usize {
        self.buffer.len_chars()
    }

    fn char_at(&self, offset: usize) -> quire_buffer::BufferResult<char> {
        self.buffer.char_at(offset)
    }

    fn text(&self) -> String {
        self.buffer.text()
    }

    fn text_range(&self, offset: usize, length: usize) -> quire_buffer::BufferResult<String> {
        self.buffer.text_range(offset, length)
    }

    fn chars_in(
        &self,
        offset: usize,
        count: usize,
    ) -> quire_buffer::BufferResult<Box<dyn Iterator<Item = char> + '_>> {
        self.buffer.chars_in(offset, count)
    }

    fn version(&self) -> Option<Version> {
        Some(self.versions.current_version())
    }

    fn create_snapshot(&self) -> SharedText {
        Arc::new(Document::create_snapshot(self))
    }

    fn as_rope(&self) -> Option<&Rope> {
        Some(self.buffer.rope())
    }

    fn last_index_of_char(
        &self,
        c: char,
        start: usize,
        count: usize,
    ) -> quire_buffer::BufferResult<Option<usize>> {
        self.buffer.last_index_of_char(c, start, count)
    }

    fn index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: quire_buffer::StringComparison,
    ) -> quire_buffer::BufferResult<Option<usize>> {
        self.buffer.index_of_str(pattern, start, count, comparison)
    }

    fn last_index_of_str(
        &self,
        pattern: &str,
        start: usize,
        count: usize,
        comparison: quire_buffer::StringComparison,
    ) -> quire_buffer::BufferResult<Option<usize>> {
        self.buffer.last_index_of_str(pattern, start, count, comparison)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Edit {
        Insert(usize, String),
        Remove(usize, usize),
        Replace(usize, usize, String),
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(prop_oneof![Just('a'), Just('b'), Just('\r'), Just('\n'), Just('é')], 0..8)
            .prop_map(|chars| chars.into_iter().collect())
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (any::<usize>(), text_strategy()).prop_map(|(offset, text)| Edit::Insert(offset, text)),
            (any::<usize>(), 0usize..6).prop_map(|(offset, length)| Edit::Remove(offset, length)),
            (any::<usize>(), 0usize..6, text_strategy())
                .prop_map(|(offset, length, text)| Edit::Replace(offset, length, text)),
        ]
    }

    proptest! {
        #[test]
        fn edits_match_string_model(
            initial in text_strategy(),
            edits in proptest::collection::vec(edit_strategy(), 1..30),
        ) {
            let config = DocumentConfig {
                check_invariants: true,
                ..DocumentConfig::default()
            };
            let mut document = Document::with_config(&initial, config);
            let mut model: Vec<char> = initial.chars().collect();

            for edit in edits {
                let (offset, length, text) = match edit {
                    Edit::Insert(offset, text) => (offset % (model.len() + 1), 0, text),
                    Edit::Remove(offset, length) | Edit::Replace(offset, length, _) if model.is_empty() => {
                        let _ = (offset, length);
                        (0, 0, String::new())
                    }
                    Edit::Remove(offset, length) => {
                        let offset = offset % (model.len() + 1);
                        (offset, length.min(model.len() - offset), String::new())
                    }
                    Edit::Replace(offset, length, text) => {
                        let offset = offset % (model.len() + 1);
                        (offset, length.min(model.len() - offset), text)
                    }
                };
                document.replace(offset, length, &text).unwrap();
                let _removed: Vec<char> = model.splice(offset..offset + length, text.chars()).collect();

                prop_assert_eq!(document.text(), model.iter().collect::<String>());
                prop_assert!(document.check_invariants().is_ok());
            }

            for offset in 0..=document.text_length() {
                // the position between \r and \n has no column of its own
                if offset > 0 && model.get(offset - 1) == Some(&'\r') && model.get(offset) == Some(&'\n') {
                    continue;
                }
                let location = document.location(offset).unwrap();
                prop_assert_eq!(document.offset_of_location(location).unwrap(), offset);
            }
        }
    }
}
