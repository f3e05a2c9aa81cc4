//! Change descriptions and offset mapping.
//!
//! ## Learning: Values, Not Callbacks
//!
//! An edit is described by an immutable value: where it happened, what was
//! removed and what was inserted. Everything that has to follow the edit
//! (anchors, line trackers, stale offsets held by other threads) asks that
//! value how an old offset maps to a new one. Inverting the value gives the
//! same edit seen backwards in time, which is all an undo step or a
//! backwards version query needs.
//!
//! `OffsetChangeMap` refines the mapping for edits that are logically several
//! edits, e.g. a replace that should behave like "remove, then insert".

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::source::{SharedText, StringTextSource};
use crate::{BufferError, BufferResult};

/// Where an offset ends up when text is inserted exactly at it, or when the
/// text around it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnchorMovementType {
    /// Use the movement the edit asks for (after the insertion unless the
    /// change map says otherwise)
    #[default]
    Default,
    /// Stay in front of inserted text
    BeforeInsertion,
    /// Move behind inserted text
    AfterInsertion,
}

/// How a replace maps offsets inside the replaced range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OffsetChangeMappingType {
    /// Offsets inside the removed range collapse to the end of the insertion
    /// (or its start, for `BeforeInsertion`)
    #[default]
    Normal,
    /// Behaves like a removal followed by an insertion at the same offset
    RemoveAndInsert,
    /// Offsets are kept character by character; only the trailing difference
    /// in length is treated as an insertion or a removal
    CharacterReplace,
    /// Like `Normal`, but `Default` anchors stay in front of the insertion
    KeepAnchorBeforeInsertion,
}

/// One contiguous remapping region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetChangeMapEntry {
    offset: usize,
    removal_length: usize,
    insertion_length: usize,
    removal_never_causes_anchor_deletion: bool,
    default_anchor_movement_is_before_insertion: bool,
}

impl OffsetChangeMapEntry {
    /// Creates an entry with both flags unset.
    pub const fn new(offset: usize, removal_length: usize, insertion_length: usize) -> Self {
        Self::with_flags(offset, removal_length, insertion_length, false, false)
    }

    /// Creates an entry with explicit flags.
    pub const fn with_flags(
        offset: usize,
        removal_length: usize,
        insertion_length: usize,
        removal_never_causes_anchor_deletion: bool,
        default_anchor_movement_is_before_insertion: bool,
    ) -> Self {
        Self {
            offset,
            removal_length,
            insertion_length,
            removal_never_causes_anchor_deletion,
            default_anchor_movement_is_before_insertion,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn removal_length(&self) -> usize {
        self.removal_length
    }

    pub fn insertion_length(&self) -> usize {
        self.insertion_length
    }

    /// Anchors inside the removed range survive even without their own
    /// survive-deletion flag.
    pub fn removal_never_causes_anchor_deletion(&self) -> bool {
        self.removal_never_causes_anchor_deletion
    }

    /// `AnchorMovementType::Default` resolves to `BeforeInsertion`.
    pub fn default_anchor_movement_is_before_insertion(&self) -> bool {
        self.default_anchor_movement_is_before_insertion
    }

    /// Maps an offset from before this change to after it.
    pub fn get_new_offset(&self, old_offset: usize, movement: AnchorMovementType) -> usize {
        let offset = self.offset;
        let removal = self.removal_length;
        let insertion = self.insertion_length;
        // A pure insertion exactly at old_offset falls through to the
        // movement rules below.
        if !(removal == 0 && old_offset == offset) {
            if old_offset <= offset {
                return old_offset;
            }
            if old_offset >= offset + removal {
                return old_offset + insertion - removal;
            }
        }
        match movement {
            AnchorMovementType::AfterInsertion => offset + insertion,
            AnchorMovementType::BeforeInsertion => offset,
            AnchorMovementType::Default if self.default_anchor_movement_is_before_insertion => offset,
            AnchorMovementType::Default => offset + insertion,
        }
    }

    /// The same region seen backwards in time.
    pub fn invert(&self) -> Self {
        Self {
            removal_length: self.insertion_length,
            insertion_length: self.removal_length,
            ..*self
        }
    }
}

/// An ordered list of remapping regions describing one document change.
///
/// A map can be extended until it is frozen. Maps attached to a change event
/// are always frozen: every subscriber reads the same entries.
#[derive(Debug, Clone, Default)]
pub struct OffsetChangeMap {
    entries: Vec<OffsetChangeMapEntry>,
    frozen: bool,
}

impl OffsetChangeMap {
    /// Creates an empty, extendable map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, extendable map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            frozen: false,
        }
    }

    /// The frozen map without entries: no offset moves.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            frozen: true,
        }
    }

    /// A frozen map with a single entry.
    pub fn from_single_entry(entry: OffsetChangeMapEntry) -> Self {
        Self {
            entries: vec![entry],
            frozen: true,
        }
    }

    /// Builds the map a replace with the given mapping type uses, or `None`
    /// when the change's own default mapping applies.
    pub fn for_replace(
        mapping: OffsetChangeMappingType,
        offset: usize,
        removal_length: usize,
        insertion_length: usize,
    ) -> Option<Self> {
        match mapping {
            OffsetChangeMappingType::Normal => None,
            OffsetChangeMappingType::KeepAnchorBeforeInsertion => {
                Some(Self::from_single_entry(OffsetChangeMapEntry::with_flags(
                    offset,
                    removal_length,
                    insertion_length,
                    false,
                    true,
                )))
            }
            _ if removal_length == 0 || insertion_length == 0 => None,
            OffsetChangeMappingType::RemoveAndInsert => {
                let mut map = Self::with_capacity(2);
                map.entries.push(OffsetChangeMapEntry::new(offset, removal_length, 0));
                map.entries.push(OffsetChangeMapEntry::new(offset, 0, insertion_length));
                map.freeze();
                Some(map)
            }
            OffsetChangeMappingType::CharacterReplace => {
                if insertion_length > removal_length {
                    // grow by replacing the last character
                    Some(Self::from_single_entry(OffsetChangeMapEntry::new(
                        offset + removal_length - 1,
                        1,
                        1 + insertion_length - removal_length,
                    )))
                } else if insertion_length < removal_length {
                    Some(Self::from_single_entry(OffsetChangeMapEntry::with_flags(
                        offset + insertion_length,
                        removal_length - insertion_length,
                        0,
                        true,
                        false,
                    )))
                } else {
                    Some(Self::empty())
                }
            }
        }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: OffsetChangeMapEntry) -> BufferResult<()> {
        if self.frozen {
            return Err(BufferError::FrozenOffsetChangeMap);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Makes the map immutable.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OffsetChangeMapEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OffsetChangeMapEntry> {
        self.entries.iter()
    }

    /// Maps an offset through every entry in order.
    pub fn get_new_offset(&self, offset: usize, movement: AnchorMovementType) -> usize {
        self.entries
            .iter()
            .fold(offset, |offset, entry| entry.get_new_offset(offset, movement))
    }

    /// Checks that the entries describe the change at `offset` that removes
    /// `removal_length` and inserts `insertion_length` characters: every
    /// entry lies inside the part of the change not yet accounted for, and
    /// the accumulated deltas end exactly at the inserted length.
    pub fn is_valid_for_document_change(
        &self,
        offset: usize,
        removal_length: usize,
        insertion_length: usize,
    ) -> bool {
        let mut end_offset = offset + removal_length;
        for entry in &self.entries {
            if entry.offset < offset || entry.offset + entry.removal_length > end_offset {
                return false;
            }
            end_offset = end_offset + entry.insertion_length - entry.removal_length;
        }
        end_offset == offset + insertion_length
    }

    /// The map seen backwards in time: entries reversed, removal and
    /// insertion swapped. The result is not frozen.
    pub fn invert(&self) -> Self {
        Self {
            entries: self.entries.iter().rev().map(OffsetChangeMapEntry::invert).collect(),
            frozen: false,
        }
    }
}

impl FromIterator<OffsetChangeMapEntry> for OffsetChangeMap {
    fn from_iter<T: IntoIterator<Item = OffsetChangeMapEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            frozen: false,
        }
    }
}

impl<'a> IntoIterator for &'a OffsetChangeMap {
    type Item = &'a OffsetChangeMapEntry;
    type IntoIter = std::slice::Iter<'a, OffsetChangeMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A single text change: at `offset`, `removed_text` was replaced by
/// `inserted_text`.
#[derive(Debug, Clone)]
pub struct TextChangeEventArgs {
    offset: usize,
    removed_text: SharedText,
    inserted_text: SharedText,
}

impl TextChangeEventArgs {
    /// Creates a change from shared text snapshots.
    pub fn new(offset: usize, removed_text: SharedText, inserted_text: SharedText) -> Self {
        Self {
            offset,
            removed_text,
            inserted_text,
        }
    }

    /// Creates a change from plain strings.
    pub fn from_strs(offset: usize, removed_text: &str, inserted_text: &str) -> Self {
        Self::new(
            offset,
            StringTextSource::shared(removed_text),
            StringTextSource::shared(inserted_text),
        )
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn removed_text(&self) -> &SharedText {
        &self.removed_text
    }

    pub fn inserted_text(&self) -> &SharedText {
        &self.inserted_text
    }

    pub fn removal_length(&self) -> usize {
        self.removed_text.text_length()
    }

    pub fn insertion_length(&self) -> usize {
        self.inserted_text.text_length()
    }

    /// Maps an offset from before the change to after it. Offsets in
    /// `[offset, offset + removal_length]` collapse to the start of the
    /// insertion for `BeforeInsertion` and to its end otherwise.
    pub fn get_new_offset(&self, offset: usize, movement: AnchorMovementType) -> usize {
        let removal_end = self.offset + self.removal_length();
        if offset >= self.offset && offset <= removal_end {
            if movement == AnchorMovementType::BeforeInsertion {
                self.offset
            } else {
                self.offset + self.insertion_length()
            }
        } else if offset > self.offset {
            offset + self.insertion_length() - self.removal_length()
        } else {
            offset
        }
    }

    /// The change seen backwards in time.
    pub fn invert(&self) -> Self {
        Self::new(self.offset, self.inserted_text.clone(), self.removed_text.clone())
    }
}

/// A document change together with its optional offset change map.
#[derive(Debug, Clone)]
pub struct DocumentChangeEventArgs {
    change: TextChangeEventArgs,
    offset_change_map: Option<Arc<OffsetChangeMap>>,
}

impl DocumentChangeEventArgs {
    /// Creates the event, validating and freezing `offset_change_map`.
    pub fn new(
        offset: usize,
        removed_text: SharedText,
        inserted_text: SharedText,
        offset_change_map: Option<OffsetChangeMap>,
    ) -> BufferResult<Self> {
        let change = TextChangeEventArgs::new(offset, removed_text, inserted_text);
        let offset_change_map = match offset_change_map {
            Some(mut map) => {
                let removal_length = change.removal_length();
                let insertion_length = change.insertion_length();
                if !map.is_valid_for_document_change(offset, removal_length, insertion_length) {
                    return Err(BufferError::InvalidOffsetChangeMap {
                        offset,
                        removal_length,
                        insertion_length,
                    });
                }
                map.freeze();
                Some(Arc::new(map))
            }
            None => None,
        };
        Ok(Self {
            change,
            offset_change_map,
        })
    }

    /// Creates the event from plain strings.
    pub fn from_strs(
        offset: usize,
        removed_text: &str,
        inserted_text: &str,
        offset_change_map: Option<OffsetChangeMap>,
    ) -> BufferResult<Self> {
        Self::new(
            offset,
            StringTextSource::shared(removed_text),
            StringTextSource::shared(inserted_text),
            offset_change_map,
        )
    }

    /// The underlying text change.
    pub fn as_text_change(&self) -> &TextChangeEventArgs {
        &self.change
    }

    pub fn offset(&self) -> usize {
        self.change.offset
    }

    pub fn removed_text(&self) -> &SharedText {
        &self.change.removed_text
    }

    pub fn inserted_text(&self) -> &SharedText {
        &self.change.inserted_text
    }

    pub fn removal_length(&self) -> usize {
        self.change.removal_length()
    }

    pub fn insertion_length(&self) -> usize {
        self.change.insertion_length()
    }

    /// The attached map, if the change was made with one.
    pub fn offset_change_map_or_none(&self) -> Option<&Arc<OffsetChangeMap>> {
        self.offset_change_map.as_ref()
    }

    /// The attached map, or a single-entry map describing the change.
    pub fn offset_change_map(&self) -> Arc<OffsetChangeMap> {
        match &self.offset_change_map {
            Some(map) => Arc::clone(map),
            None => Arc::new(OffsetChangeMap::from_single_entry(
                self.create_single_change_map_entry(),
            )),
        }
    }

    /// A map entry covering the whole change.
    pub fn create_single_change_map_entry(&self) -> OffsetChangeMapEntry {
        OffsetChangeMapEntry::new(self.offset(), self.removal_length(), self.insertion_length())
    }

    /// Maps an offset through the attached map, or through the plain change
    /// when there is none.
    pub fn get_new_offset(&self, offset: usize, movement: AnchorMovementType) -> usize {
        match &self.offset_change_map {
            Some(map) => map.get_new_offset(offset, movement),
            None => self.change.get_new_offset(offset, movement),
        }
    }

    /// The change seen backwards in time, with the map inverted as well.
    pub fn invert(&self) -> Self {
        let offset_change_map = self.offset_change_map.as_ref().map(|map| {
            let mut inverted = map.invert();
            inverted.freeze();
            Arc::new(inverted)
        });
        let change = self.change.invert();
        debug_assert!(offset_change_map.as_ref().is_none_or(|map| map.is_valid_for_document_change(
            change.offset,
            change.removal_length(),
            change.insertion_length()
        )));
        Self {
            change,
            offset_change_map,
        }
    }
}
