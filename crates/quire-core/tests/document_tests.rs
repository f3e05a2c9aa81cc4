//! End-to-end tests of the document model through its public API.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use quire_buffer::{
    AnchorMovementType, DocumentChangeEventArgs, OffsetChangeMap, OffsetChangeMapEntry,
    OffsetChangeMappingType, TextLocation, TextSource,
};
use quire_core::{Document, DocumentConfig, DocumentLine, DocumentProperty, LineTracker};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Set `RUST_LOG=trace`
/// to see every edit.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn checked(text: &str) -> Document {
    let config = DocumentConfig {
        check_invariants: true,
        ..DocumentConfig::default()
    };
    Document::with_config(text, config)
}

/// Keeps one counter per line, the way a folding or highlighting layer
/// would.
#[derive(Default)]
struct LineCounters {
    counters: Vec<u32>,
}

impl LineTracker for LineCounters {
    fn before_remove_line(&mut self, line: DocumentLine<'_>) {
        self.counters.remove(line.line_number() - 1);
    }

    fn line_inserted(&mut self, inserted_after: DocumentLine<'_>, _new_line: DocumentLine<'_>) {
        self.counters.insert(inserted_after.line_number(), 0);
    }

    fn change_complete(&mut self, _change: &DocumentChangeEventArgs) {
        self.counters.iter_mut().for_each(|counter| *counter += 1);
    }
}

#[test]
fn test_editing_session() {
    init_tracing();
    let mut document = checked("fn main() {\n}\n");
    let body = document.create_anchor(12).unwrap();

    document
        .run_update(|doc| {
            doc.insert(12, "    println!(\"hi\");\n")?;
            doc.insert(0, "// demo\n")
        })
        .unwrap();

    assert_eq!(
        document.text(),
        "// demo\nfn main() {\n    println!(\"hi\");\n}\n"
    );
    assert_eq!(document.line_count(), 5);
    assert_eq!(
        document.anchor_location(body).unwrap(),
        TextLocation::new(4, 1)
    );
    tracing::info!(lines = document.line_count(), "session finished");
}

#[test]
fn test_line_tracker_follows_structure() {
    init_tracing();
    let mut document = checked("a\nb\nc");
    let tracker = Rc::new(RefCell::new(LineCounters {
        counters: vec![0; 3],
    }));
    let _handle = document.add_line_tracker(Rc::clone(&tracker));

    document.insert(1, "\nx").unwrap();
    assert_eq!(tracker.borrow().counters.len(), document.line_count());

    document.remove(0, 4).unwrap();
    assert_eq!(tracker.borrow().counters.len(), document.line_count());
}

#[test]
fn test_property_notifications_per_update() {
    init_tracing();
    let mut document = checked("one");
    let properties = Rc::new(RefCell::new(Vec::new()));
    let p = Rc::clone(&properties);
    let _subscription = document
        .property_changed()
        .subscribe(move |_, property| p.borrow_mut().push(*property));

    document.begin_update().unwrap();
    document.insert(3, "\ntwo").unwrap();
    document.remove(3, 4).unwrap();
    assert!(properties.borrow().is_empty());
    document.end_update().unwrap();

    // the text came back to the same length and line count
    assert_eq!(*properties.borrow(), vec![DocumentProperty::Text]);
}

#[test]
fn test_remove_and_insert_mapping() {
    init_tracing();
    let mut document = checked("0123456789");
    let inside = document
        .create_anchor_with(5, AnchorMovementType::Default, true)
        .unwrap();
    let after = document.create_anchor(8).unwrap();

    document
        .replace_with_mapping(4, 3, "abcde", OffsetChangeMappingType::RemoveAndInsert)
        .unwrap();

    assert_eq!(document.text(), "0123abcde789");
    assert_eq!(document.anchor_offset(inside).unwrap(), 9);
    assert_eq!(document.anchor_offset(after).unwrap(), 10);
}

#[test]
fn test_custom_offset_change_map() {
    init_tracing();
    let mut document = checked("abcdef");
    let anchor = document.create_anchor(4).unwrap();

    // "cd" -> "cyz": the "c" is kept and only "d" is replaced
    let map: OffsetChangeMap = [OffsetChangeMapEntry::new(3, 1, 2)].into_iter().collect();
    document.replace_with_map(2, 2, "cyz", map).unwrap();

    assert_eq!(document.text(), "abcyzef");
    assert_eq!(document.anchor_offset(anchor).unwrap(), 5);
}

#[test]
fn test_snapshot_source_crosses_threads() {
    init_tracing();
    let mut document = checked("shared");
    let source = document.snapshot_source();
    document.insert(6, " text").unwrap();
    let text = std::thread::spawn(move || source.create_snapshot().text())
        .join()
        .unwrap();
    assert_eq!(text, "shared text");
}

/// Replays edits on a char model and follows the given original offsets.
/// An offset is dropped once an edit touches it: inside the removed range
/// or at either of its ends.
fn follow_offsets(
    model: &mut Vec<char>,
    tracked: &mut Vec<(usize, Option<usize>)>,
    offset: usize,
    length: usize,
    text: &str,
) {
    let insertion = text.chars().count();
    model.splice(offset..offset + length, text.chars());
    for (_, current) in tracked.iter_mut() {
        *current = match *current {
            Some(position) if position < offset => Some(position),
            Some(position) if position > offset + length => Some(position + insertion - length),
            _ => None,
        };
    }
}

proptest! {
    #[test]
    fn versions_translate_unaffected_offsets(
        edits in proptest::collection::vec((0usize..60, 0usize..4, "[ab\n]{0,4}"), 1..10),
        probes in proptest::collection::vec(0usize..43, 1..8),
    ) {
        init_tracing();
        let mut document = checked("the quick brown fox\njumps over\nthe lazy dog");
        let v0 = document.version();
        let original: Vec<char> = document.text().chars().collect();
        let mut model = original.clone();
        let mut tracked: Vec<(usize, Option<usize>)> =
            probes.iter().map(|&offset| (offset, Some(offset))).collect();
        let mut change_count = 0;

        for (offset, length, text) in edits {
            let offset = offset % (model.len() + 1);
            let length = length.min(model.len() - offset);
            document.replace(offset, length, &text).unwrap();
            follow_offsets(&mut model, &mut tracked, offset, length, &text);
            if length > 0 || !text.is_empty() {
                change_count += 1;
            }
        }
        prop_assert_eq!(document.text(), model.iter().collect::<String>());

        let end = document.version();
        prop_assert_eq!(v0.changes_to(&end).unwrap().len(), change_count);
        prop_assert_eq!(end.changes_to(&v0).unwrap().len(), change_count);

        for (old_offset, current) in tracked {
            let Some(expected) = current else { continue };
            for movement in [
                AnchorMovementType::Default,
                AnchorMovementType::BeforeInsertion,
                AnchorMovementType::AfterInsertion,
            ] {
                let moved = v0.move_offset_to(&end, old_offset, movement).unwrap();
                prop_assert_eq!(moved, expected);
                prop_assert_eq!(end.move_offset_to(&v0, moved, movement).unwrap(), old_offset);
            }
            // the character the offset pointed at is still in front of it
            prop_assert_eq!(model.get(expected), original.get(old_offset));
        }
    }

    #[test]
    fn versions_translate_the_end_of_the_document(
        edits in proptest::collection::vec((0usize..40, 0usize..4, "[ab\n]{0,4}"), 1..10),
    ) {
        init_tracing();
        let mut document = checked("the quick brown fox\njumps over\nthe lazy dog");
        let v0 = document.version();
        let length0 = document.text_length();
        let marker = document
            .create_anchor_with(length0, AnchorMovementType::Default, true)
            .unwrap();

        for (offset, length, text) in edits {
            let offset = offset % (document.text_length() + 1);
            let length = length.min(document.text_length() - offset);
            document.replace(offset, length, &text).unwrap();
        }

        let end = document.version();
        let moved = v0
            .move_offset_to(&end, length0, AnchorMovementType::Default)
            .unwrap();
        prop_assert_eq!(moved, document.anchor_offset(marker).unwrap());
        prop_assert_eq!(
            end.move_offset_to(&v0, document.text_length(), AnchorMovementType::Default).unwrap(),
            length0
        );
    }
}
