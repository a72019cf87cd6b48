//! Command execution for the document model.
//!
//! The central dispatch point for all mutations. Every operation is total:
//! a command that does not fit the current tree and selection returns
//! `false` (nothing changed) instead of erroring.

use crate::commands::Command;
use crate::document::Document;
use crate::schema::{Block, BlockType, Mark, MarkKind, MarkSet, Segment};
use crate::types::{Position, Selection};
use crate::undo::HistoryEntry;

/// Apply a command to a document. Returns true if the tree was modified.
pub(crate) fn apply_command(doc: &mut Document, cmd: &Command) -> bool {
    match cmd {
        Command::ToggleMark(mark) => toggle_mark(doc, mark),
        Command::SetBlockType(target) => set_block_type(doc, *target),
        Command::InsertNode(node) => insert_node(doc, node.clone()),
        Command::InsertText(text) => insert_text(doc, text),
        Command::Undo => undo(doc),
        Command::Redo => redo(doc),
    }
}

fn toggle_mark(doc: &mut Document, mark: &Mark) -> bool {
    let sel = doc.selection;

    if sel.is_collapsed() {
        // Over a caret, a toggle flips the marks the next insertion will
        // carry. The tree itself is untouched.
        let pos = sel.head;
        if !doc.blocks[pos.block].is_textual() {
            tracing::debug!(kind = ?mark.kind(), "mark toggle outside text context ignored");
            return false;
        }
        let mut next = doc
            .pending_marks
            .clone()
            .unwrap_or_else(|| marks_at(doc, pos));
        let currently = next.has(mark.kind());
        next.set(mark, !currently);
        doc.pending_marks = Some(next);
        return false;
    }

    if !selection_has_text(doc) {
        tracing::debug!(kind = ?mark.kind(), "mark toggle over non-text selection ignored");
        return false;
    }

    // Uniformly marked -> remove everywhere; otherwise apply everywhere.
    let apply = !selection_uniformly_marked(doc, mark.kind());
    doc.record_history();
    for (block, segment, range) in selected_ranges(doc) {
        if let Some(seg) = doc.blocks[block].segment_mut(segment) {
            seg.set_mark(range, mark, apply);
        }
    }
    doc.clamp_selection();
    true
}

fn set_block_type(doc: &mut Document, target: BlockType) -> bool {
    if matches!(target, BlockType::Image) {
        tracing::debug!("set_block_type(image) does not fit the schema, ignoring");
        return false;
    }

    let range = doc.selection.block_range();
    let will_change = range.clone().any(|i| {
        let block = &doc.blocks[i];
        block.is_textual() && block.block_type() != target
    });
    if !will_change {
        return false;
    }

    doc.record_history();
    let old = std::mem::take(&mut doc.blocks);
    let mut next = Vec::with_capacity(old.len());
    for (i, block) in old.into_iter().enumerate() {
        if range.contains(&i) && block.is_textual() && block.block_type() != target {
            next.extend(convert_block(block, target));
        } else {
            next.push(block);
        }
    }
    // An empty list converting away can leave nothing behind; the document
    // always keeps at least one block for the cursor.
    if next.is_empty() {
        next.push(Block::empty_paragraph());
    }
    doc.blocks = next;
    doc.clamp_selection();
    true
}

/// Convert one textual block to the target type. Splitting conversions
/// (list -> paragraphs) yield one block per segment.
fn convert_block(block: Block, target: BlockType) -> Vec<Block> {
    let segments = block.into_segments();
    match target {
        // Image is rejected by the caller; fall through to paragraphs so
        // content can never be lost even if that guard moves.
        BlockType::Paragraph | BlockType::Image => {
            segments.into_iter().map(Block::Paragraph).collect()
        }
        BlockType::Heading(level) => segments
            .into_iter()
            .map(|content| Block::Heading { level, content })
            .collect(),
        BlockType::BulletList => vec![Block::BulletList(segments)],
        BlockType::OrderedList => vec![Block::OrderedList(segments)],
        BlockType::Blockquote => vec![Block::Blockquote(segments)],
    }
}

fn insert_node(doc: &mut Document, node: Block) -> bool {
    doc.record_history();
    let pos = doc.clamp_position(doc.selection.head);

    let insert_idx = match &doc.blocks[pos.block] {
        Block::Paragraph(_) | Block::Heading { .. } => {
            let seg_len = doc.blocks[pos.block]
                .segment(0)
                .map(Segment::len_chars)
                .unwrap_or(0);
            if pos.offset == 0 {
                pos.block
            } else if pos.offset >= seg_len {
                pos.block + 1
            } else {
                split_leaf_block(doc, pos);
                pos.block + 1
            }
        }
        // Lists, quotes, and images are not split; the node lands after them.
        _ => pos.block + 1,
    };

    doc.blocks.insert(insert_idx, node);

    // Collapse the selection to immediately after the inserted node. When
    // the node became the last block, grow a trailing paragraph so the
    // cursor has a text position to land on.
    let after = insert_idx + 1;
    if after == doc.blocks.len() {
        doc.blocks.push(Block::empty_paragraph());
    }
    doc.selection = Selection::collapsed(Position::start_of(after));
    doc.pending_marks = None;
    true
}

/// Split a paragraph or heading at the cursor into two blocks of the same
/// type. No-op for other block kinds.
fn split_leaf_block(doc: &mut Document, pos: Position) {
    let Some(seg) = doc.blocks[pos.block].segment_mut(0) else {
        return;
    };
    let suffix = seg.split_off(pos.offset);
    let tail = match &doc.blocks[pos.block] {
        Block::Heading { level, .. } => Block::Heading {
            level: *level,
            content: suffix,
        },
        _ => Block::Paragraph(suffix),
    };
    doc.blocks.insert(pos.block + 1, tail);
}

fn insert_text(doc: &mut Document, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let sel = doc.selection;
    let start = sel.start();
    if doc.blocks[start.block].segment(start.segment).is_none() {
        tracing::debug!("text insertion on a non-text node ignored");
        return false;
    }

    doc.record_history();
    if !sel.is_collapsed() {
        delete_range(doc, sel.start(), sel.end());
    }

    let pos = doc.selection.head;
    let marks = doc
        .pending_marks
        .take()
        .unwrap_or_else(|| marks_at(doc, pos));
    let inserted = text.chars().count();
    if let Some(seg) = doc.blocks[pos.block].segment_mut(pos.segment) {
        seg.insert(pos.offset, text, marks);
    }
    doc.selection = Selection::collapsed(Position::new(
        pos.block,
        pos.segment,
        pos.offset + inserted,
    ));
    true
}

/// Delete the content between two (ordered) positions and collapse the
/// selection to the start.
///
/// Cross-segment deletes stitch the end segment's suffix onto the start
/// segment. Trailing segments of the end block become items of the start
/// block when it holds multiple segments, paragraphs after it otherwise.
/// An image sitting exactly at the (exclusive) end position survives.
fn delete_range(doc: &mut Document, start: Position, end: Position) {
    if start >= end {
        doc.selection = Selection::collapsed(start);
        return;
    }

    if (start.block, start.segment) == (end.block, end.segment) {
        if let Some(seg) = doc.blocks[start.block].segment_mut(start.segment) {
            seg.delete(start.offset..end.offset);
        }
        doc.selection = Selection::collapsed(start);
        doc.clamp_selection();
        return;
    }

    let end_textual = doc.blocks[end.block].is_textual();
    let mut tail_suffix: Option<Segment> = None;
    let mut trailing: Vec<Segment> = Vec::new();
    if end_textual {
        if let Some(seg) = doc.blocks[end.block].segment(end.segment) {
            tail_suffix = Some(seg.clone().split_off(end.offset));
        }
        for s in end.segment + 1..doc.blocks[end.block].segment_count() {
            if let Some(seg) = doc.blocks[end.block].segment(s) {
                trailing.push(seg.clone());
            }
        }
    }

    // Trim the start segment to its prefix and glue the suffix on.
    if let Some(seg) = doc.blocks[start.block].segment_mut(start.segment) {
        let len = seg.len_chars();
        seg.delete(start.offset..len);
        if let Some(suffix) = tail_suffix {
            seg.append(suffix);
        }
    }

    // Drop the start block's own segments past the deletion point, and
    // absorb trailing items when the start block can hold them.
    let absorbed = match &mut doc.blocks[start.block] {
        Block::BulletList(items) | Block::OrderedList(items) | Block::Blockquote(items) => {
            items.truncate(start.segment + 1);
            items.extend(std::mem::take(&mut trailing));
            true
        }
        _ => false,
    };

    if end_textual {
        doc.blocks.drain(start.block + 1..=end.block);
    } else {
        doc.blocks.drain(start.block + 1..end.block);
    }

    if !absorbed {
        for (k, seg) in trailing.into_iter().enumerate() {
            doc.blocks
                .insert(start.block + 1 + k, Block::Paragraph(seg));
        }
    }

    doc.selection = Selection::collapsed(start);
    doc.clamp_selection();
}

fn undo(doc: &mut Document) -> bool {
    let current = HistoryEntry {
        blocks: doc.blocks.clone(),
        selection: doc.selection,
    };
    match doc.history.undo(current) {
        Some(entry) => {
            doc.blocks = entry.blocks;
            doc.selection = entry.selection;
            doc.pending_marks = None;
            doc.clamp_selection();
            true
        }
        None => false,
    }
}

fn redo(doc: &mut Document) -> bool {
    let current = HistoryEntry {
        blocks: doc.blocks.clone(),
        selection: doc.selection,
    };
    match doc.history.redo(current) {
        Some(entry) => {
            doc.blocks = entry.blocks;
            doc.selection = entry.selection;
            doc.pending_marks = None;
            doc.clamp_selection();
            true
        }
        None => false,
    }
}

/// Marks governing an insertion at the position.
pub(crate) fn marks_at(doc: &Document, pos: Position) -> MarkSet {
    doc.blocks[pos.block]
        .segment(pos.segment)
        .map(|seg| seg.marks_at(pos.offset))
        .unwrap_or_default()
}

/// Segment coordinates covered by the selection, with the char range
/// covered in each. Empty for a collapsed selection.
fn selected_ranges(doc: &Document) -> Vec<(usize, usize, std::ops::Range<usize>)> {
    let sel = doc.selection;
    if sel.is_collapsed() {
        return Vec::new();
    }
    let (start, end) = (sel.start(), sel.end());
    let mut out = Vec::new();
    for b in start.block..=end.block {
        for s in 0..doc.blocks[b].segment_count() {
            if (b, s) < (start.block, start.segment) || (b, s) > (end.block, end.segment) {
                continue;
            }
            let len = doc.blocks[b]
                .segment(s)
                .map(Segment::len_chars)
                .unwrap_or(0);
            let lo = if (b, s) == (start.block, start.segment) {
                start.offset
            } else {
                0
            };
            let hi = if (b, s) == (end.block, end.segment) {
                end.offset.min(len)
            } else {
                len
            };
            if lo <= hi {
                out.push((b, s, lo..hi));
            }
        }
    }
    out
}

/// Whether the selection covers at least one character of text.
pub(crate) fn selection_has_text(doc: &Document) -> bool {
    selected_ranges(doc).iter().any(|(_, _, r)| !r.is_empty())
}

/// Whether every selected character carries the mark kind. False when the
/// selection holds no text at all.
pub(crate) fn selection_uniformly_marked(doc: &Document, kind: MarkKind) -> bool {
    let mut any_text = false;
    for (b, s, range) in selected_ranges(doc) {
        if range.is_empty() {
            continue;
        }
        any_text = true;
        let uniform = doc.blocks[b]
            .segment(s)
            .map(|seg| seg.is_uniformly_marked(range, kind))
            .unwrap_or(false);
        if !uniform {
            return false;
        }
    }
    any_text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{HeadingLevel, ImageAttrs};

    fn paragraph_doc(text: &str) -> Document {
        Document::from_blocks(vec![Block::Paragraph(Segment::from_text(text))])
    }

    fn select(doc: &mut Document, anchor: Position, head: Position) {
        doc.set_selection(Selection::new(anchor, head));
    }

    #[test]
    fn test_toggle_bold_applies_and_removes() {
        let mut doc = paragraph_doc("hello world");
        select(&mut doc, Position::new(0, 0, 0), Position::new(0, 0, 5));

        assert!(doc.apply(Command::ToggleMark(Mark::Bold)).changed);
        assert!(selection_uniformly_marked(&doc, MarkKind::Bold));

        assert!(doc.apply(Command::ToggleMark(Mark::Bold)).changed);
        assert!(!selection_uniformly_marked(&doc, MarkKind::Bold));
    }

    #[test]
    fn test_toggle_over_mixed_selection_applies_everywhere() {
        let mut doc = paragraph_doc("hello world");
        select(&mut doc, Position::new(0, 0, 0), Position::new(0, 0, 5));
        doc.apply(Command::ToggleMark(Mark::Bold));

        // Extend over the unbolded tail: mixed, so the toggle bolds it all.
        select(&mut doc, Position::new(0, 0, 0), Position::new(0, 0, 11));
        doc.apply(Command::ToggleMark(Mark::Bold));
        assert!(selection_uniformly_marked(&doc, MarkKind::Bold));
    }

    #[test]
    fn test_toggle_mark_over_caret_sets_pending() {
        let mut doc = paragraph_doc("hi");
        select(&mut doc, Position::new(0, 0, 2), Position::new(0, 0, 2));

        let snapshot = doc.apply(Command::ToggleMark(Mark::Italic));
        assert!(!snapshot.changed);
        assert!(doc.pending_marks().map(|m| m.italic).unwrap_or(false));

        doc.apply(Command::InsertText("!".into()));
        assert!(doc.blocks()[0]
            .segment(0)
            .map(|seg| seg.marks_at(3).italic)
            .unwrap_or(false));
        assert!(doc.pending_marks().is_none());
    }

    #[test]
    fn test_toggle_mark_on_image_only_selection_is_noop() {
        let mut doc = Document::from_blocks(vec![Block::Image(ImageAttrs::new(
            "https://cdn.example/x.png",
            "x",
            "x",
        ))]);
        let before = doc.blocks().to_vec();
        let snapshot = doc.apply(Command::ToggleMark(Mark::Bold));
        assert!(!snapshot.changed);
        assert_eq!(doc.blocks(), &before[..]);
    }

    #[test]
    fn test_set_block_type_heading() {
        let mut doc = paragraph_doc("title");
        let snapshot = doc.apply(Command::SetBlockType(BlockType::Heading(HeadingLevel::H2)));
        assert!(snapshot.changed);
        assert_eq!(
            doc.blocks()[0].block_type(),
            BlockType::Heading(HeadingLevel::H2)
        );

        // Setting the same type again is a no-op.
        let snapshot = doc.apply(Command::SetBlockType(BlockType::Heading(HeadingLevel::H2)));
        assert!(!snapshot.changed);
    }

    #[test]
    fn test_set_block_type_list_to_paragraphs_splices() {
        let mut doc = Document::from_blocks(vec![Block::BulletList(vec![
            Segment::from_text("one"),
            Segment::from_text("two"),
            Segment::from_text("three"),
        ])]);
        doc.apply(Command::SetBlockType(BlockType::Paragraph));
        assert_eq!(doc.blocks().len(), 3);
        assert!(doc
            .blocks()
            .iter()
            .all(|b| b.block_type() == BlockType::Paragraph));
    }

    #[test]
    fn test_set_block_type_spans_multiple_blocks() {
        let mut doc = Document::from_blocks(vec![
            Block::Paragraph(Segment::from_text("a")),
            Block::Paragraph(Segment::from_text("b")),
        ]);
        select(&mut doc, Position::new(0, 0, 0), Position::new(1, 0, 1));
        doc.apply(Command::SetBlockType(BlockType::Blockquote));
        assert_eq!(doc.blocks().len(), 2);
        assert!(doc
            .blocks()
            .iter()
            .all(|b| b.block_type() == BlockType::Blockquote));
    }

    #[test]
    fn test_set_block_type_skips_images() {
        let mut doc = Document::from_blocks(vec![
            Block::Paragraph(Segment::from_text("a")),
            Block::Image(ImageAttrs::new("https://cdn.example/i.png", "i", "i")),
        ]);
        select(&mut doc, Position::new(0, 0, 0), Position::new(1, 0, 0));
        doc.apply(Command::SetBlockType(BlockType::BulletList));
        assert_eq!(doc.blocks()[0].block_type(), BlockType::BulletList);
        assert_eq!(doc.blocks()[1].block_type(), BlockType::Image);
    }

    #[test]
    fn test_insert_node_mid_paragraph_splits() {
        let mut doc = paragraph_doc("hello world");
        select(&mut doc, Position::new(0, 0, 5), Position::new(0, 0, 5));

        let image = Block::Image(ImageAttrs::new("https://cdn.example/i.png", "i", "i"));
        doc.apply(Command::InsertNode(image.clone()));

        assert_eq!(doc.blocks().len(), 3);
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("hello")));
        assert_eq!(doc.blocks()[1], image);
        assert_eq!(
            doc.blocks()[2],
            Block::Paragraph(Segment::from_text(" world"))
        );
        // Cursor immediately after the image.
        assert_eq!(doc.cursor(), Position::start_of(2));
    }

    #[test]
    fn test_insert_node_at_start_of_empty_doc() {
        let mut doc = Document::new();
        let image = Block::Image(ImageAttrs::new("https://cdn.example/i.png", "i", "i"));
        doc.apply(Command::InsertNode(image.clone()));

        assert_eq!(doc.blocks()[0], image);
        assert_eq!(doc.blocks()[1], Block::empty_paragraph());
        assert_eq!(doc.cursor(), Position::start_of(1));
    }

    #[test]
    fn test_insert_node_at_end_grows_trailing_paragraph() {
        let mut doc = paragraph_doc("hi");
        select(&mut doc, Position::new(0, 0, 2), Position::new(0, 0, 2));
        let image = Block::Image(ImageAttrs::new("https://cdn.example/i.png", "i", "i"));
        doc.apply(Command::InsertNode(image.clone()));

        assert_eq!(doc.blocks().len(), 3);
        assert_eq!(doc.blocks()[1], image);
        assert_eq!(doc.blocks()[2], Block::empty_paragraph());
        assert_eq!(doc.cursor(), Position::start_of(2));
    }

    #[test]
    fn test_insert_text_replaces_selection() {
        let mut doc = paragraph_doc("hello world");
        select(&mut doc, Position::new(0, 0, 6), Position::new(0, 0, 11));
        doc.apply(Command::InsertText("rust".into()));
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("hello rust")));
        assert_eq!(doc.cursor(), Position::new(0, 0, 10));
    }

    #[test]
    fn test_insert_text_across_blocks() {
        let mut doc = Document::from_blocks(vec![
            Block::Paragraph(Segment::from_text("first")),
            Block::Paragraph(Segment::from_text("second")),
        ]);
        select(&mut doc, Position::new(0, 0, 2), Position::new(1, 0, 3));
        doc.apply(Command::InsertText("-".into()));
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("fi-ond")));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut doc = paragraph_doc("hello");
        select(&mut doc, Position::new(0, 0, 5), Position::new(0, 0, 5));
        doc.apply(Command::InsertText(" world".into()));
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("hello world")));

        assert!(doc.apply(Command::Undo).changed);
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("hello")));

        assert!(doc.apply(Command::Redo).changed);
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("hello world")));
    }

    #[test]
    fn test_undo_with_empty_history_is_noop() {
        let mut doc = paragraph_doc("hello");
        assert!(!doc.apply(Command::Undo).changed);
    }

    #[test]
    fn test_delete_range_keeps_image_at_exclusive_end() {
        let mut doc = Document::from_blocks(vec![
            Block::Paragraph(Segment::from_text("text")),
            Block::Paragraph(Segment::from_text("gone")),
            Block::Image(ImageAttrs::new("https://cdn.example/i.png", "i", "i")),
        ]);
        select(&mut doc, Position::new(0, 0, 2), Position::new(2, 0, 0));
        doc.apply(Command::InsertText("!".into()));
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0], Block::Paragraph(Segment::from_text("te!")));
        assert_eq!(doc.blocks()[1].block_type(), BlockType::Image);
    }
}
