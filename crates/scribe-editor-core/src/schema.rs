//! The closed document schema: block nodes, inline runs, and marks.
//!
//! Every node the editor can hold is one of the variants below - there is no
//! extension point. Inline formatting is stored as normalized run vectors:
//! adjacent runs with identical mark sets are merged and empty runs dropped,
//! so two documents with the same visible content compare equal.

use smol_str::SmolStr;

/// Inline mark kinds, without attributes. Used for toolbar queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkKind {
    Bold,
    Italic,
    Link,
}

/// An inline mark as carried by a toggle command. `Link` carries its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
    Link { href: SmolStr },
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Link { .. } => MarkKind::Link,
        }
    }

    pub fn link(href: impl Into<SmolStr>) -> Self {
        Mark::Link { href: href.into() }
    }
}

/// The set of marks applied to a run of text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkSet {
    pub bold: bool,
    pub italic: bool,
    /// Link target, when the run is inside a link.
    pub link: Option<SmolStr>,
}

impl MarkSet {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Link => self.link.is_some(),
        }
    }

    /// Apply or remove a mark in place.
    pub fn set(&mut self, mark: &Mark, apply: bool) {
        match mark {
            Mark::Bold => self.bold = apply,
            Mark::Italic => self.italic = apply,
            Mark::Link { href } => {
                self.link = if apply { Some(href.clone()) } else { None };
            }
        }
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && self.link.is_none()
    }
}

/// A maximal run of text under one mark set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineRun {
    pub text: String,
    pub marks: MarkSet,
}

impl InlineRun {
    pub fn new(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, MarkSet::default())
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Byte index of the char boundary at `char_offset`.
    fn byte_at(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

/// One inline sequence: the content of a paragraph, heading, list item, or
/// quoted paragraph.
///
/// Kept normalized at all times - mutation methods re-establish the
/// invariant before returning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segment {
    runs: Vec<InlineRun>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut seg = Self::new();
        if !text.is_empty() {
            seg.runs.push(InlineRun::plain(text));
        }
        seg
    }

    pub fn from_runs(runs: Vec<InlineRun>) -> Self {
        let mut seg = Self { runs };
        seg.normalize();
        seg
    }

    pub fn runs(&self) -> &[InlineRun] {
        &self.runs
    }

    pub fn len_chars(&self) -> usize {
        self.runs.iter().map(InlineRun::len_chars).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Full text without mark boundaries.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            out.push_str(&run.text);
        }
        out
    }

    /// Marks governing an insertion at `offset`: the marks of the character
    /// before it, or of the first character when at the very start.
    pub fn marks_at(&self, offset: usize) -> MarkSet {
        if self.runs.is_empty() {
            return MarkSet::default();
        }
        let probe = offset.saturating_sub(1);
        let (run_idx, _) = self.locate(probe);
        let run_idx = run_idx.min(self.runs.len() - 1);
        self.runs[run_idx].marks.clone()
    }

    /// Insert text at a char offset under the given marks.
    pub fn insert(&mut self, offset: usize, text: &str, marks: MarkSet) {
        if text.is_empty() {
            return;
        }
        let at = self.split_point(offset);
        self.runs.insert(at, InlineRun::new(text, marks));
        self.normalize();
    }

    /// Delete a char range.
    pub fn delete(&mut self, range: std::ops::Range<usize>) {
        if range.start >= range.end {
            return;
        }
        let start = self.split_point(range.start);
        let end = self.split_point(range.end);
        self.runs.drain(start..end);
        self.normalize();
    }

    /// Split at a char offset, keeping the prefix and returning the suffix.
    pub fn split_off(&mut self, offset: usize) -> Segment {
        let at = self.split_point(offset);
        let suffix = self.runs.split_off(at);
        self.normalize();
        Segment::from_runs(suffix)
    }

    /// Append another segment's runs to this one.
    pub fn append(&mut self, other: Segment) {
        self.runs.extend(other.runs);
        self.normalize();
    }

    /// Apply or remove a mark over a char range.
    pub fn set_mark(&mut self, range: std::ops::Range<usize>, mark: &Mark, apply: bool) {
        if range.start >= range.end {
            return;
        }
        let start = self.split_point(range.start);
        let end = self.split_point(range.end);
        for run in &mut self.runs[start..end] {
            run.marks.set(mark, apply);
        }
        self.normalize();
    }

    /// Whether every character in the range carries the mark kind.
    /// An empty range has no characters and reports false.
    pub fn is_uniformly_marked(&self, range: std::ops::Range<usize>, kind: MarkKind) -> bool {
        if range.start >= range.end {
            return false;
        }
        let mut cum = 0usize;
        for run in &self.runs {
            let run_len = run.len_chars();
            let run_range = cum..cum + run_len;
            if run_range.start < range.end && range.start < run_range.end && !run.marks.has(kind) {
                return false;
            }
            cum += run_len;
            if cum >= range.end {
                break;
            }
        }
        true
    }

    /// (run index, char offset within that run) for a char offset.
    /// Offsets at or past the end land after the last run.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut cum = 0usize;
        for (idx, run) in self.runs.iter().enumerate() {
            let run_len = run.len_chars();
            if offset < cum + run_len {
                return (idx, offset - cum);
            }
            cum += run_len;
        }
        (self.runs.len(), 0)
    }

    /// Ensure a run boundary exists at the char offset and return the index
    /// of the run that starts there.
    fn split_point(&mut self, offset: usize) -> usize {
        let (run_idx, in_run) = self.locate(offset);
        if in_run == 0 {
            return run_idx;
        }
        let byte = self.runs[run_idx].byte_at(in_run);
        let tail = self.runs[run_idx].text.split_off(byte);
        let marks = self.runs[run_idx].marks.clone();
        self.runs.insert(run_idx + 1, InlineRun::new(tail, marks));
        run_idx + 1
    }

    /// Merge adjacent runs with identical marks and drop empty runs.
    fn normalize(&mut self) {
        self.runs.retain(|run| !run.text.is_empty());
        let mut i = 0;
        while i + 1 < self.runs.len() {
            if self.runs[i].marks == self.runs[i + 1].marks {
                let next = self.runs.remove(i + 1);
                self.runs[i].text.push_str(&next.text);
            } else {
                i += 1;
            }
        }
    }
}

/// Restricted heading levels: the composer only offers H2 and H3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u32(self) -> u32 {
        match self {
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }

    pub fn from_u32(level: u32) -> Option<Self> {
        match level {
            2 => Some(HeadingLevel::H2),
            3 => Some(HeadingLevel::H3),
            _ => None,
        }
    }
}

/// Attributes of an image node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttrs {
    /// Public URL of the stored asset.
    pub src: SmolStr,
    pub alt: SmolStr,
    pub title: SmolStr,
}

impl ImageAttrs {
    pub fn new(
        src: impl Into<SmolStr>,
        alt: impl Into<SmolStr>,
        title: impl Into<SmolStr>,
    ) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            title: title.into(),
        }
    }
}

/// Block type tags, used by `SetBlockType` and the toolbar projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading(HeadingLevel),
    BulletList,
    OrderedList,
    Blockquote,
    Image,
}

/// A top-level document node.
///
/// Lists and quotes hold one segment per item / quoted paragraph. Image
/// nodes carry attributes only and have no children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Segment),
    Heading {
        level: HeadingLevel,
        content: Segment,
    },
    BulletList(Vec<Segment>),
    OrderedList(Vec<Segment>),
    Blockquote(Vec<Segment>),
    Image(ImageAttrs),
}

impl Block {
    pub fn empty_paragraph() -> Self {
        Block::Paragraph(Segment::new())
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Paragraph(_) => BlockType::Paragraph,
            Block::Heading { level, .. } => BlockType::Heading(*level),
            Block::BulletList(_) => BlockType::BulletList,
            Block::OrderedList(_) => BlockType::OrderedList,
            Block::Blockquote(_) => BlockType::Blockquote,
            Block::Image(_) => BlockType::Image,
        }
    }

    /// Whether the block carries inline text at all.
    pub fn is_textual(&self) -> bool {
        !matches!(self, Block::Image(_))
    }

    pub fn segment_count(&self) -> usize {
        match self {
            Block::Paragraph(_) | Block::Heading { .. } => 1,
            Block::BulletList(items) | Block::OrderedList(items) | Block::Blockquote(items) => {
                items.len()
            }
            Block::Image(_) => 0,
        }
    }

    pub fn segment(&self, idx: usize) -> Option<&Segment> {
        match self {
            Block::Paragraph(seg) | Block::Heading { content: seg, .. } => {
                (idx == 0).then_some(seg)
            }
            Block::BulletList(items) | Block::OrderedList(items) | Block::Blockquote(items) => {
                items.get(idx)
            }
            Block::Image(_) => None,
        }
    }

    pub fn segment_mut(&mut self, idx: usize) -> Option<&mut Segment> {
        match self {
            Block::Paragraph(seg) | Block::Heading { content: seg, .. } => {
                (idx == 0).then_some(seg)
            }
            Block::BulletList(items) | Block::OrderedList(items) | Block::Blockquote(items) => {
                items.get_mut(idx)
            }
            Block::Image(_) => None,
        }
    }

    /// Take the block apart into its inline segments, in order.
    /// Image blocks yield nothing.
    pub fn into_segments(self) -> Vec<Segment> {
        match self {
            Block::Paragraph(seg) | Block::Heading { content: seg, .. } => vec![seg],
            Block::BulletList(items) | Block::OrderedList(items) | Block::Blockquote(items) => {
                items
            }
            Block::Image(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_normalization_merges_equal_marks() {
        let seg = Segment::from_runs(vec![
            InlineRun::plain("hel"),
            InlineRun::plain("lo"),
            InlineRun::new(
                " world",
                MarkSet {
                    bold: true,
                    ..Default::default()
                },
            ),
        ]);
        assert_eq!(seg.runs().len(), 2);
        assert_eq!(seg.runs()[0].text, "hello");
        assert_eq!(seg.text(), "hello world");
    }

    #[test]
    fn test_segment_insert_mid_run() {
        let mut seg = Segment::from_text("hello");
        seg.insert(
            2,
            "XX",
            MarkSet {
                italic: true,
                ..Default::default()
            },
        );
        assert_eq!(seg.text(), "heXXllo");
        assert_eq!(seg.runs().len(), 3);
    }

    #[test]
    fn test_segment_insert_same_marks_merges() {
        let mut seg = Segment::from_text("hello");
        seg.insert(5, " world", MarkSet::default());
        assert_eq!(seg.runs().len(), 1);
        assert_eq!(seg.text(), "hello world");
    }

    #[test]
    fn test_segment_delete_across_runs() {
        let mut seg = Segment::from_runs(vec![
            InlineRun::plain("abc"),
            InlineRun::new(
                "def",
                MarkSet {
                    bold: true,
                    ..Default::default()
                },
            ),
            InlineRun::plain("ghi"),
        ]);
        seg.delete(2..7);
        assert_eq!(seg.text(), "abhi");
        // "ab" and "hi" are both plain, so they merge back together.
        assert_eq!(seg.runs().len(), 1);
    }

    #[test]
    fn test_segment_set_mark_partial() {
        let mut seg = Segment::from_text("hello world");
        seg.set_mark(0..5, &Mark::Bold, true);
        assert_eq!(seg.runs().len(), 2);
        assert!(seg.runs()[0].marks.bold);
        assert!(!seg.runs()[1].marks.bold);
        assert!(seg.is_uniformly_marked(0..5, MarkKind::Bold));
        assert!(!seg.is_uniformly_marked(0..6, MarkKind::Bold));
    }

    #[test]
    fn test_segment_unset_mark() {
        let mut seg = Segment::from_text("hello");
        seg.set_mark(0..5, &Mark::Bold, true);
        seg.set_mark(0..5, &Mark::Bold, false);
        assert_eq!(seg.runs().len(), 1);
        assert!(seg.runs()[0].marks.is_plain());
    }

    #[test]
    fn test_segment_split_off() {
        let mut seg = Segment::from_text("hello world");
        let suffix = seg.split_off(5);
        assert_eq!(seg.text(), "hello");
        assert_eq!(suffix.text(), " world");
    }

    #[test]
    fn test_segment_multibyte_offsets() {
        let mut seg = Segment::from_text("héllo wörld");
        seg.set_mark(0..5, &Mark::Italic, true);
        assert_eq!(seg.runs()[0].text, "héllo");
        seg.delete(5..6);
        assert_eq!(seg.text(), "héllowörld");
    }

    #[test]
    fn test_marks_at() {
        let mut seg = Segment::from_text("ab");
        seg.set_mark(0..1, &Mark::Bold, true);
        assert!(seg.marks_at(0).bold);
        assert!(seg.marks_at(1).bold);
        assert!(!seg.marks_at(2).bold);
    }

    #[test]
    fn test_link_mark_round_trips_href() {
        let mut set = MarkSet::default();
        set.set(&Mark::link("https://example.com"), true);
        assert!(set.has(MarkKind::Link));
        set.set(&Mark::link("https://example.com"), false);
        assert!(!set.has(MarkKind::Link));
    }

    #[test]
    fn test_heading_levels_closed() {
        assert_eq!(HeadingLevel::from_u32(2), Some(HeadingLevel::H2));
        assert_eq!(HeadingLevel::from_u32(3), Some(HeadingLevel::H3));
        assert_eq!(HeadingLevel::from_u32(1), None);
        assert_eq!(HeadingLevel::from_u32(4), None);
    }
}
