//! Parsing persisted markup back into the block tree.
//!
//! A recursive-descent parser over exactly the closed schema the serializer
//! emits. It is lenient where leniency cannot corrupt the tree (unknown
//! attributes are dropped, a bare `&` is literal text) and strict everywhere
//! else: unknown tags, disallowed heading levels, and broken nesting are
//! reported as [`ParseError`]s with a span into the source.

use crate::schema::{Block, HeadingLevel, ImageAttrs, InlineRun, MarkSet, Segment};
use scribe_common::{ParseError, ParseErrorKind};
use smol_str::SmolStr;

pub(crate) fn parse_blocks(src: &str) -> Result<Vec<Block>, ParseError> {
    Parser::new(src).parse_document()
}

/// An inline formatting element currently open while parsing.
enum InlineMark {
    Strong,
    Em,
    Link(SmolStr),
}

impl InlineMark {
    fn tag_name(&self) -> &'static str {
        match self {
            InlineMark::Strong => "strong",
            InlineMark::Em => "em",
            InlineMark::Link(_) => "a",
        }
    }
}

fn marks_from_stack(stack: &[InlineMark]) -> MarkSet {
    let mut marks = MarkSet::default();
    for mark in stack {
        match mark {
            InlineMark::Strong => marks.bold = true,
            InlineMark::Em => marks.italic = true,
            InlineMark::Link(href) => marks.link = Some(href.clone()),
        }
    }
    marks
}

struct OpenTag {
    name: String,
    attrs: Vec<(String, String)>,
    /// Byte offset of the `<`.
    start: usize,
    /// Byte length of the whole tag text.
    len: usize,
}

impl OpenTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse_document(&mut self) -> Result<Vec<Block>, ParseError> {
        let mut blocks = Vec::new();
        loop {
            self.skip_ws();
            if self.at_end() {
                break;
            }
            if !self.rest().starts_with('<') {
                return Err(self.err(ParseErrorKind::StrayContent, self.pos, 1));
            }
            blocks.push(self.parse_block()?);
        }
        Ok(blocks)
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        if self.rest().starts_with("</") {
            let (name, start, len) = self.read_close_tag()?;
            return Err(self.err(ParseErrorKind::MismatchedClose(name), start, len));
        }
        let tag = self.read_open_tag()?;
        match tag.name.as_str() {
            "p" => Ok(Block::Paragraph(self.parse_inline("p", tag.start)?)),
            "ul" => Ok(Block::BulletList(self.parse_list_items("ul", &tag)?)),
            "ol" => Ok(Block::OrderedList(self.parse_list_items("ol", &tag)?)),
            "blockquote" => {
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.at_end() {
                        return Err(self.err(
                            ParseErrorKind::UnclosedTag("blockquote".to_owned()),
                            tag.start,
                            tag.len,
                        ));
                    }
                    if self.try_close("blockquote")? {
                        break;
                    }
                    let inner = self.read_open_tag()?;
                    if inner.name != "p" {
                        return Err(self.err(
                            ParseErrorKind::UnknownTag(inner.name),
                            inner.start,
                            inner.len,
                        ));
                    }
                    items.push(self.parse_inline("p", inner.start)?);
                }
                Ok(Block::Blockquote(items))
            }
            "img" => {
                let src = tag.attr("src").ok_or_else(|| {
                    self.err(
                        ParseErrorKind::MissingAttr {
                            tag: "img".to_owned(),
                            attr: "src",
                        },
                        tag.start,
                        tag.len,
                    )
                })?;
                let alt = tag.attr("alt").unwrap_or("");
                let title = tag.attr("title").unwrap_or("");
                Ok(Block::Image(ImageAttrs::new(src, alt, title)))
            }
            name if name.len() > 1
                && name.starts_with('h')
                && name[1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                let level: u32 = name[1..].parse().unwrap_or(0);
                match HeadingLevel::from_u32(level) {
                    Some(level) => {
                        let closing = tag.name.clone();
                        Ok(Block::Heading {
                            level,
                            content: self.parse_inline(&closing, tag.start)?,
                        })
                    }
                    None => Err(self.err(ParseErrorKind::BadHeadingLevel(level), tag.start, tag.len)),
                }
            }
            _ => Err(self.err(ParseErrorKind::UnknownTag(tag.name), tag.start, tag.len)),
        }
    }

    fn parse_list_items(
        &mut self,
        closing: &str,
        list_tag: &OpenTag,
    ) -> Result<Vec<Segment>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.at_end() {
                return Err(self.err(
                    ParseErrorKind::UnclosedTag(closing.to_owned()),
                    list_tag.start,
                    list_tag.len,
                ));
            }
            if self.try_close(closing)? {
                break;
            }
            let tag = self.read_open_tag()?;
            if tag.name != "li" {
                return Err(self.err(ParseErrorKind::UnknownTag(tag.name), tag.start, tag.len));
            }
            items.push(self.parse_inline("li", tag.start)?);
        }
        Ok(items)
    }

    /// Parse inline content up to the closing tag of the enclosing block
    /// element, tracking open mark elements on a stack.
    fn parse_inline(&mut self, closing: &str, open_at: usize) -> Result<Segment, ParseError> {
        let mut runs: Vec<InlineRun> = Vec::new();
        let mut stack: Vec<InlineMark> = Vec::new();
        loop {
            if self.at_end() {
                return Err(self.err(
                    ParseErrorKind::UnclosedTag(closing.to_owned()),
                    open_at,
                    1,
                ));
            }
            if self.rest().starts_with("</") {
                let (name, start, len) = self.read_close_tag()?;
                if let Some(top) = stack.last() {
                    if top.tag_name() == name {
                        stack.pop();
                        continue;
                    }
                } else if name == closing {
                    return Ok(Segment::from_runs(runs));
                }
                return Err(self.err(ParseErrorKind::MismatchedClose(name), start, len));
            }
            if self.rest().starts_with('<') {
                let tag = self.read_open_tag()?;
                match tag.name.as_str() {
                    "strong" => stack.push(InlineMark::Strong),
                    "em" => stack.push(InlineMark::Em),
                    "a" => {
                        let href = tag.attr("href").ok_or_else(|| {
                            self.err(
                                ParseErrorKind::MissingAttr {
                                    tag: "a".to_owned(),
                                    attr: "href",
                                },
                                tag.start,
                                tag.len,
                            )
                        })?;
                        stack.push(InlineMark::Link(SmolStr::from(href)));
                    }
                    _ => {
                        return Err(self.err(
                            ParseErrorKind::UnknownTag(tag.name),
                            tag.start,
                            tag.len,
                        ));
                    }
                }
                continue;
            }
            let text = self.read_text();
            runs.push(InlineRun::new(text, marks_from_stack(&stack)));
        }
    }

    /// Consume `</expected>` if the input starts with a close tag.
    /// A close tag for anything else is an error; no close tag is `Ok(false)`.
    fn try_close(&mut self, expected: &str) -> Result<bool, ParseError> {
        if !self.rest().starts_with("</") {
            return Ok(false);
        }
        let (name, start, len) = self.read_close_tag()?;
        if name == expected {
            Ok(true)
        } else {
            Err(self.err(ParseErrorKind::MismatchedClose(name), start, len))
        }
    }

    fn read_open_tag(&mut self) -> Result<OpenTag, ParseError> {
        let start = self.pos;
        self.pos += 1; // consume '<'
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.err(ParseErrorKind::MalformedTag, start, 1));
        }
        let mut attrs = Vec::new();
        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                break;
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            if self.at_end() {
                return Err(self.err(ParseErrorKind::MalformedTag, start, self.pos - start));
            }
            let attr_name = self.read_name();
            if attr_name.is_empty() {
                return Err(self.err(ParseErrorKind::MalformedTag, start, self.pos - start));
            }
            self.skip_ws();
            if !self.rest().starts_with('=') {
                // Valueless attribute; tolerated and dropped.
                attrs.push((attr_name, String::new()));
                continue;
            }
            self.pos += 1;
            self.skip_ws();
            if !self.rest().starts_with('"') {
                return Err(self.err(ParseErrorKind::MalformedTag, start, self.pos - start));
            }
            self.pos += 1;
            let Some(quote) = self.rest().find('"') else {
                return Err(self.err(ParseErrorKind::MalformedTag, start, self.pos - start));
            };
            let raw = &self.src[self.pos..self.pos + quote];
            self.pos += quote + 1;
            attrs.push((attr_name, unescape(raw)));
        }
        Ok(OpenTag {
            name,
            attrs,
            start,
            len: self.pos - start,
        })
    }

    /// Read `</name>`, returning the name and its span.
    fn read_close_tag(&mut self) -> Result<(String, usize, usize), ParseError> {
        let start = self.pos;
        self.pos += 2; // consume '</'
        let name = self.read_name();
        self.skip_ws();
        if name.is_empty() || !self.rest().starts_with('>') {
            return Err(self.err(ParseErrorKind::MalformedTag, start, self.pos - start));
        }
        self.pos += 1;
        Ok((name, start, self.pos - start))
    }

    /// Consume text up to the next tag, resolving entities.
    fn read_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            if c == '&' {
                let rest = self.rest();
                let (replacement, advance) = if rest.starts_with("&amp;") {
                    ('&', 5)
                } else if rest.starts_with("&lt;") {
                    ('<', 4)
                } else if rest.starts_with("&gt;") {
                    ('>', 4)
                } else if rest.starts_with("&quot;") {
                    ('"', 6)
                } else if rest.starts_with("&#39;") {
                    ('\'', 5)
                } else {
                    // A bare ampersand is literal text.
                    ('&', 1)
                };
                out.push(replacement);
                self.pos += advance;
                continue;
            }
            out.push(c);
            self.pos += c.len_utf8();
        }
        out
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        let name = rest[..end].to_owned();
        self.pos += end;
        name
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn err(&self, kind: ParseErrorKind, offset: usize, len: usize) -> ParseError {
        ParseError::new(kind, self.src, offset, len.max(1))
    }
}

/// Resolve entities in an attribute value.
fn unescape(raw: &str) -> String {
    let mut p = Parser::new(raw);
    p.read_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::schema::Mark;

    fn parse(src: &str) -> Vec<Block> {
        parse_blocks(src).expect("parse failed")
    }

    #[test]
    fn test_parse_paragraph() {
        let blocks = parse("<p>hello world</p>");
        assert_eq!(blocks, vec![Block::Paragraph(Segment::from_text("hello world"))]);
    }

    #[test]
    fn test_parse_marks_any_nesting_order() {
        // The serializer emits link > strong > em, but the parser accepts
        // any properly-nested order.
        let blocks = parse("<p><em><strong>x</strong></em></p>");
        let seg = blocks[0].segment(0).unwrap();
        assert_eq!(seg.runs().len(), 1);
        assert!(seg.runs()[0].marks.bold);
        assert!(seg.runs()[0].marks.italic);
    }

    #[test]
    fn test_parse_link_href() {
        let blocks = parse(r#"<p><a href="https://example.com/?a=1&amp;b=2">go</a></p>"#);
        let seg = blocks[0].segment(0).unwrap();
        assert_eq!(
            seg.runs()[0].marks.link.as_deref(),
            Some("https://example.com/?a=1&b=2")
        );
    }

    #[test]
    fn test_parse_lists_and_quote() {
        let blocks = parse(
            "<ul><li>one</li><li>two</li></ul><blockquote><p>quoted</p></blockquote>",
        );
        assert_eq!(
            blocks,
            vec![
                Block::BulletList(vec![Segment::from_text("one"), Segment::from_text("two")]),
                Block::Blockquote(vec![Segment::from_text("quoted")]),
            ]
        );
    }

    #[test]
    fn test_parse_image_and_unknown_attrs_dropped() {
        let blocks = parse(
            r#"<img src="https://cdn.example/a.png" alt="photo" title="photo" class="rounded-lg">"#,
        );
        assert_eq!(
            blocks,
            vec![Block::Image(ImageAttrs::new(
                "https://cdn.example/a.png",
                "photo",
                "photo"
            ))]
        );
    }

    #[test]
    fn test_parse_self_closing_image() {
        let blocks = parse(r#"<img src="https://cdn.example/a.png" alt="" title=""/>"#);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_parse_whitespace_between_blocks() {
        let blocks = parse("<p>a</p>\n  <p>b</p>\n");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_parse_rejects_unknown_tag() {
        let err = parse_blocks("<table><p>x</p></table>").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::UnknownTag("table".to_owned()));
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_parse_rejects_disallowed_heading_level() {
        let err = parse_blocks("<h1>title</h1>").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::BadHeadingLevel(1));

        let err = parse_blocks("<h4>title</h4>").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::BadHeadingLevel(4));
    }

    #[test]
    fn test_parse_rejects_missing_img_src() {
        let err = parse_blocks(r#"<img alt="x" title="x">"#).unwrap_err();
        assert!(matches!(err.kind(), ParseErrorKind::MissingAttr { .. }));
    }

    #[test]
    fn test_parse_rejects_mismatched_close() {
        let err = parse_blocks("<p><strong>x</em></strong></p>").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::MismatchedClose("em".to_owned()));
    }

    #[test]
    fn test_parse_rejects_unclosed_block() {
        let err = parse_blocks("<p>dangling").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::UnclosedTag("p".to_owned()));
    }

    #[test]
    fn test_parse_rejects_stray_content() {
        let err = parse_blocks("loose text").unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::StrayContent);
    }

    #[test]
    fn test_parse_rejects_image_inside_paragraph() {
        let err = parse_blocks(r#"<p>text <img src="https://x/a.png"></p>"#).unwrap_err();
        assert_eq!(err.kind(), &ParseErrorKind::UnknownTag("img".to_owned()));
    }

    #[test]
    fn test_round_trip_law() {
        let mut linked = Segment::from_text("with a link inside");
        linked.set_mark(7..13, &Mark::link("https://example.com"), true);
        linked.set_mark(7..13, &Mark::Bold, true);

        let mut mixed = Segment::from_text("bold and italic");
        mixed.set_mark(0..4, &Mark::Bold, true);
        mixed.set_mark(9..15, &Mark::Italic, true);

        let docs = vec![
            Document::new(),
            Document::from_blocks(vec![Block::Paragraph(Segment::from_text("plain"))]),
            Document::from_blocks(vec![Block::Paragraph(mixed)]),
            Document::from_blocks(vec![Block::Paragraph(linked)]),
            Document::from_blocks(vec![
                Block::Heading {
                    level: HeadingLevel::H2,
                    content: Segment::from_text("Title & <subtitle>"),
                },
                Block::Heading {
                    level: HeadingLevel::H3,
                    content: Segment::from_text("Sub"),
                },
                Block::BulletList(vec![
                    Segment::from_text("one"),
                    Segment::from_text("two"),
                ]),
                Block::OrderedList(vec![Segment::from_text("first")]),
                Block::Blockquote(vec![
                    Segment::from_text("a quote"),
                    Segment::from_text("second line"),
                ]),
                Block::Image(ImageAttrs::new(
                    "https://cdn.example/img/1700000000000-photo_1.png",
                    "photo 1.png",
                    "photo 1.png",
                )),
                Block::empty_paragraph(),
            ]),
        ];

        for doc in docs {
            let markup = doc.serialize();
            let parsed = Document::deserialize(&markup).expect("round trip parse");
            assert_eq!(parsed, doc, "round trip failed for {markup}");
        }
    }

    #[test]
    fn test_round_trip_multibyte_text() {
        let doc = Document::from_blocks(vec![Block::Paragraph(Segment::from_text(
            "héllo wörld 你好",
        ))]);
        let parsed = Document::deserialize(&doc.serialize()).unwrap();
        assert_eq!(parsed, doc);
    }
}
