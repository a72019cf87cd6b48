//! Serialization of the block tree to the persisted markup (HTML) form.
//!
//! Output is canonical: marks nest in a fixed order (link > strong > em) and
//! runs are emitted in normalized order, so the same tree always produces
//! the same string. The parser in [`crate::parse`] is the inverse.

use crate::schema::{Block, Segment};

pub(crate) fn serialize_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_block(&mut out, block);
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(seg) => {
            out.push_str("<p>");
            write_segment(out, seg);
            out.push_str("</p>");
        }
        Block::Heading { level, content } => {
            let tag = match level.as_u32() {
                2 => "h2",
                _ => "h3",
            };
            out.push('<');
            out.push_str(tag);
            out.push('>');
            write_segment(out, content);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Block::BulletList(items) => write_list(out, "ul", items),
        Block::OrderedList(items) => write_list(out, "ol", items),
        Block::Blockquote(items) => {
            out.push_str("<blockquote>");
            for item in items {
                out.push_str("<p>");
                write_segment(out, item);
                out.push_str("</p>");
            }
            out.push_str("</blockquote>");
        }
        Block::Image(attrs) => {
            out.push_str("<img src=\"");
            escape_attr(out, &attrs.src);
            out.push_str("\" alt=\"");
            escape_attr(out, &attrs.alt);
            out.push_str("\" title=\"");
            escape_attr(out, &attrs.title);
            out.push_str("\">");
        }
    }
}

fn write_list(out: &mut String, tag: &str, items: &[Segment]) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    for item in items {
        out.push_str("<li>");
        write_segment(out, item);
        out.push_str("</li>");
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_segment(out: &mut String, seg: &Segment) {
    for run in seg.runs() {
        if let Some(href) = &run.marks.link {
            out.push_str("<a href=\"");
            escape_attr(out, href);
            out.push_str("\">");
        }
        if run.marks.bold {
            out.push_str("<strong>");
        }
        if run.marks.italic {
            out.push_str("<em>");
        }
        escape_text(out, &run.text);
        if run.marks.italic {
            out.push_str("</em>");
        }
        if run.marks.bold {
            out.push_str("</strong>");
        }
        if run.marks.link.is_some() {
            out.push_str("</a>");
        }
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
