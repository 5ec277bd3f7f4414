//! Markdown to PDF rendering
//!
//! The renderer flattens a markdown document into typed blocks, lays the
//! blocks out as positioned text lines with a greedy word wrap, and emits
//! an A4 PDF with the standard Helvetica and Courier fonts. Inline styling
//! (emphasis, links) is rendered as plain text; headings, bullet lists and
//! code blocks keep their structure.

use crate::{NotegenError, NotegenResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const LINE_SPACING: f32 = 1.4;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 10.0;
const BULLET_INDENT: f32 = 14.0;
const BULLET_HANG: f32 = 10.0;
const CODE_INDENT: f32 = 12.0;

/// Renders markdown notes into a binary document
pub trait NoteRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> NotegenResult<Vec<u8>>;
}

/// PDF renderer backed by `pulldown-cmark` and `lopdf`
#[derive(Debug, Default)]
pub struct MarkdownPdfRenderer;

impl MarkdownPdfRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NoteRenderer for MarkdownPdfRenderer {
    fn render(&self, markdown: &str) -> NotegenResult<Vec<u8>> {
        let blocks = parse_blocks(markdown);
        let lines = layout_blocks(&blocks);
        build_document(&lines)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading { level: usize, text: String },
    Paragraph { text: String },
    Bullet { depth: usize, text: String },
    Code { lines: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    /// Average glyph advance; Courier is fixed-pitch, Helvetica averages
    /// roughly half the point size
    fn char_width(self, size: f32) -> f32 {
        match self {
            Font::Mono => size * 0.6,
            Font::Regular | Font::Bold => size * 0.5,
        }
    }
}

/// Flatten the markdown event stream into renderable blocks
fn parse_blocks(markdown: &str) -> Vec<Block> {
    let parser = Parser::new_ext(markdown, Options::empty());

    let mut blocks = Vec::new();
    let mut text = String::new();
    let mut code = String::new();
    let mut in_code = false;
    let mut list_depth: usize = 0;
    let mut item_depth: Option<usize> = None;
    let mut heading: Option<usize> = None;

    let push_bullet = |blocks: &mut Vec<Block>, depth: usize, text: &str| {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            blocks.push(Block::Bullet {
                depth,
                text: trimmed.to_string(),
            });
        }
    };

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(level as usize);
                text.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = heading.take() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        blocks.push(Block::Heading {
                            level,
                            text: trimmed.to_string(),
                        });
                    }
                }
                text.clear();
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
            Event::Start(Tag::Item) => {
                // A nested list starts before its parent item ends; flush
                // the parent text so it keeps its own line
                if let Some(depth) = item_depth.take() {
                    push_bullet(&mut blocks, depth, &text);
                }
                item_depth = Some(list_depth.saturating_sub(1));
                text.clear();
            }
            Event::End(TagEnd::Item) => {
                if let Some(depth) = item_depth.take() {
                    push_bullet(&mut blocks, depth, &text);
                }
                text.clear();
            }
            Event::Start(Tag::Paragraph) => {
                if item_depth.is_none() {
                    text.clear();
                } else if !text.is_empty() {
                    text.push(' ');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if item_depth.is_none() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        blocks.push(Block::Paragraph {
                            text: trimmed.to_string(),
                        });
                    }
                    text.clear();
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code = true;
                code.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                let lines: Vec<String> = code.lines().map(str::to_string).collect();
                if !lines.is_empty() {
                    blocks.push(Block::Code { lines });
                }
                code.clear();
            }
            Event::Text(chunk) => {
                if in_code {
                    code.push_str(&chunk);
                } else {
                    text.push_str(&chunk);
                }
            }
            Event::Code(chunk) => text.push_str(&chunk),
            Event::SoftBreak | Event::HardBreak => {
                if in_code {
                    code.push('\n');
                } else {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }

    blocks
}

fn heading_size(level: usize) -> f32 {
    match level {
        1 => 20.0,
        2 => 16.0,
        3 => 13.0,
        _ => 12.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    font: Font,
    size: f32,
    indent: f32,
    space_before: f32,
    text: String,
}

fn max_chars(font: Font, size: f32, indent: f32) -> usize {
    let usable = PAGE_WIDTH - 2.0 * MARGIN - indent;
    (usable / font.char_width(size)).floor() as usize
}

/// Greedy word wrap; words longer than a full line are split mid-word
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(8);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if line_chars > 0 && line_chars + 1 + word_chars > max_chars {
            lines.push(std::mem::take(&mut line));
            line_chars = 0;
        }
        if line_chars > 0 {
            line.push(' ');
            line_chars += 1;
        }
        line.push_str(word);
        line_chars += word_chars;
        while line_chars > max_chars {
            let head: String = line.chars().take(max_chars).collect();
            let tail: String = line.chars().skip(max_chars).collect();
            lines.push(head);
            line = tail;
            line_chars = line.chars().count();
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Split without re-flowing words; used for code where whitespace matters
fn wrap_preserving(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(8);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn layout_blocks(blocks: &[Block]) -> Vec<Line> {
    let mut lines = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let size = heading_size(*level);
                for (i, chunk) in wrap_text(text, max_chars(Font::Bold, size, 0.0))
                    .into_iter()
                    .enumerate()
                {
                    lines.push(Line {
                        font: Font::Bold,
                        size,
                        indent: 0.0,
                        space_before: if i == 0 { size * 0.9 } else { 0.0 },
                        text: chunk,
                    });
                }
            }
            Block::Paragraph { text } => {
                for (i, chunk) in wrap_text(text, max_chars(Font::Regular, BODY_SIZE, 0.0))
                    .into_iter()
                    .enumerate()
                {
                    lines.push(Line {
                        font: Font::Regular,
                        size: BODY_SIZE,
                        indent: 0.0,
                        space_before: if i == 0 { 6.0 } else { 0.0 },
                        text: chunk,
                    });
                }
            }
            Block::Bullet { depth, text } => {
                let indent = *depth as f32 * BULLET_INDENT;
                let width = max_chars(Font::Regular, BODY_SIZE, indent + BULLET_HANG)
                    .saturating_sub(2);
                for (i, chunk) in wrap_text(text, width).into_iter().enumerate() {
                    let (text, indent) = if i == 0 {
                        (format!("- {chunk}"), indent)
                    } else {
                        (chunk, indent + BULLET_HANG)
                    };
                    lines.push(Line {
                        font: Font::Regular,
                        size: BODY_SIZE,
                        indent,
                        space_before: if i == 0 { 3.0 } else { 0.0 },
                        text,
                    });
                }
            }
            Block::Code { lines: code_lines } => {
                let width = max_chars(Font::Mono, CODE_SIZE, CODE_INDENT);
                for (i, code_line) in code_lines.iter().enumerate() {
                    for (j, chunk) in wrap_preserving(code_line, width).into_iter().enumerate() {
                        lines.push(Line {
                            font: Font::Mono,
                            size: CODE_SIZE,
                            indent: CODE_INDENT,
                            space_before: if i == 0 && j == 0 { 6.0 } else { 0.0 },
                            text: chunk,
                        });
                    }
                }
            }
        }
    }

    lines
}

/// Map text onto the WinAnsi byte range the standard fonts cover
fn encode_pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{2022}' => b'\xB7',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn build_document(lines: &[Line]) -> NotegenResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(font_dictionary("Helvetica"));
    let font_bold = doc.add_object(font_dictionary("Helvetica-Bold"));
    let font_mono = doc.add_object(font_dictionary("Courier"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_regular,
            "F2" => font_bold,
            "F3" => font_mono,
        },
    });

    let mut page_contents: Vec<Vec<Operation>> = Vec::new();
    let mut ops: Vec<Operation> = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        let advance = line.size * LINE_SPACING;
        if !ops.is_empty() {
            y -= line.space_before;
        }
        if y - advance < MARGIN && !ops.is_empty() {
            page_contents.push(std::mem::take(&mut ops));
            y = PAGE_HEIGHT - MARGIN;
        }
        let baseline = y - line.size;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), line.size.into()],
        ));
        ops.push(Operation::new(
            "Td",
            vec![(MARGIN + line.indent).into(), baseline.into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_pdf_text(&line.text))],
        ));
        ops.push(Operation::new("ET", vec![]));
        y -= advance;
    }
    page_contents.push(ops);

    let mut kids: Vec<Object> = Vec::new();
    for operations in page_contents {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| NotegenError::Rendering(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| NotegenError::Rendering(e.to_string()))?;
    Ok(buffer)
}
