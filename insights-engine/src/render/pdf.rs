//! Minimal PDF 1.4 writer.
//!
//! Only what the report needs: the two standard Helvetica faces, left or
//! centred lines, greedy word wrap and pagination by remaining height.
//! Text is encoded as WinAnsi; characters outside it become `?`.

use std::io::Write;

use chrono::{DateTime, Local};

use insights_core::{InsightsReport, Result};

use super::{ReportRenderer, FOOTER_TEXT, REPORT_TITLE};

// US Letter, points
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const LINE_SPACING: f32 = 1.35;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

/// Object numbers 1..=4 are fixed: catalog, page tree, regular and bold font.
const FIRST_PAGE_OBJECT: usize = 5;

pub struct PdfRenderer {
    generated_at: DateTime<Local>,
}

impl PdfRenderer {
    pub fn new(generated_at: DateTime<Local>) -> Self {
        Self { generated_at }
    }

    fn layout(&self, report: &InsightsReport) -> Vec<Block> {
        let overview = &report.user_analysis.overview;
        let mut blocks = vec![
            Block::text(REPORT_TITLE, 24.0).bold().centered(),
            Block::Gap(12.0),
            Block::text(format!("Hi {}!", report.user_name), 18.0).centered(),
            Block::Gap(8.0),
            Block::text("Here's your personalized analysis of ChatGPT interactions.", 12.0).centered(),
            Block::Gap(24.0),
            Block::heading("Overview"),
            Block::text(format!("Total Chats: {}", overview.total_chats), 12.0),
            Block::text(format!("Total Words: {}", overview.total_words_used), 12.0),
            Block::text(format!("Total Prompts: {}", overview.total_prompts), 12.0),
            Block::Gap(24.0),
        ];

        if !report.suggestions.is_empty() {
            blocks.push(Block::heading("Prompt Improvement Suggestions"));
            for (idx, suggestion) in report.suggestions.iter().enumerate() {
                blocks.push(Block::text(format!("{}. {}", idx + 1, suggestion), 12.0));
                blocks.push(Block::Gap(6.0));
            }
            blocks.push(Block::Gap(12.0));
        }

        blocks.push(Block::heading("Recommendations"));
        let recommendations = &report.recommendations;
        for (label, items) in [
            ("Tips to Improve:", &recommendations.tips_to_improve),
            ("Suggested Topics:", &recommendations.suggested_topics_to_explore),
        ] {
            if items.is_empty() {
                continue;
            }
            blocks.push(Block::text(label, 12.0));
            blocks.push(Block::Gap(6.0));
            for item in items {
                blocks.push(Block::text(format!("\u{2022} {}", item), 12.0));
                blocks.push(Block::Gap(6.0));
            }
            blocks.push(Block::Gap(12.0));
        }

        blocks.push(Block::Gap(24.0));
        blocks.push(Block::text(FOOTER_TEXT, 10.0).centered());
        blocks.push(Block::Gap(6.0));
        blocks.push(
            Block::text(
                format!("Generated on: {}", self.generated_at.format("%Y-%m-%d")),
                10.0,
            )
            .centered(),
        );
        blocks
    }
}

impl ReportRenderer for PdfRenderer {
    fn render(&self, report: &InsightsReport) -> Result<Vec<u8>> {
        let pages = paginate(&self.layout(report));
        let pdf = write_document(&pages)?;
        tracing::debug!(pages = pages.len(), bytes = pdf.len(), "PDF rendered");
        Ok(pdf)
    }
}

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone)]
enum Block {
    Text {
        text: String,
        size: f32,
        bold: bool,
        centered: bool,
    },
    Gap(f32),
}

impl Block {
    fn text(text: impl Into<String>, size: f32) -> Self {
        Block::Text {
            text: text.into(),
            size,
            bold: false,
            centered: false,
        }
    }

    fn heading(text: &str) -> Self {
        Block::text(text, 16.0).bold()
    }

    fn bold(mut self) -> Self {
        if let Block::Text { bold, .. } = &mut self {
            *bold = true;
        }
        self
    }

    fn centered(mut self) -> Self {
        if let Block::Text { centered, .. } = &mut self {
            *centered = true;
        }
        self
    }
}

/// A positioned line of text on a page.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    size: f32,
    bold: bool,
    x: f32,
    y: f32,
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Greedy wrap on whitespace; words longer than a line are split.
fn wrap(text: &str, size: f32) -> Vec<String> {
    let max_chars = (((PAGE_WIDTH - 2.0 * MARGIN) / (size * GLYPH_WIDTH)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn paginate(blocks: &[Block]) -> Vec<Vec<Line>> {
    let mut pages: Vec<Vec<Line>> = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in blocks {
        match block {
            Block::Gap(points) => y -= points,
            Block::Text {
                text,
                size,
                bold,
                centered,
            } => {
                for line in wrap(text, *size) {
                    let advance = size * LINE_SPACING;
                    if y - advance < MARGIN {
                        pages.push(Vec::new());
                        y = PAGE_HEIGHT - MARGIN;
                    }
                    y -= advance;

                    let x = if *centered {
                        ((PAGE_WIDTH - text_width(&line, *size)) / 2.0).max(MARGIN)
                    } else {
                        MARGIN
                    };
                    if let Some(page) = pages.last_mut() {
                        page.push(Line {
                            text: line,
                            size: *size,
                            bold: *bold,
                            x,
                            y,
                        });
                    }
                }
            }
        }
    }

    pages
}

// ============================================================================
// Serialization
// ============================================================================

/// WinAnsi-encode and escape for a PDF literal string.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\u{2022}' => out.push(0x95),
            '\u{2013}' => out.push(0x96),
            '\u{2014}' => out.push(0x97),
            '\u{2018}' => out.push(0x91),
            '\u{2019}' => out.push(0x92),
            '\u{201C}' => out.push(0x93),
            '\u{201D}' => out.push(0x94),
            ' '..='~' => out.push(c as u8),
            '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn content_stream(lines: &[Line]) -> std::io::Result<Vec<u8>> {
    let mut stream = Vec::new();
    for line in lines {
        let font = if line.bold { "F2" } else { "F1" };
        write!(
            stream,
            "BT /{} {:.1} Tf {:.2} {:.2} Td (",
            font, line.size, line.x, line.y
        )?;
        stream.extend_from_slice(&encode_text(&line.text));
        stream.extend_from_slice(b") Tj ET\n");
    }
    Ok(stream)
}

fn write_document(pages: &[Vec<Line>]) -> std::io::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + 2 * i))
        .collect();

    let mut object = |out: &mut Vec<u8>, body: &[u8]| -> std::io::Result<()> {
        offsets.push(out.len());
        writeln!(out, "{} 0 obj", offsets.len())?;
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
        Ok(())
    };

    object(&mut out, b"<< /Type /Catalog /Pages 2 0 R >>")?;
    object(
        &mut out,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    )?;
    object(
        &mut out,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    )?;
    object(
        &mut out,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    )?;

    for (i, lines) in pages.iter().enumerate() {
        let content_id = FIRST_PAGE_OBJECT + 2 * i + 1;
        object(
            &mut out,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, content_id
            )
            .as_bytes(),
        )?;

        let stream = content_stream(lines)?;
        let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        body.extend_from_slice(&stream);
        body.extend_from_slice(b"endstream");
        object(&mut out, &body)?;
    }

    let xref_offset = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
    for offset in &offsets {
        write!(out, "{:010} 00000 n \n", offset)?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        offsets.len() + 1,
        xref_offset
    )?;

    Ok(out)
}
