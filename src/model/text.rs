//! Text block / line / span hierarchy.

use serde::{Deserialize, Serialize};

use super::BBox;

/// A run of text drawn with a single font, size and colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Trimmed text content
    pub text: String,
    /// Font name (e.g., "Helvetica-Bold")
    pub font: String,
    /// Effective font size in page units
    pub size: f32,
    /// Fill colour as sRGB `0xRRGGBB`
    pub color: u32,
    /// Bounding box in page coordinates
    pub bbox: BBox,
    /// Baseline origin of the first glyph
    pub origin: [f32; 2],
}

/// A line of spans sharing a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Span texts joined by a single space
    pub text: String,
    /// Union of the span boxes
    pub bbox: BBox,
    /// Spans, left to right
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    /// Build a line from its spans.
    ///
    /// Returns `None` when no span carries visible text.
    pub fn from_spans(spans: Vec<TextSpan>) -> Option<Self> {
        let spans: Vec<TextSpan> = spans
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        let bbox = BBox::union_all(spans.iter().map(|s| &s.bbox))?;
        let text = spans
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self { text, bbox, spans })
    }
}

/// A contiguous region of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Line texts joined by newlines
    pub text: String,
    /// Union of the line boxes
    pub bbox: BBox,
    /// Lines, top to bottom
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Build a block from its lines.
    ///
    /// Returns `None` when the joined text is empty after trimming.
    pub fn from_lines(lines: Vec<TextLine>) -> Option<Self> {
        let bbox = BBox::union_all(lines.iter().map(|l| &l.bbox))?;
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return None;
        }

        Some(Self {
            text: text.trim().to_string(),
            bbox,
            lines,
        })
    }

    /// Number of lines in the block.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
