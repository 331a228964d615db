//! Layout grouping: spans into lines, lines into blocks.
//!
//! Grouping follows drawing order. Worksheets tend to draw each label or
//! instruction as its own run, so a block is a run of vertically adjacent,
//! horizontally overlapping lines, and a line is a run of spans sharing a
//! baseline without a wide horizontal gap.

use std::cmp::Ordering;

use crate::model::{BBox, TextBlock, TextLine, TextSpan};

use super::content::RawSpan;

/// Baseline variance allowed within a line, as a fraction of the font size.
const BASELINE_TOLERANCE: f32 = 0.3;

/// Widest horizontal gap still joining two spans, as a fraction of the font size.
const MAX_SPAN_GAP: f32 = 1.5;

/// Largest vertical gap between consecutive lines of a block, as a fraction of the line height.
const MAX_LINE_GAP: f32 = 0.6;

/// Spans of one line, before sorting.
#[derive(Debug)]
struct LineAcc {
    spans: Vec<TextSpan>,
    bbox: BBox,
    baseline: f32,
    size: f32,
}

impl LineAcc {
    fn new(span: TextSpan) -> Self {
        Self {
            bbox: span.bbox,
            baseline: span.origin[1],
            size: span.size,
            spans: vec![span],
        }
    }

    fn accepts(&self, span: &TextSpan) -> bool {
        let size = self.size.max(span.size);
        if (span.origin[1] - self.baseline).abs() > size * BASELINE_TOLERANCE {
            return false;
        }
        // Negative when the span overlaps the line horizontally
        let gap = (span.bbox.x0 - self.bbox.x1).max(self.bbox.x0 - span.bbox.x1);
        gap <= size * MAX_SPAN_GAP
    }

    fn push(&mut self, span: TextSpan) {
        self.bbox = self.bbox.union(&span.bbox);
        self.size = self.size.max(span.size);
        self.spans.push(span);
    }

    fn finish(mut self) -> Option<TextLine> {
        self.spans.sort_by(|a, b| cmp_f32(a.bbox.x0, b.bbox.x0));
        TextLine::from_spans(self.spans)
    }
}

/// Lines of one block, before sorting.
#[derive(Debug)]
struct BlockAcc {
    lines: Vec<TextLine>,
    bbox: BBox,
}

impl BlockAcc {
    fn new(line: TextLine) -> Self {
        Self {
            bbox: line.bbox,
            lines: vec![line],
        }
    }

    fn accepts(&self, line: &TextLine) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };
        let height = line.bbox.height().max(last.bbox.height());
        let gap = line.bbox.y0 - last.bbox.y1;

        gap >= -height * 0.5 && gap <= height * MAX_LINE_GAP && self.bbox.x_overlap(&line.bbox) > 0.0
    }

    fn push(&mut self, line: TextLine) {
        self.bbox = self.bbox.union(&line.bbox);
        self.lines.push(line);
    }

    fn finish(mut self) -> Option<TextBlock> {
        self.lines.sort_by(|a, b| {
            cmp_f32(a.bbox.y0, b.bbox.y0).then_with(|| cmp_f32(a.bbox.x0, b.bbox.x0))
        });
        TextBlock::from_lines(self.lines)
    }
}

/// Group interpreted spans into text blocks.
///
/// Blocks come out in the order their first line was drawn; lines within a
/// block are ordered top to bottom and spans within a line left to right.
pub(crate) fn build_blocks(spans: Vec<RawSpan>) -> Vec<TextBlock> {
    let lines = group_spans_into_lines(spans);
    let blocks = group_lines_into_blocks(lines);

    log::trace!("Grouped text into {} blocks", blocks.len());
    blocks
}

fn group_spans_into_lines(spans: Vec<RawSpan>) -> Vec<TextLine> {
    let mut lines: Vec<LineAcc> = Vec::new();

    for raw in spans {
        if raw.text.trim().is_empty() {
            continue;
        }
        let span = TextSpan {
            text: raw.text.trim().to_string(),
            font: raw.font,
            size: raw.size,
            color: raw.color,
            bbox: raw.bbox,
            origin: raw.origin,
        };

        match lines.last_mut() {
            Some(line) if line.accepts(&span) => line.push(span),
            _ => lines.push(LineAcc::new(span)),
        }
    }

    lines.into_iter().filter_map(LineAcc::finish).collect()
}

fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let mut blocks: Vec<BlockAcc> = Vec::new();

    for line in lines {
        match blocks.last_mut() {
            Some(block) if block.accepts(&line) => block.push(line),
            _ => blocks.push(BlockAcc::new(line)),
        }
    }

    blocks.into_iter().filter_map(BlockAcc::finish).collect()
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
