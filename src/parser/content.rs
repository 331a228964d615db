//! Content stream interpretation.
//!
//! Walks a page's content stream and records every text show operation as a
//! positioned span and every image `Do` as a placement rectangle. Form
//! XObjects are entered recursively with their own matrix and resources;
//! anything found inside them is marked as nested so image geometry can
//! prefer page-level placements.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::{BBox, Matrix};

/// Maximum Form XObject nesting followed during interpretation.
pub(crate) const MAX_FORM_DEPTH: usize = 8;

/// Threshold (thousandths of an em) above which a TJ adjustment is a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Approximate ascender, as a fraction of the font size.
const ASCENT: f32 = 0.8;

/// Approximate descender, as a fraction of the font size.
const DESCENT: f32 = 0.2;

/// A shown string with its geometry, in drawing order.
#[derive(Debug, Clone)]
pub(crate) struct RawSpan {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub color: u32,
    pub bbox: BBox,
    /// Baseline origin in page coordinates
    pub origin: [f32; 2],
}

/// Where an image XObject was painted.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub id: ObjectId,
    pub bbox: BBox,
    /// Painted from inside a Form XObject rather than the page stream
    pub nested: bool,
}

/// Everything recorded while interpreting one page.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageScan {
    pub spans: Vec<RawSpan>,
    pub placements: Vec<Placement>,
}

impl PageScan {
    /// Resolve the bounding box of an image reference.
    ///
    /// Page-level placements win over placements found inside forms; the
    /// first placement in drawing order is used when an image is painted
    /// more than once.
    pub fn image_bbox(&self, id: ObjectId) -> Option<BBox> {
        self.placements
            .iter()
            .find(|p| p.id == id && !p.nested)
            .or_else(|| self.placements.iter().find(|p| p.id == id))
            .map(|p| p.bbox)
    }
}

/// Glyph metrics for one font resource.
#[derive(Debug, Clone, Default)]
struct FontMetrics {
    /// Composite (Type0) fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    /// Width used for codes without an entry, in thousandths of an em
    default_width: Option<f32>,
}

impl FontMetrics {
    fn load(doc: &LopdfDocument, font: &Dictionary) -> Self {
        let subtype = name_of(font.get(b"Subtype").ok());
        if subtype.as_deref() == Some("Type0") {
            return Self::load_composite(doc, font);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| arr.iter().map(|w| get_number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        let default_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve_dict(doc, o))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(get_number)
            .filter(|w| *w > 0.0);

        Self {
            two_byte: false,
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width,
        }
    }

    fn load_composite(doc: &LopdfDocument, font: &Dictionary) -> Self {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| resolve_dict(doc, o));

        let mut metrics = Self {
            two_byte: true,
            default_width: Some(1000.0),
            ..Self::default()
        };

        let Some(descendant) = descendant else {
            return metrics;
        };

        if let Some(dw) = descendant.get(b"DW").ok().and_then(get_number) {
            metrics.default_width = Some(dw);
        }

        // /W is a mix of `c [w1 w2 ...]` and `c_first c_last w` entries.
        if let Some(w) = descendant
            .get(b"W")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
        {
            let mut i = 0;
            while i < w.len() {
                let Some(start) = get_cid(&w[i]) else {
                    break;
                };
                match w.get(i + 1).and_then(|o| resolve(doc, o)) {
                    Some(Object::Array(list)) => {
                        for (offset, width) in list.iter().enumerate() {
                            let cid = u32::try_from(offset).ok().and_then(|o| start.checked_add(o));
                            if let (Some(cid), Some(width)) = (cid, get_number(width)) {
                                metrics.cid_widths.insert(cid, width);
                            }
                        }
                        i += 2;
                    }
                    Some(end) => {
                        let end = get_cid(end).unwrap_or(start);
                        let width = w.get(i + 2).and_then(get_number).unwrap_or(0.0);
                        // at most 65536 codes per range
                        for cid in start..=end.min(start.saturating_add(0xFFFF)) {
                            metrics.cid_widths.insert(cid, width);
                        }
                        i += 3;
                    }
                    None => break,
                }
            }
        }

        metrics
    }

    /// Character codes contained in a shown string.
    fn codes<'b>(&self, bytes: &'b [u8]) -> Box<dyn Iterator<Item = u32> + 'b> {
        if self.two_byte {
            Box::new(
                bytes
                    .chunks(2)
                    .map(|c| ((c[0] as u32) << 8) | c.get(1).copied().unwrap_or(0) as u32),
            )
        } else {
            Box::new(bytes.iter().map(|&b| b as u32))
        }
    }

    /// Glyph width in thousandths of an em, if known.
    fn width(&self, code: u32) -> Option<f32> {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .or(self.default_width)
    }
}

/// A font resource selected with `Tf`.
#[derive(Debug)]
struct LoadedFont<'a> {
    dict: &'a Dictionary,
    base_font: String,
    metrics: FontMetrics,
}

/// Graphics state saved and restored by `q` / `Q`.
#[derive(Debug, Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    fill_color: u32,
    font: Option<Rc<LoadedFont<'a>>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState<'_> {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_color: 0,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Text object matrices, reset at every `BT`.
#[derive(Debug, Clone, Copy, Default)]
struct TextCursor {
    tm: Matrix,
    tlm: Matrix,
}

impl TextCursor {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
    }
}

/// Interprets page and form content streams.
pub(crate) struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    /// MediaBox in PDF user space (y up)
    media_box: BBox,
    scan: PageScan,
    form_stack: Vec<ObjectId>,
}

impl<'a> ContentInterpreter<'a> {
    /// Create an interpreter for a page with the given MediaBox.
    pub fn new(doc: &'a LopdfDocument, media_box: BBox) -> Self {
        Self {
            doc,
            media_box,
            scan: PageScan::default(),
            form_stack: Vec::new(),
        }
    }

    /// Interpret a page content stream.
    pub fn run(mut self, content: &[u8], resources: Option<&'a Dictionary>) -> Result<PageScan> {
        let content = Content::decode(content).map_err(|e| Error::TextExtract(e.to_string()))?;
        let mut state = GraphicsState::default();
        self.execute(&content.operations, resources, &mut state, 0);

        log::debug!(
            "Interpreted {} operations: {} spans, {} image placements",
            content.operations.len(),
            self.scan.spans.len(),
            self.scan.placements.len()
        );
        Ok(self.scan)
    }

    fn execute(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        state: &mut GraphicsState<'a>,
        depth: usize,
    ) {
        let mut stack: Vec<GraphicsState<'a>> = Vec::new();
        let mut cursor = TextCursor::default();

        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        *state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from(operands) {
                        state.ctm = m.then(&state.ctm);
                    }
                }
                "BT" => cursor = TextCursor::default(),
                "ET" => {}
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Object::Name(name) = &operands[0] {
                            state.font = self.load_font(resources, name).map(Rc::new);
                        }
                        state.font_size = get_number(&operands[1]).unwrap_or(12.0);
                    }
                }
                "Tc" => state.char_spacing = first_number(operands).unwrap_or(0.0),
                "Tw" => state.word_spacing = first_number(operands).unwrap_or(0.0),
                "Tz" => state.h_scale = first_number(operands).unwrap_or(100.0) / 100.0,
                "TL" => state.leading = first_number(operands).unwrap_or(0.0),
                "Ts" => state.rise = first_number(operands).unwrap_or(0.0),
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        cursor.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_from(operands) {
                        cursor.tm = m;
                        cursor.tlm = m;
                    }
                }
                "T*" => cursor.move_line(0.0, -state.leading),
                "Tj" => {
                    if let Some(s @ Object::String(..)) = operands.first() {
                        self.show(state, &mut cursor, std::slice::from_ref(s));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show(state, &mut cursor, items);
                    }
                }
                "'" => {
                    cursor.move_line(0.0, -state.leading);
                    if let Some(s @ Object::String(..)) = operands.first() {
                        self.show(state, &mut cursor, std::slice::from_ref(s));
                    }
                }
                "\"" => {
                    if operands.len() >= 3 {
                        state.word_spacing = get_number(&operands[0]).unwrap_or(0.0);
                        state.char_spacing = get_number(&operands[1]).unwrap_or(0.0);
                        cursor.move_line(0.0, -state.leading);
                        self.show(state, &mut cursor, &operands[2..3]);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(color) = fill_color_from(operands) {
                        state.fill_color = color;
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.paint_xobject(resources, name, state, depth);
                    }
                }
                _ => {}
            }
        }
    }

    /// Show a sequence of strings and TJ adjustments as one span.
    fn show(&mut self, state: &GraphicsState<'a>, cursor: &mut TextCursor, items: &[Object]) {
        let start = *cursor;
        let font = state.font.as_deref();
        let mut text = String::new();

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(font, bytes));
                    let tx = self.string_advance(state, bytes);
                    cursor.advance(tx);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = -get_number(item).unwrap_or(0.0);
                    cursor.advance(adjustment / 1000.0 * state.font_size * state.h_scale);

                    if adjustment > TJ_SPACE_THRESHOLD
                        && !text.is_empty()
                        && !text.ends_with(' ')
                        && !text.ends_with('\u{00A0}')
                    {
                        if let Some(c) = text.chars().last() {
                            if !is_spaceless_script_char(c) {
                                text.push(' ');
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if text.trim().is_empty() {
            return;
        }

        let begin = start.tm.then(&state.ctm);
        let end = cursor.tm.then(&state.ctm);
        let (sx, sy) = self.to_page(begin.apply(0.0, state.rise));
        let (ex, _) = self.to_page(end.apply(0.0, state.rise));
        let size = state.font_size * begin.vertical_scale();

        self.scan.spans.push(RawSpan {
            text: text.trim().to_string(),
            font: font.map(|f| f.base_font.clone()).unwrap_or_default(),
            size,
            color: state.fill_color,
            bbox: BBox::new(
                sx.min(ex),
                sy - size * ASCENT,
                sx.max(ex),
                sy + size * DESCENT,
            ),
            origin: [sx, sy],
        });
    }

    /// Horizontal displacement of a shown string, in text space.
    fn string_advance(&self, state: &GraphicsState<'a>, bytes: &[u8]) -> f32 {
        let metrics = state.font.as_ref().map(|f| &f.metrics);
        let codes: Vec<u32> = match metrics {
            Some(m) => m.codes(bytes).collect(),
            None => bytes.iter().map(|&b| b as u32).collect(),
        };

        codes
            .iter()
            .map(|&code| {
                // Fallback: assume half of the font size per glyph
                let w0 = metrics.and_then(|m| m.width(code)).unwrap_or(500.0) / 1000.0;
                let word = if code == 32 && !metrics.is_some_and(|m| m.two_byte) {
                    state.word_spacing
                } else {
                    0.0
                };
                (w0 * state.font_size + state.char_spacing + word) * state.h_scale
            })
            .sum()
    }

    fn decode(&self, font: Option<&LoadedFont<'a>>, bytes: &[u8]) -> String {
        if let Some(font) = font {
            if let Ok(encoding) = font.dict.get_font_encoding(self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn load_font(&self, resources: Option<&'a Dictionary>, name: &[u8]) -> Option<LoadedFont<'a>> {
        let fonts = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|o| resolve_dict(self.doc, o))?;
        let dict = fonts.get(name).ok().and_then(|o| resolve_dict(self.doc, o))?;
        let base_font = name_of(dict.get(b"BaseFont").ok())
            .unwrap_or_else(|| String::from_utf8_lossy(name).into_owned());

        Some(LoadedFont {
            dict,
            base_font,
            metrics: FontMetrics::load(self.doc, dict),
        })
    }

    fn paint_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        state: &GraphicsState<'a>,
        depth: usize,
    ) {
        let Some(id) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| resolve_dict(self.doc, o))
            .and_then(|x| x.get(name).ok())
            .and_then(|o| o.as_reference().ok())
        else {
            log::debug!("Unresolved XObject /{}", String::from_utf8_lossy(name));
            return;
        };

        let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
            return;
        };

        match name_of(stream.dict.get(b"Subtype").ok()).as_deref() {
            Some("Image") => {
                let corners: Vec<(f32, f32)> = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                    .iter()
                    .map(|&(x, y)| self.to_page(state.ctm.apply(x, y)))
                    .collect();
                if let Some(bbox) = BBox::from_points(&corners) {
                    self.scan.placements.push(Placement {
                        id,
                        bbox,
                        nested: depth > 0,
                    });
                }
            }
            Some("Form") => {
                if depth >= MAX_FORM_DEPTH || self.form_stack.contains(&id) {
                    log::debug!("Skipping form XObject {:?} at depth {}", id, depth);
                    return;
                }

                let operations = match stream_bytes(stream).and_then(|data| {
                    Content::decode(&data).map_err(|e| Error::TextExtract(e.to_string()))
                }) {
                    Ok(c) => c.operations,
                    Err(e) => {
                        log::warn!("Skipping undecodable form XObject {:?}: {}", id, e);
                        return;
                    }
                };

                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| o.as_array().ok())
                    .and_then(|arr| matrix_from(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(self.doc, o))
                    .or(resources);

                let mut form_state = state.clone();
                form_state.ctm = form_matrix.then(&state.ctm);

                self.form_stack.push(id);
                self.execute(&operations, form_resources, &mut form_state, depth + 1);
                self.form_stack.pop();
            }
            _ => {}
        }
    }

    /// Convert a user-space point to top-left page coordinates.
    fn to_page(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x - self.media_box.x0, self.media_box.y1 - y)
    }
}

/// Stream payload with its filters applied; unfiltered streams are returned as stored.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| Error::PdfParse(e.to_string()))
    } else {
        Ok(stream.content.clone())
    }
}

/// Follow a reference to the object it points at.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve an object to a dictionary (direct, referenced, or a stream's dictionary).
pub(crate) fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Read a name object as a string.
pub(crate) fn name_of(obj: Option<&Object>) -> Option<String> {
    match obj? {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// A character code from a `/W` entry; negative or out-of-range values are rejected.
fn get_cid(obj: &Object) -> Option<u32> {
    match obj {
        Object::Integer(i) => u32::try_from(*i).ok(),
        Object::Real(r) if r.is_finite() && *r >= 0.0 && *r <= u32::MAX as f32 => Some(*r as u32),
        _ => None,
    }
}

/// Helper to extract number from PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn first_number(operands: &[Object]) -> Option<f32> {
    operands.first().and_then(get_number)
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let n: Vec<f32> = operands[..6].iter().filter_map(get_number).collect();
    if n.len() != 6 {
        return None;
    }
    Some(Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]))
}

/// Convert numeric colour operands to sRGB `0xRRGGBB`.
fn fill_color_from(operands: &[Object]) -> Option<u32> {
    let comps: Vec<f32> = operands
        .iter()
        .map(get_number)
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .map(|v| v.clamp(0.0, 1.0))
        .collect();

    let (r, g, b) = match comps.as_slice() {
        [gray] => (*gray, *gray, *gray),
        [r, g, b] => (*r, *g, *b),
        [c, m, y, k] => ((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)),
        _ => return None,
    };

    let byte = |v: f32| (v * 255.0).round() as u32;
    Some((byte(r) << 16) | (byte(g) << 8) | byte(b))
}

/// Check if character is from a script that doesn't use word spaces.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
