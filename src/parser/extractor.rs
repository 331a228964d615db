//! Page content extractor using lopdf.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use crate::detect::{detect_format_from_bytes, has_pdf_extension};
use crate::error::{Error, Result};
use crate::model::{BBox, ExtractedDocument, ExtractionIndex, ImageBlock, PageContent};
use crate::render::{self, JsonFormat};

use super::content::{resolve, resolve_dict, stream_bytes, ContentInterpreter, PageScan};
use super::images::{collect_image_refs, decode_image};
use super::layout::build_blocks;
use super::options::{ErrorMode, ExtractOptions};

/// US Letter, used when a page declares no MediaBox.
const DEFAULT_MEDIA_BOX: BBox = BBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Extracts text blocks and images from a PDF, page by page.
pub struct PdfExtractor {
    doc: LopdfDocument,
    source: PathBuf,
    options: ExtractOptions,
}

impl PdfExtractor {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();

        if !has_pdf_extension(path) {
            log::warn!("File '{}' does not have a .pdf extension", path.display());
        }

        let data = fs::read(path)?;
        let mut extractor = Self::from_bytes_with_options(&data, options)?;
        extractor.source = path.to_path_buf();
        Ok(extractor)
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        let header = detect_format_from_bytes(data)?;
        log::debug!("Detected {} at offset {}", header, header.offset);

        let doc = LopdfDocument::load_mem(data)?;

        Ok(Self {
            doc,
            source: PathBuf::new(),
            options,
        })
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Path the document was opened from (empty for in-memory documents).
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Extract every selected page into `output_dir`.
    ///
    /// Writes one file per image, the JSON index and (unless disabled) the
    /// transcript. The output directory is created if needed.
    pub fn extract_to<P: AsRef<Path>>(&self, output_dir: P) -> Result<ExtractedDocument> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let document = self.extract_pages(output_dir)?;

        let index = ExtractionIndex::from(&document);
        render::write_json(&output_dir.join(render::INDEX_FILE), &index, JsonFormat::Pretty)?;

        if self.options.write_transcript {
            let transcript = render::to_transcript(&document, Local::now())?;
            fs::write(output_dir.join(render::TRANSCRIPT_FILE), transcript)?;
        }

        log::info!(
            "Extraction complete: {} pages, {} images, {} text blocks",
            document.pages.len(),
            document.image_count(),
            document.text_block_count()
        );

        Ok(document)
    }

    /// Extract the selected pages, writing images into `output_dir`.
    fn extract_pages(&self, output_dir: &Path) -> Result<ExtractedDocument> {
        let pages = self.doc.get_pages();
        let total_pages = pages.len() as u32;

        let selected: Vec<(u32, ObjectId)> = pages
            .into_iter()
            .filter(|(num, _)| self.options.pages.includes(*num))
            .collect();

        let extract = |&(num, id): &(u32, ObjectId)| -> Result<PageContent> {
            let page = self.extract_page_by_id(num, id, output_dir)?;
            log::info!(
                "Processing page {}/{} ({}%) - {} images, {} text blocks",
                num,
                total_pages,
                num * 100 / total_pages.max(1),
                page.images.len(),
                page.text_blocks.len()
            );
            Ok(page)
        };

        // Collecting into Result keeps document order on both paths
        let pages = if self.options.parallel {
            selected.par_iter().map(extract).collect::<Result<Vec<_>>>()?
        } else {
            selected.iter().map(extract).collect::<Result<Vec<_>>>()?
        };

        Ok(ExtractedDocument {
            source: self.source.clone(),
            output_dir: output_dir.to_path_buf(),
            page_count: total_pages,
            pages,
        })
    }

    /// Extract a single page (1-indexed), writing its images into `output_dir`.
    pub fn extract_page<P: AsRef<Path>>(&self, page_num: u32, output_dir: P) -> Result<PageContent> {
        let pages = self.doc.get_pages();
        let page_id = *pages
            .get(&page_num)
            .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;
        self.extract_page_by_id(page_num, page_id, output_dir)
    }

    fn extract_page_by_id(&self, page_num: u32, page_id: ObjectId, output_dir: &Path) -> Result<PageContent> {
        let media_box = self.get_page_media_box(page_id);
        let resources = self.get_page_resources(page_id);
        let mut page = PageContent::new(page_num, media_box.width(), media_box.height());

        let scan = match self.scan_page(page_id, media_box, resources) {
            Ok(scan) => scan,
            Err(e) => {
                self.skip_or_fail(e, || format!("text on page {}", page_num))?;
                PageScan::default()
            }
        };

        for (i, id) in collect_image_refs(&self.doc, resources).into_iter().enumerate() {
            // Sequence numbers follow the reference list even when an image is skipped
            match self.extract_image(page_num, i + 1, id, &scan, output_dir) {
                Ok(image) => page.images.push(image),
                Err(e @ Error::Io(_)) => return Err(e),
                Err(e) => self.skip_or_fail(e, || format!("image {:?} on page {}", id, page_num))?,
            }
        }

        page.text_blocks = build_blocks(scan.spans);
        Ok(page)
    }

    /// Apply the error mode to a per-item failure.
    fn skip_or_fail(&self, err: Error, item: impl FnOnce() -> String) -> Result<()> {
        match self.options.error_mode {
            ErrorMode::Strict => Err(err),
            ErrorMode::Lenient => {
                log::warn!("Skipping {}: {}", item(), err);
                Ok(())
            }
        }
    }

    fn scan_page<'a>(
        &'a self,
        page_id: ObjectId,
        media_box: BBox,
        resources: Option<&'a Dictionary>,
    ) -> Result<PageScan> {
        let content = self.get_page_content(page_id)?;
        ContentInterpreter::new(&self.doc, media_box).run(&content, resources)
    }

    fn extract_image(
        &self,
        page_num: u32,
        seq: usize,
        id: ObjectId,
        scan: &PageScan,
        output_dir: &Path,
    ) -> Result<ImageBlock> {
        let decoded = decode_image(&self.doc, id)?;
        let filename = ImageBlock::file_name(page_num, seq, decoded.format);
        let path = output_dir.join(&filename);
        fs::write(&path, &decoded.bytes)?;

        let bbox = scan.image_bbox(id);
        if bbox.is_none() {
            log::debug!("No placement found for {} on page {}", filename, page_num);
        }

        Ok(ImageBlock {
            filename,
            path,
            size: decoded.bytes.len(),
            format: decoded.format,
            bbox,
            xref: id.0,
        })
    }

    /// Get the page MediaBox in user space, walking up the page tree.
    fn get_page_media_box(&self, page_id: ObjectId) -> BBox {
        let numbers: Option<Vec<f32>> = self
            .get_inherited(page_id, b"MediaBox")
            .and_then(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| arr.iter().filter_map(|n| n.as_float().ok()).collect());

        match numbers.as_deref() {
            Some([x0, y0, x1, y1]) => BBox::new(x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)),
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    fn get_page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        self.get_inherited(page_id, b"Resources")
            .and_then(|o| resolve_dict(&self.doc, o))
    }

    /// Look up a key on the page or, failing that, its ancestors.
    fn get_inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        // Bounded walk in case of a cyclic /Parent chain
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        }
        None
    }

    /// Get the concatenated, decompressed content of a page.
    fn get_page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        match resolve(&self.doc, contents) {
            Some(Object::Stream(s)) => stream_bytes(s),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = resolve(&self.doc, obj) {
                        content.extend_from_slice(&stream_bytes(s)?);
                        content.push(b'\n');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::TextExtract("Invalid content stream".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let result = PdfExtractor::from_bytes(b"GIF89a not a pdf");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PdfExtractor::open("/definitely/not/here.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let result = PdfExtractor::from_bytes(b"%PDF-1.4\nthis is not a pdf body");
        assert!(result.is_err());
    }
}
