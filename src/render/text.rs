//! Human-readable extraction transcript.

use std::fmt::{self, Write};

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::model::ExtractedDocument;

/// Render the transcript written next to the JSON index.
///
/// Each page lists its numbered text blocks with coordinates, then its
/// images with format, size and placement.
pub fn to_transcript(doc: &ExtractedDocument, generated_at: DateTime<Local>) -> Result<String> {
    let mut out = String::new();
    write_transcript(&mut out, doc, generated_at)
        .map_err(|e| Error::Render(format!("transcript formatting error: {}", e)))?;
    Ok(out)
}

fn write_transcript<W: Write>(
    out: &mut W,
    doc: &ExtractedDocument,
    generated_at: DateTime<Local>,
) -> fmt::Result {
    writeln!(out, "PDF Text Extraction Results")?;
    writeln!(out, "PDF File: {}", doc.source.display())?;
    writeln!(
        out,
        "Extraction Date: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "{}\n", "=".repeat(60))?;

    for page in &doc.pages {
        writeln!(out, "\n=== PAGE {} ===", page.number)?;

        if !page.text_blocks.is_empty() {
            writeln!(out, "\nTEXT CONTENT:")?;
            for (i, block) in page.text_blocks.iter().enumerate() {
                writeln!(out, "\nBlock {}:", i + 1)?;
                writeln!(out, "{}", block.text)?;
                writeln!(out, "Coordinates: {}", block.bbox)?;
            }
        }

        if !page.images.is_empty() {
            writeln!(out, "\nIMAGES ({}):", page.images.len())?;
            for image in &page.images {
                writeln!(
                    out,
                    "- {} ({}, {} bytes)",
                    image.filename, image.format, image.size
                )?;
                match image.bbox {
                    Some(bbox) => writeln!(out, "  Coordinates: {}", bbox)?,
                    None => writeln!(out, "  Coordinates: unresolved")?,
                }
            }
        }

        writeln!(out, "\n{}", "-".repeat(40))?;
    }

    Ok(())
}
