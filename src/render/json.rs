//! JSON artifacts.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Serialize a value and write it to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, format: JsonFormat) -> Result<()> {
    let json = to_json(value, format)?;
    fs::write(path, json)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Read a JSON artifact written by an earlier stage.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| Error::InvalidArtifact(path.display().to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractionIndex, IndexPage};

    fn sample_index() -> ExtractionIndex {
        ExtractionIndex {
            pages: vec![IndexPage {
                page: 1,
                images: vec![],
                text_blocks: vec![],
                total_images: 0,
                total_text_blocks: 0,
            }],
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample_index(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"total_images\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample_index(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
    }

    #[test]
    fn test_write_then_read_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        write_json(&path, &sample_index(), JsonFormat::Pretty).unwrap();

        let index: ExtractionIndex = read_json(&path).unwrap();
        assert_eq!(index, sample_index());
    }

    #[test]
    fn test_read_invalid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json::<ExtractionIndex>(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidArtifact(..)));
    }
}
