//! Image XObject enumeration and decoding.

use std::collections::HashSet;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::ImageFormat;

use super::content::{name_of, resolve, resolve_dict, stream_bytes, MAX_FORM_DEPTH};

/// Encoded image bytes ready to be written to disk.
#[derive(Debug, Clone)]
pub(crate) struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// List the image XObjects reachable from a resource dictionary.
///
/// Images named directly by the resources come first, in dictionary order,
/// followed by images reachable through Form XObjects. Each object appears
/// once even when it is referenced under several names.
pub(crate) fn collect_image_refs(doc: &LopdfDocument, resources: Option<&Dictionary>) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();
    let mut visited_forms = HashSet::new();
    collect_into(doc, resources, 0, &mut images, &mut seen, &mut visited_forms);
    images
}

fn collect_into(
    doc: &LopdfDocument,
    resources: Option<&Dictionary>,
    depth: usize,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
    visited_forms: &mut HashSet<ObjectId>,
) {
    let Some(xobjects) = resources
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|o| resolve_dict(doc, o))
    else {
        return;
    };

    let mut forms = Vec::new();
    for (_, obj) in xobjects.iter() {
        let Ok(id) = obj.as_reference() else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            continue;
        };
        match name_of(stream.dict.get(b"Subtype").ok()).as_deref() {
            Some("Image") => {
                if seen.insert(id) {
                    images.push(id);
                }
            }
            Some("Form") => forms.push((id, stream)),
            _ => {}
        }
    }

    if depth >= MAX_FORM_DEPTH {
        return;
    }

    for (id, form) in forms {
        if !visited_forms.insert(id) {
            continue;
        }
        let form_resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve_dict(doc, o));
        collect_into(doc, form_resources, depth + 1, images, seen, visited_forms);
    }
}

/// Decode an image XObject into a file-ready byte payload.
///
/// JPEG and JPEG 2000 streams are passed through untouched; other pixel data
/// is decoded and re-encoded as PNG.
pub(crate) fn decode_image(doc: &LopdfDocument, id: ObjectId) -> Result<DecodedImage> {
    let stream = match doc.get_object(id) {
        Ok(Object::Stream(stream)) => stream,
        Ok(_) => return Err(Error::ImageExtract(format!("object {:?} is not a stream", id))),
        Err(e) => return Err(Error::ImageExtract(e.to_string())),
    };

    let filters = filter_names(doc, &stream.dict);
    match filters.last().map(String::as_str) {
        Some("DCTDecode") | Some("DCT") => {
            let bytes = passthrough(stream, &filters)?;
            Ok(DecodedImage {
                bytes,
                format: ImageFormat::Jpeg,
            })
        }
        Some("JPXDecode") => {
            let bytes = passthrough(stream, &filters)?;
            Ok(DecodedImage {
                bytes,
                format: ImageFormat::Jpx,
            })
        }
        Some(other @ ("CCITTFaxDecode" | "CCF" | "JBIG2Decode")) => Err(Error::ImageExtract(
            format!("unsupported image filter {}", other),
        )),
        _ => {
            let data = stream_bytes(stream).map_err(|e| Error::ImageExtract(e.to_string()))?;
            let bytes = encode_png(doc, &stream.dict, &data)?;
            Ok(DecodedImage {
                bytes,
                format: ImageFormat::Png,
            })
        }
    }
}

/// Payload of a stream whose last filter is an image codec we keep as-is.
fn passthrough(stream: &Stream, filters: &[String]) -> Result<Vec<u8>> {
    if filters.len() == 1 {
        return Ok(stream.content.clone());
    }
    Err(Error::ImageExtract(format!(
        "unsupported filter chain {}",
        filters.join(" ")
    )))
}

fn filter_names(doc: &LopdfDocument, dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Some(Object::Array(arr)) => arr.iter().filter_map(|o| name_of(Some(o))).collect(),
        _ => Vec::new(),
    }
}

/// Colour model of decoded samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette entries are stored in the base model
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }

    fn from_object(doc: &LopdfDocument, obj: &Object) -> Result<Self> {
        let unsupported = |name: &str| Error::ImageExtract(format!("unsupported color space {}", name));

        match resolve(doc, obj) {
            Some(Object::Name(name)) => Self::from_name(&String::from_utf8_lossy(name))
                .ok_or_else(|| unsupported(&String::from_utf8_lossy(name))),
            Some(Object::Array(arr)) => {
                let family = name_of(arr.first()).unwrap_or_default();
                match family.as_str() {
                    "ICCBased" => {
                        let n = arr
                            .get(1)
                            .and_then(|o| resolve_dict(doc, o))
                            .and_then(|d| d.get(b"N").ok())
                            .and_then(|o| o.as_i64().ok())
                            .unwrap_or(3);
                        match n {
                            1 => Ok(ColorModel::Gray),
                            3 => Ok(ColorModel::Rgb),
                            4 => Ok(ColorModel::Cmyk),
                            _ => Err(unsupported("ICCBased")),
                        }
                    }
                    "Indexed" | "I" => {
                        let base = arr
                            .get(1)
                            .map(|o| Self::from_object(doc, o))
                            .transpose()?
                            .ok_or_else(|| unsupported("Indexed"))?;
                        let palette = match arr.get(3).and_then(|o| resolve(doc, o)) {
                            Some(Object::String(bytes, _)) => bytes.clone(),
                            Some(Object::Stream(s)) => stream_bytes(s)?,
                            _ => return Err(unsupported("Indexed")),
                        };
                        Ok(ColorModel::Indexed {
                            base: Box::new(base),
                            palette,
                        })
                    }
                    other => Self::from_name(other).ok_or_else(|| unsupported(other)),
                }
            }
            _ => Err(unsupported("(invalid)")),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "DeviceGray" | "CalGray" | "G" => Some(ColorModel::Gray),
            "DeviceRGB" | "CalRGB" | "RGB" => Some(ColorModel::Rgb),
            "DeviceCMYK" | "CMYK" => Some(ColorModel::Cmyk),
            _ => None,
        }
    }
}

/// Decode raw samples and encode them as PNG.
fn encode_png(doc: &LopdfDocument, dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>> {
    let dimension = |key: &[u8]| -> Result<u32> {
        dict.get(key)
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_i64().ok())
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                Error::ImageExtract(format!("missing or invalid {}", String::from_utf8_lossy(key)))
            })
    };
    let width = dimension(b"Width")?;
    let height = dimension(b"Height")?;

    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let (model, bpc) = if is_mask {
        (ColorModel::Gray, 1)
    } else {
        let model = match dict.get(b"ColorSpace") {
            Ok(cs) => ColorModel::from_object(doc, cs)?,
            Err(_) => ColorModel::Gray,
        };
        let bpc = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u32;
        (model, bpc)
    };

    let samples = unpack_samples(
        data,
        width as usize,
        height as usize,
        model.components(),
        bpc,
        !matches!(model, ColorModel::Indexed { .. }),
    )?;

    let image = to_dynamic_image(&model, samples, width, height)?;
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Expand packed samples to one byte per component.
///
/// Rows are padded to a byte boundary. When `scale` is set, sub-byte samples
/// are stretched to the 0-255 range; palette indices are kept as-is.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bpc: u32,
    scale: bool,
) -> Result<Vec<u8>> {
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::ImageExtract(format!("unsupported bit depth {}", bpc)));
    }

    let too_large = || Error::ImageExtract(format!("image too large: {}x{}", width, height));
    let per_row = width.checked_mul(components).ok_or_else(too_large)?;
    let row_bytes = per_row
        .checked_mul(bpc as usize)
        .ok_or_else(too_large)?
        .div_ceil(8);
    let total_bytes = row_bytes.checked_mul(height).ok_or_else(too_large)?;
    if data.len() < total_bytes {
        return Err(Error::ImageExtract(format!(
            "truncated image data: {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    if bpc == 8 {
        return Ok(data[..per_row * height].to_vec());
    }

    let mut out = Vec::with_capacity(per_row * height);
    for row in data.chunks(row_bytes).take(height) {
        if bpc == 16 {
            out.extend(row.chunks(2).take(per_row).map(|pair| pair[0]));
            continue;
        }

        let max = (1u32 << bpc) - 1;
        for i in 0..per_row {
            let bit = i * bpc as usize;
            let byte = row[bit / 8] as u32;
            let shift = 8 - bpc as usize - (bit % 8);
            let value = (byte >> shift) & max;
            out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
        }
    }
    Ok(out)
}

fn to_dynamic_image(model: &ColorModel, samples: Vec<u8>, width: u32, height: u32) -> Result<DynamicImage> {
    let wrong_size = || Error::ImageExtract("sample buffer does not match image size".to_string());

    let rgb = match model {
        ColorModel::Gray => {
            return GrayImage::from_raw(width, height, samples)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(wrong_size);
        }
        ColorModel::Rgb => samples,
        ColorModel::Cmyk => samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect(),
        ColorModel::Indexed { base, palette } => {
            let n = base.components();
            let mut rgb = Vec::with_capacity(samples.len() * 3);
            for &index in &samples {
                let start = index as usize * n;
                let entry = palette
                    .get(start..start + n)
                    .ok_or_else(|| Error::ImageExtract(format!("palette index {} out of range", index)))?;
                match base.as_ref() {
                    ColorModel::Gray => rgb.extend_from_slice(&[entry[0]; 3]),
                    ColorModel::Rgb => rgb.extend_from_slice(entry),
                    ColorModel::Cmyk => rgb.extend_from_slice(&cmyk_to_rgb(entry)),
                    ColorModel::Indexed { .. } => {
                        return Err(Error::ImageExtract("nested indexed color space".to_string()))
                    }
                }
            }
            rgb
        }
    };

    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(wrong_size)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u32;
    let channel = |v: u8| ((255 - v as u32) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn image_doc(dict: Dictionary, content: Vec<u8>) -> (LopdfDocument, ObjectId) {
        let mut doc = LopdfDocument::with_version("1.5");
        let id = doc.add_object(Stream::new(dict, content));
        (doc, id)
    }

    #[test]
    fn test_jpeg_passthrough() {
        let (doc, id) = image_doc(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF, 0xD9],
        );
        let decoded = decode_image(&doc, id).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.bytes, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn test_raw_rgb_becomes_png() {
        let (doc, id) = image_doc(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let decoded = decode_image(&doc, id).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert!(decoded.bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_truncated_data_is_an_error() {
        let (doc, id) = image_doc(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0; 3],
        );
        assert!(matches!(decode_image(&doc, id), Err(Error::ImageExtract(_))));
    }

    #[test]
    fn test_oversized_dimensions_are_an_error() {
        let (doc, id) = image_doc(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1i64 << 31,
                "Height" => 1i64 << 31,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 16,
            },
            vec![0; 16],
        );
        assert!(matches!(decode_image(&doc, id), Err(Error::ImageExtract(_))));

        let (doc, id) = image_doc(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1i64 << 40,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0; 16],
        );
        assert!(matches!(decode_image(&doc, id), Err(Error::ImageExtract(_))));
    }

    #[test]
    fn test_unpack_rejects_overflowing_sizes() {
        let result = unpack_samples(&[0; 8], usize::MAX / 2, 2, 3, 16, true);
        assert!(matches!(result, Err(Error::ImageExtract(_))));
    }

    #[test]
    fn test_unsupported_filter() {
        let (doc, id) = image_doc(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "Filter" => "JBIG2Decode",
            },
            vec![0],
        );
        assert!(decode_image(&doc, id).is_err());
    }

    #[test]
    fn test_unpack_one_bit_rows() {
        // 3 pixels per row, padded to one byte
        let samples = unpack_samples(&[0b1010_0000, 0b0100_0000], 3, 2, 1, 1, true).unwrap();
        assert_eq!(samples, vec![255, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn test_indexed_palette_lookup() {
        let model = ColorModel::Indexed {
            base: Box::new(ColorModel::Rgb),
            palette: vec![0, 0, 0, 10, 20, 30],
        };
        let image = to_dynamic_image(&model, vec![1, 0], 2, 1).unwrap();
        let rgb = image.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), [0, 255, 255]);
    }

    #[test]
    fn test_collect_dedups_and_follows_forms() {
        let mut doc = LopdfDocument::with_version("1.5");
        let img = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0],
        ));
        let inner = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0],
        ));
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Subtype" => "Form",
                "Resources" => dictionary! { "XObject" => dictionary! { "Im9" => inner } },
            },
            b"/Im9 Do".to_vec(),
        ));
        let resources = dictionary! {
            "XObject" => dictionary! { "Fm1" => form, "Im1" => img, "Im2" => img },
        };

        assert_eq!(collect_image_refs(&doc, Some(&resources)), vec![img, inner]);
    }
}
