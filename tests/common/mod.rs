//! Builders for small worksheet PDFs used by the integration tests.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Options for [`worksheet_pdf`].
#[derive(Default)]
pub struct Fixture {
    /// Add an image XObject whose pixel data is truncated.
    pub corrupt_image: bool,
    /// Add an image XObject whose declared size overflows any buffer.
    pub oversized_image: bool,
    /// Give page 2 a Type0 font with a malformed `/W` array.
    pub broken_widths: bool,
}

/// A two-page worksheet.
///
/// Page 1 draws a JPEG at (50, 692)-(150, 742) labelled "Apple" and, through
/// a Form XObject, a 2x2 RGB image at (300, 300)-(340, 340) labelled "Pear".
/// Page 2 holds two sentences and no images.
pub fn worksheet_pdf(fixture: Fixture) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let jpeg_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        vec![0xFF, 0xD8, 0xFF, 0xD9],
    ));

    let rgb_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
    ));

    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 40.into(), 40.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im2" => rgb_id },
            },
        },
        b"q 40 0 0 40 0 0 cm /Im2 Do Q".to_vec(),
    ));

    let mut xobjects = dictionary! {
        "Im1" => jpeg_id,
        "Fm1" => form_id,
    };
    if fixture.corrupt_image {
        let broken_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 8,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0; 5],
        ));
        xobjects.set("Im3", broken_id);
    }
    if fixture.oversized_image {
        let huge_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1i64 << 31,
                "Height" => 1i64 << 31,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 16,
            },
            vec![0; 16],
        ));
        xobjects.set("Im4", huge_id);
    }

    let page2_font = if fixture.broken_widths {
        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Broken",
            "W" => vec![4294967290i64.into(), 4294967295i64.into(), 500.into()],
        });
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Broken",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![descendant_id.into()],
        })
    } else {
        font_id
    };

    let page1_content = "\
q 100 0 0 50 50 692 cm /Im1 Do Q
BT /F1 12 Tf 60 675 Td (Apple) Tj ET
q 1 0 0 1 300 300 cm /Fm1 Do Q
BT /F1 12 Tf 305 280 Td (Pear) Tj ET
";
    let page2_content = "\
BT /F1 12 Tf 72 700 Td (I see a cat.) Tj ET
BT /F1 12 Tf 72 600 Td (Draw a line.) Tj ET
";

    let page1 = add_page(
        &mut doc,
        pages_id,
        page1_content,
        dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        },
    );
    let page2 = add_page(
        &mut doc,
        pages_id,
        page2_content,
        dictionary! {
            "Font" => dictionary! { "F1" => page2_font },
        },
    );

    finish(doc, pages_id, vec![page1, page2])
}

/// A single-page PDF with the given content stream and no resources.
pub fn single_page_pdf(content: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page = add_page(&mut doc, pages_id, content, dictionary! {});
    finish(doc, pages_id, vec![page])
}

fn add_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    content: &str,
    resources: lopdf::Dictionary,
) -> Object {
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => resources,
    });
    page_id.into()
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, kids: Vec<Object>) -> Vec<u8> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
