//! Shared fixtures for the integration tests.
//!
//! PDFs are generated in code so every page carries a text label that can
//! be read back to check page order.

use docpipe::pdf::{PageGeometry, document_geometry};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// US Letter, portrait.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// A4, landscape.
pub const A4_LANDSCAPE: (f32, f32) = (842.0, 595.0);

/// Write a PDF with one page per entry in `sizes`, labelled `{label}-{n}`.
pub fn write_pdf(path: &Path, label: &str, sizes: &[(f32, f32)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 36 36 Td ({label}-{}) Tj ET", index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(Object::Reference(page_id));
    }

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

    doc.save(path).expect("Failed to write fixture PDF");
    path.to_path_buf()
}

/// Write an `n`-page Letter PDF labelled `{label}-{n}` into `dir`.
pub fn letter_pdf(dir: &TempDir, name: &str, label: &str, pages: usize) -> PathBuf {
    write_pdf(&dir.path().join(name), label, &vec![LETTER; pages])
}

/// Page labels of a PDF, in page order.
pub fn page_labels(path: &Path) -> Vec<String> {
    let doc = Document::load(path).expect("Failed to load output PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).expect("Page has no content");
            label_of(&content)
        })
        .collect()
}

/// Page geometry of a PDF, in page order.
pub fn page_geometry(path: &Path) -> Vec<PageGeometry> {
    let doc = Document::load(path).expect("Failed to load output PDF");
    document_geometry(&doc)
}

fn label_of(content: &[u8]) -> String {
    let text = String::from_utf8_lossy(content);
    let start = text.find('(').map_or(0, |i| i + 1);
    let end = text[start..].find(')').map_or(text.len(), |i| start + i);
    text[start..end].to_string()
}

/// Write a solid-colour PNG.
pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    image.save(path).expect("Failed to write fixture image");
    path.to_path_buf()
}

/// Labels `{label}-1` through `{label}-{n}`.
pub fn labels(label: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{label}-{i}")).collect()
}
