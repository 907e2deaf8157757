//! Text Extractor: plain text out of an uploaded PDF.
//!
//! Never fails: a missing, malformed or image-only document yields an empty
//! string and a logged diagnostic. Rejecting empty text is the caller's job.

use std::panic;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Extracts every page's text, newline-joined and trimmed.
pub fn extract_text(path: &Path) -> String {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let result = panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path));

    match result {
        Ok(Ok(pages)) => {
            let text = join_pages(pages);
            info!("Extracted {} characters from {}", text.len(), path.display());
            text
        }
        Ok(Err(e)) => {
            warn!("PDF extraction error for {}: {e:?}", path.display());
            String::new()
        }
        Err(_) => {
            warn!("PDF extraction panicked for {}", path.display());
            String::new()
        }
    }
}

/// Runs `extract_text` on the blocking pool.
pub async fn extract_text_blocking(path: PathBuf) -> String {
    match tokio::task::spawn_blocking(move || extract_text(&path)).await {
        Ok(text) => text,
        Err(e) => {
            warn!("PDF extraction task failed: {e}");
            String::new()
        }
    }
}

/// Pages with no text are skipped; each remaining page ends with a newline.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::new();
    for page in pages {
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(&page);
        text.push('\n');
    }
    text.trim().to_string()
}

/// Writes a PDF with one line of Courier text per page.
#[cfg(test)]
pub(crate) fn write_test_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
