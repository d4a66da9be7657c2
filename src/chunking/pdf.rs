//! PDF input.
//!
//! A PDF is reduced to plain text by joining its page texts with newlines;
//! the result goes through the plain-text pipeline. Page boundaries carry no
//! further meaning. Text extraction needs the `pdf` feature.

use crate::chunking::traits::Segmenter;
use crate::core::ChunkSequence;
use crate::error::Result;

/// Joins page texts with `\n`.
#[must_use]
pub fn pages_to_text<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Segments a list of page texts with a plain-text segmenter.
///
/// # Errors
///
/// Returns an error if the segmenter fails.
pub fn segment_pages<S: AsRef<str>>(
    pages: &[S],
    segmenter: &dyn Segmenter,
) -> Result<ChunkSequence> {
    let text = pages_to_text(pages);
    tracing::debug!(pages = pages.len(), chars = text.len(), "segmenting pdf text");
    segmenter.segment(&text)
}

/// Extracts the text of every page of a PDF file, in page order.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed as a PDF or a page's text
/// cannot be extracted.
#[cfg(feature = "pdf")]
pub fn extract_pages<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<String>> {
    use crate::error::IoError;

    let path_str = path.as_ref().to_string_lossy().to_string();
    let document = lopdf::Document::load(path.as_ref()).map_err(|e| IoError::ReadFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    document
        .get_pages()
        .keys()
        .map(|&page| {
            document
                .extract_text(&[page])
                .map_err(|e| {
                    crate::error::Error::from(IoError::ReadFailed {
                        path: path_str.clone(),
                        reason: format!("page {page}: {e}"),
                    })
                })
        })
        .collect()
}

/// Extracts the text of every page of a PDF file, in page order.
///
/// # Errors
///
/// Always fails: this build has no PDF support.
#[cfg(not(feature = "pdf"))]
pub fn extract_pages<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<String>> {
    Err(crate::error::Error::config(format!(
        "cannot read {}: built without the `pdf` feature",
        path.as_ref().display()
    )))
}
