//! CV text extraction. Tries PDF text first, then plain UTF-8.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CvExtractionError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("No readable text found in the uploaded file")]
    NoText,
}

pub async fn extract_cv_text(bytes: Bytes, content_type: Option<&str>) -> Result<String, CvExtractionError> {
    if bytes.is_empty() {
        return Err(CvExtractionError::EmptyFile);
    }

    let is_pdf = bytes.starts_with(b"%PDF")
        || content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"));

    if is_pdf {
        if let Some(text) = extract_pdf_text(bytes.clone()).await {
            return Ok(text);
        }
    }

    match std::str::from_utf8(&bytes) {
        Ok(text) if !bytes.starts_with(b"%PDF") => {
            let text = tidy_text(text);
            if !text.is_empty() {
                debug!("Extracted {} chars of plain text", text.len());
                return Ok(text);
            }
        }
        _ => {}
    }

    Err(CvExtractionError::NoText)
}

/// PDF parsing is CPU-bound and can panic on malformed files, so it runs on the
/// blocking pool; any failure means "try the next extractor".
async fn extract_pdf_text(bytes: Bytes) -> Option<String> {
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match result {
        Ok(Ok(text)) => {
            let text = tidy_text(&text);
            if text.is_empty() {
                warn!("PDF contained no extractable text");
                None
            } else {
                debug!("Extracted {} chars from PDF", text.len());
                Some(text)
            }
        }
        Ok(Err(e)) => {
            warn!("PDF text extraction failed: {e}");
            None
        }
        Err(e) => {
            warn!("PDF extraction task failed: {e}");
            None
        }
    }
}

/// Trims every line and collapses runs of blank lines to one.
fn tidy_text(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_upload() {
        let text = extract_cv_text(Bytes::from_static(b"  Lina Haddad\n\n\n  Backend Developer  \n"), Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(text, "Lina Haddad\n\nBackend Developer");
    }

    #[tokio::test]
    async fn test_empty_upload() {
        assert!(matches!(
            extract_cv_text(Bytes::new(), None).await,
            Err(CvExtractionError::EmptyFile)
        ));
    }

    #[tokio::test]
    async fn test_whitespace_only_upload_has_no_text() {
        assert!(matches!(
            extract_cv_text(Bytes::from_static(b" \n \n"), None).await,
            Err(CvExtractionError::NoText)
        ));
    }

    #[tokio::test]
    async fn test_broken_pdf_is_not_returned_as_text() {
        let result = extract_cv_text(Bytes::from_static(b"%PDF-1.7 garbage"), Some("application/pdf")).await;
        assert!(matches!(result, Err(CvExtractionError::NoText)));
    }

    #[tokio::test]
    async fn test_binary_upload_has_no_text() {
        let result = extract_cv_text(Bytes::from_static(&[0xff, 0xfe, 0x00, 0x81]), None).await;
        assert!(matches!(result, Err(CvExtractionError::NoText)));
    }
}
