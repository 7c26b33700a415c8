use super::{jaccard, SimilarityStrategy};
use crate::error::Error;
use ahash::AHashSet;
use lopdf::Document;
use std::panic;
use std::path::Path;
use tracing::trace;

pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Result<String, Error>;
}

/// Text layer extraction through `pdf-extract`.
pub struct PdfExtractText;

impl TextExtractor for PdfExtractText {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, path: &Path) -> Result<String, Error> {
        // pdf-extract panics on some malformed documents
        match panic::catch_unwind(|| pdf_extract::extract_text(path)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::extraction(path, e)),
            Err(_) => Err(Error::extraction(path, "pdf-extract panicked")),
        }
    }
}

/// Page-by-page extraction through `lopdf`.
pub struct LopdfText;

impl TextExtractor for LopdfText {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, path: &Path) -> Result<String, Error> {
        let doc = Document::load(path).map_err(|e| Error::extraction(path, e))?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(Error::extraction(path, "document has no pages"));
        }
        doc.extract_text(&pages)
            .map_err(|e| Error::extraction(path, e))
    }
}

/// Token-set Jaccard over extracted text.
pub struct TextSimilarity<E> {
    extractor: E,
}

impl<E: TextExtractor> TextSimilarity<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    fn tokens(&self, path: &Path) -> Result<AHashSet<String>, Error> {
        let text = self.extractor.extract(path)?;
        let tokens = tokenize(&text);
        trace!("{} words in {}", tokens.len(), path.display());
        Ok(tokens)
    }
}

impl<E: TextExtractor> SimilarityStrategy for TextSimilarity<E> {
    fn name(&self) -> &'static str {
        self.extractor.name()
    }

    fn similarity(&self, a: &Path, b: &Path) -> Result<f64, Error> {
        let tokens_a = self.tokens(a)?;
        let tokens_b = self.tokens(b)?;
        Ok(jaccard(&tokens_a, &tokens_b))
    }
}

/// Lowercase, drop everything that is neither a word character nor
/// whitespace, then split on whitespace.
pub fn tokenize(text: &str) -> AHashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}
