//! Tiered similarity scoring for same-named documents.
//!
//! A [`SimilarityChain`] holds an ordered list of strategies. Each pair is
//! offered to the strategies in turn and the first one that produces a score
//! wins; a failing strategy hands the pair to the next one.

mod blocks;
mod text;

pub use blocks::BlockSimilarity;
pub use text::{tokenize, LopdfText, PdfExtractText, TextExtractor, TextSimilarity};

use crate::error::Error;
use ahash::AHashSet;
use std::hash::Hash;
use std::path::Path;
use tracing::{debug, warn};

pub trait SimilarityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score in [0, 1]. An `Err` escalates to the next strategy in the chain.
    fn similarity(&self, a: &Path, b: &Path) -> Result<f64, Error>;
}

pub struct SimilarityChain {
    strategies: Vec<Box<dyn SimilarityStrategy>>,
}

impl SimilarityChain {
    pub fn new(strategies: Vec<Box<dyn SimilarityStrategy>>) -> Self {
        Self { strategies }
    }

    /// PDF text layer, then the lopdf text backend, then 4KB block overlap.
    pub fn pdf() -> Self {
        Self::new(vec![
            Box::new(TextSimilarity::new(PdfExtractText)),
            Box::new(TextSimilarity::new(LopdfText)),
            Box::new(BlockSimilarity),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Score with the first strategy that succeeds. The last error is returned
    /// when every strategy fails.
    pub fn score(&self, a: &Path, b: &Path) -> Result<f64, Error> {
        let mut last_err = None;

        for strategy in &self.strategies {
            match strategy.similarity(a, b) {
                Ok(score) => {
                    debug!(
                        "{} vs {}: {:.3} via {}",
                        a.display(),
                        b.display(),
                        score,
                        strategy.name()
                    );
                    return Ok(score.clamp(0.0, 1.0));
                }
                Err(e) => {
                    debug!("{} failed, trying next strategy: {}", strategy.name(), e);
                    last_err = Some(e);
                }
            }
        }

        let err = last_err.unwrap_or_else(|| Error::Other("no similarity strategy configured".into()));
        warn!(
            "Could not compare {} and {}: {}",
            a.display(),
            b.display(),
            err
        );
        Err(err)
    }
}

impl Default for SimilarityChain {
    fn default() -> Self {
        Self::pdf()
    }
}

/// |a ∩ b| / |a ∪ b|, or 0.0 when either set is empty.
pub fn jaccard<T: Eq + Hash>(a: &AHashSet<T>, b: &AHashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection_size = a.intersection(b).count();
    let union_size = a.len() + b.len() - intersection_size;

    intersection_size as f64 / union_size as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn set(items: &[&str]) -> AHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_basic() {
        let a = set(&["a", "b", "c"]);
        let b = set(&["b", "c", "d"]);
        assert_eq!(jaccard(&a, &b), 0.5);
        assert_eq!(jaccard(&b, &a), 0.5);
    }

    #[test]
    fn test_jaccard_identity_and_empty() {
        let a = set(&["x", "y"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &set(&[])), 0.0);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    struct Fixed {
        result: Option<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl SimilarityStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn similarity(&self, a: &Path, _b: &Path) -> Result<f64, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.ok_or_else(|| Error::extraction(a, "unsupported"))
        }
    }

    #[test]
    fn test_chain_falls_through_to_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = SimilarityChain::new(vec![
            Box::new(Fixed {
                result: None,
                calls: calls.clone(),
            }),
            Box::new(Fixed {
                result: Some(0.75),
                calls: calls.clone(),
            }),
            Box::new(Fixed {
                result: Some(0.1),
                calls: calls.clone(),
            }),
        ]);

        let score = chain.score(Path::new("a"), Path::new("b")).unwrap();
        assert_eq!(score, 0.75);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_chain_all_failing_is_error() {
        let chain = SimilarityChain::new(vec![Box::new(Fixed {
            result: None,
            calls: Arc::new(AtomicUsize::new(0)),
        })]);
        let err = chain.score(Path::new("a"), Path::new("b")).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
        assert!(SimilarityChain::new(vec![])
            .score(Path::new("a"), Path::new("b"))
            .is_err());
    }

    struct NoWords;

    impl TextExtractor for NoWords {
        fn name(&self) -> &'static str {
            "no-words"
        }

        fn extract(&self, _path: &Path) -> Result<String, Error> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_empty_text_stops_chain_at_zero() {
        let block_calls = Arc::new(AtomicUsize::new(0));
        let chain = SimilarityChain::new(vec![
            Box::new(TextSimilarity::new(NoWords)),
            Box::new(Fixed {
                result: Some(1.0),
                calls: block_calls.clone(),
            }),
        ]);

        let score = chain.score(Path::new("a.pdf"), Path::new("b.pdf")).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(block_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_chain_order() {
        assert_eq!(
            SimilarityChain::default().strategy_names(),
            vec!["pdf-extract", "lopdf", "block-hash"]
        );
    }
}
