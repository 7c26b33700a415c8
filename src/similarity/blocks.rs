use super::{jaccard, SimilarityStrategy};
use crate::error::Error;
use crate::hasher::block_hash_set;
use std::path::Path;

/// Jaccard over the sets of 4KB block hashes. Needs no text layout, so it is
/// the last resort for scanned or corrupt documents.
pub struct BlockSimilarity;

impl SimilarityStrategy for BlockSimilarity {
    fn name(&self) -> &'static str {
        "block-hash"
    }

    fn similarity(&self, a: &Path, b: &Path) -> Result<f64, Error> {
        let blocks_a = block_hash_set(a).map_err(|e| Error::unreadable(a, e))?;
        let blocks_b = block_hash_set(b).map_err(|e| Error::unreadable(b, e))?;
        Ok(jaccard(&blocks_a, &blocks_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::BLOCK_SIZE;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_block_similarity_partial_overlap() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");

        let mut data_a = vec![1u8; BLOCK_SIZE];
        data_a.extend(vec![2u8; BLOCK_SIZE]);
        data_a.extend(vec![3u8; BLOCK_SIZE]);
        let mut data_b = vec![1u8; BLOCK_SIZE];
        data_b.extend(vec![2u8; BLOCK_SIZE]);
        data_b.extend(vec![9u8; BLOCK_SIZE]);
        fs::write(&a, &data_a).unwrap();
        fs::write(&b, &data_b).unwrap();

        let ab = BlockSimilarity.similarity(&a, &b).unwrap();
        let ba = BlockSimilarity.similarity(&b, &a).unwrap();
        assert_eq!(ab, 0.5);
        assert_eq!(ab, ba);
        assert_eq!(BlockSimilarity.similarity(&a, &a).unwrap(), 1.0);
    }

    #[test]
    fn test_block_similarity_empty_file_scores_zero() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        fs::write(&a, b"").unwrap();
        fs::write(&b, b"content").unwrap();
        assert_eq!(BlockSimilarity.similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_block_similarity_missing_file_errors() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        fs::write(&a, b"content").unwrap();
        let err = BlockSimilarity
            .similarity(&a, &dir.path().join("missing.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::Unreadable { .. }));
    }
}
