use ahash::AHashSet;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use twox_hash::XxHash64;

pub const BLOCK_SIZE: usize = 4096; // 4KB

/// Set of XxHash64 digests of each fixed 4KB block in the file.
/// The trailing block may be shorter. Empty files yield an empty set.
pub fn block_hash_set(path: &Path) -> io::Result<AHashSet<u64>> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; BLOCK_SIZE];
    let mut blocks = AHashSet::new();

    loop {
        let filled = fill_block(&mut file, &mut buffer)?;
        if filled == 0 {
            break;
        }
        blocks.insert(hash_data(&buffer[..filled]));
        if filled < BLOCK_SIZE {
            break;
        }
    }

    Ok(blocks)
}

/// Read until the buffer is full or EOF, so block boundaries do not depend on
/// how the OS splits reads.
fn fill_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_block_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.bin");
        let mut data = vec![1u8; BLOCK_SIZE];
        data.extend(vec![2u8; BLOCK_SIZE]);
        data.extend(vec![3u8; 10]);
        fs::write(&path, &data).unwrap();

        let blocks = block_hash_set(&path).unwrap();
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_repeated_blocks_collapse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.bin");
        fs::write(&path, vec![0xAAu8; BLOCK_SIZE * 4]).unwrap();
        assert_eq!(block_hash_set(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_file_has_no_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();
        assert!(block_hash_set(&path).unwrap().is_empty());
    }
}
