use crate::error::Error;
use crate::model::ContentHash;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use tracing::trace;

pub const HASH_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Stream a file through BLAKE3 in 64KB chunks.
///
/// Fails with `Error::Unreadable` when the path is missing, is not a regular
/// file, or cannot be read. Callers skip the file on error.
pub fn hash_file(path: &Path) -> Result<ContentHash, Error> {
    let metadata = fs::metadata(path).map_err(|e| Error::unreadable(path, e))?;
    if !metadata.is_file() {
        return Err(Error::unreadable(
            path,
            io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
    let hash = hash_reader(file).map_err(|e| Error::unreadable(path, e))?;
    trace!("Hashed {} -> {}", path.display(), hash);
    Ok(hash)
}

pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::from_bytes(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_hash_independent_of_read_chunking() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let whole = hash_reader(Cursor::new(&data)).unwrap();
        let trickled = hash_reader(Trickle {
            data: &data,
            chunk: 7,
        })
        .unwrap();
        assert_eq!(whole, trickled);
        assert_eq!(
            whole,
            ContentHash::from_bytes(*blake3::hash(&data).as_bytes())
        );
    }

    #[test]
    fn test_hash_file_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"some content").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
    }

    #[test]
    fn test_hash_file_differs_for_different_bytes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"content one").unwrap();
        fs::write(&b, b"content two").unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn test_hash_missing_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let err = hash_file(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Unreadable { .. }));
    }

    #[test]
    fn test_hash_directory_is_unreadable() {
        let dir = tempdir().unwrap();
        let err = hash_file(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Unreadable { .. }));
    }
}
