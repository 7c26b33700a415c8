pub mod blocks;
pub mod content;

pub use blocks::{block_hash_set, BLOCK_SIZE};
pub use content::{hash_file, hash_reader, HASH_BUFFER_SIZE};
