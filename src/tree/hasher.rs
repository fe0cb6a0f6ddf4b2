//! Content hashing using BLAKE3

use blake3::Hasher;

/// Hash of a file's content.
pub fn compute_content_hash(content: &[u8]) -> [u8; 32] {
    *blake3::hash(content).as_bytes()
}

/// Fingerprint of a set of files, hex-encoded.
///
/// fingerprint = hash(for each entry: "file" || path_len || path || content_hash)
///
/// Entries must be sorted by path for determinism.
pub fn compute_tree_fingerprint<'a>(entries: impl Iterator<Item = (&'a str, &'a [u8])>) -> String {
    let mut hasher = Hasher::new();
    for (path, content) in entries {
        let path_bytes = path.as_bytes();

        // Hash type discriminator
        hasher.update(b"file");

        // Hash path length (8 bytes, big-endian for determinism)
        hasher.update(&(path_bytes.len() as u64).to_be_bytes());

        hasher.update(path_bytes);
        hasher.update(&compute_content_hash(content));
    }
    hex::encode(hasher.finalize().as_bytes())
}
