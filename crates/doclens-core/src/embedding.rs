//! Local embedding fallback and vector utilities.
//!
//! [`local_embed`] is a deterministic, offline text → vector function used
//! when no remote embedding model is configured. It is not semantic in any
//! deep sense; it gives documents and queries a stable, comparable vector
//! so that semantic mode keeps working without a network.
//!
//! Also provides BLOB encoding helpers for stores that persist vectors as
//! raw bytes.

/// Dimensionality of vectors produced by [`local_embed`].
pub const LOCAL_EMBEDDING_DIMS: usize = 64;

/// Number of leading characters of the input that contribute to the vector.
pub const LOCAL_EMBEDDING_MAX_CHARS: usize = 2000;

/// Compute the local fallback embedding of `text`.
///
/// Each of the first [`LOCAL_EMBEDDING_MAX_CHARS`] UTF-16 code units adds
/// `code % 10` to bucket `index % 64`. The accumulator is then divided by
/// its Euclidean norm, or left as-is when the norm is zero.
///
/// ```rust
/// use doclens_core::embedding::{local_embed, LOCAL_EMBEDDING_DIMS};
///
/// let v = local_embed("hello world");
/// assert_eq!(v.len(), LOCAL_EMBEDDING_DIMS);
/// assert_eq!(v, local_embed("hello world"));
/// ```
pub fn local_embed(text: &str) -> Vec<f32> {
    let mut acc = [0.0f64; LOCAL_EMBEDDING_DIMS];

    for (i, unit) in text
        .encode_utf16()
        .take(LOCAL_EMBEDDING_MAX_CHARS)
        .enumerate()
    {
        acc[i % LOCAL_EMBEDDING_DIMS] += f64::from(unit % 10);
    }

    let norm = acc.iter().map(|x| x * x).sum::<f64>().sqrt();
    let divisor = if norm == 0.0 { 1.0 } else { norm };

    acc.iter().map(|x| (x / divisor) as f32).collect()
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use doclens_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Trailing partial values are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
