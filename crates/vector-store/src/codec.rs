//! Binary layout of the vector-index artifact.
//!
//! ```text
//! magic "CGV1" | dimension: u32 LE | count: u64 LE | count * dimension f32 LE
//! ```

use crate::error::{Result, VectorStoreError};

const MAGIC: &[u8; 4] = b"CGV1";
const HEADER_LEN: usize = 4 + 4 + 8;

pub(crate) fn encode(dimension: usize, count: usize, values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + values.len() * 4);
    out.extend_from_slice(MAGIC);
    #[allow(clippy::cast_possible_truncation)]
    let dim = dimension as u32;
    out.extend_from_slice(&dim.to_le_bytes());
    out.extend_from_slice(&(count as u64).to_le_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Returns `(dimension, count, values)`
pub(crate) fn decode(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN {
        return Err(VectorStoreError::corrupt(format!(
            "artifact is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(VectorStoreError::corrupt("bad magic"));
    }

    let dimension = u32::from_le_bytes(read_array(&bytes[4..8])?) as usize;
    let count = usize::try_from(u64::from_le_bytes(read_array(&bytes[8..16])?))
        .map_err(|_| VectorStoreError::corrupt("vector count does not fit in memory"))?;

    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| VectorStoreError::corrupt("header sizes overflow"))?;
    if bytes.len() != expected_len {
        return Err(VectorStoreError::corrupt(format!(
            "expected {expected_len} bytes for {count} vectors of dimension {dimension}, found {}",
            bytes.len()
        )));
    }

    let values = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|b| read_array(b).map(f32::from_le_bytes))
        .collect::<Result<Vec<f32>>>()?;

    Ok((dimension, count, values))
}

fn read_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| VectorStoreError::corrupt("truncated field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_back_header_and_values() {
        let bytes = encode(2, 2, &[1.0, -2.5, 0.0, 3.25]);
        let (dimension, count, values) = decode(&bytes).unwrap();
        assert_eq!((dimension, count), (2, 2));
        assert_eq!(values, vec![1.0, -2.5, 0.0, 3.25]);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut bytes = encode(1, 1, &[1.0]);
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(VectorStoreError::CorruptData(_))));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let bytes = encode(3, 2, &[0.0; 6]);
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(VectorStoreError::CorruptData(_))
        ));
        assert!(matches!(decode(&bytes[..10]), Err(VectorStoreError::CorruptData(_))));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = encode(1, 1, &[1.0]);
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(VectorStoreError::CorruptData(_))));
    }
}
