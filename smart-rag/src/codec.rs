//! Binary vector encoding for the KNN wire format.
//!
//! RediSearch expects `FLOAT32` vector fields and query parameters as raw
//! little-endian IEEE-754 bytes, four per component.

use crate::error::{RagError, Result};

/// Serialize a vector into little-endian `f32` bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// Decode little-endian `f32` bytes produced by [`encode_vector`].
///
/// # Errors
///
/// Returns [`RagError::ParseError`] if the length is not a multiple of four.
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::ParseError(format!(
            "vector blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian() {
        assert_eq!(encode_vector(&[1.0]), vec![0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(encode_vector(&[-2.0, 0.0]), vec![0, 0, 0, 0xc0, 0, 0, 0, 0]);
        assert!(encode_vector(&[]).is_empty());
    }

    #[test]
    fn rejects_truncated_blob() {
        assert!(matches!(decode_vector(&[0, 0, 128]), Err(RagError::ParseError(_))));
    }

    #[test]
    fn decodes_extreme_values() {
        let values = [f32::MIN, f32::MAX, -0.0, f32::EPSILON, 1e-38];
        let decoded = decode_vector(&encode_vector(&values)).unwrap();
        assert_eq!(
            decoded.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            values.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
