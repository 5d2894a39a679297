//! BLAKE2b digests used for transaction ids and key hashes.

/// BLAKE2b-256, the digest behind transaction ids.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).hash(data);

    let mut result = [0u8; 32];
    result.copy_from_slice(hash.as_bytes());
    result
}

/// BLAKE2b-224, the digest behind payment key hashes in addresses.
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let hash = blake2b_simd::Params::new().hash_length(28).hash(data);

    let mut result = [0u8; 28];
    result.copy_from_slice(hash.as_bytes());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_empty_input_vector() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn digests_are_deterministic() {
        assert_eq!(blake2b_256(b"tx"), blake2b_256(b"tx"));
        assert_eq!(blake2b_224(b"vkey"), blake2b_224(b"vkey"));
    }

    #[test]
    fn different_lengths_are_not_prefixes() {
        // BLAKE2b mixes the output length into its parameter block.
        let long = blake2b_256(b"abc");
        let short = blake2b_224(b"abc");
        assert_ne!(&long[..28], &short[..]);
    }
}
