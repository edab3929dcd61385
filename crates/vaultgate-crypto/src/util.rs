use rand::RngCore;
use zeroize::Zeroizing;

/// Generate random bytes that are cryptographically secure
pub fn generate_random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_bytes() {
        let a = generate_random_bytes(32);
        let b = generate_random_bytes(32);

        assert_eq!(a.len(), 32);
        // Two fresh 256-bit values colliding means the RNG is broken.
        assert_ne!(*a, *b);
    }
}
