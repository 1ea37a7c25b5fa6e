use crate::fs::FsError;

/// calculate [blake3] hash of everything `write` feeds into the hasher
pub fn digest<F>(write: F) -> Result<[u8; 32], FsError>
where
    F: FnOnce(&mut blake3::Hasher) -> Result<(), FsError>,
{
    let mut hasher = blake3::Hasher::new();
    write(&mut hasher)?;
    let mut hash = hasher.finalize_xof();
    let mut output = [0u8; 32];
    hash.fill(&mut output);
    Ok(output)
}

/// render a digest as lowercase hex
pub fn to_hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_digest_matches_blake3() -> Result<(), FsError> {
        let output = digest(|hasher| {
            hasher.write_all(b"partition")?;
            Ok(())
        })?;
        assert_eq!(&output, blake3::hash(b"partition").as_bytes());
        Ok(())
    }

    #[test]
    fn test_to_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hex = to_hex(&bytes);
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }
}
