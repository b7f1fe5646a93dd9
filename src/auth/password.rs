//! Salted PBKDF2-HMAC-SHA256 password records of the form `salt_hex:digest_hex`.
//!
//! The salt is used as its hex text (the ASCII bytes of `salt_hex`), not the raw
//! random bytes, so records written by earlier deployments keep verifying.

use std::num::NonZeroU32;

use rand::{rngs::OsRng, RngCore};
use ring::{digest::SHA256_OUTPUT_LEN, pbkdf2};

use crate::errors::ServerError;

pub const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

const SALT_LEN: usize = 16;

// Verified against when the username is unknown, so both failures cost the same.
const DUMMY_RECORD: &str = "00000000000000000000000000000000:\
                            0000000000000000000000000000000000000000000000000000000000000000";

pub fn hash(password: &str) -> Result<String, ServerError> {
    let mut raw_salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut raw_salt).map_err(|e| {
        log::error!("salt generation: {e}");
        ServerError::HashError
    })?;
    let salt = hex::encode(raw_salt);

    let mut digest = [0u8; SHA256_OUTPUT_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        salt.as_bytes(),
        password.as_bytes(),
        &mut digest,
    );

    Ok(format!("{}:{}", salt, hex::encode(digest)))
}

/// Never fails: a malformed record simply does not match.
pub fn verify(password: &str, record: &str) -> bool {
    let (salt, digest_hex) = match record.split_once(':') {
        Some(parts) => parts,
        None => return false,
    };
    let digest = match hex::decode(digest_hex) {
        Ok(d) if d.len() == SHA256_OUTPUT_LEN => d,
        _ => return false,
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        salt.as_bytes(),
        password.as_bytes(),
        &digest,
    )
    .is_ok()
}

/// Burns one derivation without matching anything.
pub fn verify_dummy(password: &str) {
    let _ = verify(password, DUMMY_RECORD);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let record = hash("correct horse").unwrap();
        assert!(verify("correct horse", &record));
        assert!(!verify("correct horsE", &record));
        assert!(!verify("", &record));
    }

    #[test]
    fn salts_differ_between_records() {
        let first = hash("same password").unwrap();
        let second = hash("same password").unwrap();
        assert_ne!(first, second);
        assert!(verify("same password", &first));
        assert!(verify("same password", &second));

        let (salt, digest) = first.split_once(':').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(digest.len(), SHA256_OUTPUT_LEN * 2);
    }

    #[test]
    fn reads_existing_records() {
        let record = "0123456789abcdef0123456789abcdef:\
                      81099d818b89c8bd6eb98a94698e053edfb59a092363020a6e25e790a33710d7";
        assert!(verify("admin123", record));
        assert!(!verify("admin124", record));
    }

    #[test]
    fn malformed_records_never_match() {
        assert!(!verify("pw", ""));
        assert!(!verify("pw", "no-separator"));
        assert!(!verify("pw", "salt:not-hex"));
        assert!(!verify("pw", "salt:abcd"));
        assert!(!verify("pw", "a:b:c"));
        verify_dummy("pw");
    }
}
