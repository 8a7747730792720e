//! Identifier Codec
//!
//! Turns internal record ids into opaque, URL-safe tokens and back.
//!
//! ```text
//!  id ──▶ minimal big-endian bytes ──▶ XOR(secret, cycled) ──▶ base64url
//! ```
//!
//! The transform is reversible and keyed, but it is not authenticated: a
//! well-formed token produced under another secret decodes to some unrelated
//! id. Callers must treat "no record with that id" as the invalid-token case.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};

use crate::error::{FurbleError, Result};

/// Keyed, stateless id obfuscation.
#[derive(Clone)]
pub struct IdCodec {
    secret: Vec<u8>,
}

impl IdCodec {
    /// Build a codec from the shared secret. An empty secret is rejected.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(FurbleError::Config("identifier secret must not be empty".into()));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Encode a non-negative id into its external token.
    pub fn encode(&self, id: i64) -> Result<String> {
        if id < 0 {
            return Err(FurbleError::Codec(format!(
                "only non-negative ids can be encoded, got {id}"
            )));
        }

        let bytes = id.to_be_bytes();
        // zero still needs one byte of payload
        let skip = bytes.iter().take_while(|b| **b == 0).count().min(bytes.len() - 1);
        let xored = self.apply_key(&bytes[skip..]);

        Ok(URL_SAFE.encode(xored))
    }

    /// Decode a token back into an id.
    ///
    /// Only structural problems are errors. A token minted with a different
    /// secret decodes "successfully" into an arbitrary id.
    pub fn decode(&self, token: &str) -> Result<i64> {
        let xored = URL_SAFE
            .decode(token.trim())
            .map_err(|e| FurbleError::Codec(format!("malformed token: {e}")))?;

        if xored.is_empty() {
            return Err(FurbleError::Codec("empty token".into()));
        }

        let data = self.apply_key(&xored);
        let significant: Vec<u8> = data.iter().copied().skip_while(|b| *b == 0).collect();
        if significant.len() > 8 {
            return Err(FurbleError::Codec("token does not fit a record id".into()));
        }

        let mut buf = [0u8; 8];
        buf[8 - significant.len()..].copy_from_slice(&significant);
        let value = u64::from_be_bytes(buf);

        i64::try_from(value)
            .map_err(|_| FurbleError::Codec("token does not fit a record id".into()))
    }

    fn apply_key(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.secret.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl std::fmt::Debug for IdCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCodec").field("secret", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> IdCodec {
        IdCodec::new("furble-test-secret").unwrap()
    }

    #[test]
    fn test_roundtrip_across_byte_widths() {
        let codec = codec();
        for id in [0, 1, 255, 256, 65_535, 1 << 24, 1 << 40, i64::MAX] {
            let token = codec.encode(id).unwrap();
            assert_eq!(codec.decode(&token).unwrap(), id, "id {id} via {token}");
        }
    }

    #[test]
    fn test_zero_has_one_byte_payload() {
        let token = codec().encode(0).unwrap();
        // one byte of payload is four base64 chars with padding
        assert_eq!(token.len(), 4);
    }

    #[test]
    fn test_negative_rejected() {
        let err = codec().encode(-1).unwrap_err();
        assert!(matches!(err, FurbleError::Codec(_)));
    }

    #[test]
    fn test_tokens_are_url_safe_and_deterministic() {
        let codec = codec();
        let a = codec.encode(987_654_321).unwrap();
        let b = codec.encode(987_654_321).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn test_foreign_secret_does_not_roundtrip() {
        let ours = codec();
        let theirs = IdCodec::new("some-other-secret").unwrap();
        let token = theirs.encode(42).unwrap();
        assert_ne!(ours.decode(&token).unwrap(), 42);
    }

    #[test]
    fn test_malformed_token() {
        assert!(codec().decode("not base64 !!").is_err());
        assert!(codec().decode("").is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(IdCodec::new("").is_err());
    }
}
