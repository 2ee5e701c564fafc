//! HMAC signing keys and algorithms

use std::fmt;

use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};

use crate::{error, jws};

/// HMAC secret
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct Hmac {
    secret: Vec<u8>,
}

impl fmt::Debug for Hmac {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Hmac { secret }")
    }
}

impl Hmac {
    /// HMAC using the provided secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a new HMAC secret
    ///
    /// # Errors
    ///
    /// Unable to generate a new HMAC secret.
    pub fn generate(alg: SigningAlgorithm) -> Result<Self, ring::error::Unspecified> {
        Self::generate_with_rng(alg, &ring::rand::SystemRandom::new())
    }

    /// Generates a new HMAC secret using the provided source of randomness
    ///
    /// # Errors
    ///
    /// Unable to generate a new HMAC secret from the provided RNG.
    pub fn generate_with_rng(
        alg: SigningAlgorithm,
        rng: &dyn SecureRandom,
    ) -> Result<Self, ring::error::Unspecified> {
        let mut secret = vec![0; alg.recommended_key_size()];
        rng.fill(&mut secret)?;
        Ok(Self { secret })
    }

    /// Whether the key holds any secret material at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

/// HMAC signing algorithms
///
/// Values appear verbatim in the `alg` header of a token.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl SigningAlgorithm {
    /// Recommended key size in bytes for an HMAC secret
    #[must_use]
    fn recommended_key_size(self) -> usize {
        self.signature_size()
    }

    /// The size in bytes of an HMAC signature
    #[must_use]
    pub fn signature_size(self) -> usize {
        match self {
            Self::HS256 => 256 / 8,
            Self::HS384 => 384 / 8,
            Self::HS512 => 512 / 8,
        }
    }

    fn into_ring_algorithm(self) -> ring::hmac::Algorithm {
        match self {
            SigningAlgorithm::HS256 => ring::hmac::HMAC_SHA256,
            SigningAlgorithm::HS384 => ring::hmac::HMAC_SHA384,
            SigningAlgorithm::HS512 => ring::hmac::HMAC_SHA512,
        }
    }
}

impl jws::Signer for Hmac {
    type Algorithm = SigningAlgorithm;
    type Error = error::MissingKeyMaterial;

    fn can_sign(&self, _alg: Self::Algorithm) -> bool {
        !self.is_empty()
    }

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        if self.is_empty() {
            return Err(error::missing_key_material());
        }

        let key = ring::hmac::Key::new(alg.into_ring_algorithm(), &self.secret);
        let digest = ring::hmac::sign(&key, data);
        Ok(digest.as_ref().to_owned())
    }
}

impl jws::Verifier for Hmac {
    type Algorithm = SigningAlgorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Self::Algorithm) -> bool {
        !self.is_empty()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if self.is_empty() {
            return Err(error::signature_mismatch());
        }

        let key = ring::hmac::Key::new(alg.into_ring_algorithm(), &self.secret);
        ring::hmac::verify(&key, data, signature).map_err(|_| error::signature_mismatch())
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        };

        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::{Signer, Verifier};

    #[test]
    fn signature_sizes_match_digest() {
        let key = Hmac::new(b"secret".to_vec());
        for alg in [
            SigningAlgorithm::HS256,
            SigningAlgorithm::HS384,
            SigningAlgorithm::HS512,
        ] {
            let sig = key.sign(alg, b"payload").unwrap();
            assert_eq!(sig.len(), alg.signature_size());
            key.verify(alg, b"payload", &sig).unwrap();
        }
    }

    #[test]
    fn empty_key_refuses_to_sign() {
        let key = Hmac::new(Vec::<u8>::new());
        assert!(!key.can_sign(SigningAlgorithm::HS256));
        assert!(key.sign(SigningAlgorithm::HS256, b"payload").is_err());
    }

    #[test]
    fn empty_key_never_verifies() {
        let key = Hmac::new(Vec::<u8>::new());
        let sig = ring::hmac::sign(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b""),
            b"payload",
        );
        assert!(key
            .verify(SigningAlgorithm::HS256, b"payload", sig.as_ref())
            .is_err());
    }

    #[test]
    fn different_keys_disagree() {
        let a = Hmac::generate(SigningAlgorithm::HS256).unwrap();
        let b = Hmac::generate(SigningAlgorithm::HS256).unwrap();
        let sig = a.sign(SigningAlgorithm::HS256, b"payload").unwrap();
        assert!(b.verify(SigningAlgorithm::HS256, b"payload", &sig).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let key = Hmac::new(b"hunter2".to_vec());
        assert_eq!(format!("{:?}", key), "Hmac { secret }");
    }

    #[test]
    fn algorithm_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&SigningAlgorithm::HS256).unwrap(),
            "\"HS256\""
        );
        assert!(serde_json::from_str::<SigningAlgorithm>("\"none\"").is_err());
    }
}
