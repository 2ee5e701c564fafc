//! Signing and verification seams for the compact signed token format
//!
//! The token codec only depends on these traits, so any keyed-hash
//! implementation can stand in for the built-in [`Hmac`][crate::jwa::Hmac].

use std::{error::Error as StdError, fmt};

/// A JWS signer
pub trait Signer {
    /// The usable signature algorithms
    type Algorithm;

    /// The error returned on failure to sign
    type Error: fmt::Debug + fmt::Display + Sync + Send + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this signer
    fn can_sign(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to sign the data provided using the specified algorithm
    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// A JWS verifier
pub trait Verifier {
    /// The verifiable signature algorithms
    type Algorithm;

    /// The error returned on a failure to verify
    type Error: StdError + Send + Sync + 'static;

    /// Whether the specific algorithm provided is compatible
    /// with this verifier
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Attempts to verify the data against the signature using the
    /// specified algorithm
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<T: Signer + ?Sized> Signer for &'_ T {
    type Algorithm = T::Algorithm;
    type Error = T::Error;

    #[inline]
    fn can_sign(&self, alg: Self::Algorithm) -> bool {
        T::can_sign(&**self, alg)
    }

    #[inline]
    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        T::sign(&**self, alg, data)
    }
}

impl<T: Verifier + ?Sized> Verifier for &'_ T {
    type Algorithm = T::Algorithm;
    type Error = T::Error;

    #[inline]
    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        T::can_verify(&**self, alg)
    }

    #[inline]
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        T::verify(&**self, alg, data, signature)
    }
}
