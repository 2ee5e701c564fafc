//! Common errors

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

/// The token is malformed and cannot be parsed out into header, payload, and signature sections
#[derive(Clone, Copy, Debug, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// The token header section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT header")]
pub struct MalformedJwtHeader {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The token payload section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// The token signature section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT signature")]
pub struct MalformedJwtSignature {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtSignature {
    MalformedJwtSignature {
        source: source.into(),
    }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The signing key holds no key material
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("cannot sign with empty key material")]
pub struct MissingKeyMaterial {
    _p: (),
}

pub(crate) const fn missing_key_material() -> MissingKeyMaterial {
    MissingKeyMaterial { _p: () }
}

/// An error occurring while creating a signature
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key cannot be used for signing operations
    #[error(transparent)]
    MissingKeyMaterial(#[from] MissingKeyMaterial),
}

/// An error occurring while parsing a token
#[derive(Debug, Error)]
pub enum JwtParseError {
    /// The token is malformed, without a discernible header, payload, and signature
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The token header is malformed
    #[error(transparent)]
    MalformedTokenHeader(#[from] MalformedJwtHeader),

    /// The token payload is malformed
    #[error(transparent)]
    MalformedTokenPayload(#[from] MalformedJwtPayload),

    /// The token signature is malformed
    #[error(transparent)]
    MalformedTokenSignature(#[from] MalformedJwtSignature),
}

/// An error occurring while assembling and signing a token
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The key refused to produce a signature
    #[error(transparent)]
    SigningError(#[from] SigningError),

    /// The token header could not be serialized
    #[error(transparent)]
    MalformedJwtHeader(#[from] MalformedJwtHeader),

    /// The token payload could not be serialized
    #[error(transparent)]
    MalformedJwtPayload(#[from] MalformedJwtPayload),
}

impl From<MissingKeyMaterial> for JwtSigningError {
    fn from(err: MissingKeyMaterial) -> Self {
        Self::SigningError(err.into())
    }
}

/// The reason a token failed a lifecycle check
#[derive(Debug, Error)]
pub enum TokenRejected {
    /// A required header or claim is absent
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),

    /// The token was signed with an algorithm that is not approved
    #[error("invalid algorithm")]
    InvalidAlgorithm,

    /// The signature does not verify under the key
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),

    /// The `iat` claim lies in the future beyond the leeway
    #[error("token issued in the future")]
    IssuedInFuture,

    /// The primary expiry has elapsed
    #[error("token expired")]
    TokenExpired,

    /// Both the primary expiry and the refresh deadline have elapsed
    #[error("token expired and refresh window elapsed")]
    RefreshExpired,

    /// The availability ceiling has elapsed
    #[error("token availability elapsed")]
    AvailabilityExpired,
}

impl TokenRejected {
    /// Whether the token failed because of its structure or signature rather than its timing
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredClaim(_) | Self::InvalidAlgorithm | Self::SignatureMismatch(_)
        )
    }
}

/// A token that cannot be accepted for the requested operation
///
/// Callers recover from these by re-authenticating.
#[derive(Debug, Error)]
pub enum InvalidToken {
    /// The token could not be parsed
    #[error("invalid token")]
    Malformed(#[from] JwtParseError),

    /// The token cannot be exchanged for a fresh one
    #[error("token is not available")]
    NotAvailable(#[source] TokenRejected),

    /// The token is within its primary expiry, but its refresh deadline has passed
    #[error("token refresh window expired")]
    RefreshWindowExpired,
}

/// An error produced while issuing or renewing a token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The presented token is unusable
    #[error(transparent)]
    InvalidToken(#[from] InvalidToken),

    /// The token could not be signed; not retryable
    #[error("internal error: unable to sign token")]
    Internal(#[from] JwtSigningError),
}

impl From<JwtParseError> for TokenError {
    fn from(err: JwtParseError) -> Self {
        Self::InvalidToken(err.into())
    }
}

impl TokenError {
    /// Whether the error is due to an unusable token
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken(_))
    }

    /// Whether the error is due to the token's refresh window having closed
    #[must_use]
    pub fn is_refresh_window_expired(&self) -> bool {
        matches!(self, Self::InvalidToken(InvalidToken::RefreshWindowExpired))
    }

    /// Whether the error is an internal signing failure
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
