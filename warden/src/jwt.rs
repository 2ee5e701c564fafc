//! The compact signed token format
//!
//! Access tokens appear as a three-part base64url-encoded string, where each
//! part is separated by a `.`.
//!
//! ```text
//! eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJpYXQiOjEwMH0.<signature>
//! ```
//!
//! The first section is the header in JSON format, naming the signing
//! algorithm and the token type. The second section is the payload in JSON
//! format, holding the [`TokenClaims`]. The third section is the binary
//! keyed-hash signature over the first two sections.
//!
//! Parsing a token with [`AccessToken::parse`] only checks its structure.
//! Nothing in the header or payload should be trusted until the token has
//! been checked by a [`LifecycleValidator`][crate::validator::LifecycleValidator].

use std::{fmt, str::FromStr};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use warden_clock::UnixTime;

use crate::{
    b64,
    claims::{Audiences, Availability, IssuerRef, PrincipalRef, SubjectRef, TokenClaims},
    error, jwa, jws,
};

/// The token type placed in the `typ` header
pub const TOKEN_TYPE: &str = "JWT";

/// An encoded access token
///
/// This type provides custom implementations of [`Display`][JwtRef#impl-Display] and
/// [`Debug`][JwtRef#impl-Debug] to prevent unintentional disclosures of sensitive values.
/// See the documentation on those trait implementations on the [`JwtRef`] type for more
/// information.
#[braid(
    serde,
    debug = "owned",
    display = "owned",
    ord = "omit",
    ref_doc = "\
    A borrowed reference to an encoded access token ([`Jwt`])\n\
    \n\
    This type provides custom implementations of [`Display`][Self#impl-Display] and \
    [`Debug`][Self#impl-Debug] to prevent unintentional disclosures of sensitive values. \
    See the documentation on those trait implementations for more information.
    "
)]
#[must_use]
pub struct Jwt;

impl Jwt {
    /// Constructs a new token from a header and payload, signed by the specified key
    ///
    /// Headers and payload will be serialized as JSON blobs. The header is
    /// serialized as given; callers are responsible for it naming `alg`.
    ///
    /// # Errors
    ///
    /// * If serialization of either the header or payload fails
    /// * If the key refuses to produce a signature
    pub fn try_from_parts_with_signature<H, P, S>(
        headers: &H,
        payload: &P,
        alg: jwa::Algorithm,
        key: &S,
    ) -> Result<Self, error::JwtSigningError>
    where
        H: Serialize,
        P: Serialize,
        S: jws::Signer<Algorithm = jwa::Algorithm>,
        error::JwtSigningError: From<S::Error>,
    {
        let h_raw = serde_json::to_vec(headers).map_err(error::malformed_jwt_header)?;
        let p_raw = serde_json::to_vec(payload).map_err(error::malformed_jwt_payload)?;

        let expected_len = b64::calc_encoded_len(h_raw.len())
            + b64::calc_encoded_len(p_raw.len())
            + b64::calc_encoded_len(alg.signature_size())
            + 2;

        let mut message = String::with_capacity(expected_len);
        message.push_str(&b64::encode(&h_raw));
        message.push('.');
        message.push_str(&b64::encode(&p_raw));

        let s = key.sign(alg, message.as_bytes())?;

        message.push('.');
        message.push_str(&b64::encode(&s));

        debug_assert_eq!(message.len(), expected_len);

        Ok(Self::new(message))
    }
}

/// By default, this type holds potentially sensitive information. To prevent
/// unintentional disclosure of this value, this type will not print out its
/// contents without explicitly specifying the alternate debug format,
/// i.e. `{:#?}`. When specified in this form, it will print out the entire header
/// and payload, but will omit the token's signature. To change the number of
/// characters in the signature that should be printed, specify the amount as a
/// width in the format string, i.e. `{:#25?}`.
///
/// If not specified, a placeholder value will be printed out instead to indicate
/// that it is hiding sensitive information.
///
/// # Example
///
/// ```
/// # use warden::jwt::JwtRef;
/// #
/// let token = JwtRef::from_str("eyJhbGciOiJIUzI1NiJ9.eyJpYXQiOjB9.c2lnbmF0dXJl");
///
/// assert_eq!(format!("{:?}", token), "***JWT***");
/// assert_eq!(format!("{:#?}", token), "\"eyJhbGciOiJIUzI1NiJ9.eyJpYXQiOjB9.…\"");
/// assert_eq!(format!("{:#5?}", token), "\"eyJhbGciOiJIUzI1NiJ9.eyJpYXQiOjB9.c2ln…\"");
/// ```
impl fmt::Debug for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            if let Some(last_period) = self.0.rfind('.') {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, 0)?;
            } else {
                limited_reveal(&self.0, &mut *f, 0)?;
            }
            f.write_str("\"")
        } else {
            f.write_str(concat!("***", "JWT", "***"))
        }
    }
}

/// By default, this type holds potentially sensitive information. To prevent
/// unintentional disclosure of this value, this type will not print out its
/// contents without explicitly specifying the alternate format,
/// i.e. `{:#}`. When specified in this form, it will print out the entire token.
/// To elide some of the characters in the signature, specify the quantity as a
/// width in the format string, i.e. `{:#10}`.
///
/// # Example
///
/// ```
/// # use warden::jwt::JwtRef;
/// #
/// let token = JwtRef::from_str("eyJhbGciOiJIUzI1NiJ9.eyJpYXQiOjB9.c2lnbmF0dXJl");
///
/// assert_eq!(format!("{}", token), "***JWT***");
/// assert_eq!(format!("{:#}", token), "eyJhbGciOiJIUzI1NiJ9.eyJpYXQiOjB9.c2lnbmF0dXJl");
/// ```
impl fmt::Display for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            if let Some(last_period) = self.0.rfind('.') {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, usize::MAX)
            } else {
                limited_reveal(&self.0, &mut *f, usize::MAX)
            }
        } else {
            f.write_str(concat!("***", "JWT", "***"))
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// The header of an access token
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct TokenHeaders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<jwa::Algorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl TokenHeaders {
    /// Constructs token headers, to be signed by the specified algorithm
    pub fn new(alg: jwa::Algorithm) -> Self {
        Self {
            alg: Some(alg),
            typ: Some(TOKEN_TYPE.to_owned()),
        }
    }

    /// The signing algorithm
    pub fn alg(&self) -> Option<jwa::Algorithm> {
        self.alg
    }

    /// The token type
    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }
}

macro_rules! expect_two {
    ($iter:expr) => {{
        let mut i = $iter;
        match (i.next(), i.next(), i.next()) {
            (Some(first), Some(second), None) => Some((first, second)),
            _ => None,
        }
    }};
}

/// A structurally sound, decoded access token
///
/// Holding an `AccessToken` only guarantees that the token could be decoded.
/// The signature has **not** been checked and the time horizons have **not**
/// been evaluated; the accessors below return untrusted values until the token
/// has passed a [`LifecycleValidator`][crate::validator::LifecycleValidator].
#[derive(Clone)]
pub struct AccessToken {
    raw: Jwt,
    message_len: usize,
    headers: TokenHeaders,
    claims: TokenClaims,
    signature: Vec<u8>,
}

impl AccessToken {
    /// Decodes an encoded token into its header, claims, and signature
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, does not have exactly three
    /// `.`-separated sections, or if any section fails to decode.
    pub fn parse(raw: &JwtRef) -> Result<Self, error::JwtParseError> {
        let token = raw.as_str();

        let (s_str, message) =
            expect_two!(token.rsplitn(2, '.')).ok_or_else(error::malformed_jwt)?;
        let (p_str, h_str) =
            expect_two!(message.rsplitn(2, '.')).ok_or_else(error::malformed_jwt)?;

        if h_str.contains('.') {
            return Err(error::malformed_jwt().into());
        }

        let h_raw = b64::decode(h_str).map_err(error::malformed_jwt_header)?;
        let headers: TokenHeaders =
            serde_json::from_slice(&h_raw).map_err(error::malformed_jwt_header)?;

        let p_raw = b64::decode(p_str).map_err(error::malformed_jwt_payload)?;
        let claims: TokenClaims =
            serde_json::from_slice(&p_raw).map_err(error::malformed_jwt_payload)?;

        let signature = b64::decode(s_str).map_err(error::malformed_jwt_signature)?;

        Ok(Self {
            raw: raw.to_owned(),
            message_len: message.len(),
            headers,
            claims,
            signature,
        })
    }

    /// Checks the signature against `key` using the algorithm named in the header
    ///
    /// # Errors
    ///
    /// Returns an error if the header names no algorithm or if the signature
    /// does not match.
    pub fn verify_signature<V>(&self, key: &V) -> Result<(), error::TokenRejected>
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
    {
        let alg = self
            .headers
            .alg()
            .ok_or(error::TokenRejected::MissingRequiredClaim("alg"))?;

        key.verify(alg, self.message().as_bytes(), &self.signature)
            .map_err(|err| {
                tracing::trace!(error = %err, "signature verification failed");
                error::TokenRejected::from(error::signature_mismatch())
            })
    }

    /// The signed portion of the token: the encoded header and payload, separated by a `.`
    pub fn message(&self) -> &str {
        &self.raw.as_str()[..self.message_len]
    }

    /// The encoded token
    pub fn as_jwt(&self) -> &JwtRef {
        &self.raw
    }

    /// Consumes the token, returning its encoded form
    pub fn into_jwt(self) -> Jwt {
        self.raw
    }

    /// The decoded headers
    pub fn headers(&self) -> &TokenHeaders {
        &self.headers
    }

    /// The decoded claims
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// The `typ` header
    pub fn token_type(&self) -> Option<&str> {
        self.headers.typ()
    }

    /// The `iss` claim
    pub fn issuer(&self) -> Option<&IssuerRef> {
        self.claims.iss()
    }

    /// The `aud` claim
    pub fn audience(&self) -> &Audiences {
        self.claims.aud()
    }

    /// The `sub` claim
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.claims.sub()
    }

    /// When the token was issued
    pub fn issued_at(&self) -> Option<UnixTime> {
        self.claims.iat()
    }

    /// When the token stops being usable for protected operations
    pub fn expires_at(&self) -> Option<UnixTime> {
        self.claims.exp()
    }

    /// When the token stops being renewable
    pub fn refresh_expires_at(&self) -> Option<UnixTime> {
        self.claims.refresh_exp()
    }

    /// The ceiling beyond which no renewal of this token is usable
    pub fn available_until(&self) -> Option<Availability> {
        self.claims.available()
    }

    /// The authenticated principal
    pub fn principal(&self) -> Option<&PrincipalRef> {
        self.claims.principal()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("headers", &self.headers)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl FromStr for AccessToken {
    type Err = error::JwtParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(JwtRef::from_str(s))
    }
}
