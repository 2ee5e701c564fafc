//! The claim set carried by an access token
//!
//! A token encodes three nested time horizons:
//!
//! * `exp`: the primary expiry, after which the token is no longer usable
//!   for protected operations;
//! * [`REFRESH_EXPIRATION_CLAIM`]: the deadline for exchanging the token for
//!   a fresh one;
//! * [`AVAILABLE_EXPIRATION_CLAIM`]: an absolute ceiling that no renewal of
//!   the token may ever extend beyond, or `0` when there is no ceiling.
//!
//! The authenticated identity travels in [`PRINCIPAL_CLAIM`].

use std::fmt;

use aliri_braid::braid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use warden_clock::{DurationSecs, UnixTime};

/// Claim holding the authenticated principal
pub const PRINCIPAL_CLAIM: &str = "tsurugi/auth/name";

/// Claim holding the refresh deadline
pub const REFRESH_EXPIRATION_CLAIM: &str = "tsurugi/exp/refresh";

/// Claim holding the availability ceiling
pub const AVAILABLE_EXPIRATION_CLAIM: &str = "tsurugi/exp/available";

/// The authenticated identity a token stands in for
#[braid(serde, ref_doc = "A borrowed reference to a [`Principal`]")]
pub struct Principal;

/// An audience
#[braid(serde, ref_doc = "A borrowed reference to an [`Audience`]")]
pub struct Audience;

/// An issuer of tokens
#[braid(serde, ref_doc = "A borrowed reference to an [`Issuer`]")]
pub struct Issuer;

/// The subject of a token
#[braid(serde, ref_doc = "A borrowed reference to a [`Subject`]")]
pub struct Subject;

/// The absolute ceiling on a token and every token renewed from it
///
/// On the wire, an unbounded ceiling is encoded as `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Availability {
    /// No ceiling; renewals are limited only by the refresh window
    Unbounded,

    /// No derivative of the token may be usable after this instant
    Until(UnixTime),
}

impl Availability {
    /// The ceiling for a token issued at `now` with an availability window
    /// of `window`, where a zero-length window means no ceiling
    #[inline]
    pub fn from_window(now: UnixTime, window: DurationSecs) -> Self {
        if window.is_zero() {
            Self::Unbounded
        } else {
            Self::from(now + window)
        }
    }

    /// The ceiling, if there is one
    #[inline]
    #[must_use]
    pub fn deadline(self) -> Option<UnixTime> {
        match self {
            Self::Unbounded => None,
            Self::Until(t) => Some(t),
        }
    }

    /// Whether the ceiling is bounded
    #[inline]
    #[must_use]
    pub fn is_bounded(self) -> bool {
        matches!(self, Self::Until(_))
    }

    /// Pulls `time` back to the ceiling if it would exceed it
    #[inline]
    #[must_use]
    pub fn clamp(self, time: UnixTime) -> UnixTime {
        match self {
            Self::Until(ceiling) if time > ceiling => ceiling,
            _ => time,
        }
    }
}

impl From<UnixTime> for Availability {
    /// The epoch is indistinguishable from the unbounded marker on the wire
    #[inline]
    fn from(time: UnixTime) -> Self {
        if time == UnixTime::EPOCH {
            Self::Unbounded
        } else {
            Self::Until(time)
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Until(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl Serialize for Availability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.deadline()
            .unwrap_or(UnixTime::EPOCH)
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Availability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        UnixTime::deserialize(deserializer).map(Self::from)
    }
}

/// A set of zero or more [`Audience`]s
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<Audience>", into = "OneOrMany<Audience>")]
#[repr(transparent)]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// An empty audience set
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// An audience set with a single audience
    #[inline]
    pub fn single(aud: impl Into<Audience>) -> Self {
        Self(vec![aud.into()])
    }

    /// Indicates whether the audience set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates through references to the audiences in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AudienceRef> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl From<OneOrMany<Audience>> for Audiences {
    #[inline]
    fn from(vals: OneOrMany<Audience>) -> Self {
        match vals {
            OneOrMany::One(x) => Self(vec![x]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl From<Audiences> for OneOrMany<Audience> {
    #[inline]
    fn from(mut vec: Audiences) -> Self {
        if vec.0.len() == 1 {
            if let Some(one) = vec.0.pop() {
                return Self::One(one);
            }
        }

        Self::Many(vec.0)
    }
}

impl From<Vec<Audience>> for Audiences {
    #[inline]
    fn from(vals: Vec<Audience>) -> Self {
        Self(vals)
    }
}

impl From<Audience> for Audiences {
    #[inline]
    fn from(aud: Audience) -> Self {
        Self::single(aud)
    }
}

/// A type representing one or more items, primarily for serialization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item
    One(T),

    /// Zero or more items, to be serialized/deserialized as an array
    Many(Vec<T>),
}

/// The claims carried in the payload of an access token
///
/// Every claim is optional at the type level so that a token missing one can
/// still be decoded and then rejected by the validator instead of failing to
/// parse.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(default, skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(
        rename = "tsurugi/exp/refresh",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    refresh_exp: Option<UnixTime>,
    #[serde(
        rename = "tsurugi/exp/available",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    available: Option<Availability>,
    #[serde(
        rename = "tsurugi/auth/name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    principal: Option<Principal>,
}

impl TokenClaims {
    /// Constructs a new, empty claim set
    pub const fn new() -> Self {
        Self {
            iss: None,
            sub: None,
            aud: Audiences::empty(),
            iat: None,
            exp: None,
            refresh_exp: None,
            available: None,
            principal: None,
        }
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets or clears the `iss` claim
    pub fn with_optional_issuer(mut self, iss: Option<Issuer>) -> Self {
        self.iss = iss;
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets or clears the `sub` claim
    pub fn with_optional_subject(mut self, sub: Option<Subject>) -> Self {
        self.sub = sub;
        self
    }

    /// Sets the `aud` claim, where multiple audiences are allowed
    pub fn with_audiences(mut self, aud: impl Into<Audiences>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the `iat` claim
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.iat = Some(time);
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the refresh deadline claim
    pub fn with_refresh_expiration(mut self, time: UnixTime) -> Self {
        self.refresh_exp = Some(time);
        self
    }

    /// Sets the availability ceiling claim
    pub fn with_availability(mut self, available: Availability) -> Self {
        self.available = Some(available);
        self
    }

    /// Sets the principal claim
    pub fn with_principal(mut self, principal: impl Into<Principal>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Issuer
    pub fn iss(&self) -> Option<&IssuerRef> {
        self.iss.as_deref()
    }

    /// Subject
    pub fn sub(&self) -> Option<&SubjectRef> {
        self.sub.as_deref()
    }

    /// Audiences; empty when the claim is absent
    pub fn aud(&self) -> &Audiences {
        &self.aud
    }

    /// Issued at
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// Primary expiry
    pub fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    /// Refresh deadline
    pub fn refresh_exp(&self) -> Option<UnixTime> {
        self.refresh_exp
    }

    /// Availability ceiling
    pub fn available(&self) -> Option<Availability> {
        self.available
    }

    /// Authenticated principal
    pub fn principal(&self) -> Option<&PrincipalRef> {
        self.principal.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn custom_claim_names_on_the_wire() -> Result<()> {
        let claims = TokenClaims::new()
            .with_principal("alice")
            .with_refresh_expiration(UnixTime(20))
            .with_availability(Availability::Until(UnixTime(30)));

        let value = serde_json::to_value(&claims)?;
        assert_eq!(value[PRINCIPAL_CLAIM], "alice");
        assert_eq!(value[REFRESH_EXPIRATION_CLAIM], 20);
        assert_eq!(value[AVAILABLE_EXPIRATION_CLAIM], 30);

        Ok(())
    }

    #[test]
    fn zero_availability_is_unbounded() -> Result<()> {
        let claims: TokenClaims = serde_json::from_str(r#"{"tsurugi/exp/available": 0}"#)?;
        assert_eq!(claims.available(), Some(Availability::Unbounded));

        let out = serde_json::to_value(
            TokenClaims::new().with_availability(Availability::Unbounded),
        )?;
        assert_eq!(out[AVAILABLE_EXPIRATION_CLAIM], 0);

        Ok(())
    }

    #[test]
    fn absent_claims_stay_absent() -> Result<()> {
        let claims: TokenClaims = serde_json::from_str("{}")?;
        assert_eq!(claims, TokenClaims::new());
        assert_eq!(serde_json::to_string(&claims)?, "{}");
        Ok(())
    }

    #[test]
    fn audience_accepts_single_string_or_list() -> Result<()> {
        let one: TokenClaims = serde_json::from_str(r#"{"aud": "metadata-manager"}"#)?;
        let many: TokenClaims = serde_json::from_str(r#"{"aud": ["a", "b"]}"#)?;

        assert_eq!(
            one.aud().iter().map(AudienceRef::as_str).collect::<Vec<_>>(),
            ["metadata-manager"]
        );
        assert_eq!(
            many.aud().iter().map(AudienceRef::as_str).collect::<Vec<_>>(),
            ["a", "b"]
        );

        Ok(())
    }

    #[test]
    fn availability_clamps_only_when_bounded() {
        let bounded = Availability::Until(UnixTime(100));
        assert_eq!(bounded.clamp(UnixTime(150)), UnixTime(100));
        assert_eq!(bounded.clamp(UnixTime(50)), UnixTime(50));
        assert_eq!(Availability::Unbounded.clamp(UnixTime(150)), UnixTime(150));
    }

    #[test]
    fn availability_window_of_zero_is_unbounded() {
        assert_eq!(
            Availability::from_window(UnixTime(10), DurationSecs::ZERO),
            Availability::Unbounded
        );
        assert_eq!(
            Availability::from_window(UnixTime(10), DurationSecs(5)),
            Availability::Until(UnixTime(15))
        );
    }

    #[test]
    fn malformed_claim_types_fail_to_decode() {
        assert!(serde_json::from_str::<TokenClaims>(r#"{"exp": "soon"}"#).is_err());
    }
}
