//! Token issuance settings
//!
//! A [`TokenConfig`] is an immutable snapshot. Build one directly with
//! [`TokenConfig::new`] and the `with_*` methods, or read it from the
//! environment with [`TokenConfig::from_env`].

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use warden_clock::{DurationSecs, Leeway};

use crate::{
    claims::{Audience, AudienceRef, Issuer, IssuerRef, Subject, SubjectRef},
    jwa,
};

/// Environment variable holding the HMAC secret
pub const SECRET_KEY_VAR: &str = "WARDEN_JWT_SECRET_KEY";
/// Environment variable holding the `iss` claim
pub const ISSUER_VAR: &str = "WARDEN_JWT_CLAIM_ISS";
/// Environment variable holding the `aud` claim
pub const AUDIENCE_VAR: &str = "WARDEN_JWT_CLAIM_AUD";
/// Environment variable holding the `sub` claim
pub const SUBJECT_VAR: &str = "WARDEN_JWT_CLAIM_SUB";
/// Environment variable holding the primary expiry window
pub const EXPIRATION_VAR: &str = "WARDEN_TOKEN_EXPIRATION";
/// Environment variable holding the refresh window
pub const REFRESH_EXPIRATION_VAR: &str = "WARDEN_TOKEN_EXPIRATION_REFRESH";
/// Environment variable holding the availability window
pub const AVAILABLE_EXPIRATION_VAR: &str = "WARDEN_TOKEN_EXPIRATION_AVAILABLE";

const DEFAULT_ISSUER: &str = "authentication-manager";
const DEFAULT_AUDIENCE: &str = "metadata-manager";
const DEFAULT_SUBJECT: &str = "AuthenticationToken";

/// Five minutes
pub const DEFAULT_EXPIRATION: DurationSecs = DurationSecs(300);
/// One day
pub const DEFAULT_REFRESH_EXPIRATION: DurationSecs = DurationSecs(86_400);
/// One week
pub const DEFAULT_AVAILABLE_EXPIRATION: DurationSecs = DurationSecs(604_800);

static DURATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(s?|min|h|d)$").unwrap());

/// An error building a configuration from the environment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No secret key was supplied
    #[error("WARDEN_JWT_SECRET_KEY must be set to a non-empty value")]
    MissingSecretKey,
}

/// Settings applied when issuing and renewing tokens
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct TokenConfig {
    secret_key: jwa::Hmac,
    issuer: Option<Issuer>,
    audience: Option<Audience>,
    subject: Option<Subject>,
    expiration: DurationSecs,
    refresh_expiration: DurationSecs,
    available_expiration: DurationSecs,
    leeway: Leeway,
}

impl TokenConfig {
    /// A configuration signing with `secret` and otherwise using the defaults
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_key(jwa::Hmac::new(secret))
    }

    /// A configuration signing with `key` and otherwise using the defaults
    pub fn with_key(key: jwa::Hmac) -> Self {
        Self {
            secret_key: key,
            issuer: Some(Issuer::from_static(DEFAULT_ISSUER)),
            audience: Some(Audience::from_static(DEFAULT_AUDIENCE)),
            subject: Some(Subject::from_static(DEFAULT_SUBJECT)),
            expiration: DEFAULT_EXPIRATION,
            refresh_expiration: DEFAULT_REFRESH_EXPIRATION,
            available_expiration: DEFAULT_AVAILABLE_EXPIRATION,
            leeway: Leeway::STANDARD,
        }
    }

    /// Reads the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup
    ///
    /// Unset identity claims fall back to their defaults. Durations that
    /// cannot be parsed fall back to their defaults with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is absent or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SECRET_KEY_VAR)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecretKey)?;

        let claim = |name: &str, default: &'static str| {
            lookup(name).unwrap_or_else(|| default.to_owned())
        };

        let duration = |name: &str, default: DurationSecs| match lookup(name) {
            None => default,
            Some(value) => parse_duration(&value).unwrap_or_else(|| {
                tracing::warn!(
                    variable = name,
                    value = %value,
                    default = %default,
                    "unable to parse duration, using default"
                );
                default
            }),
        };

        Ok(Self {
            secret_key: jwa::Hmac::new(secret.into_bytes()),
            issuer: Some(Issuer::new(claim(ISSUER_VAR, DEFAULT_ISSUER))),
            audience: Some(Audience::new(claim(AUDIENCE_VAR, DEFAULT_AUDIENCE))),
            subject: Some(Subject::new(claim(SUBJECT_VAR, DEFAULT_SUBJECT))),
            expiration: duration(EXPIRATION_VAR, DEFAULT_EXPIRATION),
            refresh_expiration: duration(REFRESH_EXPIRATION_VAR, DEFAULT_REFRESH_EXPIRATION),
            available_expiration: duration(AVAILABLE_EXPIRATION_VAR, DEFAULT_AVAILABLE_EXPIRATION),
            leeway: Leeway::STANDARD,
        })
    }

    /// Sets the `iss` claim of issued tokens
    #[inline]
    pub fn with_issuer(self, issuer: impl Into<Issuer>) -> Self {
        self.with_optional_issuer(Some(issuer.into()))
    }

    /// Sets or clears the `iss` claim of issued tokens
    #[inline]
    pub fn with_optional_issuer(self, issuer: Option<Issuer>) -> Self {
        Self { issuer, ..self }
    }

    /// Sets the `aud` claim of issued tokens
    #[inline]
    pub fn with_audience(self, audience: impl Into<Audience>) -> Self {
        self.with_optional_audience(Some(audience.into()))
    }

    /// Sets or clears the `aud` claim of issued tokens
    #[inline]
    pub fn with_optional_audience(self, audience: Option<Audience>) -> Self {
        Self { audience, ..self }
    }

    /// Sets the `sub` claim of issued tokens
    #[inline]
    pub fn with_subject(self, subject: impl Into<Subject>) -> Self {
        self.with_optional_subject(Some(subject.into()))
    }

    /// Sets or clears the `sub` claim of issued tokens
    #[inline]
    pub fn with_optional_subject(self, subject: Option<Subject>) -> Self {
        Self { subject, ..self }
    }

    /// Sets the primary expiry window
    #[inline]
    pub fn with_expiration(self, expiration: impl Into<DurationSecs>) -> Self {
        Self {
            expiration: expiration.into(),
            ..self
        }
    }

    /// Sets the refresh window
    #[inline]
    pub fn with_refresh_expiration(self, refresh_expiration: impl Into<DurationSecs>) -> Self {
        Self {
            refresh_expiration: refresh_expiration.into(),
            ..self
        }
    }

    /// Sets the availability window; zero means no ceiling
    #[inline]
    pub fn with_available_expiration(self, available_expiration: impl Into<DurationSecs>) -> Self {
        Self {
            available_expiration: available_expiration.into(),
            ..self
        }
    }

    /// Sets the leeway used when checking presented tokens
    #[inline]
    pub fn with_leeway(self, leeway: Leeway) -> Self {
        Self { leeway, ..self }
    }

    /// The signing key
    #[inline]
    pub fn secret_key(&self) -> &jwa::Hmac {
        &self.secret_key
    }

    /// The `iss` claim of issued tokens
    #[inline]
    #[must_use]
    pub fn issuer(&self) -> Option<&IssuerRef> {
        self.issuer.as_deref()
    }

    /// The `aud` claim of issued tokens
    #[inline]
    #[must_use]
    pub fn audience(&self) -> Option<&AudienceRef> {
        self.audience.as_deref()
    }

    /// The `sub` claim of issued tokens
    #[inline]
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_deref()
    }

    /// The primary expiry window
    #[inline]
    #[must_use]
    pub fn expiration(&self) -> DurationSecs {
        self.expiration
    }

    /// The refresh window
    #[inline]
    #[must_use]
    pub fn refresh_expiration(&self) -> DurationSecs {
        self.refresh_expiration
    }

    /// The availability window; zero means no ceiling
    #[inline]
    #[must_use]
    pub fn available_expiration(&self) -> DurationSecs {
        self.available_expiration
    }

    /// The leeway applied to time comparisons
    #[inline]
    #[must_use]
    pub fn leeway(&self) -> Leeway {
        self.leeway
    }

    pub(crate) fn cloned_issuer(&self) -> Option<Issuer> {
        self.issuer.clone()
    }

    pub(crate) fn cloned_audience(&self) -> Option<Audience> {
        self.audience.clone()
    }

    pub(crate) fn cloned_subject(&self) -> Option<Subject> {
        self.subject.clone()
    }
}

/// Parses a duration such as `300`, `45s`, `5min`, `12h`, or `7d`
///
/// Returns `None` if the value is not of that form or overflows.
#[must_use]
pub fn parse_duration(value: &str) -> Option<DurationSecs> {
    let caps = DURATION.captures(value.trim())?;
    let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
    let scale = match caps.get(2).map_or("", |m| m.as_str()) {
        "" | "s" => 1,
        "min" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    amount.checked_mul(scale).map(DurationSecs)
}
