//! Issuance, validation, and bounded renewal of short-lived access tokens
//!
//! Tokens are compact, HMAC-signed JWTs carrying three time horizons:
//!
//! * the primary expiry (`exp`), after which the token may not be used;
//! * the refresh deadline, after which it may no longer be renewed;
//! * the availability ceiling, past which neither the token nor any token
//!   renewed from it may be used. A ceiling of `0` means there is none.
//!
//! Every time comparison grants a leeway, ten seconds unless configured
//! otherwise.
//!
//! # Example
//!
//! ```
//! use warden::{config::TokenConfig, issuer, renewer};
//! use warden_clock::{DurationSecs, TestClock, UnixTime};
//!
//! let config = TokenConfig::new(b"an example secret".to_vec())
//!     .with_expiration(DurationSecs(300))
//!     .with_refresh_expiration(DurationSecs(600))
//!     .with_available_expiration(DurationSecs(900));
//!
//! let mut clock = TestClock::new(UnixTime(1_700_000_000));
//! let jwt = issuer::issue_with_clock("alice", &config, &clock).unwrap();
//!
//! let token = warden::AccessToken::parse(&jwt).unwrap();
//! assert!(token.is_valid_with_clock(config.secret_key(), &clock));
//!
//! // After the primary expiry, the token can no longer be used,
//! // but it may still be exchanged for a fresh one
//! clock.inc(400);
//! assert!(!token.is_valid_with_clock(config.secret_key(), &clock));
//! assert!(token.is_available_with_clock(config.secret_key(), &clock));
//!
//! let renewed = renewer::refresh_with_clock(&jwt, DurationSecs(300), &config, &clock).unwrap();
//! let renewed = warden::AccessToken::parse(&renewed).unwrap();
//! assert!(renewed.is_valid_with_clock(config.secret_key(), &clock));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod b64;
pub mod claims;
pub mod config;
pub mod error;
pub mod issuer;
pub mod jwa;
pub mod jws;
pub mod jwt;
pub mod renewer;
pub mod validator;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use config::TokenConfig;
#[doc(inline)]
pub use jwt::{AccessToken, Jwt, JwtRef};
#[doc(inline)]
pub use validator::{LifecycleValidator, Policy};
