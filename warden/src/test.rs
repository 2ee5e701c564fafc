#![allow(dead_code)]

use serde_json::{json, Value};
use warden_clock::{DurationSecs, UnixTime};

use crate::{
    claims::{Audience, Availability, TokenClaims},
    config::TokenConfig,
    jwa,
    jwt::Jwt,
};

pub const SECRET: &[u8] = b"qiZB8rXTdet7Z3HTaU9t2TtcpmV6FXy7";

pub const PRINCIPAL: &str = "ut_user_name";

/// An arbitrary, fixed "now" for deterministic tests
pub const NOW: UnixTime = UnixTime(1_700_000_000);

pub fn key() -> jwa::Hmac {
    jwa::Hmac::new(SECRET)
}

pub fn config() -> TokenConfig {
    TokenConfig::new(SECRET)
}

/// A config with the 300/600/900 second windows
pub fn short_config() -> TokenConfig {
    config()
        .with_expiration(DurationSecs(300))
        .with_refresh_expiration(DurationSecs(600))
        .with_available_expiration(DurationSecs(900))
}

pub fn full_claims(now: UnixTime) -> TokenClaims {
    TokenClaims::new()
        .with_issuer("authentication-manager")
        .with_audiences(vec![Audience::from_static("metadata-manager")])
        .with_subject("AuthenticationToken")
        .with_issued_at(now)
        .with_expiration(now + DurationSecs(300))
        .with_refresh_expiration(now + DurationSecs(600))
        .with_availability(Availability::Until(now + DurationSecs(900)))
        .with_principal(PRINCIPAL)
}

pub fn standard_header() -> Value {
    json!({ "alg": "HS256", "typ": "JWT" })
}

/// The payload of a well-formed token with the given horizons, as raw JSON
/// so that individual claims can be removed
pub fn payload(iat: UnixTime, exp: UnixTime, refresh: UnixTime, available: UnixTime) -> Value {
    json!({
        "iss": "authentication-manager",
        "aud": "metadata-manager",
        "sub": "AuthenticationToken",
        "iat": iat.0,
        "exp": exp.0,
        "tsurugi/exp/refresh": refresh.0,
        "tsurugi/exp/available": available.0,
        "tsurugi/auth/name": PRINCIPAL,
    })
}

/// Signs an arbitrary header and payload with HS256 under [`SECRET`]
pub fn sign_raw(header: &Value, payload: &Value) -> Jwt {
    Jwt::try_from_parts_with_signature(header, payload, jwa::Algorithm::HS256, &key())
        .expect("test key is never empty")
}

pub fn sign_claims(claims: &TokenClaims) -> Jwt {
    sign_raw(
        &standard_header(),
        &serde_json::to_value(claims).expect("claims always serialize"),
    )
}
