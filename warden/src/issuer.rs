//! Minting fresh access tokens

use warden_clock::{Clock, System, UnixTime};

use crate::{
    claims::{Audiences, Availability, Principal, TokenClaims},
    config::TokenConfig,
    error::TokenError,
    jwa,
    jwt::{Jwt, TokenHeaders},
};

/// Issues a token for `principal` as of the current system time
///
/// # Errors
///
/// Returns an internal error if the token cannot be signed, e.g. because the
/// configured key is empty.
pub fn issue(principal: impl Into<Principal>, config: &TokenConfig) -> Result<Jwt, TokenError> {
    issue_with_clock(principal, config, &System)
}

/// Issues a token for `principal` as of the time reported by `clock`
///
/// # Errors
///
/// Returns an internal error if the token cannot be signed.
pub fn issue_with_clock<C: Clock>(
    principal: impl Into<Principal>,
    config: &TokenConfig,
    clock: &C,
) -> Result<Jwt, TokenError> {
    issue_at(principal, config, clock.now())
}

/// Issues a token for `principal` as of `now`
///
/// The primary expiry and the refresh deadline are measured from `now`. The
/// availability ceiling is too, unless the configured availability window is
/// zero, in which case the token and everything renewed from it is unbounded.
///
/// # Errors
///
/// Returns an internal error if the token cannot be signed.
pub fn issue_at(
    principal: impl Into<Principal>,
    config: &TokenConfig,
    now: UnixTime,
) -> Result<Jwt, TokenError> {
    let principal = principal.into();
    let audiences = config
        .cloned_audience()
        .map(Audiences::from)
        .unwrap_or_default();

    let claims = TokenClaims::new()
        .with_optional_issuer(config.cloned_issuer())
        .with_audiences(audiences)
        .with_optional_subject(config.cloned_subject())
        .with_issued_at(now)
        .with_expiration(now + config.expiration())
        .with_refresh_expiration(now + config.refresh_expiration())
        .with_availability(Availability::from_window(
            now,
            config.available_expiration(),
        ))
        .with_principal(principal);

    let jwt = sign(&claims, config.secret_key())?;
    tracing::trace!(
        principal = %claims.principal().map_or("", |p| p.as_str()),
        "token issued"
    );
    Ok(jwt)
}

/// Signs `claims` with `HS256` under `key`
///
/// Failures are logged at `error` and surfaced as internal errors.
pub(crate) fn sign(claims: &TokenClaims, key: &jwa::Hmac) -> Result<Jwt, TokenError> {
    let alg = jwa::Algorithm::HS256;
    Jwt::try_from_parts_with_signature(&TokenHeaders::new(alg), claims, alg, key).map_err(|err| {
        tracing::error!(error = %err, "unable to sign token");
        TokenError::from(err)
    })
}
