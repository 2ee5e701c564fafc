//! Exchanging an available token for a fresh one
//!
//! A renewed token keeps the identity and the availability ceiling of the
//! token it replaces. Only the primary expiry and the refresh deadline move,
//! and neither may move past the ceiling.

use warden_clock::{Clock, DurationSecs, System, UnixTime};

use crate::{
    claims::{AVAILABLE_EXPIRATION_CLAIM, REFRESH_EXPIRATION_CLAIM},
    config::TokenConfig,
    error::{InvalidToken, TokenError, TokenRejected},
    issuer,
    jwt::{AccessToken, Jwt, JwtRef},
    validator::LifecycleValidator,
};

/// Renews `token` as of the current system time
///
/// # Errors
///
/// See [`refresh_at`].
pub fn refresh(
    token: &JwtRef,
    extend: impl Into<DurationSecs>,
    config: &TokenConfig,
) -> Result<Jwt, TokenError> {
    refresh_with_clock(token, extend, config, &System)
}

/// Renews `token` as of the time reported by `clock`
///
/// # Errors
///
/// See [`refresh_at`].
pub fn refresh_with_clock<C: Clock>(
    token: &JwtRef,
    extend: impl Into<DurationSecs>,
    config: &TokenConfig,
    clock: &C,
) -> Result<Jwt, TokenError> {
    refresh_at(token, extend, config, clock.now())
}

/// Renews `token` as of `now`, granting a primary expiry of `extend`
///
/// The new token's primary expiry is `now + extend` and its refresh deadline
/// is `now` plus the configured refresh window. Both are pulled back to the
/// availability ceiling when the ceiling is bounded.
///
/// # Errors
///
/// * [`InvalidToken::Malformed`] if the token cannot be parsed
/// * [`InvalidToken::NotAvailable`] if the token may not be exchanged,
///   including when it was not signed by the configured key
/// * [`InvalidToken::RefreshWindowExpired`] if the primary expiry is still
///   open but the refresh deadline has passed
/// * [`TokenError::Internal`] if the new token cannot be signed
pub fn refresh_at(
    token: &JwtRef,
    extend: impl Into<DurationSecs>,
    config: &TokenConfig,
    now: UnixTime,
) -> Result<Jwt, TokenError> {
    let extend = extend.into();
    let leeway = config.leeway();

    let token = AccessToken::parse(token).map_err(|err| {
        tracing::debug!(error = %err, "refusing to renew malformed token");
        TokenError::from(err)
    })?;

    LifecycleValidator::renewable()
        .with_leeway(leeway)
        .check_at(&token, config.secret_key(), now)
        .map_err(|err| {
            tracing::debug!(reason = %err, "refusing to renew unavailable token");
            InvalidToken::NotAvailable(err)
        })?;

    let claims = token.claims();
    let refresh_deadline = claims.refresh_exp().ok_or(InvalidToken::NotAvailable(
        TokenRejected::MissingRequiredClaim(REFRESH_EXPIRATION_CLAIM),
    ))?;
    if leeway.has_elapsed(refresh_deadline, now) {
        tracing::debug!(%refresh_deadline, %now, "refresh window expired");
        return Err(InvalidToken::RefreshWindowExpired.into());
    }

    let ceiling = claims.available().ok_or(InvalidToken::NotAvailable(
        TokenRejected::MissingRequiredClaim(AVAILABLE_EXPIRATION_CLAIM),
    ))?;
    let renewed = claims
        .clone()
        .with_expiration(ceiling.clamp(now + extend))
        .with_refresh_expiration(ceiling.clamp(now + config.refresh_expiration()));

    let jwt = issuer::sign(&renewed, config.secret_key())?;
    tracing::trace!(
        expires_at = ?renewed.exp(),
        refresh_expires_at = ?renewed.refresh_exp(),
        "token renewed"
    );
    Ok(jwt)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use color_eyre::Result;
    use tracing_test::traced_test;
    use warden_clock::TestClock;

    use super::*;
    use crate::{
        claims::Availability,
        issuer::issue_at,
        test::{self, NOW},
    };

    fn renewed(jwt: &Jwt) -> AccessToken {
        AccessToken::parse(jwt).unwrap()
    }

    #[test]
    fn carries_identity_and_ceiling() -> Result<()> {
        let config = test::config();
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;
        let before = renewed(&original);

        let later = NOW + DurationSecs(120);
        let jwt = refresh_at(&original, DurationSecs(300), &config, later)?;
        let after = renewed(&jwt);

        assert_eq!(after.issuer(), before.issuer());
        assert_eq!(after.audience(), before.audience());
        assert_eq!(after.subject(), before.subject());
        assert_eq!(after.principal(), before.principal());
        assert_eq!(after.issued_at(), before.issued_at());
        assert_eq!(after.available_until(), before.available_until());

        assert_eq!(after.expires_at(), Some(later + DurationSecs(300)));
        assert_eq!(
            after.refresh_expires_at(),
            Some(later + config.refresh_expiration())
        );

        Ok(())
    }

    #[test]
    fn never_extends_past_ceiling() -> Result<()> {
        let config = test::short_config();
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;
        let ceiling = NOW + DurationSecs(900);

        for (offset, extend) in [(0, 60), (100, 300), (290, 3600), (580, 10_000)] {
            let now = NOW + DurationSecs(offset);
            let token = renewed(&refresh_at(&original, DurationSecs(extend), &config, now)?);

            let exp = token.expires_at().unwrap();
            let refresh = token.refresh_expires_at().unwrap();

            assert!(exp <= ceiling, "exp {} beyond ceiling at +{}", exp, offset);
            assert!(refresh <= ceiling, "refresh {} beyond ceiling at +{}", refresh, offset);
            assert_eq!(exp, (now + DurationSecs(extend)).min(ceiling));
            assert_eq!(
                refresh,
                (now + config.refresh_expiration()).min(ceiling)
            );
        }

        Ok(())
    }

    #[test]
    fn extension_near_ceiling_is_clamped() -> Result<()> {
        let config = test::config()
            .with_expiration(DurationSecs(3600))
            .with_available_expiration(DurationSecs(3600));
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;
        let ceiling = NOW + DurationSecs(3600);

        let now = ceiling - DurationSecs(60);
        let token = renewed(&refresh_at(&original, DurationSecs(100), &config, now)?);

        assert_eq!(token.expires_at(), Some(ceiling));
        assert_eq!(token.refresh_expires_at(), Some(ceiling));
        assert_eq!(token.available_until(), Some(Availability::Until(ceiling)));

        Ok(())
    }

    #[test]
    fn unbounded_ceiling_is_not_clamped() -> Result<()> {
        let config = test::short_config().with_available_expiration(DurationSecs::ZERO);
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;

        let now = NOW + DurationSecs(500);
        let token = renewed(&refresh_at(&original, DurationSecs(10_000), &config, now)?);

        assert_eq!(token.expires_at(), Some(now + DurationSecs(10_000)));
        assert_eq!(token.available_until(), Some(Availability::Unbounded));

        Ok(())
    }

    #[test]
    fn accepts_std_duration() -> Result<()> {
        let config = test::config();
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;
        let clock = TestClock::new(NOW + DurationSecs(30));

        let jwt = refresh_with_clock(&original, Duration::from_secs(90), &config, &clock)?;
        assert_eq!(
            renewed(&jwt).expires_at(),
            Some(NOW + DurationSecs(120))
        );

        Ok(())
    }

    #[test]
    fn renewed_token_is_valid() -> Result<()> {
        let config = test::short_config();
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;

        // Past the primary expiry but inside the refresh window
        let clock = TestClock::new(NOW + DurationSecs(400));
        assert!(!renewed(&original).is_valid_with_clock(&test::key(), &clock));

        let jwt = refresh_with_clock(&original, DurationSecs(300), &config, &clock)?;
        assert!(renewed(&jwt).is_valid_with_clock(&test::key(), &clock));

        Ok(())
    }

    #[test]
    fn refresh_window_expired_while_still_valid() -> Result<()> {
        // A refresh window shorter than the primary expiry
        let config = test::config()
            .with_expiration(DurationSecs(600))
            .with_refresh_expiration(DurationSecs(60));
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;

        let err = refresh_at(&original, DurationSecs(300), &config, NOW + DurationSecs(100))
            .unwrap_err();
        assert!(err.is_refresh_window_expired());

        Ok(())
    }

    #[test]
    fn unavailable_token_is_refused() -> Result<()> {
        let config = test::short_config();
        let original = issue_at(test::PRINCIPAL, &config, NOW)?;

        let err = refresh_at(&original, DurationSecs(300), &config, NOW + DurationSecs(700))
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::InvalidToken(InvalidToken::NotAvailable(TokenRejected::RefreshExpired))
        ));

        Ok(())
    }

    #[test]
    fn wrong_key_is_invalid_token() -> Result<()> {
        let original = issue_at(test::PRINCIPAL, &test::config(), NOW)?;
        let other = TokenConfig::new(b"some other secret".to_vec());

        let err = refresh_at(&original, DurationSecs(300), &other, NOW).unwrap_err();
        assert!(err.is_invalid_token());

        Ok(())
    }

    #[test]
    #[traced_test]
    fn malformed_token_is_invalid_token() {
        let config = test::config();

        for raw in ["", "not a token", "a.b", "e30.e30.!!!"] {
            let err = refresh_at(JwtRef::from_str(raw), DurationSecs(300), &config, NOW)
                .unwrap_err();
            assert!(
                matches!(err, TokenError::InvalidToken(InvalidToken::Malformed(_))),
                "{:?} => {:?}",
                raw,
                err
            );
        }

        assert!(logs_contain("refusing to renew malformed token"));
    }
}
