//! Lifecycle checks for access tokens
//!
//! A token is judged against three horizons: its primary expiry (`exp`), its
//! refresh deadline, and its availability ceiling. The same set of structural
//! and signature checks runs for both policies; only the time rules differ.
//!
//! ```
//! use warden::{jwa, jwt::AccessToken, validator::LifecycleValidator};
//! use warden_clock::{TestClock, UnixTime};
//!
//! let token: AccessToken = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.e30.\
//!     ZRrHA1JJJW8opsbCGfG_HACGpVUMN_a9IV7pAx_Zmeo"
//!     .parse()
//!     .unwrap();
//!
//! // The token carries no claims, so neither policy can accept it
//! let key = jwa::Hmac::new(b"secret".to_vec());
//! let clock = TestClock::new(UnixTime(1_700_000_000));
//! assert!(LifecycleValidator::strict()
//!     .check_with_clock(&token, &key, &clock)
//!     .is_err());
//! assert!(!token.is_available_with_clock(&key, &clock));
//! ```

use warden_clock::{Clock, Leeway, System, UnixTime};

use crate::{
    claims::{Availability, AVAILABLE_EXPIRATION_CLAIM, PRINCIPAL_CLAIM, REFRESH_EXPIRATION_CLAIM},
    error::TokenRejected,
    jwa, jws,
    jwt::AccessToken,
};

/// Which set of time rules a token is held to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Policy {
    /// The token may be used for a protected operation right now
    ///
    /// Neither the primary expiry nor the availability ceiling may have
    /// elapsed.
    Strict,

    /// The token may still be exchanged for a fresh one
    ///
    /// The availability ceiling may not have elapsed, and at least one of
    /// the primary expiry or the refresh deadline must still be open.
    Renewable,
}

/// The time horizons of a token that carries every required claim
#[derive(Clone, Copy, Debug)]
struct Horizons {
    issued_at: UnixTime,
    expires_at: UnixTime,
    refresh_expires_at: UnixTime,
    available: Availability,
}

impl Horizons {
    /// Ensures the token names every header and claim the lifecycle relies
    /// upon, reporting the first one missing
    fn extract(token: &AccessToken) -> Result<Self, TokenRejected> {
        token
            .headers()
            .alg()
            .ok_or(TokenRejected::MissingRequiredClaim("alg"))?;
        token
            .token_type()
            .ok_or(TokenRejected::MissingRequiredClaim("typ"))?;

        let issued_at = token
            .issued_at()
            .ok_or(TokenRejected::MissingRequiredClaim("iat"))?;
        let expires_at = token
            .expires_at()
            .ok_or(TokenRejected::MissingRequiredClaim("exp"))?;

        token
            .principal()
            .ok_or(TokenRejected::MissingRequiredClaim(PRINCIPAL_CLAIM))?;

        let refresh_expires_at = token
            .refresh_expires_at()
            .ok_or(TokenRejected::MissingRequiredClaim(REFRESH_EXPIRATION_CLAIM))?;
        let available = token
            .available_until()
            .ok_or(TokenRejected::MissingRequiredClaim(AVAILABLE_EXPIRATION_CLAIM))?;

        Ok(Self {
            issued_at,
            expires_at,
            refresh_expires_at,
            available,
        })
    }
}

/// Checks whether a token satisfies a [`Policy`] at a point in time
#[derive(Clone, Debug)]
#[must_use]
pub struct LifecycleValidator {
    policy: Policy,
    leeway: Leeway,
    approved_algorithms: Vec<jwa::Algorithm>,
}

impl LifecycleValidator {
    /// A validator approving only `HS256` with the standard leeway
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            leeway: Leeway::STANDARD,
            approved_algorithms: vec![jwa::Algorithm::HS256],
        }
    }

    /// A validator for tokens about to be used
    #[inline]
    pub fn strict() -> Self {
        Self::new(Policy::Strict)
    }

    /// A validator for tokens about to be renewed
    #[inline]
    pub fn renewable() -> Self {
        Self::new(Policy::Renewable)
    }

    /// Allows a different grace period on every time comparison
    #[inline]
    pub fn with_leeway(self, leeway: Leeway) -> Self {
        Self { leeway, ..self }
    }

    /// Approves an additional algorithm
    #[inline]
    pub fn add_approved_algorithm(self, alg: jwa::Algorithm) -> Self {
        let mut this = self;
        this.approved_algorithms.push(alg);
        this
    }

    /// The policy this validator enforces
    #[inline]
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The leeway applied to time comparisons
    #[inline]
    #[must_use]
    pub fn leeway(&self) -> Leeway {
        self.leeway
    }

    /// Checks the token against the system clock
    ///
    /// # Errors
    ///
    /// Returns the first reason the token fails the policy.
    pub fn check<V>(&self, token: &AccessToken, key: &V) -> Result<(), TokenRejected>
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
    {
        self.check_with_clock(token, key, &System)
    }

    /// Checks the token against the provided clock
    ///
    /// # Errors
    ///
    /// Returns the first reason the token fails the policy.
    pub fn check_with_clock<V, C>(
        &self,
        token: &AccessToken,
        key: &V,
        clock: &C,
    ) -> Result<(), TokenRejected>
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
        C: Clock,
    {
        self.check_at(token, key, clock.now())
    }

    /// Checks the token as of `now`
    ///
    /// # Errors
    ///
    /// Returns the first reason the token fails the policy.
    pub fn check_at<V>(
        &self,
        token: &AccessToken,
        key: &V,
        now: UnixTime,
    ) -> Result<(), TokenRejected>
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
    {
        let horizons = Horizons::extract(token)?;

        let algorithm_approved = token
            .headers()
            .alg()
            .map_or(false, |alg| self.approved_algorithms.contains(&alg));
        if !algorithm_approved {
            return Err(TokenRejected::InvalidAlgorithm);
        }

        token.verify_signature(key)?;

        if self.leeway.is_premature(horizons.issued_at, now) {
            return Err(TokenRejected::IssuedInFuture);
        }

        let ceiling_elapsed = horizons
            .available
            .deadline()
            .map_or(false, |ceiling| self.leeway.has_elapsed(ceiling, now));

        match self.policy {
            Policy::Strict => {
                if self.leeway.has_elapsed(horizons.expires_at, now) {
                    return Err(TokenRejected::TokenExpired);
                }
                if ceiling_elapsed {
                    return Err(TokenRejected::AvailabilityExpired);
                }
            }
            Policy::Renewable => {
                if ceiling_elapsed {
                    return Err(TokenRejected::AvailabilityExpired);
                }
                if self.leeway.has_elapsed(horizons.expires_at, now)
                    && self.leeway.has_elapsed(horizons.refresh_expires_at, now)
                {
                    return Err(TokenRejected::RefreshExpired);
                }
            }
        }

        Ok(())
    }

    /// Whether the token satisfies the policy according to `clock`
    ///
    /// Rejections are logged at `debug` and otherwise swallowed.
    pub fn accepts<V, C>(&self, token: &AccessToken, key: &V, clock: &C) -> bool
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
        C: Clock,
    {
        match self.check_with_clock(token, key, clock) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(policy = ?self.policy, reason = %err, "token rejected");
                false
            }
        }
    }
}

/// Whether the token carries every header and claim the lifecycle relies upon
///
/// This only inspects presence; it neither verifies the signature nor looks
/// at the clock.
#[must_use]
pub fn has_required_claims(token: &AccessToken) -> bool {
    Horizons::extract(token).is_ok()
}

impl AccessToken {
    /// Whether the token may be used right now
    pub fn is_valid<V>(&self, key: &V) -> bool
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
    {
        self.is_valid_with_clock(key, &System)
    }

    /// Whether the token may be used according to `clock`
    pub fn is_valid_with_clock<V, C>(&self, key: &V, clock: &C) -> bool
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
        C: Clock,
    {
        LifecycleValidator::strict().accepts(self, key, clock)
    }

    /// Whether the token may still be exchanged for a fresh one
    pub fn is_available<V>(&self, key: &V) -> bool
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
    {
        self.is_available_with_clock(key, &System)
    }

    /// Whether the token may still be exchanged according to `clock`
    pub fn is_available_with_clock<V, C>(&self, key: &V, clock: &C) -> bool
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
        C: Clock,
    {
        LifecycleValidator::renewable().accepts(self, key, clock)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;
    use tracing_test::traced_test;
    use warden_clock::{DurationSecs, TestClock};

    use super::*;
    use crate::test::{self, NOW};

    fn token_at(iat: UnixTime, exp: u64, refresh: u64, available: UnixTime) -> AccessToken {
        let jwt = test::sign_raw(
            &test::standard_header(),
            &test::payload(iat, iat + DurationSecs(exp), iat + DurationSecs(refresh), available),
        );
        AccessToken::parse(&jwt).unwrap()
    }

    fn short_token() -> AccessToken {
        token_at(NOW, 300, 600, NOW + DurationSecs(900))
    }

    fn without(header_key: Option<&str>, claim_key: Option<&str>) -> AccessToken {
        let mut header = test::standard_header();
        let mut payload = test::payload(
            NOW,
            NOW + DurationSecs(300),
            NOW + DurationSecs(600),
            NOW + DurationSecs(900),
        );
        if let Some(k) = header_key {
            header.as_object_mut().unwrap().remove(k);
        }
        if let Some(k) = claim_key {
            payload.as_object_mut().unwrap().remove(k);
        }
        AccessToken::parse(&test::sign_raw(&header, &payload)).unwrap()
    }

    fn both(token: &AccessToken, now: UnixTime) -> (bool, bool) {
        let clock = TestClock::new(now);
        let key = test::key();
        (
            token.is_valid_with_clock(&key, &clock),
            token.is_available_with_clock(&key, &clock),
        )
    }

    #[test]
    fn fresh_token_is_valid_and_available() {
        assert_eq!(both(&short_token(), NOW), (true, true));
    }

    #[test]
    fn walks_through_each_horizon() {
        let token = short_token();

        assert_eq!(both(&token, NOW + DurationSecs(310)), (true, true));
        assert_eq!(both(&token, NOW + DurationSecs(311)), (false, true));
        assert_eq!(both(&token, NOW + DurationSecs(610)), (false, true));
        assert_eq!(both(&token, NOW + DurationSecs(611)), (false, false));
    }

    #[test]
    fn ceiling_overrides_open_windows() {
        // Primary and refresh windows still open, ceiling already gone
        let token = token_at(NOW, 3600, 7200, NOW + DurationSecs(60));
        let now = NOW + DurationSecs(100);

        let err = LifecycleValidator::strict()
            .check_at(&token, &test::key(), now)
            .unwrap_err();
        assert!(matches!(err, TokenRejected::AvailabilityExpired));

        let err = LifecycleValidator::renewable()
            .check_at(&token, &test::key(), now)
            .unwrap_err();
        assert!(matches!(err, TokenRejected::AvailabilityExpired));
    }

    #[test]
    fn unbounded_ceiling_never_fails() {
        let token = token_at(NOW, 300, 600, UnixTime::EPOCH);
        assert_eq!(token.available_until(), Some(Availability::Unbounded));

        assert_eq!(both(&token, NOW + DurationSecs(100)), (true, true));
        assert_eq!(both(&token, NOW + DurationSecs(400)), (false, true));
        assert_eq!(both(&token, NOW + DurationSecs(1000)), (false, false));
    }

    #[test]
    fn reports_specific_time_failures() {
        let token = short_token();
        let key = test::key();

        let err = LifecycleValidator::strict()
            .check_at(&token, &key, NOW + DurationSecs(400))
            .unwrap_err();
        assert!(matches!(err, TokenRejected::TokenExpired));

        let err = LifecycleValidator::renewable()
            .check_at(&token, &key, NOW + DurationSecs(700))
            .unwrap_err();
        assert!(matches!(err, TokenRejected::RefreshExpired));
    }

    #[test]
    fn premature_token_is_rejected_by_both_policies() {
        let token = token_at(NOW + DurationSecs(11), 300, 600, NOW + DurationSecs(900));
        assert_eq!(both(&token, NOW), (false, false));

        let err = LifecycleValidator::renewable()
            .check_at(&token, &test::key(), NOW)
            .unwrap_err();
        assert!(matches!(err, TokenRejected::IssuedInFuture));
    }

    #[test]
    fn issued_within_leeway_is_accepted() {
        let token = token_at(NOW + DurationSecs(10), 300, 600, NOW + DurationSecs(900));
        assert_eq!(both(&token, NOW), (true, true));
    }

    #[test]
    fn leeway_is_configurable() {
        let token = short_token();
        let key = test::key();
        let now = NOW + DurationSecs(305);

        assert!(LifecycleValidator::strict()
            .check_at(&token, &key, now)
            .is_ok());
        assert!(LifecycleValidator::strict()
            .with_leeway(Leeway::NONE)
            .check_at(&token, &key, now)
            .is_err());
    }

    #[test]
    fn wrong_key_fails_both_policies() {
        let token = short_token();
        let clock = TestClock::new(NOW);
        let other = jwa::Hmac::new(b"a different secret".to_vec());

        assert!(!token.is_valid_with_clock(&other, &clock));
        assert!(!token.is_available_with_clock(&other, &clock));

        let err = LifecycleValidator::strict()
            .check_with_clock(&token, &other, &clock)
            .unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn empty_key_fails_both_policies() {
        let token = short_token();
        let clock = TestClock::new(NOW);
        let empty = jwa::Hmac::new(Vec::<u8>::new());

        assert!(!token.is_valid_with_clock(&empty, &clock));
        assert!(!token.is_available_with_clock(&empty, &clock));
    }

    #[test]
    fn unapproved_algorithm_is_rejected() -> Result<()> {
        let header = json!({ "alg": "HS512", "typ": "JWT" });
        let payload = test::payload(
            NOW,
            NOW + DurationSecs(300),
            NOW + DurationSecs(600),
            NOW + DurationSecs(900),
        );
        let jwt = crate::jwt::Jwt::try_from_parts_with_signature(
            &header,
            &payload,
            jwa::Algorithm::HS512,
            &test::key(),
        )?;
        let token = AccessToken::parse(&jwt)?;

        let err = LifecycleValidator::strict()
            .check_at(&token, &test::key(), NOW)
            .unwrap_err();
        assert!(matches!(err, TokenRejected::InvalidAlgorithm));

        LifecycleValidator::strict()
            .add_approved_algorithm(jwa::Algorithm::HS512)
            .check_at(&token, &test::key(), NOW)?;

        Ok(())
    }

    #[test]
    fn every_required_claim_is_enforced() {
        let cases: [(Option<&str>, Option<&str>, &str); 7] = [
            (Some("alg"), None, "alg"),
            (Some("typ"), None, "typ"),
            (None, Some("iat"), "iat"),
            (None, Some("exp"), "exp"),
            (None, Some(PRINCIPAL_CLAIM), PRINCIPAL_CLAIM),
            (None, Some(REFRESH_EXPIRATION_CLAIM), REFRESH_EXPIRATION_CLAIM),
            (None, Some(AVAILABLE_EXPIRATION_CLAIM), AVAILABLE_EXPIRATION_CLAIM),
        ];

        for (header_key, claim_key, expected) in cases {
            let token = without(header_key, claim_key);

            assert!(!has_required_claims(&token), "missing {}", expected);
            assert_eq!(both(&token, NOW), (false, false), "missing {}", expected);

            match LifecycleValidator::renewable().check_at(&token, &test::key(), NOW) {
                Err(TokenRejected::MissingRequiredClaim(name)) => assert_eq!(name, expected),
                other => panic!("missing {}: unexpected {:?}", expected, other),
            }
        }
    }

    #[test]
    fn complete_token_has_required_claims() {
        assert!(has_required_claims(&without(None, None)));
    }

    #[test]
    #[traced_test]
    fn rejection_is_logged() {
        let token = short_token();
        let clock = TestClock::new(NOW + DurationSecs(400));

        assert!(!token.is_valid_with_clock(&test::key(), &clock));
        assert!(logs_contain("token rejected"));
        assert!(logs_contain("token expired"));
    }
}
