//! Signing users in and keeping their tokens fresh

use thiserror::Error;
use warden::{
    config::{ConfigError, TokenConfig},
    error::{InvalidToken, JwtSigningError, TokenError},
    issuer, renewer, AccessToken, Jwt, JwtRef,
};
use warden_clock::{Clock, DurationSecs, System};

use crate::{
    directory::{Directory, DirectoryError},
    ConnectionTarget, ConnectionTargetRef, IdentityRef, SecretRef,
};

/// Environment variable naming the directory to authenticate against
pub const CONNECTION_TARGET_VAR: &str = "WARDEN_CONNECTION_STRING_AUTH";

/// The directory consulted when none is configured
pub const DEFAULT_CONNECTION_TARGET: &str = "postgres://localhost/tsurugi";

/// An error signing a user in or renewing their token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The directory rejected the credentials
    #[error("authentication failed")]
    AuthenticationFailed(#[source] DirectoryError),

    /// The directory could not be consulted
    #[error("authentication backend unavailable")]
    BackendUnavailable(#[source] DirectoryError),

    /// The presented token cannot be renewed
    #[error(transparent)]
    InvalidToken(#[from] InvalidToken),

    /// A token could not be signed
    #[error("internal error: unable to sign token")]
    Internal(#[source] JwtSigningError),
}

impl AuthError {
    /// Whether the caller presented bad credentials
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Whether the failure is on the directory's side and may be retried later
    #[must_use]
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// Whether the caller presented an unusable token
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken(_))
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        if err.is_authentication_failure() {
            Self::AuthenticationFailed(err)
        } else {
            Self::BackendUnavailable(err)
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken(err) => Self::InvalidToken(err),
            TokenError::Internal(err) => Self::Internal(err),
        }
    }
}

/// Authenticates users against a [`Directory`] and manages their tokens
#[derive(Debug)]
pub struct Authenticator<D, C = System> {
    directory: D,
    target: ConnectionTarget,
    tokens: TokenConfig,
    clock: C,
}

impl<D: Directory> Authenticator<D> {
    /// Constructs an authenticator consulting `directory` at `target`
    pub fn new(directory: D, target: impl Into<ConnectionTarget>, tokens: TokenConfig) -> Self {
        Self {
            directory,
            target: target.into(),
            tokens,
            clock: System,
        }
    }

    /// Constructs an authenticator from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if the token configuration is incomplete.
    pub fn from_env(directory: D) -> Result<Self, ConfigError> {
        Self::from_lookup(directory, |name| std::env::var(name).ok())
    }

    /// Constructs an authenticator through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if the token configuration is incomplete.
    pub fn from_lookup<F>(directory: D, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target = lookup(CONNECTION_TARGET_VAR)
            .unwrap_or_else(|| DEFAULT_CONNECTION_TARGET.to_owned());
        let tokens = TokenConfig::from_lookup(lookup)?;
        Ok(Self::new(directory, target, tokens))
    }
}

impl<D: Directory, C: Clock> Authenticator<D, C> {
    /// Replaces the clock used to stamp and check tokens
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Authenticator<D, C2> {
        Authenticator {
            directory: self.directory,
            target: self.target,
            tokens: self.tokens,
            clock,
        }
    }

    /// The configured connection target
    pub fn target(&self) -> &ConnectionTargetRef {
        &self.target
    }

    /// The token configuration
    pub fn token_config(&self) -> &TokenConfig {
        &self.tokens
    }

    /// Signs a user in against the configured target, returning a fresh token
    ///
    /// # Errors
    ///
    /// * [`AuthError::AuthenticationFailed`] if the directory rejects the credentials
    /// * [`AuthError::BackendUnavailable`] if the directory cannot be consulted
    /// * [`AuthError::Internal`] if the token cannot be signed
    pub async fn authenticate(
        &self,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<Jwt, AuthError> {
        self.authenticate_with_target(&self.target, identity, secret)
            .await
    }

    /// Signs a user in against an explicit target, returning a fresh token
    ///
    /// # Errors
    ///
    /// As for [`authenticate`][Self::authenticate].
    #[tracing::instrument(skip(self, secret))]
    pub async fn authenticate_with_target(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<Jwt, AuthError> {
        if let Err(err) = self.directory.attempt(target, identity, secret).await {
            let err = AuthError::from(err);
            if err.is_authentication_failure() {
                tracing::info!(reason = %err, "authentication rejected");
            } else {
                tracing::warn!(reason = %err, "authentication could not be completed");
            }
            return Err(err);
        }

        let jwt = issuer::issue_with_clock(identity.as_str(), &self.tokens, &self.clock)?;
        tracing::info!("authenticated");
        Ok(jwt)
    }

    /// Exchanges an available token for one expiring `extend` from now
    ///
    /// # Errors
    ///
    /// * [`AuthError::InvalidToken`] if the token cannot be renewed
    /// * [`AuthError::Internal`] if the new token cannot be signed
    pub fn refresh(
        &self,
        token: &JwtRef,
        extend: impl Into<DurationSecs>,
    ) -> Result<Jwt, AuthError> {
        Ok(renewer::refresh_with_clock(
            token,
            extend,
            &self.tokens,
            &self.clock,
        )?)
    }

    /// Whether the token may be used right now
    #[must_use]
    pub fn is_valid(&self, token: &JwtRef) -> bool {
        self.parse(token).map_or(false, |t| {
            t.is_valid_with_clock(self.tokens.secret_key(), &self.clock)
        })
    }

    /// Whether the token may still be exchanged for a fresh one
    #[must_use]
    pub fn is_available(&self, token: &JwtRef) -> bool {
        self.parse(token).map_or(false, |t| {
            t.is_available_with_clock(self.tokens.secret_key(), &self.clock)
        })
    }

    fn parse(&self, token: &JwtRef) -> Option<AccessToken> {
        AccessToken::parse(token)
            .map_err(|err| tracing::debug!(error = %err, "token rejected"))
            .ok()
    }
}
