//! User directories that can vouch for an identity

use std::{error, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{ConnectionTargetRef, IdentityRef, SecretRef};

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::StaticDirectory;
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub use postgres::PostgresDirectory;

/// The reason a directory did not vouch for an identity
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory rejected the identity or secret
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The directory could not be consulted
    #[error("directory unavailable")]
    BackendUnavailable(#[source] Box<dyn error::Error + Send + Sync + 'static>),
}

impl DirectoryError {
    /// Whether the directory rejected the credentials
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

/// A directory of users
///
/// A directory is asked once per authentication attempt. Implementations
/// should not retry on their own.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Checks that `identity` may sign in to `target` using `secret`
    async fn attempt(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError>;
}

#[async_trait]
impl<T: Directory + ?Sized> Directory for &'_ T {
    async fn attempt(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError> {
        T::attempt(&**self, target, identity, secret).await
    }
}

#[async_trait]
impl<T: Directory + ?Sized> Directory for Box<T> {
    async fn attempt(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError> {
        T::attempt(&**self, target, identity, secret).await
    }
}

#[async_trait]
impl<T: Directory + ?Sized> Directory for Arc<T> {
    async fn attempt(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError> {
        T::attempt(&**self, target, identity, secret).await
    }
}
