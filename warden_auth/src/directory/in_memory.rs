//! A fixed, in-memory user directory

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    directory::{Directory, DirectoryError},
    ConnectionTargetRef, Identity, IdentityRef, Secret, SecretRef,
};

/// A directory holding a fixed table of identities and secrets
///
/// The connection target is ignored. Useful for tests and for embedding
/// where no external directory exists.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    users: HashMap<Identity, Secret>,
    offline: bool,
}

impl StaticDirectory {
    /// Constructs an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user to the directory
    #[must_use]
    pub fn with_user(mut self, identity: impl Into<Identity>, secret: impl Into<Secret>) -> Self {
        self.insert(identity, secret);
        self
    }

    /// Marks the directory as unreachable; every attempt will fail as unavailable
    #[must_use]
    pub fn offline(self) -> Self {
        Self {
            offline: true,
            ..self
        }
    }

    /// Adds or replaces a user, returning the previous secret
    pub fn insert(
        &mut self,
        identity: impl Into<Identity>,
        secret: impl Into<Secret>,
    ) -> Option<Secret> {
        self.users.insert(identity.into(), secret.into())
    }

    /// Removes a user, returning their secret
    pub fn remove(&mut self, identity: &IdentityRef) -> Option<Secret> {
        self.users.remove(identity)
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn attempt(
        &self,
        _target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError> {
        if self.offline {
            return Err(DirectoryError::BackendUnavailable(
                "static directory is offline".into(),
            ));
        }

        match self.users.get(identity) {
            Some(known) if known.as_str() == secret.as_str() => Ok(()),
            Some(_) => Err(DirectoryError::AuthenticationFailed(format!(
                "password authentication failed for user \"{}\"",
                identity
            ))),
            None => Err(DirectoryError::AuthenticationFailed(format!(
                "role \"{}\" does not exist",
                identity
            ))),
        }
    }
}
