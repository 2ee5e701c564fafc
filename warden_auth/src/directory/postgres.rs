//! Authentication against PostgreSQL roles
//!
//! A sign-in attempt opens a connection as the user and immediately closes
//! it. The server decides whether the credentials are good; its SQLSTATE
//! tells an authentication failure apart from any other problem.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{postgres::PgConnectOptions, ConnectOptions, Connection};

use crate::{
    directory::{Directory, DirectoryError},
    ConnectionTargetRef, IdentityRef, SecretRef,
};

/// SQLSTATE class for "invalid authorization specification"
const AUTHORIZATION_CLASS: &str = "28";

const JDBC_PREFIX: &str = "jdbc:";

/// A directory backed by the roles of a PostgreSQL server
#[derive(Clone, Copy, Debug)]
pub struct PostgresDirectory {
    connect_timeout: Duration,
}

impl Default for PostgresDirectory {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl PostgresDirectory {
    /// How long to wait for the server before treating it as unavailable
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Constructs a directory with the default connection timeout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the connection timeout
    #[must_use]
    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    #[tracing::instrument(level = "debug", skip(self, secret))]
    async fn attempt(
        &self,
        target: &ConnectionTargetRef,
        identity: &IdentityRef,
        secret: &SecretRef,
    ) -> Result<(), DirectoryError> {
        let options = PgConnectOptions::from_str(normalize_target(target.as_str()))
            .map_err(|err| DirectoryError::BackendUnavailable(err.into()))?
            .username(identity.as_str())
            .password(secret.as_str());

        let conn = tokio::time::timeout(self.connect_timeout, options.connect())
            .await
            .map_err(|elapsed| {
                tracing::warn!(timeout = ?self.connect_timeout, "directory connection timed out");
                DirectoryError::BackendUnavailable(elapsed.into())
            })?
            .map_err(classify)?;

        if let Err(err) = conn.close().await {
            tracing::debug!(error = %err, "error closing directory connection");
        }

        Ok(())
    }
}

/// Accepts JDBC-style targets by dropping their `jdbc:` prefix
fn normalize_target(target: &str) -> &str {
    target.strip_prefix(JDBC_PREFIX).unwrap_or(target)
}

fn is_authorization_failure(sqlstate: &str) -> bool {
    sqlstate.len() > AUTHORIZATION_CLASS.len() && sqlstate.starts_with(AUTHORIZATION_CLASS)
}

fn classify(err: sqlx::Error) -> DirectoryError {
    let sqlstate = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());

    match sqlstate {
        Some(code) if is_authorization_failure(&code) => {
            tracing::debug!(sqlstate = %code, "directory rejected credentials");
            DirectoryError::AuthenticationFailed(err.to_string())
        }
        _ => {
            tracing::warn!(error = %err, "directory unavailable");
            DirectoryError::BackendUnavailable(err.into())
        }
    }
}
