//! Directory-backed sign-in for warden access tokens
//!
//! An [`Authenticator`] asks a [`Directory`] whether an identity and secret
//! are good. If they are, it issues a token through [`warden::issuer`]. The
//! same authenticator then renews and checks those tokens.
//!
//! The `postgres` feature (on by default) provides
//! [`PostgresDirectory`][directory::PostgresDirectory], which treats the
//! roles of a PostgreSQL server as the user directory.
//!
//! ```
//! use warden::TokenConfig;
//! use warden_auth::{directory::StaticDirectory, Authenticator, Identity, Secret};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = StaticDirectory::new().with_user("alice", "wonderland");
//! let auth = Authenticator::new(
//!     directory,
//!     "memory",
//!     TokenConfig::new(b"an example secret".to_vec()),
//! );
//!
//! let token = auth
//!     .authenticate(&Identity::from_static("alice"), &Secret::from_static("wonderland"))
//!     .await?;
//! assert!(auth.is_valid(&token));
//!
//! let denied = auth
//!     .authenticate(&Identity::from_static("alice"), &Secret::from_static("guess"))
//!     .await;
//! assert!(denied.unwrap_err().is_authentication_failure());
//! # Ok(())
//! # }
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

mod authenticator;
mod braids;
pub mod directory;

pub use authenticator::{
    AuthError, Authenticator, CONNECTION_TARGET_VAR, DEFAULT_CONNECTION_TARGET,
};
pub use braids::{ConnectionTarget, ConnectionTargetRef, Identity, IdentityRef, Secret, SecretRef};
pub use directory::{Directory, DirectoryError};
