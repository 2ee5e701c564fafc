//! Algorithms used to sign and verify access tokens
//!
//! Only symmetric keyed-hash (HMAC) signatures are supported. Tokens are
//! issued with [`Algorithm::HS256`].

pub mod hmac;

#[doc(inline)]
pub use hmac::Hmac;
#[doc(inline)]
pub use hmac::SigningAlgorithm as Algorithm;
