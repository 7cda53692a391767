//! ycscaler-auth — IAM credentials for the monitoring API.
//!
//! Loads a service account key, signs short-lived PS256 assertions with it,
//! and trades them for a bearer token that is cached in memory and shared by
//! every in-flight scaler call.
//!
//! # Architecture
//!
//! ```text
//! CredentialCache (TokenProvider)
//!   ├── SigningKey ── sign_assertion() → PS256 JWT (kid = key id)
//!   ├── TokenExchange
//!   │   └── IamExchange → POST {iam}/iam/v1/tokens {"jwt": ...}
//!   └── RwLock<Option<CachedCredential>>
//!       ├── fast path: read lock, token still fresh
//!       └── slow path: write lock, re-check, refresh once
//! ```
//!
//! # Cache Lifetime
//!
//! A refreshed token is kept until `min(now + 6h, expiresAt - 5m)`, so a
//! token is never handed out in the last five minutes of its server-side
//! lifetime. A failed refresh leaves the previous entry untouched.

pub mod cache;
pub mod error;
pub mod exchange;
pub mod key;

pub use cache::{CredentialCache, TokenProvider, cache_expiry};
pub use error::{AuthError, KeyError};
pub use exchange::{IamExchange, IssuedToken, TokenExchange};
pub use key::SigningKey;
