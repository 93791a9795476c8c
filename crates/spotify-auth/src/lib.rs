//! Spotify OAuth authentication library
//!
//! Provides the refresh-token exchange and the process-wide token store for
//! the playback proxy. This crate is a standalone library with no dependency
//! on the proxy binary — it can be tested and used independently.
//!
//! Credential flow:
//! 1. Service loads access/refresh credentials from the environment at startup
//! 2. `TokenStore::current()` hands out the live access token plus a generation
//! 3. On an upstream 401, the caller invokes `TokenStore::refresh()` with the
//!    generation it observed
//! 4. The store performs `token::refresh_access_token()` at most once per
//!    expiry — concurrent callers coalesce onto the same exchange

pub mod constants;
pub mod error;
pub mod secret;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use secret::SecretString;
pub use store::{AccessToken, TokenStore};
pub use token::{TokenResponse, refresh_access_token};
