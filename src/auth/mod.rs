//! Identity and session-lifecycle core.
//!
//! The modules here are plain async functions over a `sqlx::PgPool`; HTTP
//! routing stays in `crate::api` and only translates typed results into
//! responses.
//!
//! - [`tokens`] — stateless signed-token codec (access + refresh, distinct
//!   secrets).
//! - [`session`] — issuance, rotation-on-refresh, and revocation-on-logout.
//! - [`registration`] — OTP-gated staged registration.
//! - [`password_reset`] — OTP-gated password changes.
//! - [`google`] — OAuth code exchange and identity-token verification.
//! - [`sweeper`] — recurring deletion of expired rows.
//!
//! All policy knobs (token lifetimes, rotation threshold, OTP deadline) live
//! on [`AuthConfig`] and are injected at startup; nothing in here reads
//! process-wide state.

pub mod config;
pub mod error;
pub mod google;
pub mod password_reset;
pub mod registration;
pub mod session;
pub mod state;
pub mod storage;
pub mod sweeper;
pub mod tokens;
pub(crate) mod utils;

pub use config::{AuthConfig, GoogleConfig};
pub use error::AuthError;
pub use session::TokenPair;
pub use state::AuthState;
pub use sweeper::SweeperConfig;
