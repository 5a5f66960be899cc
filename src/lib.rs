//! # Kiroku (identity & session lifecycle)
//!
//! `kiroku` is the authentication backend for the Kiroku session-log tracker.
//! It issues and rotates credential pairs (short-lived access tokens plus
//! long-lived refresh tokens), gates account creation and password changes
//! behind one-time codes, federates identity through Google OAuth, and reaps
//! expired state on a schedule.
//!
//! ## Sessions & rotation
//!
//! Every device holds at most one active refresh session per account. A
//! refresh call rotates the token only once its remaining validity drops to
//! 90 days or less; until then the same token is returned unchanged. Rotation
//! is transactional: the old session stays valid unless the replacement row
//! was durably persisted.
//!
//! ## One-time codes
//!
//! Email registration and password reset both stage a 6-digit code with a
//! 30-minute deadline. Registration staging is replace-on-request (one
//! pending record per email); reset challenges accumulate until a password
//! change deletes all of them.
//!
//! ## Federation
//!
//! Google sign-in is client-side only: the authorization code is exchanged at
//! the provider's token endpoint and the returned identity token is verified
//! against the provider's published signing keys before any local account is
//! touched.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
