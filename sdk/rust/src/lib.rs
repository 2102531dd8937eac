//! Client SDK for the ZEUS SAFETY API proxy.
//!
//! Session state is passed explicitly: a [`SessionContext`] owns the bearer
//! token, the signed-in user and cached permission lists. A `401` from the
//! proxy logs the session out and surfaces as [`ClientError::SessionExpired`].

pub mod client;
pub mod session;

pub use client::{ClientError, ZeusClient};
pub use session::{SessionContext, TtlCell, UserProfile, PERMISSIONS_TTL};
