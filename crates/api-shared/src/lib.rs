//! # API Shared
//!
//! Shared utilities and definitions for the patient service APIs.
//!
//! Contains:
//! - Wire types (`wire` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - The bearer-credential guard (`auth` module)

pub mod auth;
pub mod health;
pub mod wire;

pub use auth::{AuthDecision, BearerToken, CredentialCheck, Identity};
pub use health::HealthService;
pub use wire::*;
