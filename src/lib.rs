//! Learnhub - Learning Management Platform
//!
//! A course/enrollment/progress domain service behind a JSON HTTP API.
//!
//! ## Architecture
//!
//! - **Courses**: authored by trainers, gated by an admin approval workflow
//!   (pending/approved/rejected) before becoming publicly visible
//! - **Lessons**: ordered content units (video or image) owned by a course
//! - **Enrollment & Progress**: per-(user, course) completion tracking with a
//!   derived percentage that gates certificate issuance
//! - **Notifications**: persisted per-user inbox fed by approval decisions

mod auth;
mod config;
mod database;
mod error;
mod models;
mod services;
mod web;

pub use auth::{AuthUser, MaybeAuthUser};
pub use config::Config;
pub use database::Database;
pub use error::ApiError;
pub use models::*;
pub use services::{ApprovalWorkflow, CourseCatalog, MediaStore, ProgressTracker};
pub use web::{routes, AppState};
