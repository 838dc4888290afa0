//! Application layer: use cases orchestrated over the domain ports.
//!
//! `EnrollmentService` owns the payment lifecycle, `AuthService` owns
//! accounts and sessions, `CohortService` owns cohorts and student
//! placement. All are shared behind `Arc` by the HTTP layer.

pub mod auth;
pub mod cohorts;
pub mod enrollment;
