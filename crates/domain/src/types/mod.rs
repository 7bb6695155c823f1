//! Domain types and models
//!
//! Payloads served by the CRM REST API, decoded from the common response
//! envelope.

pub mod dashboard;
pub mod envelope;
pub mod schedule;
pub mod user;

pub use dashboard::{MeetingBreakdown, MeetingsSplit, TargetProgress, TargetStatus};
pub use envelope::{ApiEnvelope, RejectedEnvelope};
pub use schedule::PrePlan;
pub use user::{OnboardingStatus, UserData};
