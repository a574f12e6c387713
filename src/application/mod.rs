//! Application layer orchestrating the domain ports.
//!
//! The `ReconciliationEngine` is the only writer of payment state
//! transitions; `RegistrationService` creates orders and opens gateway
//! sessions; `IntakeService` owns the sponsorship application lifecycle.

pub mod intake;
pub mod reconciliation;
pub mod registration;
