use crate::application::intake::IntakeService;
use crate::application::reconciliation::ReconciliationEngine;
use crate::application::registration::RegistrationService;
use std::sync::Arc;

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub registration: Arc<RegistrationService>,
    pub intake: Arc<IntakeService>,
}

impl AppState {
    pub fn new(
        engine: ReconciliationEngine,
        registration: RegistrationService,
        intake: IntakeService,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            registration: Arc::new(registration),
            intake: Arc::new(intake),
        }
    }
}
