use crate::{model::ModelManager, payments::PaymentProcessor};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    payments: PaymentProcessor,
}

impl AppState {
    pub fn new(mm: ModelManager) -> Self {
        Self {
            mm,
            payments: PaymentProcessor::new(),
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn payments(&self) -> &PaymentProcessor {
        &self.payments
    }
}
