// Per-operation fault injection

use healthcheck_core::error::{AppError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Operations that are currently forced to fail, with the error message
#[derive(Debug, Default)]
pub struct FaultInjector {
    faults: RwLock<HashMap<String, String>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail until `heal` is called
    pub fn fail(&self, op: &str, message: impl Into<String>) {
        self.faults.write().insert(op.to_string(), message.into());
    }

    pub fn heal(&self, op: &str) {
        self.faults.write().remove(op);
    }

    pub fn heal_all(&self) {
        self.faults.write().clear();
    }

    /// `Err(AppError::Backend)` if `op` is currently faulted
    pub fn check(&self, op: &str) -> Result<()> {
        match self.faults.read().get(op) {
            Some(message) => Err(AppError::Backend(format!("{}: {}", op, message))),
            None => Ok(()),
        }
    }
}
