//! Error types for tool operations.

use brain_core::{StoreError, ToolResult};
use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// None of these reach the agent loop as errors: the executor renders each
/// one into an unsuccessful [`ToolResult`] via [`ToolError::into_result`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool exists but is blocked by policy.
    #[error("Tool not allowed: {0}")]
    NotAllowed(String),

    /// Arguments did not match the tool's schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Arguments were well-formed but the request breaks a clinic rule.
    #[error("{0}")]
    Rejected(String),

    /// Tool did not finish within the policy timeout.
    #[error("Tool execution timed out")]
    Timeout,

    /// The clinic store failed or refused the write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ToolError {
    /// Message suitable for the model.
    ///
    /// Storage backend details are not echoed; conflicts and missing rows
    /// are phrased as scheduling facts.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(name) => format!("La herramienta '{}' no existe.", name),
            Self::NotAllowed(name) => format!("La herramienta '{}' no está permitida.", name),
            Self::InvalidArguments(reason) => format!("Argumentos inválidos: {}", reason),
            Self::Rejected(reason) => reason.clone(),
            Self::Timeout => {
                "La operación tardó demasiado. Intenta de nuevo en un momento.".to_string()
            }
            Self::Store(StoreError::Conflict(_)) => {
                "Ese horario ya no está disponible (slot no longer available). Ofrece otro horario."
                    .to_string()
            }
            Self::Store(StoreError::NotFound { entity, id }) => {
                format!("No se encontró {} con id {}.", entity, id)
            }
            Self::Store(StoreError::Backend(_)) => {
                "No se pudo completar la operación por un problema interno.".to_string()
            }
        }
    }

    /// Convert into the unsuccessful result fed back to the model.
    pub fn into_result(self) -> ToolResult {
        ToolResult::error(self.user_message())
    }
}
