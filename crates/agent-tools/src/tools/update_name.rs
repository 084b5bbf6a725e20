//! Contact name capture.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{ClinicStore, ToolContext, ToolResult, UPDATE_NAME_TOOL};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs};

/// Longest accepted name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateNameArgs {
    name: String,
}

/// Stores the contact's name.
///
/// The normalized name is returned in `data.name` so the caller can update
/// its working copy of the contact.
pub struct UpdateName {
    store: Arc<dyn ClinicStore>,
}

impl UpdateName {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateName {
    fn name(&self) -> &str {
        UPDATE_NAME_TOOL
    }

    fn description(&self) -> &str {
        "Registra el nombre completo del paciente en cuanto lo proporcione."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Nombre completo del paciente"}
            },
            "required": ["name"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: UpdateNameArgs = args.parse()?;
        let name = args.name.split_whitespace().collect::<Vec<_>>().join(" ");

        if name.is_empty() {
            return Err(ToolError::Rejected("El nombre no puede estar vacío.".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ToolError::Rejected(format!(
                "El nombre es demasiado largo (máximo {} caracteres).",
                MAX_NAME_CHARS
            )));
        }

        self.store
            .update_contact_name(context.contact.id, &name)
            .await?;

        info!(contact_id = context.contact.id, "Contact name updated");

        Ok(ToolResult::success(format!("Nombre registrado: {}.", name))
            .with_data(json!({ "name": name })))
    }
}
