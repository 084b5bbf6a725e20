//! Human handoff.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{ClinicStore, ToolContext, ToolResult, REQUEST_HUMAN_TOOL};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::format_stamp;
use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs};

/// Tag added to contacts that asked for a person.
pub const HANDOFF_TAG: &str = "requiere_humano";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestHumanArgs {
    #[serde(default)]
    reason: Option<String>,
}

/// Flags the conversation for a staff member.
///
/// The flag is a note and tag on the contact. Failing to write it does not
/// fail the handoff itself.
pub struct RequestHuman {
    store: Arc<dyn ClinicStore>,
}

impl RequestHuman {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RequestHuman {
    fn name(&self) -> &str {
        REQUEST_HUMAN_TOOL
    }

    fn description(&self) -> &str {
        "Transfiere la conversación a una persona del equipo ante una emergencia, frustración o petición explícita."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string", "description": "Motivo de la transferencia"}
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: ToolArgs, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: RequestHumanArgs = args.parse()?;
        let reason = args
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty());

        let note = match reason {
            Some(reason) => format!("[{}] Solicitó atención humana: {}", format_stamp(context.now), reason),
            None => format!("[{}] Solicitó atención humana", format_stamp(context.now)),
        };

        if let Err(e) = self
            .store
            .append_contact_memory(context.contact.id, &note, &[HANDOFF_TAG.to_string()])
            .await
        {
            warn!(contact_id = context.contact.id, "Failed to record handoff: {}", e);
        }

        info!(contact_id = context.contact.id, "Human handoff requested");

        Ok(ToolResult::success(
            "Se avisó al equipo de la clínica. Un miembro del personal contactará al paciente.",
        )
        .with_data(json!({ "handoff": true, "reason": reason })))
    }
}
