//! The bounded model/tool loop that produces one reply per inbound message.

use std::env;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use brain_core::{
    hash_prompt, window_messages, BrainError, ChatGateway, ChatMessage, CompletionRequest,
    ConversationContext, ToolChoice, ToolContext, ToolExecutor, ToolInvocation, ToolRequest,
    ToolResult, DEFAULT_HISTORY_WINDOW, REQUEST_HUMAN_TOOL, UPDATE_NAME_TOOL,
};
use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::safety::SafetyGate;
use crate::system_prompt::{build_system_prompt, PromptSettings};

/// Default ceiling on model calls per message.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Call id of the synthetic handoff invocation.
pub const HANDOFF_CALL_ID: &str = "safety_gate_handoff";

/// Reply sent when the safety gate hands the conversation to a person.
pub const HANDOFF_REPLY: &str = "Entiendo, y quiero que recibas la atención adecuada. Ya avisé a una persona de nuestro equipo para que se comunique contigo lo antes posible. Si se trata de una emergencia, acude de inmediato al servicio de urgencias más cercano o llama al 911.";

/// Reply sent when the model cannot be reached or misbehaves.
pub const TECHNICAL_FALLBACK_REPLY: &str = "Disculpa, en este momento tengo dificultades técnicas para responderte. Por favor escríbeme de nuevo en unos minutos o llama directamente a la clínica.";

/// Reply sent when the inbound text is blank.
pub const EMPTY_MESSAGE_REPLY: &str = "No entendí tu mensaje. ¿Me lo puedes escribir de nuevo?";

/// Reply sent when the iteration ceiling is reached.
pub const EXHAUSTED_FALLBACK_REPLY: &str = "Lo siento, no logré completar tu solicitud esta vez. ¿Me lo puedes pedir de nuevo con un poco más de detalle? También puedes llamar a la clínica y con gusto te ayudan.";

/// Agent loop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum model calls per message.
    pub max_iterations: usize,
    /// Prior messages sent to the model.
    pub history_window: usize,
    /// Model override; the gateway default is used when unset.
    pub model: Option<String>,
    pub prompt: PromptSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_window: DEFAULT_HISTORY_WINDOW,
            model: None,
            prompt: PromptSettings::default(),
        }
    }
}

impl AgentSettings {
    /// Settings from the environment.
    ///
    /// - `AGENT_MAX_ITERATIONS` - model calls per message (default: 5, minimum 1)
    /// - `AGENT_HISTORY_WINDOW` - prior messages sent to the model (default: 10)
    /// - `AGENT_MODEL` - model override (default: gateway model)
    /// - plus the [`PromptSettings::from_env`] variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: env::var("AGENT_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.max(1))
                .unwrap_or(defaults.max_iterations),
            history_window: env::var("AGENT_HISTORY_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_window),
            model: env::var("AGENT_MODEL").ok().filter(|m| !m.trim().is_empty()),
            prompt: PromptSettings::from_env(),
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_prompt(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }
}

/// How a loop run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered with text.
    Answered,
    /// The safety gate fired; the model was never called.
    Handoff,
    /// The iteration ceiling was reached.
    Exhausted,
    /// The gateway failed, panicked, or returned an empty reply.
    Failed,
    /// The inbound text was blank; nothing was stored or asked.
    EmptyMessage,
}

/// Final reply plus the tool calls made while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub text: String,
    /// Executed tool calls, in execution order.
    pub tool_calls: Vec<ToolInvocation>,
    pub outcome: LoopOutcome,
}

impl AgentReply {
    /// Whether a tool with this name ran.
    pub fn invoked(&self, tool: &str) -> bool {
        self.tool_calls.iter().any(|call| call.name == tool)
    }
}

/// Drives safety gate, prompt, model calls and tool calls for one message.
///
/// The loop never returns an error: every failure becomes a fixed reply.
pub struct AgentLoop {
    gateway: Arc<dyn ChatGateway>,
    executor: Arc<dyn ToolExecutor>,
    gate: SafetyGate,
    settings: AgentSettings,
}

impl AgentLoop {
    /// Loop with the embedded escalation terms and default settings.
    pub fn new(gateway: Arc<dyn ChatGateway>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            gateway,
            executor,
            gate: SafetyGate::default(),
            settings: AgentSettings::default(),
        }
    }

    /// Loop configured from the environment.
    pub fn from_env(gateway: Arc<dyn ChatGateway>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self::new(gateway, executor)
            .with_gate(SafetyGate::from_env())
            .with_settings(AgentSettings::from_env())
    }

    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<dyn ToolExecutor> {
        &self.executor
    }

    /// Produce the reply to `user_text`.
    ///
    /// `context.history` holds the prior messages only; `user_text` is the
    /// new message.
    pub async fn run(&self, context: &ConversationContext, user_text: &str) -> AgentReply {
        let contact_id = context.contact.id;

        if let Some(term) = self.gate.matched_term(user_text) {
            info!(contact_id, term, "Safety gate triggered, handing off");
            return handoff_reply(term);
        }

        let mut invocations = Vec::new();
        let run = AssertUnwindSafe(self.drive(context, user_text, &mut invocations))
            .catch_unwind()
            .await;

        let (text, outcome) = match run {
            Ok(Ok(Some(text))) => (text, LoopOutcome::Answered),
            Ok(Ok(None)) => {
                warn!(
                    contact_id,
                    max_iterations = self.settings.max_iterations,
                    tool_calls = invocations.len(),
                    "Iteration ceiling reached without a reply"
                );
                (EXHAUSTED_FALLBACK_REPLY.to_string(), LoopOutcome::Exhausted)
            }
            Ok(Err(e)) => {
                warn!(contact_id, gateway = self.gateway.name(), "Model call failed: {}", e);
                (TECHNICAL_FALLBACK_REPLY.to_string(), LoopOutcome::Failed)
            }
            Err(_) => {
                error!(contact_id, gateway = self.gateway.name(), "Agent loop panicked");
                (TECHNICAL_FALLBACK_REPLY.to_string(), LoopOutcome::Failed)
            }
        };

        AgentReply {
            text,
            tool_calls: invocations,
            outcome,
        }
    }

    /// The model/tool cycle. `Ok(None)` means the ceiling was reached.
    async fn drive(
        &self,
        context: &ConversationContext,
        user_text: &str,
        invocations: &mut Vec<ToolInvocation>,
    ) -> Result<Option<String>, BrainError> {
        // Working copy; update_name changes it for the rest of this run only.
        let mut working = context.clone();
        let mut prompt = build_system_prompt(&working, &self.settings.prompt);

        let mut transcript = window_messages(&context.history, self.settings.history_window);
        transcript.push(ChatMessage::user(user_text));

        let tools = self.executor.definitions();

        for iteration in 1..=self.settings.max_iterations {
            let mut messages = Vec::with_capacity(transcript.len() + 1);
            messages.push(ChatMessage::system(prompt.clone()));
            messages.extend(transcript.iter().cloned());

            debug!(
                contact_id = working.contact.id,
                iteration,
                messages = messages.len(),
                prompt_hash = %hash_prompt(&prompt),
                "Calling model"
            );

            let mut request = CompletionRequest::new(messages);
            if !tools.is_empty() {
                request = request.with_tools(tools.clone(), ToolChoice::Auto);
            }
            if let Some(model) = &self.settings.model {
                request = request.with_model(model.clone());
            }

            let completion = self.gateway.complete(request).await?;

            if !completion.has_tool_calls() {
                return match completion.text_content() {
                    Some(text) => {
                        info!(
                            contact_id = working.contact.id,
                            iterations = iteration,
                            tool_calls = invocations.len(),
                            "Agent replied"
                        );
                        Ok(Some(text.to_string()))
                    }
                    None => Err(BrainError::InvalidResponse(
                        "model returned an empty reply".to_string(),
                    )),
                };
            }

            // Text alongside tool calls is not a reply.
            let calls = completion.tool_calls;
            transcript.push(ChatMessage::assistant_tool_calls(None, calls.clone()));

            let mut renamed = false;
            for call in &calls {
                let result = match ToolRequest::from_tool_call(call) {
                    Ok(request) => {
                        self.executor
                            .execute(request, &tool_context(&working))
                            .await
                    }
                    Err(e) => {
                        warn!(
                            contact_id = working.contact.id,
                            tool = %call.function.name,
                            call_id = %call.id,
                            "Malformed tool arguments: {}",
                            e
                        );
                        ToolResult::error(format!(
                            "Los argumentos de {} no son JSON válido: {}",
                            call.function.name, e
                        ))
                    }
                };

                if call.function.name == UPDATE_NAME_TOOL && result.success {
                    if let Some(name) = stored_name(&result) {
                        working.contact.name = Some(name.to_string());
                        renamed = true;
                    }
                }

                transcript.push(ChatMessage::tool(call.id.clone(), result.to_model_content()));
                invocations.push(ToolInvocation {
                    call_id: call.id.clone(),
                    name: call.function.name.clone(),
                    result,
                });
            }

            if renamed {
                prompt = build_system_prompt(&working, &self.settings.prompt);
            }
        }

        Ok(None)
    }
}

pub(crate) fn tool_context(context: &ConversationContext) -> ToolContext {
    ToolContext {
        contact: context.contact.clone(),
        tenant_id: context.clinic.tenant_id,
        clinic: context.clinic.clone(),
        now: context.now,
    }
}

fn stored_name(result: &ToolResult) -> Option<&str> {
    result
        .data
        .as_ref()
        .and_then(|data| data.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn handoff_reply(term: &str) -> AgentReply {
    let result = ToolResult::success("Conversación transferida a una persona del equipo.")
        .with_data(json!({ "trigger": "safety_gate", "term": term }));

    AgentReply {
        text: HANDOFF_REPLY.to_string(),
        tool_calls: vec![ToolInvocation {
            call_id: HANDOFF_CALL_ID.to_string(),
            name: REQUEST_HUMAN_TOOL.to_string(),
            result,
        }],
        outcome: LoopOutcome::Handoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_settings_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::remove_var("AGENT_MAX_ITERATIONS");
        std::env::remove_var("AGENT_HISTORY_WINDOW");
        std::env::remove_var("AGENT_MODEL");
        let settings = AgentSettings::from_env();
        assert_eq!(settings.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(settings.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(settings.model, None);

        std::env::set_var("AGENT_MAX_ITERATIONS", "0");
        std::env::set_var("AGENT_HISTORY_WINDOW", "4");
        std::env::set_var("AGENT_MODEL", "deepseek-reasoner");
        let settings = AgentSettings::from_env();
        assert_eq!(settings.max_iterations, 1);
        assert_eq!(settings.history_window, 4);
        assert_eq!(settings.model.as_deref(), Some("deepseek-reasoner"));

        std::env::remove_var("AGENT_MAX_ITERATIONS");
        std::env::remove_var("AGENT_HISTORY_WINDOW");
        std::env::remove_var("AGENT_MODEL");
    }

    #[test]
    fn test_handoff_reply_shape() {
        let reply = handoff_reply("sangrado");
        assert_eq!(reply.outcome, LoopOutcome::Handoff);
        assert_eq!(reply.tool_calls.len(), 1);
        assert!(reply.invoked(REQUEST_HUMAN_TOOL));
        assert_eq!(
            reply.tool_calls[0].result.data.as_ref().and_then(|d| d["term"].as_str()),
            Some("sangrado")
        );
    }

    #[test]
    fn test_stored_name() {
        let result = ToolResult::success("ok").with_data(json!({"name": " Ana "}));
        assert_eq!(stored_name(&result), Some("Ana"));
        assert_eq!(stored_name(&ToolResult::success("ok")), None);
    }
}
