//! Main orchestrator that coordinates message processing.

use std::sync::Arc;

use agent_tools::{default_registry, RegistryToolExecutor, ToolPolicy};
use brain_core::{
    normalize_phone, ChatGateway, ClinicStore, ConversationContext, InboundMessage,
    MessageSender, Role, ToolRequest, REQUEST_HUMAN_TOOL,
};
use chrono::{NaiveDateTime, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::agent::{
    tool_context, AgentLoop, AgentReply, LoopOutcome, EMPTY_MESSAGE_REPLY, HANDOFF_CALL_ID,
    TECHNICAL_FALLBACK_REPLY,
};
use crate::compactor::{CompactionOutcome, CompactionSettings, ContextCompactor};
use crate::context::load_context;
use crate::error::OrchestratorError;
use crate::locks::ContactLocks;

/// What happened to one inbound message.
#[derive(Debug)]
pub struct ProcessedMessage {
    /// Resolved contact, if resolution succeeded.
    pub contact_id: Option<i64>,
    /// Normalized phone the reply was sent to.
    pub phone: String,
    pub reply: AgentReply,
    /// Whether the outbound channel accepted the reply.
    pub delivered: bool,
    /// Background compaction check started after this message.
    pub compaction: Option<JoinHandle<CompactionOutcome>>,
}

/// Main orchestrator that coordinates message processing.
///
/// The orchestrator:
/// - Serializes messages per contact so two loops never race on a calendar
/// - Resolves the contact and assembles the conversation context
/// - Persists both sides of the exchange
/// - Runs the agent loop and delivers whatever it replies
/// - Starts a compaction check once the reply is out
pub struct Orchestrator<S: MessageSender> {
    store: Arc<dyn ClinicStore>,
    agent: AgentLoop,
    compactor: Option<ContextCompactor>,
    sender: S,
    locks: ContactLocks,
}

impl<S: MessageSender> Orchestrator<S> {
    /// Create an orchestrator with default settings and the clinic tools.
    pub fn new(store: Arc<dyn ClinicStore>, gateway: Arc<dyn ChatGateway>, sender: S) -> Self {
        let executor = RegistryToolExecutor::new(default_registry(store.clone()));
        let agent = AgentLoop::new(gateway.clone(), Arc::new(executor));
        let compactor = ContextCompactor::new(gateway, store.clone());
        Self::with_components(store, agent, Some(compactor), sender)
    }

    /// Create an orchestrator configured from environment variables.
    pub fn from_env(store: Arc<dyn ClinicStore>, gateway: Arc<dyn ChatGateway>, sender: S) -> Self {
        let executor =
            RegistryToolExecutor::with_policy(default_registry(store.clone()), ToolPolicy::from_env());
        let agent = AgentLoop::from_env(gateway.clone(), Arc::new(executor));
        let compactor =
            ContextCompactor::with_settings(gateway, store.clone(), CompactionSettings::from_env());
        Self::with_components(store, agent, Some(compactor), sender)
    }

    /// Create an orchestrator from prebuilt parts. `None` disables compaction.
    pub fn with_components(
        store: Arc<dyn ClinicStore>,
        agent: AgentLoop,
        compactor: Option<ContextCompactor>,
        sender: S,
    ) -> Self {
        Self {
            store,
            agent,
            compactor,
            sender,
            locks: ContactLocks::default(),
        }
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Process an inbound message end-to-end.
    ///
    /// This method:
    /// 1. Normalizes the phone and takes the contact's lock
    /// 2. Resolves the contact and loads its context
    /// 3. Persists the user message
    /// 4. Runs the agent loop
    /// 5. Persists the reply
    /// 6. Sends the reply
    /// 7. Starts a background compaction check
    ///
    /// Storage failures before the loop still produce a fallback reply. Blank
    /// text gets [`EMPTY_MESSAGE_REPLY`] without storing anything or calling
    /// the model. The only error is [`OrchestratorError::Skipped`], for a
    /// message with no usable phone.
    pub async fn process(&self, message: InboundMessage) -> Result<ProcessedMessage, OrchestratorError> {
        // 1. Normalize and serialize per contact
        let phone = normalize_phone(&message.phone);
        if phone.trim_start_matches('+').is_empty() {
            return Err(OrchestratorError::Skipped(format!(
                "no usable phone in '{}'",
                message.phone
            )));
        }
        let text = message.text.trim();
        if text.is_empty() {
            debug!(tenant_id = message.tenant_id, phone = %phone, "Blank message, asking to resend");
            let reply = AgentReply {
                text: EMPTY_MESSAGE_REPLY.to_string(),
                tool_calls: Vec::new(),
                outcome: LoopOutcome::EmptyMessage,
            };
            let delivered = self.deliver(message.tenant_id, &phone, &reply.text, None).await;
            return Ok(ProcessedMessage {
                contact_id: None,
                phone,
                reply,
                delivered,
                compaction: None,
            });
        }

        info!(tenant_id = message.tenant_id, phone = %phone, "Processing message");
        if let Some(name) = &message.sender_name {
            debug!(phone = %phone, sender_name = %name, "Platform display name");
        }

        let lock = self.locks.lock_for(message.tenant_id, &phone);
        let _guard = lock.lock().await;

        // 2-3. Resolve, load and persist the user message
        let (contact_id, reply, now) = match self.prepare(message.tenant_id, &phone, text).await {
            Ok(context) => {
                // 4. Run the loop
                let reply = self.agent.run(&context, text).await;
                if reply.outcome == LoopOutcome::Handoff {
                    self.flag_handoff(&context, text).await;
                }

                // 5. Persist the reply
                if let Err(e) = self
                    .store
                    .append_message(context.contact.id, Role::Assistant, &reply.text)
                    .await
                {
                    warn!(contact_id = context.contact.id, "Failed to store reply: {}", e);
                }
                (Some(context.contact.id), reply, context.now)
            }
            Err(e) => {
                warn!(tenant_id = message.tenant_id, phone = %phone, "Could not prepare conversation: {}", e);
                (None, fallback_reply(), Utc::now().naive_utc())
            }
        };

        info!(
            contact_id,
            outcome = ?reply.outcome,
            tool_calls = reply.tool_calls.len(),
            "Reply ready"
        );

        // 6. Deliver
        let delivered = self.deliver(message.tenant_id, &phone, &reply.text, contact_id).await;

        // 7. Compaction runs off the critical path
        let compaction = match (&self.compactor, contact_id) {
            (Some(compactor), Some(contact_id)) => Some(spawn_compaction(compactor.clone(), contact_id, now)),
            _ => None,
        };

        Ok(ProcessedMessage {
            contact_id,
            phone,
            reply,
            delivered,
            compaction,
        })
    }

    async fn deliver(&self, tenant_id: i64, phone: &str, text: &str, contact_id: Option<i64>) -> bool {
        match self.sender.send(tenant_id, phone, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(contact_id, phone = %phone, "Failed to deliver reply: {}", e);
                false
            }
        }
    }

    /// Run a compaction check for a contact now.
    pub async fn compact(&self, contact_id: i64) -> Option<CompactionOutcome> {
        let compactor = self.compactor.as_ref()?;
        Some(compactor.compact(contact_id, Utc::now().naive_utc()).await)
    }

    async fn prepare(
        &self,
        tenant_id: i64,
        phone: &str,
        text: &str,
    ) -> Result<ConversationContext, OrchestratorError> {
        let contact = self.store.find_or_create_contact(tenant_id, phone).await?;
        let context = load_context(
            self.store.as_ref(),
            contact,
            self.agent.settings().history_window,
            Utc::now(),
        )
        .await?;
        self.store
            .append_message(context.contact.id, Role::User, text)
            .await?;
        Ok(context)
    }

    /// Record a safety-gate handoff on the contact through the tool layer.
    async fn flag_handoff(&self, context: &ConversationContext, text: &str) {
        let term = self.agent.gate().matched_term(text).unwrap_or_default();
        let request = ToolRequest {
            id: HANDOFF_CALL_ID.to_string(),
            name: REQUEST_HUMAN_TOOL.to_string(),
            arguments: json!({ "reason": format!("mensaje con término de escalamiento \"{}\"", term) }),
        };
        let result = self
            .agent
            .executor()
            .execute(request, &tool_context(context))
            .await;
        if !result.success {
            warn!(contact_id = context.contact.id, "Handoff flag not recorded: {}", result.message);
        }
    }
}

fn spawn_compaction(
    compactor: ContextCompactor,
    contact_id: i64,
    now: NaiveDateTime,
) -> JoinHandle<CompactionOutcome> {
    // Messages appended meanwhile have higher ids than the compacted prefix.
    tokio::spawn(async move { compactor.compact(contact_id, now).await })
}

fn fallback_reply() -> AgentReply {
    AgentReply {
        text: TECHNICAL_FALLBACK_REPLY.to_string(),
        tool_calls: Vec::new(),
        outcome: LoopOutcome::Failed,
    }
}
