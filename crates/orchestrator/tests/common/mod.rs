//! Shared setup for the orchestrator integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use agent_tools::{default_registry, RegistryToolExecutor};
use brain_core::{ChatGateway, ChatMessage, ChatRole, Contact, ConversationContext, Service};
use mock_brain::fixtures::{at, clinic_config};
use mock_brain::InMemoryStore;
use orchestrator::AgentLoop;

pub const PHONE: &str = "+5215512345678";

/// Store with clinic 1, a 45 minute cleaning and one contact.
pub fn seeded_store(name: Option<&str>) -> (Arc<InMemoryStore>, Service, Contact) {
    let store = Arc::new(InMemoryStore::new());
    store.add_clinic(clinic_config(1));
    let service = store.add_service(1, "Limpieza dental", 50_000, 45);
    let contact = store.add_contact(1, PHONE, name);
    (store, service, contact)
}

/// Context with "now" on Friday 2026-02-27 at noon and no history.
pub fn context_for(contact: &Contact, services: Vec<Service>) -> ConversationContext {
    ConversationContext {
        contact: contact.clone(),
        history: Vec::new(),
        appointments: Vec::new(),
        services,
        clinic: clinic_config(contact.tenant_id),
        last_cancellation: None,
        now: at(2026, 2, 27, 12, 0),
    }
}

/// Agent loop over the real clinic tools backed by `store`.
pub fn agent_loop(gateway: Arc<dyn ChatGateway>, store: Arc<InMemoryStore>) -> AgentLoop {
    let executor = RegistryToolExecutor::new(default_registry(store));
    AgentLoop::new(gateway, Arc::new(executor))
}

pub fn system_prompt(messages: &[ChatMessage]) -> &str {
    assert_eq!(messages[0].role, ChatRole::System);
    messages[0].content.as_deref().unwrap_or_default()
}
