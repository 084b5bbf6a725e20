//! The per-invocation input bundle.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clinic::{Appointment, CancellationFact, ClinicConfig, Service};
use crate::contact::Contact;
use crate::message::Message;

/// Everything one agent invocation needs, assembled fresh by the caller.
///
/// The core never caches this across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub contact: Contact,
    /// Prior messages, oldest first. Does not include the new user message.
    pub history: Vec<Message>,
    /// Future, non-cancelled appointments ordered by start time.
    pub appointments: Vec<Appointment>,
    /// Active service catalog.
    pub services: Vec<Service>,
    pub clinic: ClinicConfig,
    pub last_cancellation: Option<CancellationFact>,
    /// Clinic-local reference time for the invocation.
    pub now: NaiveDateTime,
}
