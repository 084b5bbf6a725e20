//! System prompt construction.
//!
//! [`build_system_prompt`] is a pure function of the conversation context:
//! the same context always produces the same prompt, which keeps the logged
//! fingerprint meaningful.

use std::env;

use brain_core::{
    describe_datetime, format_contact_memory, format_time_12h, weekday_name_es,
    ConversationContext, DayHours, REQUEST_HUMAN_TOOL, UPDATE_NAME_TOOL,
};

/// Default assistant persona name.
pub const DEFAULT_PERSONA_NAME: &str = "Sofía";

/// Default character budget for the contact memory block.
pub const DEFAULT_MEMORY_MAX_CHARS: usize = 1500;

/// Marker rendered when the contact's name is unknown.
pub const NAME_NOT_PROVIDED: &str = "No proporcionado";

/// Marker rendered for a closed day.
pub const CLOSED_DAY: &str = "CERRADO";

/// Rule that forbids booking before the contact is identified.
pub const IDENTITY_FIRST_RULE: &str = "IDENTIDAD PRIMERO: nunca agendes una cita sin conocer el nombre del paciente. Si el nombre aparece como \"No proporcionado\", pregúntalo antes de proponer o agendar horarios y guárdalo con update_name en cuanto te lo diga.";

/// One-line descriptions of the tools, in the order the model sees them.
const TOOL_GUIDE: &[(&str, &str)] = &[
    ("get_available_slots", "consulta los horarios libres de un servicio en una fecha."),
    ("book_appointment", "agenda una cita; solo cuando ya conoces el nombre y el paciente eligió servicio, fecha y hora."),
    ("cancel_appointment", "cancela una cita próxima del paciente usando su ID."),
    ("reschedule_appointment", "mueve una cita próxima del paciente a otra fecha y hora usando su ID."),
    (UPDATE_NAME_TOOL, "guarda el nombre del paciente."),
    (REQUEST_HUMAN_TOOL, "pasa la conversación a una persona del equipo."),
];

/// Settings for prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub persona_name: String,
    /// Character budget for accumulated notes and tags.
    pub memory_max_chars: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            persona_name: DEFAULT_PERSONA_NAME.to_string(),
            memory_max_chars: DEFAULT_MEMORY_MAX_CHARS,
        }
    }
}

impl PromptSettings {
    /// Settings from the environment.
    ///
    /// - `AGENT_PERSONA_NAME` - persona name (default: Sofía)
    /// - `AGENT_MEMORY_MAX_CHARS` - memory block budget (default: 1500)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            persona_name: env::var("AGENT_PERSONA_NAME")
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.persona_name),
            memory_max_chars: env::var("AGENT_MEMORY_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_max_chars),
        }
    }

    pub fn with_persona_name(mut self, name: impl Into<String>) -> Self {
        self.persona_name = name.into();
        self
    }
}

/// Build the system prompt for one model call.
pub fn build_system_prompt(context: &ConversationContext, settings: &PromptSettings) -> String {
    let clinic = &context.clinic;
    let contact = &context.contact;
    let mut sections = Vec::new();

    sections.push(format!(
        "Eres {}, la asistente virtual de {}, una clínica dental. Atiendes a pacientes y prospectos por mensaje de texto.",
        settings.persona_name, clinic.name
    ));

    sections.push(format!(
        "## Clínica\n- Nombre: {}\n- Dirección: {}\n- Teléfono: {}",
        clinic.name, clinic.address, clinic.phone
    ));

    let hours: Vec<String> = clinic
        .hours
        .iter()
        .map(|(day, hours)| match hours {
            DayHours::Closed => format!("- {}: {}", weekday_name_es(day), CLOSED_DAY),
            DayHours::Open { open, close } => format!(
                "- {}: {} a {}",
                weekday_name_es(day),
                format_time_12h(open),
                format_time_12h(close)
            ),
        })
        .collect();
    sections.push(format!("## Horario de atención\n{}", hours.join("\n")));

    if !context.services.is_empty() {
        let services: Vec<String> = context
            .services
            .iter()
            .map(|service| {
                format!(
                    "- [ID {}] {}: {}, {} minutos",
                    service.id,
                    service.title,
                    service.display_price(),
                    service.duration_minutes
                )
            })
            .collect();
        sections.push(format!("## Servicios\n{}", services.join("\n")));
    }

    let kind = if contact.is_registered() {
        "Paciente registrado"
    } else {
        "Contacto nuevo (aún no es paciente)"
    };
    sections.push(format!(
        "## Paciente\n- Nombre: {}\n- Tipo: {}",
        contact.display_name().unwrap_or(NAME_NOT_PROVIDED),
        kind
    ));

    let appointments = if context.appointments.is_empty() {
        "Sin citas próximas.".to_string()
    } else {
        context
            .appointments
            .iter()
            .map(|appointment| {
                format!(
                    "- [ID {}] {} - {} ({})",
                    appointment.id,
                    describe_datetime(appointment.starts_at),
                    appointment.service_title,
                    appointment.status.label()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    sections.push(format!("## Citas próximas\n{}", appointments));

    if let Some(cancellation) = &context.last_cancellation {
        let reason = cancellation
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or("sin motivo registrado");
        sections.push(format!(
            "## Última cancelación\nEl paciente canceló una cita del {} ({}). Tenlo presente y muestra empatía si vuelve a agendar.",
            describe_datetime(cancellation.date),
            reason
        ));
    }

    if let Some(memory) = format_contact_memory(contact, settings.memory_max_chars) {
        sections.push(format!("## Lo que sabemos del paciente\n{}", memory));
    }

    sections.push(format!("## Fecha actual\nHoy es {}.", describe_datetime(context.now)));

    let tools: Vec<String> = TOOL_GUIDE
        .iter()
        .map(|(name, description)| format!("   - {}: {}", name, description))
        .collect();
    sections.push(format!(
        "## Reglas\n1. {}\n2. Herramientas disponibles:\n{}\n3. SEGURIDAD: no des diagnósticos ni consejos médicos. Ante una emergencia, dolor intenso, sangrado, o si el paciente se frustra o pide hablar con una persona, usa {}.\n4. Para citas existentes usa siempre el ID de la lista de citas próximas. Para las herramientas usa fechas AAAA-MM-DD; al paciente muéstrale las horas en formato de 12 horas (por ejemplo 4:30 PM).\n5. TONO: cálido, breve y profesional, en español. Una pregunta a la vez y sin inventar horarios, precios ni servicios.",
        IDENTITY_FIRST_RULE,
        tools.join("\n"),
        REQUEST_HUMAN_TOOL
    ));

    sections.join("\n\n")
}
