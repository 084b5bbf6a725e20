//! Conversation history windowing.
//!
//! The model only ever sees a bounded tail of the stored transcript. Older
//! turns survive as compacted notes on the contact.

use crate::chat::ChatMessage;
use crate::message::Message;

/// Default number of prior messages sent to the model.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// The most recent `max_messages` of `history`, oldest first.
pub fn history_window(history: &[Message], max_messages: usize) -> &[Message] {
    let start = history.len().saturating_sub(max_messages);
    &history[start..]
}

/// Chat messages for the windowed history.
pub fn window_messages(history: &[Message], max_messages: usize) -> Vec<ChatMessage> {
    history_window(history, max_messages)
        .iter()
        .map(ChatMessage::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;

    fn transcript(len: usize) -> Vec<Message> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("pregunta {}", i))
                } else {
                    Message::assistant(format!("respuesta {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_window_keeps_tail() {
        let history = transcript(7);
        let window = history_window(&history, 3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "pregunta 4");
        assert_eq!(window[2].content, "pregunta 6");
    }

    #[test]
    fn test_window_shorter_than_limit() {
        let history = transcript(2);
        assert_eq!(history_window(&history, 10).len(), 2);
        assert!(history_window(&history, 0).is_empty());
    }

    #[test]
    fn test_window_messages_roles() {
        let messages = window_messages(&transcript(4), 2);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[1].role, ChatRole::User);
    }
}
