//! Caller-side conversation history with a turn cap.
//!
//! [`GeminiClient`](crate::llm::GeminiClient) keeps no state, so the caller
//! resupplies the whole conversation on every call.  [`ConversationHistory`]
//! holds the system prompt plus a rolling window of the most recent
//! user/assistant messages, capped at `max_turns` pairs.

use std::collections::VecDeque;

use crate::llm::message::{ChatMessage, Role};

/// Maximum number of user/assistant turn pairs resent to the model.
pub const MAX_CONVERSATION_TURNS: usize = 10;

/// Default system prompt for voice conversations.
pub const CONVERSATION_SYSTEM_PROMPT: &str = "You are a friendly and helpful voice assistant. \
Keep your responses concise and conversational since they will be spoken aloud. \
Aim for 1-3 sentences unless the user asks for more detail.";

/// Rolling window of conversation turns behind a fixed system prompt.
///
/// # Example
/// ```rust
/// use super_characters::llm::{ConversationHistory, Role};
///
/// let mut history = ConversationHistory::new("Be brief.");
/// history.push_user("Hi");
/// history.push_assistant("Hello!");
/// let messages = history.messages();
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system_prompt: Option<String>,
    turns: VecDeque<ChatMessage>,
    max_turns: usize,
}

impl ConversationHistory {
    /// History seeded with `system_prompt` and the default turn cap.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_max_turns(Some(system_prompt.into()), MAX_CONVERSATION_TURNS)
    }

    /// History with an explicit prompt (or none) and turn cap.
    pub fn with_max_turns(system_prompt: Option<String>, max_turns: usize) -> Self {
        Self {
            system_prompt,
            turns: VecDeque::with_capacity(max_turns * 2 + 1),
            max_turns,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    /// Append a message and drop the oldest turns beyond the cap.
    ///
    /// System messages replace the prompt instead of entering the window.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.system_prompt = Some(message.content);
            return;
        }

        self.turns.push_back(message);
        while self.turns.len() > self.max_turns * 2 {
            self.turns.pop_front();
        }
    }

    /// The messages to send: system prompt first, then turns oldest-first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system_prompt
            .iter()
            .map(|p| ChatMessage::system(p.as_str()))
            .chain(self.turns.iter().cloned())
            .collect()
    }

    /// Drop all turns, keeping the system prompt.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of user/assistant messages held (system prompt excluded).
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(CONVERSATION_SYSTEM_PROMPT)
    }
}
