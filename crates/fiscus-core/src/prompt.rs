use serde::{Deserialize, Serialize};

/// A single entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// "user" or "assistant".
    pub role: String,
    /// The message content.
    pub text: String,
}

/// Conversation context passed to an AI responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// System prompt prepended to every request.
    pub system: String,
    /// Conversation history (oldest first).
    #[serde(default)]
    pub history: Vec<Turn>,
    /// The current user message, exactly as the user wrote it.
    pub user: String,
    /// Note appended to the user message when the prompt is rendered
    /// for a model. Not part of `user`, so rule-based responders can
    /// match on the raw text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

impl Prompt {
    /// Create a prompt with no history and an empty system prompt.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            history: Vec::new(),
            user: user.into(),
            suffix: String::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// The user message as rendered for a model, suffix included.
    fn rendered_user(&self) -> String {
        if self.suffix.is_empty() {
            self.user.clone()
        } else {
            format!("{}\n\n{}", self.user, self.suffix)
        }
    }

    /// Flatten the prompt into a single text block for responders that
    /// accept one text input.
    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();

        if !self.system.is_empty() {
            parts.push(format!("[System]\n{}", self.system));
        }

        for turn in &self.history {
            let role = if turn.role == "user" {
                "User"
            } else {
                "Assistant"
            };
            parts.push(format!("[{}]\n{}", role, turn.text));
        }

        parts.push(format!("[User]\n{}", self.rendered_user()));

        parts.join("\n\n")
    }

    /// Split the prompt into `(system, turns)` for chat-style APIs that
    /// carry the system prompt outside the messages array.
    pub fn to_chat(&self) -> (String, Vec<Turn>) {
        let mut turns = Vec::with_capacity(self.history.len() + 1);
        turns.extend(self.history.iter().cloned());
        turns.push(Turn {
            role: "user".to_string(),
            text: self.rendered_user(),
        });
        (self.system.clone(), turns)
    }
}

/// A response produced by a responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    /// The response text.
    pub text: String,
    /// Name of the responder that produced it.
    pub provider: String,
    /// Total tokens billed, when the API reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    /// Wall-clock time spent on the request, in milliseconds.
    #[serde(default)]
    pub processing_ms: u64,
}
