use serde::{Deserialize, Serialize};

/// A message in a page-grounded conversation.
///
/// Messages carry a role, content, and a conversation-local id. The id is
/// monotonically increasing within one conversation and exists purely so a
/// rendering surface can reconcile list updates; nothing in the engine keys
/// protocol behavior off it.
///
/// # Examples
///
/// ```
/// use pagelens::message::Message;
///
/// let question = Message::user(1, "What does this page say about pricing?");
/// let answer = Message::assistant(2, "The page lists three tiers.");
/// assert!(question.has_role(Message::USER));
/// assert!(!answer.is_error);
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (`user`, `assistant`, or `tool`).
    pub role: String,
    /// Text content, or a serialized tool result for `tool`-role messages.
    pub content: MessageContent,
    /// Conversation-local id, monotonically increasing per conversation.
    pub id: u64,
    /// Whether the assistant finished producing this message.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_complete: bool,
    /// Whether this message came from a thinking-model reasoning pass.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_thinking: bool,
    /// Whether this message renders a failed turn's error text.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Content payload of a [`Message`].
///
/// Plain text for user/assistant messages; a structured value for tool
/// results, preserved as-is so the rendering surface can pass it to the
/// originating tool's `render` hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    ToolResult(serde_json::Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// The text of this content, or `None` for structured tool results.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::ToolResult(_) => None,
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// Tool result message role. Stripped from history before provider calls.
    pub const TOOL: &'static str = "tool";

    /// Creates a new message with the specified role, id, and content.
    #[must_use]
    pub fn new(role: &str, id: u64, content: impl Into<MessageContent>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            id,
            is_complete: false,
            is_thinking: false,
            is_error: false,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(id: u64, content: &str) -> Self {
        Self::new(Self::USER, id, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(id: u64, content: &str) -> Self {
        Self::new(Self::ASSISTANT, id, content)
    }

    /// Creates a tool-result message.
    #[must_use]
    pub fn tool(id: u64, result: serde_json::Value) -> Self {
        Self {
            role: Self::TOOL.to_string(),
            content: MessageContent::ToolResult(result),
            id,
            is_complete: true,
            is_thinking: false,
            is_error: false,
        }
    }

    /// Marks this message as complete.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.is_complete = true;
        self
    }

    /// Marks this message as carrying error text.
    #[must_use]
    pub fn errored(mut self) -> Self {
        self.is_error = true;
        self.is_complete = true;
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// The text content of this message, empty for tool results.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_text().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn construction_and_roles() {
        let msg = Message::user(1, "hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.text(), "hello");
        assert!(msg.has_role(Message::USER));
        assert!(!msg.has_role(Message::ASSISTANT));
    }

    #[test]
    fn tool_messages_carry_structured_content() {
        let msg = Message::tool(3, json!({"temperature": 21.5}));
        assert!(msg.has_role(Message::TOOL));
        assert!(msg.content.as_text().is_none());
        assert!(msg.is_complete);
    }

    #[test]
    fn errored_marks_complete() {
        let msg = Message::assistant(2, "rate limit exceeded").errored();
        assert!(msg.is_error);
        assert!(msg.is_complete);
    }

    #[test]
    fn serialization_round_trip() {
        let original = Message::assistant(7, "It's sunny.").completed();
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn incomplete_flags_are_omitted_from_json() {
        let msg = Message::user(1, "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("is_error"));
        assert!(!json.contains("is_thinking"));
    }
}
