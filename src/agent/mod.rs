//! Conversational agent
//!
//! A [`ReactAgent`] sends the conversation to a [`ChatModel`], runs the tool
//! calls the model asks for through the [`ToolRegistry`](crate::tools::ToolRegistry)
//! and feeds the results back until the model answers in plain text.
//! Messages use the chat-completions wire shape so the OpenAI backend can
//! serialize them as-is.

mod audit;
mod memory;
mod openai;
mod react;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use audit::AuditLog;
pub use memory::ConversationMemory;
pub use openai::OpenAiChatModel;
pub use react::ReactAgent;

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(
            default,
            deserialize_with = "null_as_empty",
            skip_serializing_if = "Vec::is_empty"
        )]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Text-only assistant reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<ToolCall>, D::Error> {
    Option::<Vec<ToolCall>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

/// Chat backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next assistant message for `messages`, offering `tools`
    async fn complete(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<ChatMessage>;
}

/// Output chunk of an agent turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Text written by the model
    Agent(String),
    /// Output of a tool call
    Tools(String),
}

impl AgentEvent {
    pub fn text(&self) -> &str {
        match self {
            Self::Agent(text) | Self::Tools(text) => text,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::Error;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays canned replies and records what it was sent
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<ChatMessage>>,
        pub seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<ChatMessage>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], _tools: &[Value]) -> Result<ChatMessage> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Model("script exhausted".to_string()))
        }
    }
}
