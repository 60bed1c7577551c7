//! In-memory conversation history keyed by thread id

use super::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Message history per thread; clones share the same store
///
/// With a turn limit, only the most recent user turns (each user message and
/// everything after it up to the next one) are kept.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    threads: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
    max_turns: Option<usize>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_turns` turns per thread (at least one)
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns.max(1));
        self
    }

    pub async fn history(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn append(&self, thread_id: &str, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut threads = self.threads.write().await;
        let history = threads.entry(thread_id.to_string()).or_default();
        history.extend(messages);
        if let Some(max_turns) = self.max_turns {
            trim_turns(history, max_turns);
        }
    }

    pub async fn clear(&self, thread_id: &str) {
        self.threads.write().await.remove(thread_id);
    }
}

/// Drop the oldest turns so at most `max_turns` remain
fn trim_turns(history: &mut Vec<ChatMessage>, max_turns: usize) {
    let starts: Vec<usize> = history
        .iter()
        .enumerate()
        .filter(|(_, message)| matches!(message, ChatMessage::User { .. }))
        .map(|(index, _)| index)
        .collect();

    if starts.len() > max_turns {
        let keep_from = starts[starts.len() - max_turns];
        history.drain(..keep_from);
    }
}
