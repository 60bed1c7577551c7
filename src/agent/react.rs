//! ReAct loop
//!
//! 1. Send system prompt, thread history and the new input to the model
//! 2. Text-only reply: emit it and finish the turn
//! 3. Tool calls: run each through the registry, emit the output, append the
//!    results and go back to 1
//!
//! Tool failures are reported to the model as `Error: ...` text so it can
//! recover; only model failures end the turn with an error.

use super::{AgentEvent, AuditLog, ChatMessage, ChatModel, ConversationMemory, ToolCall};
use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::tools::ToolRegistry;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct ReactAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    memory: ConversationMemory,
    system_prompt: String,
    max_iterations: usize,
    audit: Option<AuditLog>,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            memory: ConversationMemory::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            audit: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Run one user turn on `thread_id`, passing each chunk to `sink` as it
    /// is produced
    ///
    /// Messages of the turn are stored in memory even when the model fails
    /// part way, so the thread stays consistent for the next turn.
    pub async fn stream<F>(&self, thread_id: &str, input: &str, mut sink: F) -> Result<()>
    where
        F: FnMut(AgentEvent) + Send,
    {
        let history = self.memory.history(thread_id).await;
        let mut turn = vec![ChatMessage::user(input)];

        let outcome = self.run_turn(&history, &mut turn, &mut sink).await;
        self.memory.append(thread_id, turn).await;
        outcome
    }

    /// Run one user turn and collect its chunks
    pub async fn invoke(&self, thread_id: &str, input: &str) -> Result<Vec<AgentEvent>> {
        let mut events = Vec::new();
        self.stream(thread_id, input, |event| events.push(event))
            .await?;
        Ok(events)
    }

    async fn run_turn<F>(
        &self,
        history: &[ChatMessage],
        turn: &mut Vec<ChatMessage>,
        sink: &mut F,
    ) -> Result<()>
    where
        F: FnMut(AgentEvent) + Send,
    {
        let specs = self.tools.function_specs();

        for iteration in 0..self.max_iterations {
            let mut messages = Vec::with_capacity(1 + history.len() + turn.len());
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
            messages.extend_from_slice(history);
            messages.extend_from_slice(turn);

            debug!(iteration, messages = messages.len(), "Calling model");
            let reply = self.model.complete(&messages, &specs).await?;

            let (content, tool_calls) = match reply {
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => (content, tool_calls),
                other => {
                    return Err(Error::Model(format!(
                        "Expected an assistant message, got {}",
                        other.role()
                    )))
                }
            };

            let tool_calls: Vec<ToolCall> = tool_calls.into_iter().map(with_call_id).collect();

            if let Some(text) = content.as_deref().filter(|t| !t.trim().is_empty()) {
                sink(AgentEvent::Agent(text.to_string()));
            }
            turn.push(ChatMessage::Assistant {
                content,
                tool_calls: tool_calls.clone(),
            });

            if tool_calls.is_empty() {
                return Ok(());
            }

            for call in &tool_calls {
                let output = self.run_tool(call).await;
                sink(AgentEvent::Tools(output.clone()));
                turn.push(ChatMessage::Tool {
                    tool_call_id: call.id.clone(),
                    content: output,
                });
            }
        }

        warn!(max_iterations = self.max_iterations, "Iteration limit reached");
        let text = format!(
            "Stopped after {} steps without a final answer.",
            self.max_iterations
        );
        sink(AgentEvent::Agent(text.clone()));
        turn.push(ChatMessage::assistant(text));
        Ok(())
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let args = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "Malformed tool arguments");
                return format!("Error: {}", e);
            }
        };

        info!(tool = name, call_id = %call.id, "Running tool");
        if let Some(audit) = &self.audit {
            audit.tool_call_start(&call.id, name, &args).await;
        }

        let started = Instant::now();
        let result = self.tools.invoke(name, args.clone()).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(audit) = &self.audit {
            audit
                .tool_call_complete(&call.id, name, &args, &result, duration_ms)
                .await;
        }

        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool failed");
                format!("Error: {}", e)
            }
        }
    }
}

fn with_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_empty() {
        call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
    }
    call
}

fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| Error::InvalidArgument(format!("Tool arguments are not valid JSON: {}", e)))
}
