//! Scripted chat model for integration testing.
//!
//! Replies are popped from a queue in order; every request's message list
//! is recorded. Running out of replies is an error, like an upstream
//! failure would be.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use augur::llm::{ChatMessage, ChatModel, Role, ToolCall, ToolSpec};

#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<ChatMessage>>>,
    seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain-text final answer.
    pub fn says(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(ChatMessage::assistant(text));
        self
    }

    /// Queue a round of tool calls: `(id, tool name, JSON arguments)`.
    pub fn calls(self, calls: &[(&str, &str, &str)]) -> Self {
        let tool_calls = calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect();
        self.replies.lock().unwrap().push_back(ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        });
        self
    }

    /// Message lists received, one per model call.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }

    /// Content of the tool result answering `call_id`, from any request.
    pub fn tool_result(&self, call_id: &str) -> Option<String> {
        self.requests()
            .iter()
            .flatten()
            .find(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id))
            .and_then(|m| m.content.clone())
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ChatMessage> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model has no more replies"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
