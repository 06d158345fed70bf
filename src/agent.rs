//! Agent turn loop.
//!
//! One user turn: render the shared state into the prompt, let the model
//! call tools (serially) until it answers in plain text, and apply any
//! `update_watchlist` call to the state through the bridge.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bridge::{extract_state, render_context, RawArgs};
use crate::config::AgentConfig;
use crate::llm::{ChatMessage, ChatModel, Role};
use crate::tools::catalog::UPDATE_WATCHLIST;
use crate::tools::{ToolOutput, Toolbox, WATCHLIST_IGNORED};
use crate::types::AgentState;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are {name}, an autonomous Polymarket trading agent. \
You analyze prediction markets, evaluate probabilities, and make betting decisions using \
real-time market data from Polymarket. When the user asks you to find opportunities, analyze \
markets thoroughly: look at current prices, liquidity, and recent price movements before \
making recommendations or placing bets. Always explain your reasoning. Whenever the \
watchlist or positions change, call update_watchlist with the entire state, not just new items.";

// ---------------------------------------------------------------------------
// Turn result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final assistant text.
    pub reply: String,
    /// Conversation history after the turn, without the system prompt.
    pub messages: Vec<ChatMessage>,
    pub state: AgentState,
    pub state_changed: bool,
    /// Names of the tools called, in order.
    pub tool_calls: Vec<String>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

pub struct Agent {
    model: Arc<dyn ChatModel>,
    toolbox: Arc<Toolbox>,
    system_prompt: String,
    max_tool_rounds: usize,
    max_history_messages: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, toolbox: Arc<Toolbox>, config: &AgentConfig) -> Self {
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.replace("{name}", &config.name));
        Self {
            model,
            toolbox,
            system_prompt,
            max_tool_rounds: config.max_tool_rounds.max(1),
            max_history_messages: config.max_history_messages.max(2),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Run one user turn against `history` and `state`.
    ///
    /// Tool failures are fed back to the model as text and never fail the
    /// turn; only a model error does.
    pub async fn run_turn(
        &self,
        history: &[ChatMessage],
        state: AgentState,
        user_message: &str,
    ) -> Result<TurnOutcome> {
        let specs = self.toolbox.specs();
        let mut state = state;
        let mut state_changed = false;
        let mut tool_calls = Vec::new();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(ChatMessage::user(render_context(&state, user_message)));

        let mut reply = None;

        for round in 0..self.max_tool_rounds {
            let assistant = self
                .model
                .complete(&messages, &specs)
                .await
                .with_context(|| format!("Model call failed in round {round}"))?;
            messages.push(assistant.clone());

            if !assistant.has_tool_calls() {
                reply = Some(assistant.content.unwrap_or_default());
                break;
            }

            debug!(round, calls = assistant.tool_calls.len(), "Model requested tools");

            for call in &assistant.tool_calls {
                let name = call.function.name.as_str();
                let mut output = self.toolbox.dispatch(name, &call.function.arguments).await;
                tool_calls.push(name.to_string());

                if name == UPDATE_WATCHLIST {
                    match extract_state(RawArgs::Text(&call.function.arguments)) {
                        Some(next) => {
                            state_changed |= next != state;
                            state = next;
                        }
                        None => {
                            warn!("update_watchlist arguments not understood, state unchanged");
                            output = ToolOutput::Message(WATCHLIST_IGNORED.to_string());
                        }
                    }
                }

                messages.push(ChatMessage::tool_result(call.id.clone(), output.render()));
            }
        }

        let reply = reply.unwrap_or_else(|| {
            warn!(rounds = self.max_tool_rounds, "Tool round limit reached");
            format!(
                "I stopped after {} rounds of tool calls without reaching a final answer.",
                self.max_tool_rounds
            )
        });

        info!(
            tools = tool_calls.len(),
            state_changed,
            reply_chars = reply.chars().count(),
            "Turn complete"
        );

        // Drop the system prompt from the returned history
        messages.remove(0);
        trim_history(&mut messages, self.max_history_messages);

        Ok(TurnOutcome { reply, messages, state, state_changed, tool_calls })
    }
}

/// Keep at most `max` trailing messages, cutting only where a user message
/// starts a turn so tool calls stay paired with their results.
///
/// When the latest turn alone exceeds `max` it is kept whole.
pub fn trim_history(messages: &mut Vec<ChatMessage>, max: usize) {
    if messages.len() <= max {
        return;
    }
    let earliest = messages.len() - max;
    let cut = messages[earliest..]
        .iter()
        .position(|m| m.role == Role::User)
        .map(|i| earliest + i)
        .or_else(|| messages.iter().rposition(|m| m.role == Role::User));

    if let Some(cut) = cut.filter(|c| *c > 0) {
        debug!(dropped = cut, kept = messages.len() - cut, "History trimmed");
        messages.drain(..cut);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
