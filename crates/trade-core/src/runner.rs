// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent Runner (C7): executes one agent turn against a model provider,
//! exposing a streaming iterator of typed events. Tool calls deduplicated by
//! name are reported once per turn; tool execution runs in parallel.

use std::collections::HashMap;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use trade_model::{CompletionRequest, FunctionCall, Message, MessageContent, ModelProvider, ResponseEvent, Role, ToolSchema};
use trade_tools::{ToolCall, ToolOutput};

use crate::agent_config::AgentConfig;

/// Typed event yielded by a running agent turn.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// An incremental text fragment.
    TokenDelta { text: String },
    /// Emitted once when a tool name is first observed in this turn.
    ToolCall { name: String },
    /// The concatenation of every `TokenDelta` emitted this turn.
    FinalText { text: String },
}

/// What to feed the model for this turn.
pub enum RunnerInput {
    /// A single user message with no prior history.
    Message(String),
    /// Prior role-tagged turns, followed by the new user turn.
    WithHistory { history: Vec<Message>, message: String },
}

pub type EventStream = Pin<Box<dyn Stream<Item = anyhow::Result<RunnerEvent>> + Send>>;

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    args_buf: String,
}

impl PendingToolCall {
    fn finish(self) -> ToolCall {
        let args = serde_json::from_str(&self.args_buf).unwrap_or_else(|_| serde_json::json!({}));
        ToolCall { id: self.id, name: self.name, args }
    }
}

/// Run one agent turn, yielding events as they occur. Dropping the returned
/// stream aborts the in-flight turn at the next `await` point — every send
/// below is checked and the loop returns as soon as the receiver is gone.
pub fn run_streamed(model: Arc<dyn ModelProvider>, agent: Arc<AgentConfig>, input: RunnerInput) -> EventStream {
    let messages = match input {
        RunnerInput::Message(message) => vec![Message::system(agent.instructions.clone()), Message::user(message)],
        RunnerInput::WithHistory { mut history, message } => {
            let mut messages = vec![Message::system(agent.instructions.clone())];
            messages.append(&mut history);
            messages.push(Message::user(message));
            messages
        }
    };

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(drive(model, agent, messages, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn drive(model: Arc<dyn ModelProvider>, agent: Arc<AgentConfig>, mut messages: Vec<Message>, tx: mpsc::Sender<anyhow::Result<RunnerEvent>>) {
    let tool_schemas: Vec<ToolSchema> = agent
        .tools
        .schemas()
        .into_iter()
        .map(|s| ToolSchema { name: s.name, description: s.description, parameters: s.parameters })
        .collect();

    let mut full_text = String::new();
    let mut seen_tool_names: HashSet<String> = HashSet::new();

    loop {
        let req = CompletionRequest { messages: messages.clone(), tools: tool_schemas.clone(), stream: true, system_dynamic_suffix: None };

        let mut stream = match model.complete(req).await {
            Ok(s) => s,
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
        };

        let mut turn_text = String::new();
        let mut pending: HashMap<u32, PendingToolCall> = HashMap::new();

        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(e) => e,
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            };

            match event {
                ResponseEvent::TextDelta(delta) if !delta.is_empty() => {
                    turn_text.push_str(&delta);
                    if tx.send(Ok(RunnerEvent::TokenDelta { text: delta })).await.is_err() {
                        return;
                    }
                }
                ResponseEvent::TextDelta(_) => {}
                ResponseEvent::ToolCall { index, id, name, arguments } => {
                    let ptc = pending.entry(index).or_default();
                    if !id.is_empty() {
                        ptc.id = id;
                    }
                    if !name.is_empty() {
                        ptc.name = name;
                    }
                    ptc.args_buf.push_str(&arguments);
                }
                ResponseEvent::Usage { .. } => {}
                ResponseEvent::Done => break,
                ResponseEvent::Error(err) => warn!(error = %err, "model stream warning"),
            }
        }

        full_text.push_str(&turn_text);

        let mut pending_sorted: Vec<(u32, PendingToolCall)> = pending.into_iter().collect();
        pending_sorted.sort_by_key(|(idx, _)| *idx);
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        for (i, (_, ptc)) in pending_sorted.into_iter().enumerate() {
            if ptc.name.is_empty() {
                continue;
            }
            let mut tc = ptc.finish();
            if tc.id.is_empty() {
                tc.id = format!("tc_synthetic_{i}");
            }
            tool_calls.push(tc);
        }

        if tool_calls.is_empty() {
            let _ = tx.send(Ok(RunnerEvent::FinalText { text: full_text })).await;
            return;
        }

        for tc in &tool_calls {
            messages.push(Message {
                role: Role::Assistant,
                content: MessageContent::ToolCall { tool_call_id: tc.id.clone(), function: FunctionCall { name: tc.name.clone(), arguments: tc.args.to_string() } },
            });
            if seen_tool_names.insert(tc.name.clone()) && tx.send(Ok(RunnerEvent::ToolCall { name: tc.name.clone() })).await.is_err() {
                return;
            }
        }

        let mut tasks = Vec::with_capacity(tool_calls.len());
        for tc in tool_calls.clone() {
            let registry = agent.tools.clone();
            tasks.push(tokio::spawn(async move { registry.execute(&tc).await }));
        }

        let mut outputs = Vec::with_capacity(tasks.len());
        for (i, task) in tasks.into_iter().enumerate() {
            let output = match task.await {
                Ok(o) => o,
                Err(err) => ToolOutput::err(&tool_calls[i].id, format!("tool panicked: {err}")),
            };
            outputs.push(output);
        }

        for (tc, output) in tool_calls.iter().zip(outputs.iter()) {
            messages.push(Message::tool_result(&tc.id, &output.content));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use trade_model::ScriptedMockProvider;
    use trade_tools::{Passage, Tool, ToolRegistry};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "search_trade_documents"
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            let passages = vec![Passage { text: "incoterm info".into(), source: "kb".into(), score: Some(0.9) }];
            ToolOutput::ok(&call.id, trade_tools::passages_to_content(&passages))
        }
    }

    fn plain_agent(model_events: Vec<Vec<ResponseEvent>>) -> (Arc<dyn ModelProvider>, Arc<AgentConfig>) {
        let model: Arc<dyn ModelProvider> = Arc::new(ScriptedMockProvider::new(model_events));
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        let agent = Arc::new(AgentConfig { name: "trade_assistant".into(), model_id: "mock".into(), instructions: "be helpful".into(), tools: Arc::new(tools) });
        (model, agent)
    }

    #[tokio::test]
    async fn text_only_turn_emits_deltas_then_final_text() {
        let (model, agent) = plain_agent(vec![vec![
            ResponseEvent::TextDelta("Hello".into()),
            ResponseEvent::TextDelta(", world".into()),
            ResponseEvent::Done,
        ]]);

        let mut stream = run_streamed(model, agent, RunnerInput::Message("hi".into()));
        let mut events = Vec::new();
        while let Some(ev) = stream.next().await {
            events.push(ev.unwrap());
        }

        assert!(matches!(&events[0], RunnerEvent::TokenDelta { text } if text == "Hello"));
        assert!(matches!(&events[1], RunnerEvent::TokenDelta { text } if text == ", world"));
        assert!(matches!(events.last().unwrap(), RunnerEvent::FinalText { text } if text == "Hello, world"));
    }

    #[tokio::test]
    async fn tool_call_is_reported_once_then_final_text_follows() {
        let (model, agent) = plain_agent(vec![
            vec![
                ResponseEvent::ToolCall { index: 0, id: "tc1".into(), name: "search_trade_documents".into(), arguments: "{\"query\":\"FOB\"}".into() },
                ResponseEvent::Done,
            ],
            vec![ResponseEvent::TextDelta("FOB means free on board.".into()), ResponseEvent::Done],
        ]);

        let mut stream = run_streamed(model, agent, RunnerInput::Message("what is FOB?".into()));
        let mut events = Vec::new();
        while let Some(ev) = stream.next().await {
            events.push(ev.unwrap());
        }

        let tool_events: Vec<_> = events.iter().filter(|e| matches!(e, RunnerEvent::ToolCall { .. })).collect();
        assert_eq!(tool_events.len(), 1);
        assert!(matches!(events.last().unwrap(), RunnerEvent::FinalText { text } if text == "FOB means free on board."));
    }

    #[tokio::test]
    async fn with_history_prepends_prior_turns() {
        let (model, agent) = plain_agent(vec![vec![ResponseEvent::TextDelta("ack".into()), ResponseEvent::Done]]);
        let history = vec![Message::user("earlier question"), Message::assistant("earlier answer")];
        let mut stream = run_streamed(model, agent, RunnerInput::WithHistory { history, message: "follow up".into() });
        let mut saw_final = false;
        while let Some(ev) = stream.next().await {
            if matches!(ev.unwrap(), RunnerEvent::FinalText { .. }) {
                saw_final = true;
            }
        }
        assert!(saw_final);
    }
}
