//! Test helpers: a scripted in-memory transport and canned vendor bodies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use llmux_core::config::ClientDefaults;
use llmux_core::cost::MemoryCostLogger;
use llmux_core::error::{LlmError, Result};

use crate::images::ImageResolver;
use crate::traits::ProviderContext;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Replays canned responses in order and records every request it sees.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
        Arc::new(ScriptedTransport {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests().into_iter().map(|r| r.body).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Transport("no scripted response left".into()))
    }
}

/// Provider context over `transport` with default settings and an
/// in-memory cost log.
pub fn context(transport: Arc<ScriptedTransport>) -> (ProviderContext, Arc<MemoryCostLogger>) {
    let costs = Arc::new(MemoryCostLogger::new());
    let ctx = ProviderContext::new(
        transport,
        ImageResolver::default(),
        costs.clone(),
        ClientDefaults::default(),
    );
    (ctx, costs)
}

/// Chat-completions body with one choice and 10/5 token usage.
pub fn chat_completion(text: &str, finish_reason: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Messages API body with a single text block and 20/8 token usage.
pub fn messages_response(text: &str, stop_reason: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": stop_reason,
        "usage": {"input_tokens": 20, "output_tokens": 8}
    })
}
