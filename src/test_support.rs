use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::llm::{LlmError, LlmProvider};

// Replays canned completions in order; errors once the script runs out
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

pub fn analysis_json(risk: &str, score: u8) -> String {
    serde_json::json!({
        "summary": "The fellow introduced growth mindset. Members shared examples. \
                    The session closed on time.",
        "metrics": {
            "contentCoverage": { "score": score },
            "facilitationQuality": { "score": score },
            "protocolSafety": { "score": score }
        },
        "riskDetection": {
            "status": risk,
            "quote": if risk == "RISK" { Some("I don't want to be here anymore") } else { None }
        }
    })
    .to_string()
}
