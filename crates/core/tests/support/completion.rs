use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use timewise_core::agent::ports::{
    CompletionOutcome, CompletionPort, PromptMessage, ToolSpec,
};
use timewise_domain::{Result, TimewiseError};

/// Completion mock that replays a fixed script of outcomes.
///
/// Each call pops the next outcome; an exhausted script is an error so a
/// test that triggers more rounds than it planned for fails loudly. The
/// conversation passed to the final call is recorded for assertions.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<CompletionOutcome>>,
    /// Returned on every call once the script runs dry, when set.
    looping: Option<CompletionOutcome>,
    calls: Mutex<usize>,
    last_conversation: Mutex<Vec<PromptMessage>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<CompletionOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            looping: None,
            calls: Mutex::new(0),
            last_conversation: Mutex::new(Vec::new()),
        }
    }

    /// A completion that returns the same outcome on every round.
    pub fn looping(outcome: CompletionOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            looping: Some(outcome),
            calls: Mutex::new(0),
            last_conversation: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// The conversation passed to the most recent `complete` call.
    pub fn last_conversation(&self) -> Vec<PromptMessage> {
        self.last_conversation.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        conversation: &[PromptMessage],
        _tools: &[ToolSpec],
    ) -> Result<CompletionOutcome> {
        *self.calls.lock().unwrap() += 1;
        *self.last_conversation.lock().unwrap() = conversation.to_vec();

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return Ok(outcome);
        }
        self.looping.clone().ok_or_else(|| {
            TimewiseError::Completion("scripted completion exhausted".to_string())
        })
    }
}
