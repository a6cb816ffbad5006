//! Scripted in-memory invoker for agent and loop tests

use gann_model::{Error, InvokeRequest, InvokeResult, ModelInvoker, StructuredOutput};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Answers each request from a per-shape queue and records every request.
///
/// Replies go through the request's shape validation, so an out-of-range
/// scripted value surfaces as a schema violation just like a real model's.
#[derive(Default)]
pub(crate) struct ScriptedInvoker {
    replies: Mutex<HashMap<&'static str, VecDeque<InvokeResult<Value>>>>,
    calls: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedInvoker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, shape: &'static str, value: Value) -> Self {
        self.push(shape, Ok(value));
        self
    }

    pub(crate) fn fail(self, shape: &'static str, error: Error) -> Self {
        self.push(shape, Err(error));
        self
    }

    pub(crate) fn texts(self, texts: &[&str]) -> Self {
        texts
            .iter()
            .fold(self, |s, t| s.reply(crate::generator::TEXT_SHAPE, serde_json::json!({ "text": t })))
    }

    pub(crate) fn scores(self, scores: &[f64]) -> Self {
        scores
            .iter()
            .fold(self, |s, v| s.reply(crate::discriminator::SCORE_SHAPE, serde_json::json!({ "score": v })))
    }

    pub(crate) fn temperatures(self, temps: &[f64]) -> Self {
        temps.iter().fold(self, |s, t| {
            s.reply(
                crate::configurator::TEMPERATURE_SHAPE,
                serde_json::json!({ "suggestedTemperature": t }),
            )
        })
    }

    pub(crate) fn prompts(self, prompts: &[&str]) -> Self {
        prompts.iter().fold(self, |s, p| {
            s.reply(
                crate::configurator::INSTRUCTION_SHAPE,
                serde_json::json!({ "suggestedPrompt": p }),
            )
        })
    }

    pub(crate) fn calls(&self) -> Vec<InvokeRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, shape: &str) -> Vec<InvokeRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.shape.name() == shape)
            .collect()
    }

    fn push(&self, shape: &'static str, reply: InvokeResult<Value>) {
        self.replies
            .lock()
            .unwrap()
            .entry(shape)
            .or_default()
            .push_back(reply);
    }
}

impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, request: InvokeRequest) -> InvokeResult<StructuredOutput> {
        self.calls.lock().unwrap().push(request.clone());
        let next = self
            .replies
            .lock()
            .unwrap()
            .get_mut(request.shape.name())
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(value)) => request.shape.validate(&value),
            Some(Err(error)) => Err(error),
            None => Err(Error::unexpected(format!(
                "no scripted reply for shape '{}'",
                request.shape.name()
            ))),
        }
    }
}
