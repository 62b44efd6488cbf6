//! Mock completer for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use juris_core::{Completer, JurisError, Result};

/// In-memory completion backend for testing.
///
/// Records every call and answers with a canned response, so tests can
/// assert on the prompts that reached the backend without a network
/// dependency.
pub struct MockCompleter {
    /// Canned answer returned by every successful call.
    response: String,

    /// When set, every call fails with this message instead.
    fail_with: Option<String>,

    /// Recorded (system, prompt) pairs.
    calls: Mutex<Vec<(String, String)>>,
}

impl MockCompleter {
    /// Create a mock that answers with a fixed placeholder.
    pub fn new() -> Self {
        Self::with_response("Mock analysis.")
    }

    /// Create a mock that answers with the given text.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose every call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: String::new(),
            fail_with: Some(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Recorded (system, prompt) pairs, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCompleter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));

        if let Some(message) = &self.fail_with {
            return Err(JurisError::completion(message.clone()));
        }

        Ok(self.response.clone())
    }
}
