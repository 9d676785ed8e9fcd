//! Scriptable generator for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{GenerateError, GenerationRequest, TextGenerator};

type Responder = dyn Fn(&GenerationRequest) -> Result<String, GenerateError> + Send + Sync;

/// Answers each request through a closure and counts calls.
pub struct MockGenerator {
    responder: Box<Responder>,
    delay: Option<Duration>,
    call_count: AtomicU32,
}

impl MockGenerator {
    pub fn new(
        responder: impl Fn(&GenerationRequest) -> Result<String, GenerateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Always returns the same text.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails with a network error.
    pub fn failing() -> Self {
        Self::new(|_| Err(GenerateError::Network("connection refused".into())))
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerateError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}
