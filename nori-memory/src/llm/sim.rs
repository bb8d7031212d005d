//! Scripted, seeded provider for tests and keyless runs.
//!
//! Answers come from a scripted FIFO queue first. Once the queue is empty the
//! provider falls back to deterministic defaults: structured (`json_mode`)
//! requests get the extraction sentinel `null`, chat requests get a seeded
//! pick from a few canned coaching replies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{CompletionRequest, LLMProvider, ProviderError, TextStream};
use crate::constants::{EXTRACTION_NULL_SENTINEL, LLM_PROMPT_BYTES_MAX};
use crate::dst::{DeterministicRng, FaultInjector, FaultType};

/// Replies used when nothing is scripted.
const CANNED_REPLIES: &[&str] = &[
    "Thanks for sharing that. How much weight are you looking to lose?",
    "That's a great starting point.\n\nWhat does a typical day of eating look like for you?",
    "Got it. How active are you during a normal week?",
    "Understood. Is there anything that has made losing weight hard for you before?",
];

// =============================================================================
// SimLLMProvider
// =============================================================================

/// Deterministic simulation provider.
///
/// Clones share their script queue, request log and fault injector, so a test
/// can keep a handle after moving the provider into a session.
///
/// # Example
///
/// ```rust
/// use nori_memory::llm::{CompletionRequest, LLMProvider, SimLLMProvider};
///
/// #[tokio::main]
/// async fn main() {
///     let provider = SimLLMProvider::with_seed(42);
///
///     let request = CompletionRequest::new("I want to lose 20 lbs");
///     let first = provider.complete(&request).await.unwrap();
///
///     let again = SimLLMProvider::with_seed(42).complete(&request).await.unwrap();
///     assert_eq!(first, again);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SimLLMProvider {
    seed: u64,
    rng: Arc<Mutex<DeterministicRng>>,
    faults: Arc<FaultInjector>,
    scripted: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl SimLLMProvider {
    /// Create a provider with the given seed and no faults.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_faults(seed, Arc::new(FaultInjector::new(DeterministicRng::new(seed))))
    }

    /// Create a provider that consults `faults` before every call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use nori_memory::dst::{DeterministicRng, FaultConfig, FaultInjector, FaultType};
    /// use nori_memory::llm::SimLLMProvider;
    ///
    /// let mut injector = FaultInjector::new(DeterministicRng::new(42));
    /// injector.register(FaultConfig::new(FaultType::LlmTimeout, 0.5));
    ///
    /// let provider = SimLLMProvider::with_faults(42, Arc::new(injector));
    /// ```
    #[must_use]
    pub fn with_faults(seed: u64, faults: Arc<FaultInjector>) -> Self {
        Self {
            seed,
            rng: Arc::new(Mutex::new(DeterministicRng::new(seed))),
            faults,
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue scripted responses, consumed in order by later calls.
    #[must_use]
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for response in responses {
            self.push_response(response);
        }
        self
    }

    /// Queue one more scripted response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response.into());
    }

    /// Number of scripted responses not consumed yet.
    #[must_use]
    pub fn pending_responses(&self) -> usize {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every request seen so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the seed used by this provider (for debugging/logging).
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Record the request, roll for faults and produce the answer text.
    ///
    /// The flag is set when the connection should drop after the first
    /// fragment.
    fn respond(
        &self,
        request: &CompletionRequest,
        operation: &str,
    ) -> Result<(String, bool), ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let prompt_bytes = request.prompt_bytes();
        if prompt_bytes > LLM_PROMPT_BYTES_MAX {
            return Err(ProviderError::ContextOverflow(prompt_bytes));
        }

        let interrupted = match self.faults.should_inject(operation) {
            Some(FaultType::LlmStreamInterrupt) => true,
            Some(fault) => match fault_to_error(fault) {
                Some(err) => return Err(err),
                None => false,
            },
            None => false,
        };

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(text) = scripted {
            return Ok((text, interrupted));
        }

        if request.json_mode {
            return Ok((EXTRACTION_NULL_SENTINEL.to_string(), interrupted));
        }

        let reply = *self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .choose(CANNED_REPLIES);
        Ok((reply.to_string(), interrupted))
    }
}

#[async_trait]
impl LLMProvider for SimLLMProvider {
    #[tracing::instrument(skip(self, request), fields(messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let (text, interrupted) = self.respond(request, "llm_complete")?;
        if interrupted {
            return Err(ProviderError::connection("simulated connection drop"));
        }
        Ok(text)
    }

    fn complete_stream<'a>(&'a self, request: &'a CompletionRequest) -> TextStream<'a> {
        let items: Vec<Result<String, ProviderError>> = match self.respond(request, "llm_stream") {
            Ok((text, interrupted)) => {
                let mut fragments: Vec<_> = text.split_inclusive(' ').map(str::to_string).collect();
                if interrupted {
                    fragments.truncate(1);
                    fragments
                        .into_iter()
                        .map(Ok)
                        .chain(std::iter::once(Err(ProviderError::connection(
                            "simulated stream interruption",
                        ))))
                        .collect()
                } else {
                    fragments.into_iter().map(Ok).collect()
                }
            }
            Err(err) => vec![Err(err)],
        };

        Box::pin(futures::stream::iter(items))
    }

    fn name(&self) -> &'static str {
        "sim"
    }

    fn is_simulation(&self) -> bool {
        true
    }
}

/// Map an injected fault to the error a real provider would return.
///
/// `LlmStreamInterrupt` is handled by the caller of `respond`.
fn fault_to_error(fault: FaultType) -> Option<ProviderError> {
    match fault {
        FaultType::LlmTimeout => Some(ProviderError::Timeout),
        FaultType::LlmRateLimit => Some(ProviderError::RateLimited(None)),
        FaultType::LlmServiceUnavailable => {
            Some(ProviderError::unavailable("simulated outage"))
        }
        FaultType::LlmInvalidResponse => {
            Some(ProviderError::malformed("simulated invalid response"))
        }
        FaultType::LlmStreamInterrupt
        | FaultType::StorageWriteFail
        | FaultType::StorageReadFail
        | FaultType::StorageCorruption => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{FaultConfig, FaultInjectorBuilder};
    use futures::StreamExt;

    async fn collect(provider: &SimLLMProvider, request: &CompletionRequest) -> Vec<Result<String, ProviderError>> {
        provider.complete_stream(request).collect().await
    }

    #[tokio::test]
    async fn test_determinism() {
        let request = CompletionRequest::new("I want to lose weight");

        let response1 = SimLLMProvider::with_seed(42).complete(&request).await.unwrap();
        let response2 = SimLLMProvider::with_seed(42).complete(&request).await.unwrap();

        assert_eq!(response1, response2, "Same seed should produce same response");
        assert!(CANNED_REPLIES.contains(&response1.as_str()));
    }

    #[tokio::test]
    async fn test_scripted_responses_fifo() {
        let provider = SimLLMProvider::with_seed(42).with_responses(["first", "second"]);
        let request = CompletionRequest::new("hello");

        assert_eq!(provider.complete(&request).await.unwrap(), "first");
        assert_eq!(provider.complete(&request).await.unwrap(), "second");
        assert_eq!(provider.pending_responses(), 0);
    }

    #[tokio::test]
    async fn test_json_mode_defaults_to_null() {
        let provider = SimLLMProvider::with_seed(42);
        let request = CompletionRequest::new("Analyze this exchange").with_json_mode();

        assert_eq!(provider.complete(&request).await.unwrap(), "null");
    }

    #[tokio::test]
    async fn test_requests_are_recorded_across_clones() {
        let provider = SimLLMProvider::with_seed(42);
        let handle = provider.clone();

        let request = CompletionRequest::new("hello").with_system("coach");
        provider.complete(&request).await.unwrap();

        let seen = handle.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system.as_deref(), Some("coach"));
    }

    #[tokio::test]
    async fn test_stream_fragments_concatenate() {
        let provider = SimLLMProvider::with_seed(42).with_responses(["You can do this today."]);
        let request = CompletionRequest::new("hello");

        let fragments: Vec<String> = collect(&provider, &request)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(fragments.len(), 5);
        assert_eq!(fragments.concat(), "You can do this today.");
    }

    #[tokio::test]
    async fn test_stream_interrupt() {
        let faults = FaultInjectorBuilder::new(DeterministicRng::new(1))
            .with_fault(FaultConfig::new(FaultType::LlmStreamInterrupt, 1.0))
            .build();
        let provider = SimLLMProvider::with_faults(1, Arc::new(faults)).with_responses(["one two three"]);
        let request = CompletionRequest::new("hello");

        let items = collect(&provider, &request).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().ok(), Some("one "));
        assert!(matches!(items[1], Err(ProviderError::Connection(_))));
    }

    #[tokio::test]
    async fn test_fault_injection_timeout() {
        let mut injector = FaultInjector::new(DeterministicRng::new(42));
        injector.register(FaultConfig::new(FaultType::LlmTimeout, 1.0));

        let provider = SimLLMProvider::with_faults(42, Arc::new(injector));
        let result = provider.complete(&CompletionRequest::new("Test prompt")).await;
        assert!(matches!(result, Err(ProviderError::Timeout)));
    }

    #[tokio::test]
    async fn test_fault_injection_rate_limit_on_stream() {
        let mut injector = FaultInjector::new(DeterministicRng::new(42));
        injector.register(FaultConfig::new(FaultType::LlmRateLimit, 1.0).with_filter("llm_stream"));

        let provider = SimLLMProvider::with_faults(42, Arc::new(injector));
        let request = CompletionRequest::new("Test prompt");

        assert!(provider.complete(&request).await.is_ok());
        let items = collect(&provider, &request).await;
        assert!(matches!(items.as_slice(), [Err(ProviderError::RateLimited(_))]));
    }

    #[test]
    fn test_name_and_seed() {
        let provider = SimLLMProvider::with_seed(12345);
        assert_eq!(provider.name(), "sim");
        assert!(provider.is_simulation());
        assert_eq!(provider.seed(), 12345);
    }
}
