//! DST Tests for Session under Fault Injection
//!
//! `TigerStyle`: Same seed = same faults = reproducible bugs.
//!
//! Every seed drives a short conversation through a simulated provider and a
//! simulated store, both injecting faults. The properties checked hold for
//! any interleaving of failures:
//! - A successful exchange always ends the log with its own reply
//! - A failed reply never writes an assistant turn
//! - Persisted documents always parse
//!
//! Run a single seed with `DST_SEED=1234 cargo test -p nori-memory --test dst_session_faults`.

use std::ops::ControlFlow;
use std::sync::Arc;

use nori_memory::conversation::Turn;
use nori_memory::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, FaultType, SimConfig};
use nori_memory::llm::{Role, SimLLMProvider};
use nori_memory::profile::ProfileSchema;
use nori_memory::session::{ExtractionOutcome, Session, SessionConfig, SessionError};
use nori_memory::storage::{Document, SimStorageBackend};
use serde_json::Value;

const SEEDS_COUNT: u64 = 32;
const MESSAGES_PER_SEED_COUNT: usize = 8;

fn faulty_session(seed: u64) -> (Session<SimLLMProvider, SimStorageBackend>, Arc<SimStorageBackend>) {
    let mut rng = SimConfig::with_seed(seed).rng();
    let llm_faults = Arc::new(
        FaultInjectorBuilder::new(rng.fork())
            .with_llm_faults(0.1)
            .build(),
    );
    let provider = SimLLMProvider::with_faults(seed, llm_faults);
    let storage = Arc::new(
        SimStorageBackend::new(SimConfig::with_seed(seed))
            .with_faults(FaultConfig::new(FaultType::StorageWriteFail, 0.05))
            .with_faults(FaultConfig::new(FaultType::StorageReadFail, 0.05)),
    );
    let session = Session::new(
        provider,
        Arc::clone(&storage),
        ProfileSchema::weight_loss(),
        SessionConfig::default().with_history_limit(6),
    );
    (session, storage)
}

fn persisted_log(storage: &SimStorageBackend, user_id: &str) -> Vec<Turn> {
    storage
        .snapshot(user_id, Document::Conversation)
        .map(|bytes| serde_json::from_slice(&bytes).expect("log must always parse"))
        .unwrap_or_default()
}

fn seeds() -> Vec<u64> {
    SimConfig::sweep(SEEDS_COUNT).iter().map(SimConfig::seed).collect()
}

#[tokio::test]
async fn test_exchanges_under_faults_keep_log_consistent() {
    for seed in seeds() {
        let (session, storage) = faulty_session(seed);

        for i in 0..MESSAGES_PER_SEED_COUNT {
            let message = format!("message {i}");
            let before = persisted_log(&storage, "u1");
            let result = if i % 2 == 0 {
                session.chat("u1", &message).await
            } else {
                session
                    .chat_stream("u1", &message, |_| ControlFlow::Continue(()))
                    .await
            };
            let after = persisted_log(&storage, "u1");

            match result {
                Ok(exchange) => {
                    assert_eq!(after.len(), before.len() + 2, "seed {seed}: two turns per exchange");
                    let last = after.last().unwrap();
                    assert_eq!(last.role, Role::Assistant, "seed {seed}");
                    assert_eq!(last.content, exchange.reply, "seed {seed}");
                    assert_eq!(after[after.len() - 2].content, message, "seed {seed}");
                }
                Err(SessionError::Provider(_)) => {
                    assert_eq!(after.len(), before.len() + 1, "seed {seed}: user turn only");
                    assert_eq!(after.last().unwrap().role, Role::User, "seed {seed}");
                }
                Err(SessionError::Storage(_)) => {
                    assert!(after.len() <= before.len() + 1, "seed {seed}: no reply persisted");
                    if after.len() > before.len() {
                        assert_eq!(after.last().unwrap().role, Role::User, "seed {seed}");
                    }
                }
                Err(e) => panic!("seed {seed}: unexpected error {e}"),
            }

            if let Some(bytes) = storage.snapshot("u1", Document::Profile) {
                let profile: Value = serde_json::from_slice(&bytes).expect("profile must always parse");
                assert!(profile.is_object(), "seed {seed}");
            }
        }
    }
}

#[tokio::test]
async fn test_extraction_failures_never_fail_the_reply() {
    for seed in seeds() {
        // Every extraction attempt fails; replies stream and are unaffected.
        let faults = Arc::new(
            FaultInjectorBuilder::new(DeterministicRng::new(seed))
                .with_fault(
                    FaultConfig::new(FaultType::LlmRateLimit, 1.0).with_filter("llm_complete"),
                )
                .build(),
        );
        let provider = SimLLMProvider::with_faults(seed, faults);
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(seed)));
        let session = Session::new(
            provider,
            Arc::clone(&storage),
            ProfileSchema::health(),
            SessionConfig::default(),
        );

        for i in 0..3 {
            let exchange = session
                .chat_stream("u1", &format!("message {i}"), |_| ControlFlow::Continue(()))
                .await
                .unwrap();
            assert!(
                matches!(exchange.outcome, ExtractionOutcome::Failed(_)),
                "seed {seed}"
            );
        }

        assert_eq!(persisted_log(&storage, "u1").len(), 6, "seed {seed}");
        assert!(storage.snapshot("u1", Document::Profile).is_none(), "seed {seed}");
    }
}

#[tokio::test]
async fn test_same_seed_same_conversation() {
    async fn run(seed: u64) -> Vec<String> {
        let (session, _) = faulty_session(seed);
        let mut replies = Vec::new();
        for i in 0..MESSAGES_PER_SEED_COUNT {
            match session.chat("u1", &format!("message {i}")).await {
                Ok(exchange) => replies.push(exchange.reply),
                Err(e) => replies.push(format!("error: {e}")),
            }
        }
        replies
    }

    for seed in [7, 42, 1234] {
        assert_eq!(run(seed).await, run(seed).await, "seed {seed} must replay exactly");
    }
}
