// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sweep and flush behavior against the in-memory state store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cadence_config::model::DebounceConfig;
use cadence_core::types::{Company, Conversation, FollowUpContent, PendingResponse};
use cadence_core::{
    AdapterType, CadenceError, Clock, ConversationLease, Directory, DispatchPool, HealthStatus,
    ManualClock, PluginAdapter, Responder, StateStore,
};
use cadence_debounce::{DebounceAggregator, FlushOutcome};
use cadence_storage::MemoryStateStore;
use cadence_test_utils::{fixtures, MockDirectory, MockResponder};

struct Fixture {
    state: Arc<MemoryStateStore>,
    directory: Arc<MockDirectory>,
    responder: Arc<MockResponder>,
    clock: Arc<ManualClock>,
    pool: DispatchPool,
}

impl Fixture {
    async fn new(responder: MockResponder) -> Self {
        let directory = Arc::new(MockDirectory::new());
        directory.insert_company(fixtures::company("co-1")).await;
        directory
            .insert_conversation(fixtures::conversation("conv-1", "co-1", Some("Ana")))
            .await;
        Self {
            state: Arc::new(MemoryStateStore::new()),
            directory,
            responder: Arc::new(responder),
            clock: Arc::new(ManualClock::new(fixtures::t0())),
            pool: DispatchPool::new(8),
        }
    }

    /// A separate aggregator instance over the same shared state, as a second
    /// process would have.
    fn aggregator(&self, instance: &str) -> DebounceAggregator {
        self.aggregator_with(instance, self.directory.clone(), self.responder.clone())
    }

    fn aggregator_with(
        &self,
        instance: &str,
        directory: Arc<dyn Directory>,
        responder: Arc<dyn Responder>,
    ) -> DebounceAggregator {
        let lease = ConversationLease::new(
            self.state.clone(),
            self.clock.clone(),
            instance,
            Duration::from_secs(60),
        );
        DebounceAggregator::new(
            self.state.clone(),
            lease,
            directory,
            responder,
            self.clock.clone(),
            self.pool.clone(),
            &DebounceConfig {
                enabled: true,
                sweep_interval_ms: 500,
                quiet_period_ms: 3000,
            },
        )
    }
}

macro_rules! test_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), CadenceError> {
                Ok(())
            }
        }
    };
}

/// Finds nothing, after a new fragment lands mid-lookup.
struct VanishingDirectory {
    state: Arc<MemoryStateStore>,
    clock: Arc<ManualClock>,
}

test_adapter!(VanishingDirectory, "vanishing-directory", AdapterType::Directory);

#[async_trait]
impl Directory for VanishingDirectory {
    async fn resolve_conversation(&self, id: &str) -> Result<Option<Conversation>, CadenceError> {
        let pending = PendingResponse {
            conversation_id: id.to_string(),
            company_id: "co-1".into(),
            lead_name: "Ana".into(),
        };
        self.state
            .append_fragment(&pending, "nova mensagem", self.clock.now())
            .await?;
        Ok(None)
    }

    async fn resolve_company(&self, id: &str) -> Result<Option<Company>, CadenceError> {
        Ok(Some(fixtures::company(id)))
    }
}

struct PanickingResponder;

test_adapter!(PanickingResponder, "panicking-responder", AdapterType::Responder);

#[async_trait]
impl Responder for PanickingResponder {
    async fn respond(
        &self,
        _conversation: &Conversation,
        _text: &str,
        _lead_name: &str,
    ) -> Result<(), CadenceError> {
        panic!("responder blew up");
    }

    async fn send_follow_up(
        &self,
        _conversation: &Conversation,
        _content: &FollowUpContent,
        _lead_name: &str,
    ) -> Result<(), CadenceError> {
        panic!("responder blew up");
    }
}

#[tokio::test]
async fn quiet_period_gates_the_flush() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");

    // A fragment every second never lets the conversation go quiet.
    for text in ["oi", "tudo bem", "queria saber", "do plano"] {
        agg.on_inbound_fragment("conv-1", "co-1", "Ana", text).await.unwrap();
        assert_eq!(agg.sweep().await.unwrap(), 0);
        fx.clock.advance(chrono::Duration::seconds(1));
    }
    assert_eq!(fx.responder.sent_count().await, 0);

    // Arrivals stop: the first sweep past the quiet period flushes.
    fx.clock.advance(chrono::Duration::seconds(2));
    assert_eq!(agg.sweep().await.unwrap(), 1);
    fx.pool.drain().await;

    assert_eq!(
        fx.responder.replies().await,
        vec!["oi. tudo bem. queria saber. do plano"]
    );
    assert!(fx.state.active_conversations().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sweeps_dispatch_once() {
    let fx = Fixture::new(MockResponder::with_delay(Duration::from_millis(20))).await;
    let aggregators: Vec<DebounceAggregator> =
        (0..4).map(|i| fx.aggregator(&format!("node-{i}"))).collect();

    aggregators[0]
        .on_inbound_fragment("conv-1", "co-1", "Ana", "preciso de ajuda")
        .await
        .unwrap();
    aggregators[1]
        .on_inbound_fragment("conv-1", "co-1", "Ana", "pode me ligar?")
        .await
        .unwrap();
    fx.clock.advance(chrono::Duration::seconds(5));

    let sweeps = aggregators.iter().map(|agg| agg.sweep());
    for result in futures::future::join_all(sweeps).await {
        result.unwrap();
    }
    // Sweeping the same instance again must not queue a duplicate.
    aggregators[0].sweep().await.unwrap();
    fx.pool.drain().await;

    assert_eq!(
        fx.responder.replies().await,
        vec!["preciso de ajuda. pode me ligar?"]
    );
    let leftover = fx.state.take_pending("conv-1").await.unwrap();
    assert!(leftover.fragments.is_empty());
}

#[tokio::test]
async fn flush_of_empty_conversation_is_a_no_op() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");

    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Empty);
    assert_eq!(agg.sweep().await.unwrap(), 0);
    assert_eq!(fx.responder.sent_count().await, 0);
}

#[tokio::test]
async fn deleted_conversation_is_abandoned() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "oi").await.unwrap();
    fx.directory.remove_conversation("conv-1").await;

    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Abandoned);
    assert_eq!(fx.responder.sent_count().await, 0);
    assert!(fx.state.active_conversations().await.unwrap().is_empty());
    assert!(fx.state.take_pending("conv-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn responder_failure_is_terminal() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "oi").await.unwrap();
    fx.responder.set_failing(true);
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Failed);

    // Nothing is requeued; the next fragment starts a fresh buffer.
    fx.responder.set_failing(false);
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Empty);

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "alguem ai?").await.unwrap();
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Dispatched);
    assert_eq!(fx.responder.replies().await, vec!["alguem ai?"]);
}

#[tokio::test]
async fn held_lease_keeps_the_conversation_active() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");
    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "oi").await.unwrap();

    let other = ConversationLease::new(
        fx.state.clone(),
        fx.clock.clone(),
        "b",
        Duration::from_secs(60),
    );
    let guard = other.try_acquire("conv-1").await.unwrap().unwrap();

    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Locked);
    assert_eq!(
        fx.state.active_conversations().await.unwrap(),
        vec!["conv-1".to_string()]
    );

    guard.release().await;
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Dispatched);
}

#[tokio::test]
async fn fragment_after_take_becomes_a_new_unit() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator("a");

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "primeira").await.unwrap();
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Dispatched);

    // The append re-adds the id even though it was just removed.
    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "segunda").await.unwrap();
    assert_eq!(
        fx.state.active_conversations().await.unwrap(),
        vec!["conv-1".to_string()]
    );
    fx.clock.advance(chrono::Duration::seconds(3));
    assert_eq!(agg.sweep().await.unwrap(), 1);
    fx.pool.drain().await;

    assert_eq!(fx.responder.replies().await, vec!["primeira", "segunda"]);
}

#[tokio::test]
async fn abandoned_flush_keeps_a_fragment_that_arrived_during_lookup() {
    let fx = Fixture::new(MockResponder::new()).await;
    let directory = Arc::new(VanishingDirectory {
        state: fx.state.clone(),
        clock: fx.clock.clone(),
    });
    let agg = fx.aggregator_with("a", directory, fx.responder.clone());

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "oi").await.unwrap();
    assert_eq!(agg.flush("conv-1").await.unwrap(), FlushOutcome::Abandoned);
    assert_eq!(fx.responder.sent_count().await, 0);

    assert_eq!(
        fx.state.active_conversations().await.unwrap(),
        vec!["conv-1".to_string()]
    );
    let buffer = fx.state.take_pending("conv-1").await.unwrap();
    assert_eq!(buffer.fragments, vec!["nova mensagem".to_string()]);
}

#[tokio::test]
async fn panicking_flush_does_not_hide_the_conversation_from_later_sweeps() {
    let fx = Fixture::new(MockResponder::new()).await;
    let agg = fx.aggregator_with("a", fx.directory.clone(), Arc::new(PanickingResponder));

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "oi").await.unwrap();
    fx.clock.advance(chrono::Duration::seconds(3));
    assert_eq!(agg.sweep().await.unwrap(), 1);
    fx.pool.drain().await;

    agg.on_inbound_fragment("conv-1", "co-1", "Ana", "de novo").await.unwrap();
    fx.clock.advance(chrono::Duration::seconds(3));
    assert_eq!(agg.sweep().await.unwrap(), 1);
    fx.pool.drain().await;
}
