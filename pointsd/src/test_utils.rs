use crate::{
    api::models::{redemption_codes::RedemptionCodeResponse, referrals::InvitationCodeResponse},
    config::{ChargesConfig, Config, ProviderConfig},
    db::{
        memory::MemoryLedgerStore,
        models::transactions::{TransactionCreateDBRequest, TransactionType},
    },
    ledger::apply_transaction,
    provider::TextProvider,
    tasks::memory::MemoryTaskStore,
    types::{Points, UserId},
    AppState,
};
use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

pub const FAKE_PROVIDER_OUTPUT: &str = "Clear thesis, well supported.";

/// Referral milestones as seeded by the migrations
pub const TEST_MILESTONES: &[(i64, Points)] = &[(3, 50), (10, 300), (30, 1000), (100, 5000)];

/// Provider that answers with a fixed text and can be told to fail once
#[derive(Default)]
pub struct FakeProvider {
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl FakeProvider {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for FakeProvider {
    async fn call(&self, _payload: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("provider unavailable");
        }
        Ok(FAKE_PROVIDER_OUTPUT.to_string())
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        charges: ChargesConfig {
            provider_timeout: Duration::from_secs(5),
        },
        provider: ProviderConfig {
            url: Some("http://localhost:8081/v1/".parse().unwrap()),
            api_key: None,
            model: "test".to_string(),
        },
        ..Default::default()
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryLedgerStore,
    pub provider: Arc<FakeProvider>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = create_test_config();
        let store = MemoryLedgerStore::new().with_milestones(TEST_MILESTONES).await;
        let provider = Arc::new(FakeProvider::default());

        let state = AppState::builder()
            .ledger(store.clone())
            .tasks(Arc::new(MemoryTaskStore::new(config.tasks.ttl)))
            .provider(provider.clone())
            .config(config)
            .build();
        let router = crate::build_router(state).expect("Failed to build router");
        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store, provider }
    }

    /// Credit the user directly through the ledger
    pub async fn fund(&self, user_id: UserId, points: Points) {
        apply_transaction(
            &self.store,
            &TransactionCreateDBRequest::credit(user_id, TransactionType::Bonus, points, "Test funding"),
        )
        .await
        .expect("Failed to fund user");
    }

    /// Mint one redemption code through the API
    pub async fn mint_code(&self, code_type: &str, value: Points) -> String {
        let response = self
            .server
            .post("/api/v1/redemption-codes")
            .json(&json!({"code_type": code_type, "value": value}))
            .await;
        let mut codes: Vec<RedemptionCodeResponse> = response.json();
        codes.remove(0).code
    }

    pub async fn invitation_code(&self, inviter_id: UserId) -> String {
        let response = self.server.post(&format!("/api/v1/users/{inviter_id}/invitation-code")).await;
        let code: InvitationCodeResponse = response.json();
        code.code
    }
}
