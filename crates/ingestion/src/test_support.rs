//! In-memory doubles for engine and endpoint tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use contracts::{
    Account, AccountId, AccountResolver, ContractError, Destination, DestinationDirectory,
    DestinationId, DispatchFailure, HttpTransport, OutboundRequest,
};

pub fn account(id: &str, token: &str) -> Account {
    let now = Utc::now();
    Account {
        account_id: id.into(),
        email: format!("{id}@example.com"),
        account_name: id.to_string(),
        app_secret_token: token.into(),
        website: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn destination(id: u64, account_id: &str, method: &str, url: &str) -> Destination {
    let now = Utc::now();
    Destination {
        id: DestinationId(id),
        account_id: account_id.into(),
        url: url.to_string(),
        http_method: method.to_string(),
        headers: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Token table + destination table, counting directory lookups
#[derive(Default)]
pub struct StaticDirectory {
    pub accounts: Vec<Account>,
    pub destinations: Vec<Destination>,
    pub fail_listing: bool,
    pub lookups: AtomicUsize,
}

impl StaticDirectory {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl AccountResolver for StaticDirectory {
    async fn resolve_account(&self, token: &str) -> Result<Account, ContractError> {
        self.accounts
            .iter()
            .find(|a| a.app_secret_token.expose() == token)
            .cloned()
            .ok_or(ContractError::Unauthenticated)
    }
}

impl DestinationDirectory for StaticDirectory {
    async fn list_destinations(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Destination>, ContractError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(ContractError::directory("backend unavailable"));
        }
        Ok(self
            .destinations
            .iter()
            .filter(|d| &d.account_id == account_id)
            .cloned()
            .collect())
    }
}

/// Records every request; per-destination delay
#[derive(Default)]
pub struct RecordingTransport {
    pub delays: HashMap<u64, Duration>,
    pub requests: Mutex<Vec<OutboundRequest>>,
}

impl RecordingTransport {
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(
        &self,
        request: &OutboundRequest,
        _timeout: Duration,
    ) -> Result<u16, DispatchFailure> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.destination_id.0) {
            tokio::time::sleep(*delay).await;
        }
        Ok(200)
    }
}
