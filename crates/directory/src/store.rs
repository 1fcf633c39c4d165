//! InMemoryDirectory - account and destination tables
//!
//! 一把 `RwLock` 保护全部表：读路径（鉴权、列出 destination）并发，写路径
//! （管理 API）互斥。读者拿到的都是克隆出来的快照。

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use contracts::{
    Account, AccountId, AccountResolver, ContractError, Destination, DestinationDirectory,
    DestinationId, DestinationSeed, HttpMethod, RelayBlueprint,
};

use crate::error::DirectoryError;

/// Fields of a new account. Missing id and token are generated (UUIDv4).
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub account_id: Option<String>,
    pub email: String,
    pub account_name: String,
    pub app_secret_token: Option<String>,
    pub website: Option<String>,
}

/// Partial account update, `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub account_name: Option<String>,
    pub website: Option<String>,
}

/// Fields of a new destination. A missing id is allocated.
#[derive(Debug, Clone)]
pub struct NewDestination {
    pub id: Option<u64>,
    pub account_id: AccountId,
    pub url: String,
    pub http_method: String,
    pub headers: BTreeMap<String, String>,
}

/// Partial destination update, `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct DestinationPatch {
    pub url: Option<String>,
    pub http_method: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    /// secret token -> owning account
    tokens: HashMap<String, AccountId>,
    destinations: BTreeMap<DestinationId, Destination>,
    /// Highest destination id handed out so far
    last_destination_id: u64,
}

impl Tables {
    fn insert_account(&mut self, new: NewAccount) -> Result<Account, DirectoryError> {
        if new.email.is_empty() || new.account_name.is_empty() {
            return Err(DirectoryError::invalid(
                "Email and account name are required",
            ));
        }
        if self.email_taken(&new.email, None) {
            return Err(DirectoryError::conflict(
                "Account with this email already exists",
            ));
        }

        let account_id = AccountId::from(
            new.account_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        );
        if self.accounts.contains_key(&account_id) {
            return Err(DirectoryError::conflict(format!(
                "Account '{account_id}' already exists"
            )));
        }

        let token = new
            .app_secret_token
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.tokens.contains_key(&token) {
            return Err(DirectoryError::conflict(
                "Account with this token already exists",
            ));
        }

        let now = Utc::now();
        let account = Account {
            account_id: account_id.clone(),
            email: new.email,
            account_name: new.account_name,
            app_secret_token: token.clone().into(),
            website: new.website,
            created_at: now,
            updated_at: now,
        };
        self.tokens.insert(token, account_id.clone());
        self.accounts.insert(account_id, account.clone());
        Ok(account)
    }

    fn email_taken(&self, email: &str, except: Option<&AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| a.email == email && Some(&a.account_id) != except)
    }

    fn insert_destination(&mut self, new: NewDestination) -> Result<Destination, DirectoryError> {
        if !self.accounts.contains_key(&new.account_id) {
            return Err(DirectoryError::account_not_found(new.account_id.to_string()));
        }
        let http_method = normalize_method(&new.http_method)?;
        check_url(&new.url)?;

        let id = match new.id {
            Some(raw) => {
                let id = DestinationId(raw);
                if self.destinations.contains_key(&id) {
                    return Err(DirectoryError::conflict(format!(
                        "Destination {id} already exists"
                    )));
                }
                self.last_destination_id = self.last_destination_id.max(raw);
                id
            }
            None => self.allocate_destination_id(),
        };

        let now = Utc::now();
        let destination = Destination {
            id,
            account_id: new.account_id,
            url: new.url,
            http_method,
            headers: new.headers,
            created_at: now,
            updated_at: now,
        };
        self.destinations.insert(id, destination.clone());
        Ok(destination)
    }

    fn allocate_destination_id(&mut self) -> DestinationId {
        self.last_destination_id += 1;
        DestinationId(self.last_destination_id)
    }

    fn destinations_of(&self, account_id: &AccountId) -> Vec<Destination> {
        self.destinations
            .values()
            .filter(|d| &d.account_id == account_id)
            .cloned()
            .collect()
    }
}

/// Upper-cased verb, or `Invalid` when outside GET/POST/PUT/PATCH/DELETE
fn normalize_method(raw: &str) -> Result<String, DirectoryError> {
    raw.parse::<HttpMethod>()
        .map(|m| m.as_str().to_string())
        .map_err(|_| DirectoryError::invalid("Invalid HTTP method"))
}

fn check_url(raw: &str) -> Result<(), DirectoryError> {
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(DirectoryError::invalid("Invalid URL")),
    }
}

fn seed_to_new(seed: &DestinationSeed) -> NewDestination {
    NewDestination {
        id: seed.id,
        account_id: AccountId::from(seed.account_id.as_str()),
        url: seed.url.clone(),
        http_method: seed.http_method.clone(),
        headers: seed.headers.clone(),
    }
}

/// In-memory account/destination store
///
/// Implements [`AccountResolver`] and [`DestinationDirectory`] for the
/// ingestion engine, plus the CRUD operations behind the management API.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: RwLock<Tables>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory seeded with the blueprint's accounts and destinations
    ///
    /// Destinations with an explicit id are inserted first so that allocated
    /// ids never collide with them.
    #[instrument(
        name = "directory_from_blueprint",
        skip(blueprint),
        fields(
            accounts = blueprint.accounts.len(),
            destinations = blueprint.destinations.len()
        )
    )]
    pub fn from_blueprint(blueprint: &RelayBlueprint) -> Result<Self, DirectoryError> {
        let mut tables = Tables::default();

        for seed in &blueprint.accounts {
            tables.insert_account(NewAccount {
                account_id: seed.account_id.clone(),
                email: seed.email.clone(),
                account_name: seed.account_name.clone(),
                app_secret_token: seed.app_secret_token.clone(),
                website: seed.website.clone(),
            })?;
        }

        let (explicit, allocated): (Vec<_>, Vec<_>) =
            blueprint.destinations.iter().partition(|d| d.id.is_some());
        for seed in explicit.into_iter().chain(allocated) {
            tables.insert_destination(seed_to_new(seed))?;
        }

        info!(
            accounts = tables.accounts.len(),
            destinations = tables.destinations.len(),
            "Directory seeded"
        );

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// (accounts, destinations) currently stored
    pub async fn counts(&self) -> (usize, usize) {
        let tables = self.tables.read().await;
        (tables.accounts.len(), tables.destinations.len())
    }

    // ===== Accounts =====

    #[instrument(name = "directory_create_account", skip(self, new), fields(email = %new.email))]
    pub async fn create_account(&self, new: NewAccount) -> Result<Account, DirectoryError> {
        let account = self.tables.write().await.insert_account(new)?;
        info!(account_id = %account.account_id, "Account created");
        Ok(account)
    }

    /// All accounts, ordered by id
    pub async fn accounts(&self) -> Vec<Account> {
        self.tables.read().await.accounts.values().cloned().collect()
    }

    pub async fn account(&self, account_id: &str) -> Result<Account, DirectoryError> {
        self.tables
            .read()
            .await
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| DirectoryError::account_not_found(account_id))
    }

    /// Apply a partial update. Empty strings are ignored; a changed email
    /// must stay unique.
    #[instrument(name = "directory_update_account", skip(self, patch))]
    pub async fn update_account(
        &self,
        account_id: &str,
        patch: AccountPatch,
    ) -> Result<Account, DirectoryError> {
        let mut tables = self.tables.write().await;
        let id = AccountId::from(account_id);

        let email = patch.email.filter(|e| !e.is_empty());
        if let Some(email) = &email {
            if tables.email_taken(email, Some(&id)) {
                return Err(DirectoryError::conflict(
                    "Account with this email already exists",
                ));
            }
        }

        let account = tables
            .accounts
            .get_mut(&id)
            .ok_or_else(|| DirectoryError::account_not_found(account_id))?;
        if let Some(email) = email {
            account.email = email;
        }
        if let Some(name) = patch.account_name.filter(|n| !n.is_empty()) {
            account.account_name = name;
        }
        if let Some(website) = patch.website {
            account.website = Some(website);
        }
        account.updated_at = Utc::now();

        debug!(account_id, "Account updated");
        Ok(account.clone())
    }

    /// Delete an account and, by cascade, its destinations.
    ///
    /// Returns the number of destinations removed. The account's token stops
    /// resolving immediately.
    #[instrument(name = "directory_delete_account", skip(self))]
    pub async fn delete_account(&self, account_id: &str) -> Result<usize, DirectoryError> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .remove(account_id)
            .ok_or_else(|| DirectoryError::account_not_found(account_id))?;
        tables.tokens.remove(account.app_secret_token.expose());

        let before = tables.destinations.len();
        tables
            .destinations
            .retain(|_, d| d.account_id != account.account_id);
        let removed = before - tables.destinations.len();

        info!(account_id, destinations_removed = removed, "Account deleted");
        Ok(removed)
    }

    // ===== Destinations =====

    #[instrument(
        name = "directory_create_destination",
        skip(self, new),
        fields(account_id = %new.account_id)
    )]
    pub async fn create_destination(
        &self,
        new: NewDestination,
    ) -> Result<Destination, DirectoryError> {
        let destination = self.tables.write().await.insert_destination(new)?;
        info!(
            destination_id = %destination.id,
            method = %destination.http_method,
            "Destination created"
        );
        Ok(destination)
    }

    /// All destinations, ordered by id
    pub async fn destinations(&self) -> Vec<Destination> {
        self.tables
            .read()
            .await
            .destinations
            .values()
            .cloned()
            .collect()
    }

    pub async fn destination(&self, id: DestinationId) -> Result<Destination, DirectoryError> {
        self.tables
            .read()
            .await
            .destinations
            .get(&id)
            .cloned()
            .ok_or_else(|| DirectoryError::destination_not_found(id.to_string()))
    }

    /// Destinations of one account; `NotFound` when the account is unknown
    pub async fn destinations_of(
        &self,
        account_id: &str,
    ) -> Result<Vec<Destination>, DirectoryError> {
        let tables = self.tables.read().await;
        let id = AccountId::from(account_id);
        if !tables.accounts.contains_key(&id) {
            return Err(DirectoryError::account_not_found(account_id));
        }
        Ok(tables.destinations_of(&id))
    }

    #[instrument(name = "directory_update_destination", skip(self, patch), fields(destination_id = %id))]
    pub async fn update_destination(
        &self,
        id: DestinationId,
        patch: DestinationPatch,
    ) -> Result<Destination, DirectoryError> {
        let mut tables = self.tables.write().await;
        let destination = tables
            .destinations
            .get_mut(&id)
            .ok_or_else(|| DirectoryError::destination_not_found(id.to_string()))?;

        let http_method = match patch.http_method.filter(|m| !m.is_empty()) {
            Some(raw) => Some(normalize_method(&raw)?),
            None => None,
        };
        let url = patch.url.filter(|u| !u.is_empty());
        if let Some(url) = &url {
            check_url(url)?;
        }

        if let Some(url) = url {
            destination.url = url;
        }
        if let Some(method) = http_method {
            destination.http_method = method;
        }
        if let Some(headers) = patch.headers {
            destination.headers = headers;
        }
        destination.updated_at = Utc::now();

        debug!("Destination updated");
        Ok(destination.clone())
    }

    #[instrument(name = "directory_delete_destination", skip(self), fields(destination_id = %id))]
    pub async fn delete_destination(&self, id: DestinationId) -> Result<(), DirectoryError> {
        self.tables
            .write()
            .await
            .destinations
            .remove(&id)
            .map(|_| info!("Destination deleted"))
            .ok_or_else(|| DirectoryError::destination_not_found(id.to_string()))
    }
}

impl AccountResolver for InMemoryDirectory {
    #[instrument(name = "directory_resolve_account", skip_all)]
    async fn resolve_account(&self, token: &str) -> Result<Account, ContractError> {
        let tables = self.tables.read().await;
        tables
            .tokens
            .get(token)
            .and_then(|id| tables.accounts.get(id))
            .cloned()
            .ok_or(ContractError::Unauthenticated)
    }
}

impl DestinationDirectory for InMemoryDirectory {
    #[instrument(name = "directory_list_destinations", skip(self), fields(account_id = %account_id))]
    async fn list_destinations(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Destination>, ContractError> {
        let destinations = self.tables.read().await.destinations_of(account_id);
        debug!(count = destinations.len(), "Destinations listed");
        Ok(destinations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AccountSeed;

    fn blueprint() -> RelayBlueprint {
        RelayBlueprint {
            accounts: vec![
                AccountSeed {
                    account_id: Some("A1".into()),
                    email: "ops@example.com".into(),
                    account_name: "Ops".into(),
                    app_secret_token: Some("T1".into()),
                    website: None,
                },
                AccountSeed {
                    account_id: None,
                    email: "dev@example.com".into(),
                    account_name: "Dev".into(),
                    app_secret_token: None,
                    website: Some("https://dev.example.com".into()),
                },
            ],
            destinations: vec![
                DestinationSeed {
                    id: None,
                    account_id: "A1".into(),
                    url: "https://d2.example.com".into(),
                    http_method: "post".into(),
                    headers: BTreeMap::new(),
                },
                DestinationSeed {
                    id: Some(1),
                    account_id: "A1".into(),
                    url: "https://d1.example.com".into(),
                    http_method: "GET".into(),
                    headers: BTreeMap::new(),
                },
            ],
            ..Default::default()
        }
    }

    fn new_destination(account_id: &str, method: &str) -> NewDestination {
        NewDestination {
            id: None,
            account_id: account_id.into(),
            url: "https://hooks.example.com/in".into(),
            http_method: method.into(),
            headers: BTreeMap::from([("X-Api-Key".to_string(), "k".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_seed_generates_missing_ids_and_tokens() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();
        assert_eq!(dir.counts().await, (2, 2));

        let dev = dir
            .accounts()
            .await
            .into_iter()
            .find(|a| a.email == "dev@example.com")
            .unwrap();
        assert!(Uuid::parse_str(&dev.account_id).is_ok());
        assert!(Uuid::parse_str(dev.app_secret_token.expose()).is_ok());

        let resolved = dir
            .resolve_account(dev.app_secret_token.expose())
            .await
            .unwrap();
        assert_eq!(resolved.account_id, dev.account_id);
    }

    #[tokio::test]
    async fn test_seed_explicit_ids_win_and_listing_is_ordered() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();
        let listed = dir.list_destinations(&"A1".into()).await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(listed[0].url, "https://d1.example.com");
        assert_eq!(listed[1].http_method, "POST");
    }

    #[tokio::test]
    async fn test_resolve_is_exact_and_idempotent() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        let first = dir.resolve_account("T1").await.unwrap();
        let second = dir.resolve_account("T1").await.unwrap();
        assert_eq!(first.account_id, "A1");
        assert_eq!(first, second);

        for token in ["t1", " T1", "T1 ", "", "nope"] {
            assert!(matches!(
                dir.resolve_account(token).await,
                Err(ContractError::Unauthenticated)
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_account_lists_nothing() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();
        let listed = dir.list_destinations(&"ghost".into()).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        let removed = dir.delete_account("A1").await.unwrap();
        assert_eq!(removed, 2);
        assert!(dir.destinations().await.is_empty());
        assert!(matches!(
            dir.resolve_account("T1").await,
            Err(ContractError::Unauthenticated)
        ));
        assert!(matches!(
            dir.delete_account("A1").await,
            Err(DirectoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_account_requires_fields_and_unique_email() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        let missing = dir
            .create_account(NewAccount {
                email: "x@example.com".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(missing, Err(DirectoryError::Invalid { .. })));

        let duplicate = dir
            .create_account(NewAccount {
                email: "ops@example.com".into(),
                account_name: "Other".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(duplicate, Err(DirectoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_account_email_stays_unique() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        let clash = dir
            .update_account(
                "A1",
                AccountPatch {
                    email: Some("dev@example.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(clash, Err(DirectoryError::Conflict { .. })));

        let updated = dir
            .update_account(
                "A1",
                AccountPatch {
                    email: Some("ops@example.com".into()),
                    account_name: Some("Operations".into()),
                    website: Some("https://ops.example.com".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.account_name, "Operations");
        assert_eq!(updated.website.as_deref(), Some("https://ops.example.com"));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_create_destination_checks() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        assert!(matches!(
            dir.create_destination(new_destination("ghost", "GET")).await,
            Err(DirectoryError::NotFound { .. })
        ));
        assert!(matches!(
            dir.create_destination(new_destination("A1", "TRACE")).await,
            Err(DirectoryError::Invalid { .. })
        ));

        let mut bad_url = new_destination("A1", "GET");
        bad_url.url = "not a url".into();
        assert!(matches!(
            dir.create_destination(bad_url).await,
            Err(DirectoryError::Invalid { .. })
        ));

        let created = dir
            .create_destination(new_destination("A1", "patch"))
            .await
            .unwrap();
        assert_eq!(created.id, DestinationId(3));
        assert_eq!(created.http_method, "PATCH");
    }

    #[tokio::test]
    async fn test_update_and_delete_destination() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();

        let updated = dir
            .update_destination(
                DestinationId(1),
                DestinationPatch {
                    http_method: Some("delete".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.http_method, "DELETE");
        assert_eq!(updated.url, "https://d1.example.com");

        dir.delete_destination(DestinationId(1)).await.unwrap();
        assert!(matches!(
            dir.destination(DestinationId(1)).await,
            Err(DirectoryError::NotFound { .. })
        ));
        assert_eq!(dir.destinations_of("A1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_is_a_snapshot() {
        let dir = InMemoryDirectory::from_blueprint(&blueprint()).unwrap();
        let snapshot = dir.list_destinations(&"A1".into()).await.unwrap();

        dir.create_destination(new_destination("A1", "PUT"))
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(dir.list_destinations(&"A1".into()).await.unwrap().len(), 3);
    }
}
