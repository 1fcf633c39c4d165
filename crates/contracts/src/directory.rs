//! Collaborator traits consumed by the ingestion engine
//!
//! Both are pure queries: the engine never mutates the directory.

use crate::{Account, AccountId, ContractError, Destination};

/// Authenticator
#[trait_variant::make(AccountResolver: Send)]
pub trait LocalAccountResolver {
    /// Map a bearer token to its account.
    ///
    /// Exact, case-sensitive match. An unknown token yields
    /// [`ContractError::Unauthenticated`], same as an absent one.
    async fn resolve_account(&self, token: &str) -> Result<Account, ContractError>;
}

/// Destination Directory access
#[trait_variant::make(DestinationDirectory: Send)]
pub trait LocalDestinationDirectory {
    /// Destinations of `account_id`, ordered by id.
    ///
    /// The returned vector is an owned snapshot; an empty result is not an error.
    async fn list_destinations(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Destination>, ContractError>;
}
