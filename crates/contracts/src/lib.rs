//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the relay: domain
//! types, the error taxonomy and the collaborator traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! - `AccountResolver` maps a bearer token to an `Account`
//! - `DestinationDirectory` lists the `Destination`s of that account
//! - each destination becomes one `OutboundRequest`, sent through `HttpTransport`
//! - every send settles into exactly one `DispatchOutcome`

mod account;
mod account_id;
mod blueprint;
mod destination;
mod directory;
mod error;
mod outcome;
mod payload;
mod request;
mod transport;

pub use account::*;
pub use account_id::AccountId;
pub use blueprint::*;
pub use destination::*;
pub use directory::{AccountResolver, DestinationDirectory, LocalAccountResolver, LocalDestinationDirectory};
pub use error::*;
pub use outcome::*;
pub use payload::InboundPayload;
pub use request::OutboundRequest;
pub use transport::{HttpTransport, LocalHttpTransport};
