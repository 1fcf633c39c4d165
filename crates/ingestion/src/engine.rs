//! IngestionEngine - authenticate, resolve, fan out, aggregate
//!
//! 状态机（终态）：
//! 1. token 无法解析 → `Unauthenticated`，不查询目录
//! 2. 已认证、无 destination → `IngestReport::NoDestinations`，不发出任何请求
//! 3. 已认证、有 destination → 适配 + 并发分发 + 汇总 → `IngestReport::Dispatched`
//!
//! 每次调用恰好产生一个分发波次；不重试、不排队。

use std::sync::Arc;

use tracing::{field, info, instrument, Span};

use contracts::{
    AccountId, AccountResolver, DestinationDirectory, DispatchOutcome, DispatchSummary,
    HttpTransport, InboundPayload,
};
use dispatcher::{summarize, FanOutDispatcher};

use crate::error::IngestError;

/// Terminal result of an authenticated ingestion call
#[derive(Debug, Clone, PartialEq)]
pub enum IngestReport {
    /// Account owns no destinations; nothing was sent
    NoDestinations { account_id: AccountId },
    /// One wave was dispatched
    Dispatched {
        account_id: AccountId,
        summary: DispatchSummary,
        /// Per-destination detail, input order. Not returned to the caller.
        outcomes: Vec<DispatchOutcome>,
    },
}

impl IngestReport {
    pub fn account_id(&self) -> &AccountId {
        match self {
            Self::NoDestinations { account_id } | Self::Dispatched { account_id, .. } => {
                account_id
            }
        }
    }

    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoDestinations { .. } => "no_destinations",
            Self::Dispatched { .. } => "dispatched",
        }
    }
}

/// Ingestion entry point over injected collaborators
pub struct IngestionEngine<R, D, T> {
    resolver: Arc<R>,
    directory: Arc<D>,
    dispatcher: FanOutDispatcher<T>,
}

impl<R, D, T> IngestionEngine<R, D, T>
where
    R: AccountResolver + Send + Sync + 'static,
    D: DestinationDirectory + Send + Sync + 'static,
    T: HttpTransport + Send + Sync + 'static,
{
    pub fn new(resolver: Arc<R>, directory: Arc<D>, dispatcher: FanOutDispatcher<T>) -> Self {
        Self {
            resolver,
            directory,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &FanOutDispatcher<T> {
        &self.dispatcher
    }

    /// Handle one authenticated-or-not call carrying `payload`
    ///
    /// # Errors
    /// - `Unauthenticated`: token unknown
    /// - `Internal`: directory failure
    ///
    /// Destination failures never surface here; they are counted in the
    /// report's summary.
    #[instrument(
        name = "ingest",
        skip_all,
        fields(account_id = field::Empty, payload_keys = payload.len())
    )]
    pub async fn ingest(
        &self,
        token: &str,
        payload: &InboundPayload,
    ) -> Result<IngestReport, IngestError> {
        let account = self.resolver.resolve_account(token).await?;
        Span::current().record("account_id", field::display(&account.account_id));

        let destinations = self.directory.list_destinations(&account.account_id).await?;
        if destinations.is_empty() {
            info!("No destinations registered, nothing to dispatch");
            return Ok(IngestReport::NoDestinations {
                account_id: account.account_id,
            });
        }

        let outcomes = self.dispatcher.dispatch(&destinations, payload).await;
        let summary = summarize(&outcomes, self.dispatcher.status_policy());

        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "Payload fanned out"
        );

        Ok(IngestReport::Dispatched {
            account_id: account.account_id,
            summary,
            outcomes,
        })
    }
}
