use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::application::validation::{validate_account_creation, validate_transaction};
use crate::application::{AppError, LedgerStore, StoreError};
use crate::domain::{
    ensure_funds, ordered_history, Account, AccountId, BalanceStats, Cents, LedgerError, Transaction,
    TransactionKind, TransactionStats,
};

use super::{
    tags_for_account_change, tags_for_transaction, Completion, Control, MutationPhase,
    MutationTracker, QueryCache, QueryKey, QueryValue, Tag, Ticket,
};

pub type ViewId = u64;

/// What a presentation layer needs to render one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub key: QueryKey,
    pub value: Option<QueryValue>,
    pub loading: bool,
    pub stale: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct SyncState {
    cache: QueryCache,
    views: HashMap<ViewId, QueryKey>,
    next_view: ViewId,
    mutations: MutationTracker,
    closed: HashSet<AccountId>,
}

impl SyncState {
    fn is_watched(&self, key: &QueryKey) -> bool {
        self.views.values().any(|k| k == key)
    }

    fn ensure_open(&self, account_id: AccountId) -> Result<(), AppError> {
        if self.closed.contains(&account_id) {
            return Err(AppError::AccountClosed(account_id));
        }
        Ok(())
    }

    /// Drop every trace of a closed account: its views, its cached history
    /// and its transaction control.
    fn forget_account(&mut self, account_id: AccountId) {
        self.views.retain(|_, key| key.account() != Some(account_id));
        self.cache.evict(&QueryKey::AccountTransactions(account_id));
        self.mutations.clear(Control::RecordTransaction(account_id));
        self.closed.insert(account_id);
    }

    /// Balance of `account_id` according to a fresh cached listing, if any.
    fn known_balance(&self, account_id: AccountId) -> Option<Cents> {
        let entry = self.cache.get(&QueryKey::Accounts)?;
        if entry.stale || entry.in_flight {
            return None;
        }
        entry
            .value
            .as_ref()?
            .as_accounts()?
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.balance)
    }
}

/// Keeps every view consistent with the ledger store.
///
/// Views are registered with [`watch`](Self::watch) and filled by
/// [`load`](Self::load). Mutations go through the command methods, which
/// validate input, submit to the store and then re-query every watched view
/// depending on what changed. Balances are never patched locally.
#[derive(Clone)]
pub struct SyncController {
    store: Arc<dyn LedgerStore>,
    state: Arc<Mutex<SyncState>>,
}

impl SyncController {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(SyncState::default())),
        }
    }

    // ========================
    // Views
    // ========================

    /// Register a live view on `key`. Nothing is fetched until `load`.
    pub async fn watch(&self, key: QueryKey) -> Result<ViewId, AppError> {
        let mut state = self.state.lock().await;
        if let Some(account_id) = key.account() {
            state.ensure_open(account_id)?;
        }
        state.next_view += 1;
        let view = state.next_view;
        state.views.insert(view, key);
        Ok(view)
    }

    /// Tear down a view. A response still in flight for it will be dropped.
    pub async fn dismiss(&self, view: ViewId) {
        let mut state = self.state.lock().await;
        if let Some(key) = state.views.remove(&view) {
            if !state.is_watched(&key) {
                state.cache.evict(&key);
            }
        }
    }

    pub async fn is_live(&self, view: ViewId) -> bool {
        self.state.lock().await.views.contains_key(&view)
    }

    /// Query the store for a view and cache the result.
    ///
    /// If the view is dismissed, or a newer fetch for the same query was
    /// issued, before the response arrives, the response is discarded and
    /// this returns `Ok(())`.
    pub async fn load(&self, view: ViewId) -> Result<(), AppError> {
        let ticket = {
            let mut state = self.state.lock().await;
            let key = *state.views.get(&view).ok_or(AppError::UnknownView(view))?;
            state.cache.begin_fetch(key)
        };

        let result = fetch(self.store.clone(), ticket.key).await;
        match self.apply(ticket, result).await {
            Some(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }

    pub async fn view(&self, view: ViewId) -> Result<ViewSnapshot, AppError> {
        let state = self.state.lock().await;
        let key = *state.views.get(&view).ok_or(AppError::UnknownView(view))?;
        let snapshot = match state.cache.get(&key) {
            Some(entry) => ViewSnapshot {
                key,
                value: entry.value.clone(),
                loading: entry.in_flight,
                stale: entry.stale,
                error: entry.error.clone(),
            },
            None => ViewSnapshot {
                key,
                value: None,
                loading: false,
                stale: false,
                error: None,
            },
        };
        Ok(snapshot)
    }

    pub async fn accounts(&self) -> Option<Vec<Account>> {
        let state = self.state.lock().await;
        Some(state.cache.value(&QueryKey::Accounts)?.as_accounts()?.to_vec())
    }

    /// Cached history of one account, most recent first.
    pub async fn history(&self, account_id: AccountId) -> Option<Vec<Transaction>> {
        let state = self.state.lock().await;
        let transactions = state
            .cache
            .value(&QueryKey::AccountTransactions(account_id))?
            .as_transactions()?;
        Some(ordered_history(transactions))
    }

    pub async fn balance_stats(&self) -> Option<BalanceStats> {
        let state = self.state.lock().await;
        state
            .cache
            .value(&QueryKey::BalanceStats)?
            .as_balance_stats()
            .copied()
    }

    pub async fn transaction_stats(&self) -> Option<TransactionStats> {
        let state = self.state.lock().await;
        state
            .cache
            .value(&QueryKey::TransactionStats)?
            .as_transaction_stats()
            .copied()
    }

    // ========================
    // Mutations
    // ========================

    pub async fn phase(&self, control: Control) -> MutationPhase {
        self.state.lock().await.mutations.phase(control)
    }

    /// Message of the last failed attempt on `control`, until it is retried.
    pub async fn last_error(&self, control: Control) -> Option<String> {
        self.state
            .lock()
            .await
            .mutations
            .last_error(control)
            .map(str::to_string)
    }

    pub async fn open_account(
        &self,
        initial_balance: Option<&str>,
        account_type: Option<&str>,
    ) -> Result<Account, AppError> {
        let draft = validate_account_creation(initial_balance, account_type)?;
        let control = Control::OpenAccount;

        self.begin(control).await?;
        let result = self
            .store
            .create_account(draft.initial_balance, draft.account_type)
            .await;
        let account = self.settle(control, result).await?;

        self.refresh_after(control, &tags_for_account_change()).await;
        Ok(account)
    }

    pub async fn close_account(&self, account_id: AccountId) -> Result<(), AppError> {
        let control = Control::CloseAccount(account_id);
        self.state.lock().await.ensure_open(account_id)?;

        self.begin(control).await?;
        let result = self.store.delete_account(account_id).await;
        self.settle(control, result).await?;

        self.state.lock().await.forget_account(account_id);
        self.refresh_after(control, &tags_for_account_change()).await;
        Ok(())
    }

    pub async fn record_transaction(
        &self,
        account_id: AccountId,
        amount: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Transaction, AppError> {
        let draft = validate_transaction(amount, kind)?;
        let control = Control::RecordTransaction(account_id);

        {
            let mut state = self.state.lock().await;
            state.ensure_open(account_id)?;
            if !state.mutations.advance(control, MutationPhase::Submitting) {
                return Err(AppError::Busy(control));
            }
            if draft.kind == TransactionKind::Withdrawal {
                if let Some(balance) = state.known_balance(account_id) {
                    if let Err(LedgerError::InsufficientFunds { balance, requested }) =
                        ensure_funds(balance, draft.amount)
                    {
                        let err = AppError::InsufficientFunds { balance, requested };
                        state.mutations.fail(control, err.to_string());
                        return Err(err);
                    }
                }
            }
        }

        let result = self
            .store
            .record_transaction(account_id, draft.kind, draft.amount)
            .await;
        let transaction = self.settle(control, result).await?;

        self.refresh_after(control, &tags_for_transaction(account_id))
            .await;
        Ok(transaction)
    }

    async fn begin(&self, control: Control) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.mutations.advance(control, MutationPhase::Submitting) {
            return Err(AppError::Busy(control));
        }
        Ok(())
    }

    async fn settle<T>(&self, control: Control, result: Result<T, StoreError>) -> Result<T, AppError> {
        let mut state = self.state.lock().await;
        match result {
            Ok(value) => {
                state.mutations.advance(control, MutationPhase::Succeeded);
                Ok(value)
            }
            Err(err) => {
                let err = AppError::from(err);
                tracing::info!(%control, error = %err, "mutation failed");
                state.mutations.fail(control, err.to_string());
                Err(err)
            }
        }
    }

    async fn refresh_after(&self, control: Control, tags: &[Tag]) {
        self.state
            .lock()
            .await
            .mutations
            .advance(control, MutationPhase::Refreshing);

        self.refresh(tags).await;

        self.state
            .lock()
            .await
            .mutations
            .advance(control, MutationPhase::Idle);
    }

    // ========================
    // Refresh
    // ========================

    /// Re-query every watched query carrying one of `tags`. Unwatched ones are
    /// evicted and fetched again on their next `load`.
    async fn refresh(&self, tags: &[Tag]) {
        let tickets: Vec<Ticket> = {
            let mut state = self.state.lock().await;
            let keys = state.cache.invalidate(tags);
            let mut tickets = Vec::new();
            for key in keys {
                if state.is_watched(&key) {
                    tickets.push(state.cache.begin_fetch(key));
                } else {
                    state.cache.evict(&key);
                }
            }
            tickets
        };

        let mut pending = JoinSet::new();
        for ticket in tickets {
            let store = self.store.clone();
            pending.spawn(async move { (ticket, fetch(store, ticket.key).await) });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((ticket, result)) => {
                    if let Some(Err(err)) = self.apply(ticket, result).await {
                        tracing::warn!(query = %ticket.key, error = %err, "refresh failed");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "refresh task aborted"),
            }
        }
    }

    /// Write a fetch result into the cache. Returns `None` when the result was
    /// discarded, otherwise the outcome the caller should surface.
    async fn apply(
        &self,
        ticket: Ticket,
        result: Result<QueryValue, StoreError>,
    ) -> Option<Result<(), AppError>> {
        let mut state = self.state.lock().await;
        if !state.is_watched(&ticket.key) {
            tracing::debug!(query = %ticket.key, "discarded response for dismissed view");
            return None;
        }

        let (cached, outcome) = match result {
            Ok(value) => (Ok(value), Ok(())),
            Err(err) => {
                let err = AppError::from(err);
                (Err(err.to_string()), Err(err))
            }
        };

        match state.cache.complete(ticket, cached) {
            Completion::Applied => Some(outcome),
            Completion::Superseded => {
                tracing::debug!(query = %ticket.key, "discarded superseded response");
                None
            }
        }
    }
}

async fn fetch(store: Arc<dyn LedgerStore>, key: QueryKey) -> Result<QueryValue, StoreError> {
    let value = match key {
        QueryKey::Accounts => QueryValue::Accounts(store.list_accounts().await?),
        QueryKey::AccountTransactions(id) => {
            QueryValue::Transactions(store.list_transactions(id).await?)
        }
        QueryKey::BalanceStats => QueryValue::BalanceStats(store.total_balance_stats().await?),
        QueryKey::TransactionStats => {
            QueryValue::TransactionStats(store.transaction_stats().await?)
        }
    };
    Ok(value)
}
