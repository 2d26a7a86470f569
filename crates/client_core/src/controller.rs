//! The customer list view model.
//!
//! Every user intent is an async method on a shared [`CustomerListController`].
//! Fetches are never cancelled; instead each issued request is tagged with a
//! generation and only the response to the most recently issued request is
//! allowed to touch the displayed state.

use std::sync::Arc;

use shared::domain::{Customer, CustomerId, CustomerStatus};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

use crate::{
    api::CustomerDirectory,
    query::{Column, ListRequest, PageSize, QueryState},
    session::AuthenticatedContext,
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load customers";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete customer";
pub const DELETE_SUCCEEDED_MESSAGE: &str = "Customer deleted successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn success(message: &str) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    RowsReplaced {
        page_index: u32,
        total_pages: u32,
        row_count: usize,
    },
    LoadingChanged(bool),
    Notification(Notification),
}

/// What happened to one issued list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { row_count: usize },
    /// A newer request was issued before this one resolved.
    Superseded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The row was deleted; carries the outcome of the follow-up refetch.
    Deleted(FetchOutcome),
    Failed,
}

/// Read-only snapshot of everything a renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub query: QueryState,
    pub rows: Vec<Customer>,
    pub is_loading: bool,
    pub can_previous: bool,
    pub can_next: bool,
}

impl ListView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct ListState {
    query: QueryState,
    rows: Vec<Customer>,
    is_loading: bool,
    issued_generation: u64,
}

pub struct CustomerListController {
    directory: Arc<dyn CustomerDirectory>,
    inner: Mutex<ListState>,
    events: broadcast::Sender<ListEvent>,
}

impl CustomerListController {
    pub(crate) fn new(directory: Arc<dyn CustomerDirectory>, page_size: PageSize) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            directory,
            inner: Mutex::new(ListState {
                query: QueryState::with_page_size(page_size),
                rows: Vec::new(),
                is_loading: false,
                issued_generation: 0,
            }),
            events,
        })
    }

    /// Builds the controller for a signed-in user and loads the first page.
    pub async fn mount(
        ctx: &AuthenticatedContext,
        directory: Arc<dyn CustomerDirectory>,
        page_size: PageSize,
    ) -> Arc<Self> {
        info!(username = %ctx.user().username, %page_size, "mounting customer list");
        let controller = Self::new(directory, page_size);
        controller.load_initial().await;
        controller
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    pub async fn view(&self) -> ListView {
        let state = self.inner.lock().await;
        ListView {
            query: state.query.clone(),
            rows: state.rows.clone(),
            is_loading: state.is_loading,
            can_previous: state.query.can_go_previous(),
            can_next: state.query.can_go_next(),
        }
    }

    pub async fn load_initial(&self) -> FetchOutcome {
        self.fetch_page(|_| Some(0)).await.unwrap_or(FetchOutcome::Failed)
    }

    pub async fn set_search_term(&self, text: impl Into<String>) {
        self.inner.lock().await.query.search_term = text.into();
    }

    pub async fn set_status_filter(&self, status: Option<CustomerStatus>) {
        self.inner.lock().await.query.status_filter = status;
    }

    pub async fn submit_search(&self) -> FetchOutcome {
        self.fetch_first_page(|_| {}).await
    }

    pub async fn toggle_sort(&self) -> FetchOutcome {
        self.fetch_first_page(|query| {
            query.sort_direction = query.sort_direction.cycle();
        })
        .await
    }

    pub async fn reset_filters(&self) -> FetchOutcome {
        self.fetch_first_page(QueryState::clear_filters).await
    }

    pub async fn change_page_size(&self, size: PageSize) -> FetchOutcome {
        self.fetch_first_page(|query| query.page_size = size).await
    }

    /// Requests `target` even when it lies outside the known page range; the
    /// server has the final word on what exists.
    pub async fn change_page(&self, target: u32) -> FetchOutcome {
        self.fetch_page(|query| {
            if target >= query.total_pages {
                debug!(
                    requested = target,
                    total_pages = query.total_pages,
                    "page outside known range"
                );
            }
            Some(target)
        })
        .await
        .unwrap_or(FetchOutcome::Failed)
    }

    /// `None` when already on the last page.
    pub async fn next_page(&self) -> Option<FetchOutcome> {
        self.fetch_page(|query| query.can_go_next().then(|| query.page_index + 1))
            .await
    }

    /// `None` when already on the first page.
    pub async fn previous_page(&self) -> Option<FetchOutcome> {
        self.fetch_page(|query| query.can_go_previous().then(|| query.page_index - 1))
            .await
    }

    /// Flips an optional column and returns whether anything changed.
    pub async fn toggle_column(&self, column: Column) -> bool {
        self.inner.lock().await.query.column_visibility.toggle(column)
    }

    pub async fn delete_customer(&self, id: &CustomerId) -> DeleteOutcome {
        if let Err(err) = self.directory.delete_customer(id).await {
            error!(customer_id = %id, error = %err, "failed to delete customer");
            self.emit(ListEvent::Notification(Notification::error(
                DELETE_FAILED_MESSAGE,
            )));
            return DeleteOutcome::Failed;
        }

        info!(customer_id = %id, "customer deleted");
        self.emit(ListEvent::Notification(Notification::success(
            DELETE_SUCCEEDED_MESSAGE,
        )));
        // Built from the query as it stands now, so a search issued while
        // the delete was in flight is not replaced by older filters.
        let refetch = self
            .fetch_page(|query| Some(query.page_index))
            .await
            .unwrap_or(FetchOutcome::Failed);
        DeleteOutcome::Deleted(refetch)
    }

    async fn fetch_first_page(&self, mutate: impl FnOnce(&mut QueryState)) -> FetchOutcome {
        self.fetch_page(|query| {
            mutate(query);
            Some(0)
        })
        .await
        .unwrap_or(FetchOutcome::Failed)
    }

    /// Applies `plan` to the query under the lock; when it names a page, that
    /// page is requested with the resulting filters, sort and size.
    async fn fetch_page(
        &self,
        plan: impl FnOnce(&mut QueryState) -> Option<u32>,
    ) -> Option<FetchOutcome> {
        let (generation, request) = {
            let mut state = self.inner.lock().await;
            let page = plan(&mut state.query)?;
            let request = state.query.request_for_page(page);
            (self.issue(&mut state), request)
        };
        Some(self.complete(generation, request).await)
    }

    fn issue(&self, state: &mut ListState) -> u64 {
        state.issued_generation += 1;
        if !state.is_loading {
            state.is_loading = true;
            self.emit(ListEvent::LoadingChanged(true));
        }
        state.issued_generation
    }

    async fn complete(&self, generation: u64, request: ListRequest) -> FetchOutcome {
        debug!(generation, request = %request.path_and_query(), "fetching customers");
        let result = self.directory.fetch_customers(&request).await;

        let mut state = self.inner.lock().await;
        if generation != state.issued_generation {
            debug!(
                generation,
                latest = state.issued_generation,
                "dropping superseded customer page"
            );
            return FetchOutcome::Superseded;
        }

        let outcome = match result {
            Ok(page) => {
                let row_count = page.content.len();
                state.rows = page.content;
                state.query.total_pages = page.total_pages;
                state.query.page_index = request.page;
                self.emit(ListEvent::RowsReplaced {
                    page_index: request.page,
                    total_pages: page.total_pages,
                    row_count,
                });
                FetchOutcome::Applied { row_count }
            }
            Err(err) => {
                error!(
                    request = %request.path_and_query(),
                    error = %err,
                    "failed to load customers"
                );
                self.emit(ListEvent::Notification(Notification::error(
                    LOAD_FAILED_MESSAGE,
                )));
                FetchOutcome::Failed
            }
        };
        state.is_loading = false;
        self.emit(ListEvent::LoadingChanged(false));
        outcome
    }

    fn emit(&self, event: ListEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
