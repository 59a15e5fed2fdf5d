use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::debounce::Debouncer;
use super::pagination::{Applied, FetchOutcome, Messages, Notice, PageState, PageTicket, Paginator};
use crate::{api::RepositoryApi, config::SearchConfig, models::Repository};

const SEARCH_MESSAGES: Messages = Messages {
    failed: "Failed to fetch repositories",
    rate_limited: "Rate limit exceeded",
};

/// GitHub serves at most this many results per search; later pages are a 422
pub const SEARCH_RESULT_LIMIT: u64 = 1000;

/// A search page fetch waiting to be run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub ticket: PageTicket,
}

impl SearchRequest {
    pub async fn execute<A: RepositoryApi + ?Sized>(&self, api: &A) -> FetchOutcome<Repository> {
        info!("Searching '{}' (page {})", self.query, self.ticket.page);
        api.search_repositories(&self.query, self.ticket.page, self.ticket.per_page)
            .await
            .into()
    }
}

/// Everything that can happen to a search session
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// The debounced query text changed - a new query epoch
    QueryChanged(String),
    /// The list was scrolled to its end
    PageRequested,
    FetchCompleted(SearchRequest, FetchOutcome<Repository>),
}

/// Repository search with debounced input and incremental paging
///
/// The session never performs I/O itself: events go in, fetches to run
/// come out. `SearchController` runs those against a `RepositoryApi`; the
/// `search`/`load_more` helpers do the same inline for simple callers.
#[derive(Debug)]
pub struct SearchSession {
    raw_query: String,
    query: String,
    debouncer: Debouncer,
    pager: Paginator<Repository>,
}

impl SearchSession {
    pub fn new(page_size: u32, debounce: Duration) -> Self {
        Self {
            raw_query: String::new(),
            query: String::new(),
            debouncer: Debouncer::new(debounce),
            pager: Paginator::new(page_size, SEARCH_MESSAGES)
                .with_result_cap(SEARCH_RESULT_LIMIT),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.page_size, config.debounce())
    }

    /// Text as typed, before debouncing
    pub fn input(&mut self, raw: impl Into<String>, now: Instant) {
        self.raw_query = raw.into();
        self.debouncer.push(self.raw_query.clone(), now);
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Turn settled input into a query change
    pub fn poll_debounce(&mut self, now: Instant) -> Option<SearchRequest> {
        let settled = self.debouncer.poll(now)?;
        if settled == self.query {
            debug!("Debounced query unchanged, nothing to do");
            return None;
        }
        self.handle(SearchEvent::QueryChanged(settled))
    }

    pub fn handle(&mut self, event: SearchEvent) -> Option<SearchRequest> {
        match event {
            SearchEvent::QueryChanged(query) => self.change_query(query),
            SearchEvent::PageRequested => self.request_next_page(),
            SearchEvent::FetchCompleted(request, outcome) => {
                self.complete(request, outcome);
                None
            }
        }
    }

    fn change_query(&mut self, query: String) -> Option<SearchRequest> {
        self.query = query;

        if self.query.trim().is_empty() {
            debug!("Query cleared");
            self.pager.reset();
            return None;
        }

        let ticket = self.pager.begin();
        Some(SearchRequest {
            query: self.query.clone(),
            ticket,
        })
    }

    fn request_next_page(&mut self) -> Option<SearchRequest> {
        if self.query.trim().is_empty() {
            return None;
        }

        let ticket = self.pager.begin_next()?;
        Some(SearchRequest {
            query: self.query.clone(),
            ticket,
        })
    }

    pub fn complete(
        &mut self,
        request: SearchRequest,
        outcome: FetchOutcome<Repository>,
    ) -> Applied {
        let applied = self.pager.apply(request.ticket, outcome);
        self.pager.label_notices(&request.query);
        debug!(
            "Search page {} for '{}': {:?}",
            request.ticket.page, request.query, applied
        );
        applied
    }

    /// Search right away, skipping the debounce window
    pub async fn search<A: RepositoryApi + ?Sized>(
        &mut self,
        api: &A,
        query: impl Into<String>,
    ) -> Option<Applied> {
        let query = query.into();
        self.debouncer.cancel();
        self.raw_query = query.clone();

        let request = self.handle(SearchEvent::QueryChanged(query))?;
        let outcome = request.execute(api).await;
        Some(self.complete(request, outcome))
    }

    /// Fetch and append the next page, if there is one to fetch
    pub async fn load_more<A: RepositoryApi + ?Sized>(&mut self, api: &A) -> Option<Applied> {
        let request = self.handle(SearchEvent::PageRequested)?;
        let outcome = request.execute(api).await;
        Some(self.complete(request, outcome))
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// The debounced query the current results belong to
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Repository] {
        self.pager.items()
    }

    pub fn pager(&self) -> &Paginator<Repository> {
        &self.pager
    }

    pub fn snapshot(&self) -> PageState<Repository> {
        self.pager.snapshot()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.pager.take_notices()
    }
}
