use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::pagination::{FetchOutcome, Notice, PageState};
use super::search::{SearchEvent, SearchRequest, SearchSession};
use crate::{api::RepositoryApi, models::Repository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand {
    /// Raw text from the search box
    Input(String),
    /// The visible list hit its end
    EndReached,
}

type InFlight = BoxFuture<'static, (SearchRequest, FetchOutcome<Repository>)>;

/// Runs a `SearchSession` on its own task.
///
/// One task owns the session, so nothing needs a lock: commands, the
/// debounce timer and finished fetches are all handled from a single
/// `select!` loop. Fetches run concurrently inside that loop and may finish
/// in any order; the session's generation check throws away the ones that
/// no longer matter.
pub struct SearchController {
    api: Arc<dyn RepositoryApi>,
    session: SearchSession,
}

/// What the rest of the app holds on to
pub struct SearchHandle {
    commands: mpsc::UnboundedSender<SearchCommand>,
    state: watch::Receiver<PageState<Repository>>,
    notices: mpsc::UnboundedReceiver<Notice>,
    task: JoinHandle<()>,
}

impl SearchController {
    pub fn new(api: Arc<dyn RepositoryApi>, session: SearchSession) -> Self {
        Self { api, session }
    }

    pub fn spawn(self) -> SearchHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(self.session.snapshot());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(command_rx, state_tx, notice_tx));

        SearchHandle {
            commands: command_tx,
            state: state_rx,
            notices: notice_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SearchCommand>,
        state: watch::Sender<PageState<Repository>>,
        notices: mpsc::UnboundedSender<Notice>,
    ) {
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();

        loop {
            let deadline = self.session.debounce_deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SearchCommand::Input(text)) => {
                        self.session.input(text, Instant::now());
                    }
                    Some(SearchCommand::EndReached) => {
                        if let Some(request) = self.session.handle(SearchEvent::PageRequested) {
                            in_flight.push(self.dispatch(request));
                        }
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(request) = self.session.poll_debounce(Instant::now()) {
                        in_flight.push(self.dispatch(request));
                    }
                }
                Some((request, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.session.handle(SearchEvent::FetchCompleted(request, outcome));
                }
            }

            for notice in self.session.take_notices() {
                // Nobody listening is fine; notices are best effort
                let _ = notices.send(notice);
            }

            let snapshot = self.session.snapshot();
            state.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot;
                    true
                }
            });
        }

        debug!("Search controller stopped with {} fetches in flight", in_flight.len());
    }

    fn dispatch(&self, request: SearchRequest) -> InFlight {
        let api = Arc::clone(&self.api);
        Box::pin(async move {
            let outcome = request.execute(api.as_ref()).await;
            (request, outcome)
        })
    }
}

impl SearchHandle {
    /// Feed raw search-box text. Returns false once the controller is gone.
    pub fn input(&self, text: impl Into<String>) -> bool {
        self.commands.send(SearchCommand::Input(text.into())).is_ok()
    }

    pub fn end_reached(&self) -> bool {
        self.commands.send(SearchCommand::EndReached).is_ok()
    }

    /// Latest published state
    pub fn current(&self) -> PageState<Repository> {
        self.state.borrow().clone()
    }

    /// Watch for state changes
    pub fn subscribe(&self) -> watch::Receiver<PageState<Repository>> {
        self.state.clone()
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Stop the controller and wait for it
    pub async fn shutdown(self) {
        let SearchHandle {
            commands, task, ..
        } = self;
        drop(commands);
        let _ = task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contributor, Page};
    use crate::test_support::repos;
    use crate::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Answers every query with a full page of ids starting at the query's
    /// base, after that query's latency.
    #[derive(Default)]
    struct FakeApi {
        bases: HashMap<&'static str, u64>,
        latency: HashMap<&'static str, Duration>,
        rate_limited_pages: Vec<u32>,
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RepositoryApi for FakeApi {
        async fn search_repositories(
            &self,
            query: &str,
            page: u32,
            per_page: u32,
        ) -> Result<Page<Repository>> {
            self.calls.lock().unwrap().push((query.to_string(), page));
            if let Some(delay) = self.latency.get(query) {
                sleep(*delay).await;
            }
            if self.rate_limited_pages.contains(&page) {
                return Err(Error::RateLimitExceeded { retry_after: None });
            }
            let base = self.bases.get(query).copied().unwrap_or(1);
            let first = base + u64::from((page - 1) * per_page);
            Ok(Page::new(repos(first, per_page as usize)))
        }

        async fn list_contributors(
            &self,
            _owner: &str,
            _repo: &str,
            _page: u32,
            _per_page: u32,
        ) -> Result<Page<Contributor>> {
            Ok(Page::new(Vec::new()))
        }
    }

    fn spawn(api: Arc<FakeApi>) -> SearchHandle {
        let session = SearchSession::new(10, Duration::from_millis(500));
        SearchController::new(api, session).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_typing_fetches_once_after_quiet_period() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn(api.clone());

        handle.input("r");
        sleep(Duration::from_millis(150)).await;
        handle.input("ru");
        sleep(Duration::from_millis(150)).await;
        handle.input("rust");

        sleep(Duration::from_millis(499)).await;
        assert!(api.calls().is_empty());

        let mut state = handle.subscribe();
        state.wait_for(|s| !s.items.is_empty()).await.unwrap();

        assert_eq!(api.calls(), vec![("rust".to_string(), 1)]);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(api.calls().len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_result_for_old_query_is_dropped() {
        let mut api = FakeApi::default();
        api.bases.insert("slow", 100);
        api.bases.insert("fast", 200);
        api.latency.insert("slow", Duration::from_millis(1000));
        api.latency.insert("fast", Duration::from_millis(10));
        let api = Arc::new(api);
        let handle = spawn(api.clone());

        handle.input("slow");
        sleep(Duration::from_millis(600)).await;
        handle.input("fast");
        sleep(Duration::from_millis(2000)).await;

        let state = handle.current();
        assert_eq!(api.calls().len(), 2);
        assert!(!state.loading);
        assert_eq!(state.items.len(), 10);
        assert!(state.items.iter().all(|r| (200..210).contains(&r.id)));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_reached_appends_next_page() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn(api.clone());
        let mut state = handle.subscribe();

        handle.input("rust");
        state.wait_for(|s| s.items.len() == 10).await.unwrap();

        handle.end_reached();
        state.wait_for(|s| s.items.len() == 20).await.unwrap();

        let current = handle.current();
        assert_eq!(current.page, 2);
        assert!(!current.loading_more);
        assert_eq!(api.calls(), vec![("rust".to_string(), 1), ("rust".to_string(), 2)]);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_forwarded_as_notice() {
        let api = Arc::new(FakeApi {
            rate_limited_pages: vec![2],
            ..FakeApi::default()
        });
        let mut handle = spawn(api.clone());
        let mut state = handle.subscribe();

        handle.input("rust");
        state.wait_for(|s| s.items.len() == 10).await.unwrap();
        handle.end_reached();

        let notice = handle.next_notice().await.unwrap();
        assert_eq!(notice.message(), "Rate limit exceeded");

        let current = handle.current();
        assert_eq!(current.items.len(), 10);
        assert!(current.has_more);
        assert!(!current.loading_more);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_the_box_empties_results_without_fetching() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn(api.clone());
        let mut state = handle.subscribe();

        handle.input("rust");
        state.wait_for(|s| s.items.len() == 10).await.unwrap();

        handle.input("");
        state.wait_for(|s| s.items.is_empty()).await.unwrap();

        assert_eq!(api.calls().len(), 1);
        handle.shutdown().await;
    }
}
