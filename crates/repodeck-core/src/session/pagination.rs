//! Page cursor shared by the search and contributor sessions.
//!
//! A [`Paginator`] is a small state machine: `Idle -> Loading -> Ready |
//! Failed`, with an orthogonal "loading more" flag for page advances. Every
//! fetch it hands out carries a [`PageTicket`] stamped with the current
//! generation. Starting over bumps the generation, and any ticket from an
//! older generation is ignored when its result finally shows up.

use tracing::{debug, warn};

use crate::{models::Page, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing asked for yet (or the query was cleared)
    Idle,
    /// First page in flight
    Loading,
    /// Items are what the last successful fetch said
    Ready,
    /// First page failed; `error` says why
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    NextPage,
}

/// Identifies one dispatched fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub generation: u64,
    pub page: u32,
    pub per_page: u32,
    pub kind: FetchKind,
}

/// What came back from the remote side, already classified
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Succeeded(Page<T>),
    RateLimited { retry_after: Option<u64> },
    Failed(String),
}

impl<T> From<Result<Page<T>>> for FetchOutcome<T> {
    fn from(result: Result<Page<T>>) -> Self {
        match result {
            Ok(page) => FetchOutcome::Succeeded(page),
            Err(Error::RateLimitExceeded { retry_after }) => {
                FetchOutcome::RateLimited { retry_after }
            }
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

/// Transient, non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RateLimited {
        message: String,
        retry_after: Option<u64>,
        /// What was being fetched: the query, or `owner/repo`
        subject: Option<String>,
    },
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::RateLimited { message, .. } => message,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Notice::RateLimited { subject, .. } => subject.as_deref(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::RateLimited {
                message,
                retry_after,
                subject,
            } => {
                if let Some(subject) = subject {
                    write!(f, "{}: ", subject)?;
                }
                f.write_str(message)?;
                if let Some(secs) = retry_after {
                    write!(f, " (resets in {}s)", secs)?;
                }
                Ok(())
            }
        }
    }
}

/// How a completed fetch changed the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// First page replaced the items
    Replaced(usize),
    /// A later page was appended
    Appended(usize),
    /// A later page came back empty; no more pages
    Exhausted,
    RateLimited,
    Failed,
    /// Belonged to an older generation (or a fetch nobody is waiting for)
    Stale,
}

/// User-facing strings, per session kind
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub failed: &'static str,
    pub rate_limited: &'static str,
}

/// Read-only view handed to whoever renders the list
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
    pub has_more: bool,
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            loading: false,
            loading_more: false,
            error: None,
            has_more: false,
        }
    }
}

#[derive(Debug)]
pub struct Paginator<T> {
    page_size: u32,
    page: u32,
    items: Vec<T>,
    has_more: bool,
    phase: Phase,
    loading_more: bool,
    error: Option<String>,
    generation: u64,
    /// Total reported by the remote side for the current generation
    total: Option<u64>,
    /// Hard ceiling on reachable results, whatever the total says
    result_cap: Option<u64>,
    notices: Vec<Notice>,
    messages: Messages,
}

impl<T> Paginator<T> {
    pub fn new(page_size: u32, messages: Messages) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
            items: Vec::new(),
            has_more: false,
            phase: Phase::Idle,
            loading_more: false,
            error: None,
            generation: 0,
            total: None,
            result_cap: None,
            notices: Vec::new(),
            messages,
        }
    }

    /// Stop paging once this many items are listed
    pub fn with_result_cap(mut self, cap: u64) -> Self {
        self.result_cap = Some(cap);
        self
    }

    /// Forget everything and go idle. In-flight fetches become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.total = None;
        self.page = 1;
        self.has_more = false;
        self.phase = Phase::Idle;
        self.loading_more = false;
        self.error = None;
    }

    /// Start a new generation and ask for its first page.
    ///
    /// Items are kept until the first page lands so the list doesn't
    /// flash empty between queries.
    pub fn begin(&mut self) -> PageTicket {
        self.generation += 1;
        self.phase = Phase::Loading;
        self.loading_more = false;
        self.error = None;

        PageTicket {
            generation: self.generation,
            page: 1,
            per_page: self.page_size,
            kind: FetchKind::Initial,
        }
    }

    /// Ask for the page after the current one, if that makes sense right now.
    ///
    /// At most one page advance is in flight at a time, and none while the
    /// first page is still loading.
    pub fn begin_next(&mut self) -> Option<PageTicket> {
        if self.phase != Phase::Ready || self.loading_more || !self.has_more {
            return None;
        }

        self.loading_more = true;
        Some(PageTicket {
            generation: self.generation,
            page: self.page + 1,
            per_page: self.page_size,
            kind: FetchKind::NextPage,
        })
    }

    pub fn apply(&mut self, ticket: PageTicket, outcome: FetchOutcome<T>) -> Applied {
        if ticket.generation != self.generation {
            debug!(
                "Dropping page {} from generation {} (now at {})",
                ticket.page, ticket.generation, self.generation
            );
            return Applied::Stale;
        }

        match ticket.kind {
            FetchKind::Initial => self.apply_initial(outcome),
            FetchKind::NextPage => self.apply_next(ticket, outcome),
        }
    }

    fn apply_initial(&mut self, outcome: FetchOutcome<T>) -> Applied {
        if self.phase != Phase::Loading {
            return Applied::Stale;
        }

        match outcome {
            FetchOutcome::Succeeded(page) => {
                let count = page.items.len();
                self.items = page.items;
                self.total = page.total_count;
                self.page = 1;
                self.has_more = self.more_after(count);
                self.phase = Phase::Ready;
                Applied::Replaced(count)
            }
            FetchOutcome::RateLimited { retry_after } => {
                self.notify_rate_limited(retry_after);
                // Whatever is on screen belongs to an earlier query; paging
                // on from it would splice two result sets together.
                self.has_more = false;
                self.phase = Phase::Ready;
                Applied::RateLimited
            }
            FetchOutcome::Failed(reason) => {
                warn!("First page failed: {}", reason);
                self.items.clear();
                self.has_more = false;
                self.error = Some(self.messages.failed.to_string());
                self.phase = Phase::Failed;
                Applied::Failed
            }
        }
    }

    fn apply_next(&mut self, ticket: PageTicket, outcome: FetchOutcome<T>) -> Applied {
        if !self.loading_more {
            return Applied::Stale;
        }
        self.loading_more = false;

        match outcome {
            FetchOutcome::Succeeded(page) if page.items.is_empty() => {
                self.has_more = false;
                Applied::Exhausted
            }
            FetchOutcome::Succeeded(page) => {
                let count = page.items.len();
                self.items.extend(page.items);
                self.total = page.total_count.or(self.total);
                self.page = ticket.page;
                self.has_more = self.more_after(count);
                Applied::Appended(count)
            }
            FetchOutcome::RateLimited { retry_after } => {
                self.notify_rate_limited(retry_after);
                Applied::RateLimited
            }
            FetchOutcome::Failed(reason) => {
                // Next end-of-list trigger simply tries again
                warn!("Fetching page {} failed: {}", ticket.page, reason);
                Applied::Failed
            }
        }
    }

    /// A full page hints at another one, unless the listed items already
    /// reach the reported total or the result cap.
    fn more_after(&self, count: usize) -> bool {
        if count != self.page_size as usize {
            return false;
        }

        let ceiling = match (self.total, self.result_cap) {
            (Some(total), Some(cap)) => Some(total.min(cap)),
            (total, cap) => total.or(cap),
        };
        ceiling.map_or(true, |limit| (self.items.len() as u64) < limit)
    }

    fn notify_rate_limited(&mut self, retry_after: Option<u64>) {
        warn!("Rate limited by the remote API");
        self.notices.push(Notice::RateLimited {
            message: self.messages.rate_limited.to_string(),
            retry_after,
            subject: None,
        });
    }

    /// Attach `subject` to notices that don't name one yet
    pub fn label_notices(&mut self, subject: &str) {
        for notice in &mut self.notices {
            let Notice::RateLimited { subject: slot, .. } = notice;
            if slot.is_none() {
                *slot = Some(subject.to_string());
            }
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl<T: Clone> Paginator<T> {
    pub fn snapshot(&self) -> PageState<T> {
        PageState {
            items: self.items.clone(),
            page: self.page,
            loading: self.is_loading(),
            loading_more: self.loading_more,
            error: self.error.clone(),
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fetched;

    const MESSAGES: Messages = Messages {
        failed: "Failed to fetch things",
        rate_limited: "Rate limit exceeded",
    };

    fn numbers(from: u32, count: u32) -> Vec<u32> {
        (from..from + count).collect()
    }

    fn ready(page_size: u32, first_page: u32) -> Paginator<u32> {
        let mut pager = Paginator::new(page_size, MESSAGES);
        let ticket = pager.begin();
        pager.apply(ticket, fetched(numbers(0, first_page)));
        pager
    }

    #[test]
    fn test_initial_full_page_expects_more() {
        let pager = ready(10, 10);
        assert_eq!(pager.phase(), Phase::Ready);
        assert!(pager.has_more());
        assert_eq!(pager.page(), 1);
        assert!(!pager.is_loading());
    }

    #[test]
    fn test_initial_short_or_empty_page_is_the_end() {
        assert!(!ready(10, 7).has_more());
        assert!(!ready(10, 0).has_more());
    }

    #[test]
    fn test_begin_next_requires_ready_and_more() {
        let mut pager: Paginator<u32> = Paginator::new(10, MESSAGES);
        assert!(pager.begin_next().is_none());

        pager.begin();
        assert!(pager.begin_next().is_none(), "first page still loading");

        let mut pager = ready(10, 10);
        let ticket = pager.begin_next().unwrap();
        assert_eq!(ticket.page, 2);
        assert_eq!(ticket.kind, FetchKind::NextPage);
        assert!(pager.is_loading_more());
        assert!(pager.begin_next().is_none(), "one advance at a time");
    }

    #[test]
    fn test_page_advances_only_on_non_empty_page() {
        let mut pager = ready(10, 10);

        let ticket = pager.begin_next().unwrap();
        assert_eq!(pager.apply(ticket, fetched(Vec::new())), Applied::Exhausted);
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.items().len(), 10);
        assert!(!pager.has_more());
        assert!(pager.begin_next().is_none());
    }

    #[test]
    fn test_result_cap_ends_paging_on_a_full_page() {
        let mut pager = Paginator::new(10, MESSAGES).with_result_cap(20);
        let ticket = pager.begin();
        pager.apply(ticket, fetched(numbers(0, 10)));
        assert!(pager.has_more());

        let ticket = pager.begin_next().unwrap();
        assert_eq!(pager.apply(ticket, fetched(numbers(10, 10))), Applied::Appended(10));
        assert!(!pager.has_more());
        assert!(pager.begin_next().is_none());
    }

    #[test]
    fn test_notices_are_labelled_once() {
        let mut pager = ready(10, 10);
        let ticket = pager.begin_next().unwrap();
        pager.apply(ticket, FetchOutcome::RateLimited { retry_after: None });

        pager.label_notices("rust");
        pager.label_notices("zig");

        let notices = pager.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].subject(), Some("rust"));
        assert_eq!(notices[0].to_string(), "rust: Rate limit exceeded");
    }

    #[test]
    fn test_failed_advance_can_be_retried() {
        let mut pager = ready(10, 10);

        let ticket = pager.begin_next().unwrap();
        assert_eq!(pager.apply(ticket, FetchOutcome::Failed("boom".into())), Applied::Failed);
        assert!(pager.error().is_none());
        assert!(!pager.is_loading_more());

        let retry = pager.begin_next().unwrap();
        assert_eq!(retry.page, 2);
        assert_eq!(pager.apply(retry, fetched(numbers(10, 10))), Applied::Appended(10));
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.items(), numbers(0, 20).as_slice());
    }

    #[test]
    fn test_initial_failure_clears_items_and_sets_error() {
        let mut pager = ready(10, 10);

        let ticket = pager.begin();
        assert_eq!(pager.apply(ticket, FetchOutcome::Failed("offline".into())), Applied::Failed);

        assert!(pager.items().is_empty());
        assert_eq!(pager.error(), Some("Failed to fetch things"));
        assert_eq!(pager.phase(), Phase::Failed);
        assert!(!pager.is_loading());
    }

    #[test]
    fn test_initial_rate_limit_keeps_items_and_stops_paging() {
        let mut pager = ready(10, 10);

        let ticket = pager.begin();
        assert_eq!(
            pager.apply(ticket, FetchOutcome::RateLimited { retry_after: Some(5) }),
            Applied::RateLimited
        );

        assert_eq!(pager.items().len(), 10);
        assert!(!pager.has_more());
        assert!(!pager.is_loading());
        assert_eq!(pager.take_notices().len(), 1);
        assert!(pager.take_notices().is_empty());
    }

    #[test]
    fn test_old_generation_is_ignored() {
        let mut pager = ready(10, 10);
        let stale = pager.begin_next().unwrap();

        let fresh = pager.begin();
        assert!(!pager.is_loading_more());
        assert_eq!(pager.apply(stale, fetched(numbers(100, 10))), Applied::Stale);

        assert_eq!(pager.apply(fresh, fetched(numbers(50, 3))), Applied::Replaced(3));
        assert_eq!(pager.items(), &[50, 51, 52]);
    }

    #[test]
    fn test_reset_goes_idle_and_invalidates() {
        let mut pager = ready(10, 10);
        let ticket = pager.begin_next().unwrap();

        pager.reset();
        assert_eq!(pager.phase(), Phase::Idle);
        assert!(pager.items().is_empty());
        assert_eq!(pager.apply(ticket, fetched(numbers(10, 10))), Applied::Stale);
        assert!(pager.items().is_empty());
    }

    #[test]
    fn test_outcome_from_result() {
        let rate: FetchOutcome<u32> = Err(Error::RateLimitExceeded { retry_after: None }).into();
        assert_eq!(rate, FetchOutcome::RateLimited { retry_after: None });

        let failed: FetchOutcome<u32> = Err(Error::ApiError("500".into())).into();
        assert!(matches!(failed, FetchOutcome::Failed(_)));

        let ok: FetchOutcome<u32> = Ok(Page::new(vec![1, 2])).into();
        assert_eq!(ok, FetchOutcome::Succeeded(Page::new(vec![1, 2])));
    }

    #[test]
    fn test_snapshot_mirrors_flags() {
        let mut pager = ready(2, 2);
        pager.begin_next();

        let state = pager.snapshot();
        assert_eq!(state.items, vec![0, 1]);
        assert!(state.loading_more);
        assert!(!state.loading);
        assert!(state.has_more);
    }
}
