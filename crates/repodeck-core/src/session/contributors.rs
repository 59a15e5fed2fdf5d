use tracing::{debug, info};

use super::pagination::{Applied, FetchOutcome, Messages, Notice, PageState, PageTicket, Paginator};
use crate::{api::RepositoryApi, models::Contributor};

const CONTRIBUTOR_MESSAGES: Messages = Messages {
    failed: "Failed to fetch contributors",
    rate_limited: "Rate limit exceeded. Please try again later.",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorRequest {
    pub owner: String,
    pub repo: String,
    pub ticket: PageTicket,
}

impl ContributorRequest {
    pub async fn execute<A: RepositoryApi + ?Sized>(&self, api: &A) -> FetchOutcome<Contributor> {
        info!(
            "Fetching contributors of {}/{} (page {})",
            self.owner, self.repo, self.ticket.page
        );
        api.list_contributors(&self.owner, &self.repo, self.ticket.page, self.ticket.per_page)
            .await
            .into()
    }
}

/// Paged contributor list for one repository
///
/// Same cursor rules as search, minus the debounce: the first page is
/// requested when the session is created. Whether another page exists is
/// guessed from the page being full - the endpoint gives no total.
#[derive(Debug)]
pub struct ContributorSession {
    owner: String,
    repo: String,
    pager: Paginator<Contributor>,
}

impl ContributorSession {
    /// New session plus the first-page fetch it wants run
    pub fn start(
        owner: impl Into<String>,
        repo: impl Into<String>,
        page_size: u32,
    ) -> (Self, ContributorRequest) {
        let mut session = Self {
            owner: owner.into(),
            repo: repo.into(),
            pager: Paginator::new(page_size, CONTRIBUTOR_MESSAGES),
        };
        let ticket = session.pager.begin();
        let request = session.request(ticket);
        (session, request)
    }

    /// Create the session and load its first page
    pub async fn open<A: RepositoryApi + ?Sized>(
        api: &A,
        owner: impl Into<String>,
        repo: impl Into<String>,
        page_size: u32,
    ) -> Self {
        let (mut session, request) = Self::start(owner, repo, page_size);
        let outcome = request.execute(api).await;
        session.complete(request, outcome);
        session
    }

    /// The end of the list was reached
    pub fn request_more(&mut self) -> Option<ContributorRequest> {
        let ticket = self.pager.begin_next()?;
        Some(self.request(ticket))
    }

    pub fn complete(
        &mut self,
        request: ContributorRequest,
        outcome: FetchOutcome<Contributor>,
    ) -> Applied {
        let applied = self.pager.apply(request.ticket, outcome);
        self.pager.label_notices(&format!("{}/{}", request.owner, request.repo));
        debug!(
            "Contributors page {} of {}/{}: {:?}",
            request.ticket.page, self.owner, self.repo, applied
        );
        applied
    }

    pub async fn load_more<A: RepositoryApi + ?Sized>(&mut self, api: &A) -> Option<Applied> {
        let request = self.request_more()?;
        let outcome = request.execute(api).await;
        Some(self.complete(request, outcome))
    }

    fn request(&self, ticket: PageTicket) -> ContributorRequest {
        ContributorRequest {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            ticket,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn contributors(&self) -> &[Contributor] {
        self.pager.items()
    }

    pub fn pager(&self) -> &Paginator<Contributor> {
        &self.pager
    }

    pub fn snapshot(&self) -> PageState<Contributor> {
        self.pager.snapshot()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.pager.take_notices()
    }
}
