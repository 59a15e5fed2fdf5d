// Paged list sessions and the task that drives search
pub mod contributors;
pub mod controller;
pub mod debounce;
pub mod pagination;
pub mod search;

pub use contributors::{ContributorRequest, ContributorSession};
pub use controller::{SearchCommand, SearchController, SearchHandle};
pub use debounce::Debouncer;
pub use pagination::{
    Applied, FetchKind, FetchOutcome, Messages, Notice, PageState, PageTicket, Paginator, Phase,
};
pub use search::{SearchEvent, SearchRequest, SearchSession};
