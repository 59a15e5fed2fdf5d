use anyhow::{bail, Context};
use clap::Parser;
use repodeck_api::RetryConfig;
use repodeck_core::{
    models::parse_full_name, Config, ContributorSession, FavoritesStore, GitHubProvider,
    PageState, Repository, RepositoryApi, SearchController, SearchSession, ThemePreference,
    ThemeStore,
};
use repodeck_store::{KeyValueStore, SqliteStore};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "repodeck")]
#[command(version, long_about = None)]
#[command(about = "Search GitHub repositories and keep a list of favorites")]
struct Cli {
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// API base URL (GitHub Enterprise)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// SQLite file holding favorites and the theme
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search for repositories
    Search {
        /// Search query
        query: String,
        /// How many pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Interactive search: each line typed is the new query text
    Browse,
    /// Show repository details
    Show {
        /// Repository name (owner/repo)
        name: String,
        /// Add to favorites, or remove if it already is one
        #[arg(long)]
        toggle_favorite: bool,
    },
    /// List the contributors of a repository
    Contributors {
        /// Repository name (owner/repo)
        name: String,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Manage favorite repositories
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show or change the theme
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
}

#[derive(clap::Subcommand)]
enum FavoritesAction {
    List,
    /// Look a repository up and add it
    Add {
        /// Repository name (owner/repo)
        name: String,
    },
    /// Remove by repository id
    Remove { id: u64 },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ThemeAction {
    Light,
    Dark,
    Toggle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so listings on stdout stay clean
    let default_filter = if cli.verbose { "repodeck=debug" } else { "repodeck=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(token) = cli.token {
        config.github.token = Some(token);
    }
    if let Some(api_url) = cli.api_url {
        config.github.api_url = api_url;
    }
    if let Some(store) = cli.store {
        config.storage.path = Some(store);
    }

    let store_path = config.store_path()?;
    tracing::debug!("Using store at {}", store_path.display());
    let store = SqliteStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

    match cli.command {
        Commands::Search { query, pages } => {
            let provider = provider(&config)?;
            search(&config, &provider, &store, &query, pages).await?;
        }
        Commands::Browse => {
            let provider = Arc::new(provider(&config)?);
            browse(&config, provider, &store).await?;
        }
        Commands::Show {
            name,
            toggle_favorite,
        } => {
            let provider = provider(&config)?;
            let repo = find_repository(&provider, &name).await?;
            let mut favorites = FavoritesStore::load(&store);
            print!("{}", show(&repo, &mut favorites, toggle_favorite)?);
        }
        Commands::Contributors { name, pages } => {
            let provider = provider(&config)?;
            contributors(&config, &provider, &name, pages).await?;
        }
        Commands::Favorites { action } => {
            favorites(&config, &store, action).await?;
        }
        Commands::Theme { action } => {
            let theme = ThemeStore::load(&store);
            match action {
                Some(ThemeAction::Light) => theme.set(ThemePreference::Light)?,
                Some(ThemeAction::Dark) => theme.set(ThemePreference::Dark)?,
                Some(ThemeAction::Toggle) => {
                    theme.toggle()?;
                }
                None => {}
            }
            println!("{}", theme.current());
        }
    }

    Ok(())
}

fn provider(config: &Config) -> anyhow::Result<GitHubProvider> {
    let retry = RetryConfig::from(&config.retry);
    Ok(GitHubProvider::from_config(&config.github, retry)?)
}

async fn search(
    config: &Config,
    provider: &GitHubProvider,
    store: &SqliteStore,
    query: &str,
    pages: u32,
) -> anyhow::Result<()> {
    let favorites = FavoritesStore::load(store);
    let mut session = SearchSession::from_config(&config.search);

    session.search(provider, query).await;
    for _ in 1..pages {
        if session.load_more(provider).await.is_none() {
            break;
        }
    }

    for notice in session.take_notices() {
        eprintln!("{}", notice);
    }

    print!("{}", search_results(&session.snapshot(), &favorites)?);
    Ok(())
}

/// A failed first page is a failed command rather than a listing
fn search_results<S: KeyValueStore>(
    state: &PageState<Repository>,
    favorites: &FavoritesStore<S>,
) -> anyhow::Result<String> {
    if let Some(error) = &state.error {
        bail!("{}", error);
    }
    Ok(render_repositories(state, favorites))
}

async fn browse(
    config: &Config,
    provider: Arc<GitHubProvider>,
    store: &SqliteStore,
) -> anyhow::Result<()> {
    let mut favorites = FavoritesStore::load(store);
    let session = SearchSession::from_config(&config.search);
    let mut handle = SearchController::new(provider, session).spawn();
    let mut state = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type to search. :more loads more, :fav <n> toggles a favorite, :quit exits.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match BrowseInput::parse(&line) {
                    BrowseInput::Quit => break,
                    BrowseInput::More => {
                        handle.end_reached();
                    }
                    BrowseInput::Favorite(number) => {
                        let current = handle.current();
                        match number.checked_sub(1).and_then(|i| current.items.get(i)) {
                            Some(repo) => {
                                let now = favorites.toggle(repo)?;
                                let verb = if now { "Added" } else { "Removed" };
                                println!("{} {}", verb, repo.full_name);
                            }
                            None => println!("No result #{}", number),
                        }
                    }
                    BrowseInput::Invalid(reason) => println!("{}", reason),
                    BrowseInput::Query(text) => {
                        handle.input(text);
                    }
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                print!("{}", render_repositories(&snapshot, &favorites));
            }
            Some(notice) = handle.next_notice() => {
                eprintln!("{}", notice);
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

async fn contributors(
    config: &Config,
    provider: &GitHubProvider,
    name: &str,
    pages: u32,
) -> anyhow::Result<()> {
    let Some((owner, repo)) = parse_full_name(name) else {
        bail!("Expected owner/repo, got '{}'", name);
    };

    let mut session =
        ContributorSession::open(provider, owner, repo, config.contributors.page_size).await;
    for _ in 1..pages {
        if session.load_more(provider).await.is_none() {
            break;
        }
    }

    for notice in session.take_notices() {
        eprintln!("{}", notice);
    }

    let state = session.snapshot();
    if let Some(error) = &state.error {
        bail!("{}", error);
    }

    println!("Contributors of {}/{}", session.owner(), session.repo());
    for (index, contributor) in state.items.iter().enumerate() {
        println!(
            "{:>4}. {:<24} {:>6} commits  [{}]",
            index + 1,
            contributor.login,
            contributor.contributions,
            contributor.list_key(index)
        );
    }
    if state.has_more {
        println!("(more available, use --pages)");
    }
    Ok(())
}

async fn favorites(
    config: &Config,
    store: &SqliteStore,
    action: FavoritesAction,
) -> anyhow::Result<()> {
    let mut favorites = FavoritesStore::load(store);

    match action {
        FavoritesAction::List => print!("{}", render_favorites(&favorites)),
        FavoritesAction::Add { name } => {
            let provider = provider(config)?;
            let repo = find_repository(&provider, &name).await?;
            if favorites.add(repo.clone())? {
                println!("Added {}", repo.full_name);
            } else {
                println!("{} is already a favorite", repo.full_name);
            }
        }
        FavoritesAction::Remove { id } => {
            let name = favorites.get(id).map(|repo| repo.full_name.clone());
            if favorites.remove(id)? {
                println!("Removed {}", name.unwrap_or_else(|| id.to_string()));
            } else {
                println!("{} was not a favorite", id);
            }
        }
    }

    Ok(())
}

/// Exact lookup through the search endpoint
async fn find_repository(provider: &GitHubProvider, name: &str) -> anyhow::Result<Repository> {
    let Some((owner, repo)) = parse_full_name(name) else {
        bail!("Expected owner/repo, got '{}'", name);
    };
    let full_name = format!("{}/{}", owner, repo);

    let page = provider
        .search_repositories(&format!("repo:{}", full_name), 1, 5)
        .await?;

    page.items
        .into_iter()
        .find(|r| r.full_name.eq_ignore_ascii_case(&full_name))
        .with_context(|| format!("Repository {} not found", full_name))
}

/// Detail view; flips the favorite first when asked to
fn show<S: KeyValueStore>(
    repo: &Repository,
    favorites: &mut FavoritesStore<S>,
    toggle_favorite: bool,
) -> anyhow::Result<String> {
    if toggle_favorite {
        favorites.toggle(repo)?;
    }

    let favorite = if favorites.is_favorite(repo.id) { "yes" } else { "no" };
    let mut out = String::new();
    let _ = writeln!(out, "{}", repo.full_name);
    let _ = writeln!(out, "  Id:           {}", repo.id);
    let _ = writeln!(out, "  Name:         {}", repo.name);
    let _ = writeln!(out, "  Owner:        {} ({})", repo.owner.login, repo.owner.avatar_url);
    let _ = writeln!(out, "  Description:  {}", repo.description.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  Stars:        {}", repo.stars);
    let _ = writeln!(out, "  Forks:        {}", repo.forks);
    let _ = writeln!(out, "  Language:     {}", repo.language.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  Updated:      {}", repo.updated_at.format("%Y-%m-%d"));
    let _ = writeln!(out, "  URL:          {}", repo.url);
    let _ = writeln!(out, "  Favorite:     {}", favorite);
    let _ = writeln!(out, "  Contributors: repodeck contributors {}", repo.full_name);
    Ok(out)
}

fn render_repositories<S: KeyValueStore>(
    state: &PageState<Repository>,
    favorites: &FavoritesStore<S>,
) -> String {
    if state.loading {
        return "Searching...\n".to_string();
    }
    if let Some(error) = &state.error {
        return format!("{}\n", error);
    }

    let mut out = String::new();
    for (index, repo) in state.items.iter().enumerate() {
        let marker = if favorites.is_favorite(repo.id) { '*' } else { ' ' };
        let _ = writeln!(out, "{:>4}. {} {}", index + 1, marker, describe(repo));
    }
    if state.loading_more {
        out.push_str("Loading more...\n");
    } else if state.has_more {
        out.push_str("(more available)\n");
    }
    out
}

fn render_favorites<S: KeyValueStore>(favorites: &FavoritesStore<S>) -> String {
    if favorites.is_empty() {
        return "No favorites yet\n".to_string();
    }

    let mut out = format!("Favorites: {}\n", favorites.len());
    for repo in favorites.items() {
        let _ = writeln!(out, "{:>12}  {}", repo.id, describe(repo));
    }
    out
}

fn describe(repo: &Repository) -> String {
    format!(
        "{:<40} {:>7} stars  {:<12} updated {}",
        repo.full_name,
        repo.stars,
        repo.language.as_deref().unwrap_or("-"),
        repo.updated_at.format("%Y-%m-%d")
    )
}

/// One line typed into `browse`
#[derive(Debug, PartialEq, Eq)]
enum BrowseInput {
    Query(String),
    More,
    Favorite(usize),
    Invalid(String),
    Quit,
}

impl BrowseInput {
    fn parse(line: &str) -> Self {
        let Some(command) = line.trim().strip_prefix(':') else {
            return BrowseInput::Query(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "q"), None) => BrowseInput::Quit,
            (Some("more"), None) => BrowseInput::More,
            (Some("fav"), Some(n)) => match n.parse() {
                Ok(number) => BrowseInput::Favorite(number),
                Err(_) => BrowseInput::Invalid(format!("Not a result number: {}", n)),
            },
            _ => BrowseInput::Invalid(format!("Unknown command: :{}", command)),
        }
    }
}
