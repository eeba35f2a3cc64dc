#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use clap::{Args, Parser, Subcommand};
use portal_router::portal;
use portal_router::{
    ConfigError, History, NavigationIntent, Page, RenderTarget, Resolution, Router, RouterError, RouteTableError,
    RoutingConfig, SessionState, SessionStore,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid route table: {0}")]
    Table(#[from] RouteTableError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-routes", about = "Inspect and simulate course portal navigation")]
struct Cli {
    /// Override the unauthenticated entry point (also `PORTAL_LOGIN_PATH`).
    #[arg(long)]
    login_path: Option<String>,

    /// Override the default landing page (also `PORTAL_LANDING_PATH`).
    #[arg(long)]
    landing_path: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List declared routes in match order.
    Table,
    /// Resolve paths against a session state.
    Resolve(ResolveArgs),
    /// Replay a navigation sequence through the router and a history model.
    Walk(WalkArgs),
}

#[derive(Args, Debug)]
struct ResolveArgs {
    #[arg(required = true)]
    paths: Vec<String>,

    #[arg(long, env = "PORTAL_SESSION", default_value = "unauthenticated")]
    session: SessionState,

    /// Follow redirects to the final target.
    #[arg(long)]
    follow: bool,
}

#[derive(Args, Debug)]
struct WalkArgs {
    #[arg(required = true)]
    paths: Vec<String>,

    #[arg(long, default_value = "/")]
    start: String,

    #[arg(long, env = "PORTAL_SESSION", default_value = "pending")]
    session: SessionState,

    /// Session state the provider reports after all paths were requested.
    #[arg(long)]
    resolve_to: Option<SessionState>,
}

#[derive(Debug, Serialize)]
struct RouteRow {
    pattern: String,
    visibility: String,
    chrome: Vec<String>,
    target: String,
}

#[derive(Debug, Serialize)]
struct WalkReport {
    steps: Vec<Resolution<Page>>,
    history: Vec<String>,
    current: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "portal-routes failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.login_path, cli.landing_path)?;
    tracing::debug!(login = %config.login_path, landing = %config.landing_path, "config loaded");
    let mut router = portal::router(&config)?;

    match cli.command {
        Command::Table => {
            let rows = table_rows(&router);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    let chrome = if row.chrome.is_empty() { "-".to_owned() } else { row.chrome.join(">") };
                    println!("{:<14} {:<10} {:<6} {}", row.pattern, row.visibility, chrome, row.target);
                }
            }
        }
        Command::Resolve(args) => {
            for path in &args.paths {
                let chain = if args.follow {
                    router.follow(path, &args.session)?
                } else {
                    vec![router.resolve(path, &args.session)]
                };
                if cli.json {
                    println!("{}", serde_json::to_string(&chain)?);
                } else {
                    let text: Vec<_> = chain.iter().map(describe).collect();
                    println!("{}", text.join("  =>  "));
                }
            }
        }
        Command::Walk(args) => {
            let report = walk(&mut router, &config, &args)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for step in &report.steps {
                    println!("{}", describe(step));
                }
                println!("history: {}", report.history.join(" | "));
                println!("current: {}", report.current);
            }
        }
    }
    Ok(())
}

/// Environment config, with command-line flags taking precedence.
fn load_config(login_path: Option<String>, landing_path: Option<String>) -> Result<RoutingConfig, ConfigError> {
    if login_path.is_none() && landing_path.is_none() {
        return RoutingConfig::from_env();
    }
    let overrides = [("PORTAL_LOGIN_PATH", login_path), ("PORTAL_LANDING_PATH", landing_path)];
    RoutingConfig::from_lookup(|key| {
        overrides
            .iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, value)| value.clone())
            .or_else(|| std::env::var(key).ok())
    })
}

fn table_rows(router: &Router<Page>) -> Vec<RouteRow> {
    let table = router.table();
    table
        .routes()
        .chain(std::iter::once(table.fallback()))
        .map(|route| RouteRow {
            pattern: route.pattern(),
            visibility: route.visibility.to_string(),
            chrome: route.layouts.iter().map(ToString::to_string).collect(),
            target: match &route.target {
                portal_router::Target::Page(page) => page.title().to_owned(),
                portal_router::Target::Redirect(to) => format!("redirect {to}"),
            },
        })
        .collect()
}

fn describe(resolution: &Resolution<Page>) -> String {
    let verb = if resolution.intent.replace { "replace" } else { "push" };
    let outcome = match &resolution.target {
        RenderTarget::Page(composed) if composed.has_chrome() => {
            let chrome: Vec<_> = composed.chrome.iter().map(ToString::to_string).collect();
            format!("{} [{}]", composed.body, chrome.join(">"))
        }
        RenderTarget::Page(composed) => composed.body.to_string(),
        RenderTarget::Redirect(intent) => format!("redirect {} (replace={})", intent.path, intent.replace),
        RenderTarget::Suspended { .. } => "suspended (session pending)".to_owned(),
    };
    format!("{verb} {} ({} {}) -> {outcome}", resolution.intent.path, resolution.visibility, resolution.pattern)
}

/// Replay `args.paths`, following redirects like a browser host would.
fn walk(router: &mut Router<Page>, config: &RoutingConfig, args: &WalkArgs) -> Result<WalkReport, CliError> {
    let session = SessionStore::new();
    session.set(args.session);
    let mut history = History::new(&args.start);
    let mut steps = Vec::new();

    for path in &args.paths {
        let resolution = router.navigate(NavigationIntent::push(path.clone()), &session);
        history.apply(&resolution.intent);
        settle(router, config, &session, &mut history, &mut steps, resolution)?;
    }

    if let Some(next) = args.resolve_to {
        session.set(next);
        let resumed = router.resume(&session);
        // Only the latest resumed navigation is rendered; earlier ones are
        // reported but their redirects are not applied.
        let count = resumed.len();
        for (i, resolution) in resumed.into_iter().enumerate() {
            if i + 1 == count {
                settle(router, config, &session, &mut history, &mut steps, resolution)?;
            } else {
                steps.push(resolution);
            }
        }
    }

    Ok(WalkReport { current: history.current().to_owned(), history: history.entries().to_vec(), steps })
}

/// Record `resolution` and follow any redirect chain it starts.
fn settle(
    router: &mut Router<Page>,
    config: &RoutingConfig,
    session: &SessionStore,
    history: &mut History,
    steps: &mut Vec<Resolution<Page>>,
    resolution: Resolution<Page>,
) -> Result<(), CliError> {
    let origin = resolution.intent.path.clone();
    let mut next = resolution.target.redirect().cloned();
    steps.push(resolution);

    let mut hops = 0;
    while let Some(intent) = next {
        hops += 1;
        if hops > config.max_redirect_hops {
            return Err(RouterError::RedirectLoop { path: origin, hops: config.max_redirect_hops }.into());
        }
        history.apply(&intent);
        let resolution = router.navigate(intent, session);
        next = resolution.target.redirect().cloned();
        steps.push(resolution);
    }
    Ok(())
}
