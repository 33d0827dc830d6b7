use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use wodarc_browser::Browser;
use wodarc_common::observability::{init_logging, LogConfig};
use wodarc_config::{WodarcConfig, WodarcConfigLoader};
use wodarc_scrape::{
    AdaptiveLimiter, CrawlSpec, Credentials, EntrySink, Flow, MetaFetcher, ProfileCrawler,
};

use crate::sink::ArchiveSink;

mod sink;

#[derive(Parser)]
#[command(name = "wodarc", about = "Archive workout posts from a public profile")]
struct Cli {
    /// Optional YAML config file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror log events to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the profile and fold new posts into the archive.
    Crawl(CrawlArgs),
    /// One-time migration: re-key every record from its content date.
    Migrate(MigrateArgs),
}

#[derive(Args)]
struct CrawlArgs {
    /// Profile to crawl.
    #[arg(long)]
    username: Option<String>,

    /// Archive file path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Account to log in with.
    #[arg(long, env = "INSTAGRAM_USER")]
    login_user: Option<String>,

    #[arg(long, env = "INSTAGRAM_PASS", hide_env_values = true)]
    login_pass: Option<String>,

    /// Proxy URL for all traffic.
    #[arg(long)]
    proxy: Option<String>,

    #[arg(long)]
    delay_min: Option<f64>,

    #[arg(long)]
    delay_max: Option<f64>,

    /// Cap on posts processed this run.
    #[arg(long)]
    max_posts: Option<u32>,

    /// Skip the newest N posts (pinned announcements).
    #[arg(long)]
    skip_first: Option<u32>,

    /// Stop at the first already-archived post instead of skipping past it.
    #[arg(long)]
    stop_on_existing: bool,

    /// Run the browser with a visible window.
    #[arg(long)]
    headful: bool,

    #[arg(long, value_enum, default_value_t = Engine::Browser)]
    engine: Engine,

    /// Directory for failure screenshots and page dumps.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[derive(Args)]
struct MigrateArgs {
    /// Archive file to migrate in place (a `.bak` copy is written first).
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Full browser session via WebDriver.
    Browser,
    /// Plain HTTP against the public profile feed.
    Api,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig {
        emit_stderr: cli.verbose,
        ..LogConfig::default()
    })?;

    let mut loader = WodarcConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().context("loading configuration")?;

    match cli.command {
        Command::Crawl(args) => crawl(config, args).await,
        Command::Migrate(args) => migrate(config, args),
    }
}

async fn crawl(mut config: WodarcConfig, args: CrawlArgs) -> Result<()> {
    if let Some(username) = args.username {
        config.target.username = username;
    }
    if let Some(output) = &args.output {
        config.target.output = output.display().to_string();
    }
    if let Some(min) = args.delay_min {
        config.crawl.min_delay_secs = min;
    }
    if let Some(max) = args.delay_max {
        config.crawl.max_delay_secs = max;
    }
    if let Some(max_posts) = args.max_posts {
        config.crawl.max_posts = Some(max_posts);
    }
    if let Some(skip) = args.skip_first {
        config.crawl.skip_first = skip;
    }
    if args.stop_on_existing {
        config.crawl.stop_on_existing = true;
    }
    if args.headful {
        config.crawl.headless = false;
    }
    if let Some(proxy) = args.proxy {
        config.proxy = Some(proxy);
    }
    let login = match (args.login_user, args.login_pass) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        (Some(_), None) | (None, Some(_)) => {
            warn!("only one of login user/pass provided, crawling unauthenticated");
            None
        }
        (None, None) => config.login.as_ref().map(|l| Credentials {
            username: l.username.clone(),
            password: l.password.clone(),
        }),
    };

    let output = PathBuf::from(&config.target.output);
    let existing = wodarc_store::load(&output);
    info!(
        username = %config.target.username,
        archive = %output.display(),
        existing = existing.len(),
        "crawl.start"
    );

    let mut sink = ArchiveSink::new(
        output.clone(),
        existing,
        config.boilerplate.clone(),
        config.crawl.stop_on_existing,
    );
    let limiter = AdaptiveLimiter::new(config.crawl.min_delay_secs, config.crawl.max_delay_secs);

    match args.engine {
        Engine::Browser => {
            let mut spec = CrawlSpec::new(config.target.username.clone());
            spec.login = login;
            if let Some(max) = config.crawl.max_posts {
                spec.max_posts = max as usize;
            }
            spec.skip_first = config.crawl.skip_first as usize;
            spec.debug_dir = args
                .debug_dir
                .or_else(|| output.parent().map(PathBuf::from));

            let mut browser =
                Browser::connect(config.crawl.headless, config.proxy.as_deref()).await?;
            let mut crawler = ProfileCrawler::new(spec, limiter);
            let report = crawler.crawl(&mut browser, &mut sink).await;
            browser.close().await?;
            let report = report?;
            info!(
                delivered = report.delivered,
                skipped = report.skipped,
                stopped_early = report.stopped_early,
                "crawl.browser.done"
            );
        }
        Engine::Api => {
            let fetcher = MetaFetcher::new(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                config.proxy.as_deref(),
            )?;
            let entries = fetcher.profile_feed(&config.target.username).await?;
            let take = config
                .crawl
                .max_posts
                .map_or(usize::MAX, |max| max as usize);
            for entry in entries
                .into_iter()
                .skip(config.crawl.skip_first as usize)
                .take(take)
            {
                if sink.accept(entry)? == Flow::Stop {
                    break;
                }
            }
        }
    }

    let summary = sink.finish()?;
    info!(
        new = summary.new_entries,
        skipped_existing = summary.skipped_existing,
        total = summary.total,
        "crawl.done"
    );
    Ok(())
}

fn migrate(config: WodarcConfig, args: MigrateArgs) -> Result<()> {
    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(&config.target.output));

    let store = wodarc_store::load_strict(&path)?;
    let before = store.len();
    let backup = wodarc_store::backup(&path)?;
    info!(backup = %backup.display(), entries = before, "migrate.start");

    let migrated = wodarc_core::rekey(store);
    ensure!(
        migrated.len() == before,
        "migration changed entry count: {before} -> {}",
        migrated.len()
    );

    wodarc_store::save(&path, &migrated)?;
    info!(entries = migrated.len(), "migrate.done");
    Ok(())
}
