//! liquidfn CLI - Main Entry Point
//!
//! Deploys a Liquid snippet to a Shopify theme, renders the scenarios of a
//! test entry through throwaway page templates, prints the results and
//! removes everything it created.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use liquidfn_cli::assets::ThemeAssets;
use liquidfn_cli::client::ShopifyClient;
use liquidfn_cli::config::CliConfig;
use liquidfn_cli::fetch::HttpFetcher;
use liquidfn_cli::output::{self, OutputFormat};
use liquidfn_harness::{observe, CaseSpec, Collaborators, FsTemplateLoader, TestRun};

/// Exit code when setup (or anything before it) fails
const EXIT_FATAL: i32 = 2;
/// Exit code when the run or teardown fails
const EXIT_FAILED: i32 = 1;

/// liquidfn - end-to-end tests for Shopify Liquid snippets
#[derive(Parser)]
#[command(name = "liquidfn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Test entry: <tests-dir>/<entry>.liquid is the snippet,
    /// <tests-dir>/<entry>.yaml the scenarios
    entry: String,

    /// Configuration file path
    #[arg(short, long, default_value = "liquidfn.toml")]
    config: PathBuf,

    /// Shop domain, e.g. demo.myshopify.com
    #[arg(long, env = "SHOPIFY_SHOP")]
    shop: Option<String>,

    /// Admin API access token
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Theme to deploy fixtures into
    #[arg(long, env = "SHOPIFY_THEME_ID")]
    theme_id: Option<u64>,

    /// Directory holding test entries
    #[arg(long)]
    tests_dir: Option<PathBuf>,

    /// Delay before the first fetch of each render (ms)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Deadline for each render fetch (ms)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Indent JSON output by this many spaces
    #[arg(long)]
    pretty: Option<usize>,

    /// Omit the passed/failed totals
    #[arg(long)]
    no_overall: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit non-zero when any assertion failed
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for results
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new(log_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = CliConfig::load(&cli.config)?;
    if let Some(shop) = cli.shop {
        config.harness.shop = shop;
    }
    if let Some(token) = cli.token {
        config.shopify.access_token = Some(token);
    }
    if let Some(theme_id) = cli.theme_id {
        config.shopify.theme_id = Some(theme_id);
    }
    if let Some(dir) = cli.tests_dir {
        config.harness.tests_dir = dir;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.harness.render.delay_ms = delay_ms;
    }
    if cli.timeout_ms.is_some() {
        config.harness.render.timeout_ms = cli.timeout_ms;
    }

    config.harness.validate()?;
    let theme_id = config
        .shopify
        .theme_id
        .context("missing theme ID (--theme-id or SHOPIFY_THEME_ID)")?;
    let token = config
        .shopify
        .access_token
        .as_deref()
        .context("missing access token (--token or SHOPIFY_ACCESS_TOKEN)")?;

    let case_path = config.harness.case_path(&cli.entry);
    let case = CaseSpec::from_file(&case_path)
        .with_context(|| format!("loading test case {}", case_path.display()))?;

    let client = ShopifyClient::new(&config.harness.shop, token, &config.shopify.api_version)?;
    let collaborators = Collaborators {
        deployer: Arc::new(ThemeAssets::new(
            client,
            theme_id,
            config.harness.base_name.clone(),
        )?),
        fetcher: Arc::new(HttpFetcher::new()?),
        loader: Arc::new(FsTemplateLoader::new(config.harness.tests_dir.clone())),
    };

    info!(
        "Running '{}' ({} scenario(s)) against {}",
        case.name,
        case.scenarios.len(),
        config.harness.shop
    );

    let mut test = TestRun::new(cli.entry, config.harness, collaborators);
    observe::attach_logger(test.bus())?;

    let report = match test.execute(&case).await {
        Ok(report) => report,
        Err(e) => {
            output::print_error(&e.to_string());
            return Ok(EXIT_FATAL);
        }
    };

    let presenter = output::presenter(cli.format, cli.pretty, !cli.no_overall, !cli.no_color);
    println!("{}", test.present(presenter.as_ref())?);

    if let Some(e) = &report.run_error {
        output::print_error(&e.to_string());
    }
    if let Some(e) = &report.teardown_error {
        output::print_error(&e.to_string());
    }
    if !report.is_clean() {
        return Ok(EXIT_FAILED);
    }

    let failures = test.tracker().lock().failures().total;
    if failures > 0 {
        output::print_warning(&format!("{failures} assertion(s) failed"));
        if cli.strict {
            return Ok(EXIT_FAILED);
        }
    } else {
        output::print_success(&format!("Deleted {} render target(s)", report.deleted.len()));
    }

    Ok(0)
}
