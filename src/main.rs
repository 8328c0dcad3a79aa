//! dep-harvester CLI - walk a package's dependency closure into a build manifest

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dep_harvester::config::{CrawlConfig, DEFAULT_PAGE_TEMPLATE};
use dep_harvester::crawl::DependencyWalker;
use dep_harvester::model::SourceKind;
use dep_harvester::scrape::{DependencyClass, HttpFetcher};

#[derive(Parser)]
#[command(name = "dep-harvester")]
#[command(version)]
#[command(about = "Resolve a package's dependency closure into a build manifest", long_about = None)]
struct Cli {
    /// Root package name, expanded through --template
    #[arg(long)]
    pkg: Option<String>,

    /// Root package page URL (overrides --template)
    #[arg(long)]
    url: Option<String>,

    /// Module type: binary packages or upstream source tarballs
    #[arg(long = "type", value_enum, default_value_t = ModuleType::Deb)]
    module_type: ModuleType,

    /// Distribution code name
    #[arg(long, alias = "deb-version", default_value = "bookworm")]
    suite: String,

    /// Architecture of binary packages to download
    #[arg(long, default_value = "amd64")]
    arch: String,

    /// Mirror used for downloading binary packages
    #[arg(long, default_value = "ftp.us.debian.org/debian")]
    mirror: String,

    /// Dependency classes to follow (repeatable or comma-separated)
    #[arg(long = "class", value_delimiter = ',', default_value = "depends")]
    classes: Vec<DependencyClass>,

    /// Package page URL template with {suite} and {package} placeholders
    #[arg(long, default_value = DEFAULT_PAGE_TEMPLATE)]
    template: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// User agent sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Pretty-print the manifest
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModuleType {
    Deb,
    Tarball,
}

impl From<ModuleType> for SourceKind {
    fn from(value: ModuleType) -> Self {
        match value {
            ModuleType::Deb => SourceKind::File,
            ModuleType::Tarball => SourceKind::Archive,
        }
    }
}

impl Cli {
    fn config(&self) -> CrawlConfig {
        let defaults = CrawlConfig::default();
        CrawlConfig {
            page_template: self.template.clone(),
            suite: self.suite.clone(),
            arch: self.arch.clone(),
            mirror: self.mirror.clone(),
            source_kind: self.module_type.into(),
            classes: self.classes.clone(),
            timeout_secs: self.timeout,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config();

    let fetcher = HttpFetcher::new(&config).context("Failed to create HTTP client")?;
    let walker = DependencyWalker::new(fetcher, config.extractor(), config.locator())
        .with_timeout(config.fetch_timeout());

    let outcome = walker
        .walk_root(&config, cli.pkg.as_deref(), cli.url.as_deref())
        .await?;
    info!("Finished walking {}", outcome.stats);

    let bytes = outcome.manifest.serialize(cli.pretty)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes).context("Failed to write manifest")?;
    if cli.pretty {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
