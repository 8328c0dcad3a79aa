//! Depth-first, post-order dependency walk.
//!
//! The walk runs on an explicit stack instead of recursion so that deep
//! dependency chains cannot exhaust the call stack. A package is finalized
//! (its artifact located and its module emitted) only after every dependency
//! pushed above it has been finalized, so the manifest lists dependencies
//! before their dependents.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{ConfigError, CrawlConfig};
use crate::crawl::state::{VisitLedger, WalkStats};
use crate::manifest::Manifest;
use crate::model::{DependencyEdge, DependencyLink, Module, PackageName};
use crate::traits::{
    DependencyExtractor, FetchError, Page, PageFetcher, ParseError, SourceLocator,
};

/// Errors that abort a walk. Only the root can produce them.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ConfigError),

    #[error("Root page unavailable: {0}")]
    Fetch(#[from] FetchError),

    #[error("Root page unreadable: {0}")]
    Parse(#[from] ParseError),
}

/// Manifest and counters produced by one walk.
#[derive(Debug)]
pub struct WalkOutcome {
    pub manifest: Manifest,
    pub stats: WalkStats,
}

enum Frame {
    Root { name: PackageName, url: Url },
    Edge(DependencyEdge),
    Finalize { name: PackageName, page: Page },
}

/// Node-level failure; fatal only at the root.
#[derive(Debug)]
enum NodeError {
    Fetch(FetchError),
    Parse(ParseError),
}

impl From<NodeError> for WalkError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Fetch(e) => WalkError::Fetch(e),
            NodeError::Parse(e) => WalkError::Parse(e),
        }
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Fetch(e) => e.fmt(f),
            NodeError::Parse(e) => e.fmt(f),
        }
    }
}

/// Bounds every fetch of the wrapped fetcher by `limit`.
struct TimedFetcher<'a, F> {
    inner: &'a F,
    limit: Duration,
}

#[async_trait]
impl<'a, F: PageFetcher> PageFetcher for TimedFetcher<'a, F> {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        timeout(self.limit, self.inner.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.limit.as_secs(),
            })?
    }
}

/// Walks a package's dependency closure and builds its manifest.
///
/// # Example
///
/// ```ignore
/// let walker = DependencyWalker::new(HttpFetcher::new(&config)?, extractor, locator)
///     .with_timeout(Duration::from_secs(30));
/// let outcome = walker.walk(PackageName::new("curl"), root_url).await?;
/// println!("{}", outcome.stats);
/// ```
pub struct DependencyWalker<F, E, L>
where
    F: PageFetcher,
    E: DependencyExtractor,
    L: SourceLocator,
{
    fetcher: F,
    extractor: E,
    locator: L,

    /// Limit for each individual fetch (default: 30 seconds)
    fetch_timeout: Duration,
}

impl<F, E, L> DependencyWalker<F, E, L>
where
    F: PageFetcher,
    E: DependencyExtractor,
    L: SourceLocator,
{
    pub fn new(fetcher: F, extractor: E, locator: L) -> Self {
        Self {
            fetcher,
            extractor,
            locator,
            fetch_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Walks from `root`, whose page lives at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] only when the root page cannot be fetched or
    /// read. Failures below the root are logged, counted in
    /// [`WalkStats::failed`], and the walk continues without that node.
    #[instrument(skip_all, fields(root = %root, url = %url))]
    pub async fn walk(&self, root: PackageName, url: Url) -> Result<WalkOutcome, WalkError> {
        let fetcher = TimedFetcher {
            inner: &self.fetcher,
            limit: self.fetch_timeout,
        };
        let mut ledger = VisitLedger::new();
        let mut manifest = Manifest::new();
        let mut stats = WalkStats::default();
        let mut stack = vec![Frame::Root { name: root, url }];

        while let Some(frame) = stack.pop() {
            let (name, url, parent) = match frame {
                Frame::Root { name, url } => (name, url, None),
                Frame::Edge(edge) => (edge.child, edge.url, Some(edge.parent)),
                Frame::Finalize { name, page } => {
                    let artifact = self.locator.locate(&name, &page, &fetcher).await;
                    if !ledger.claim_checksum(&artifact.sha256) {
                        stats.overlaps += 1;
                        debug!(package = %name, sha256 = %artifact.sha256, "Checksum overlap, module dropped");
                        continue;
                    }
                    if artifact.sha256.is_unknown() {
                        stats.unresolved += 1;
                        warn!(package = %name, "No checksum found");
                    }
                    stats.emitted += 1;
                    debug!(package = %name, url = %artifact.url, "Module emitted");
                    manifest.append(Module::new(name, artifact));
                    continue;
                }
            };

            if !ledger.mark_visited(&name) {
                stats.duplicates += 1;
                debug!(package = %name, "Already visited");
                continue;
            }

            let (page, links) = match self.read_node(&fetcher, &url).await {
                Ok(node) => node,
                Err(err) => match parent {
                    None => return Err(err.into()),
                    Some(parent) => {
                        stats.failed += 1;
                        warn!(package = %name, %parent, error = %err, "Skipping dependency");
                        continue;
                    }
                },
            };

            stats.edges += links.len();
            let mut children = Vec::with_capacity(links.len());
            for link in links {
                match page.resolve(&link.href) {
                    Ok(child_url) => children.push(Frame::Edge(DependencyEdge {
                        parent: name.clone(),
                        child: link.name,
                        url: child_url,
                    })),
                    Err(err) => {
                        stats.failed += 1;
                        warn!(package = %link.name, parent = %name, error = %err, "Skipping dependency");
                    }
                }
            }

            debug!(package = %name, dependencies = children.len(), "Page walked");
            stack.push(Frame::Finalize { name, page });
            // Reversed so the first link in document order is walked first.
            stack.extend(children.into_iter().rev());
        }

        info!(
            edges = stats.edges,
            duplicates = stats.duplicates,
            overlaps = stats.overlaps,
            failed = stats.failed,
            modules = manifest.len(),
            "Walk completed"
        );

        Ok(WalkOutcome { manifest, stats })
    }

    /// Resolves the root from `config` and walks from it.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::InvalidInput`] before any fetch when neither
    /// `package` nor `url` yields a usable root.
    pub async fn walk_root(
        &self,
        config: &CrawlConfig,
        package: Option<&str>,
        url: Option<&str>,
    ) -> Result<WalkOutcome, WalkError> {
        let (root, url) = config.root(package, url)?;
        self.walk(root, url).await
    }

    async fn read_node(
        &self,
        fetcher: &TimedFetcher<'_, F>,
        url: &Url,
    ) -> Result<(Page, Vec<DependencyLink>), NodeError> {
        let page = fetcher.fetch(url).await.map_err(NodeError::Fetch)?;
        let links = self.extractor.extract(&page).map_err(NodeError::Parse)?;
        Ok((page, links))
    }
}

// ============================================================================
// Tests
// ============================================================================
