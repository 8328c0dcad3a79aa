//! Crawl configuration and root resolution.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::{PackageName, SourceKind};
use crate::scrape::debian::{
    DebLocator, DebianDependencyExtractor, DependencyClass, OrigTarballLocator,
};
use crate::traits::SourceLocator;

pub const DEFAULT_PAGE_TEMPLATE: &str = "https://packages.debian.org/{suite}/{package}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Either a package name or a root URL is required")]
    MissingTarget,

    #[error("Invalid root URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Page template '{0}' has no {{package}} placeholder")]
    InvalidTemplate(String),
}

/// Settings for one crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Package page URL with `{suite}` and `{package}` placeholders
    pub page_template: String,

    /// Distribution code name (e.g. `"bookworm"`)
    pub suite: String,

    /// Architecture of binary packages (e.g. `"amd64"`)
    pub arch: String,

    /// Mirror label as listed on download pages
    pub mirror: String,

    /// Whether modules stage binary files or source archives
    pub source_kind: SourceKind,

    /// Dependency lists followed by the walk
    pub classes: Vec<DependencyClass>,

    /// Per-fetch timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_template: DEFAULT_PAGE_TEMPLATE.to_string(),
            suite: "bookworm".to_string(),
            arch: "amd64".to_string(),
            mirror: "ftp.us.debian.org/debian".to_string(),
            source_kind: SourceKind::File,
            classes: vec![DependencyClass::Depends],
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the root package and its page URL.
    ///
    /// An explicit `url` wins over the template. Without a `package`, the
    /// name is taken from the URL's last path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when neither input is usable.
    pub fn root(
        &self,
        package: Option<&str>,
        url: Option<&str>,
    ) -> Result<(PackageName, Url), ConfigError> {
        let package = package.map(str::trim).filter(|p| !p.is_empty());

        let url = match (url, package) {
            (Some(raw), _) => parse_url(raw)?,
            (None, Some(name)) => self.package_url(name)?,
            (None, None) => return Err(ConfigError::MissingTarget),
        };

        let name = match package {
            Some(name) => PackageName::new(name),
            None => last_segment(&url)
                .map(PackageName::new)
                .ok_or(ConfigError::MissingTarget)?,
        };

        Ok((name, url))
    }

    pub fn extractor(&self) -> DebianDependencyExtractor {
        DebianDependencyExtractor::new(self.classes.clone())
    }

    /// Locator matching the configured source kind.
    pub fn locator(&self) -> Box<dyn SourceLocator> {
        match self.source_kind {
            SourceKind::File => Box::new(DebLocator::new(&self.arch, &self.mirror)),
            SourceKind::Archive => Box::new(OrigTarballLocator),
        }
    }

    /// Expands the page template for `package`.
    pub fn package_url(&self, package: &str) -> Result<Url, ConfigError> {
        if !self.page_template.contains("{package}") {
            return Err(ConfigError::InvalidTemplate(self.page_template.clone()));
        }
        let raw = self
            .page_template
            .replace("{suite}", &self.suite)
            .replace("{package}", package);
        parse_url(&raw)
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn last_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}
