use crate::model::{DependencyLink, PackageName, SourceArtifact, SourceKind};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("Fetching {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Document at {url} is not HTML (content type: {content_type})")]
    NotHtml { url: String, content_type: String },
    #[error("Invalid link '{href}' on {url}: {reason}")]
    InvalidLink {
        url: String,
        href: String,
        reason: String,
    },
}

/// A retrieved document and the URL it was served from.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            content_type: Some("text/html".to_string()),
            body: body.into(),
        }
    }

    /// A missing content type is given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.contains("html"))
    }

    /// Resolves a link found on this page against the page's own URL.
    pub fn resolve(&self, href: &str) -> Result<Url, ParseError> {
        self.url.join(href).map_err(|e| ParseError::InvalidLink {
            url: self.url.to_string(),
            href: href.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieves the document at `url`.
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

pub trait DependencyExtractor: Send + Sync {
    /// Returns the dependency links on `page`, in document order.
    ///
    /// An empty list marks the package as a leaf.
    fn extract(&self, page: &Page) -> Result<Vec<DependencyLink>, ParseError>;
}

#[async_trait]
pub trait SourceLocator: Send + Sync {
    /// Source type of every artifact this locator produces.
    fn kind(&self) -> SourceKind;

    /// Locates the artifact backing `package`, whose page is `page`.
    ///
    /// Never fails: anything that cannot be found is reported through an
    /// empty URL and/or [`Checksum::unknown`](crate::model::Checksum::unknown).
    /// `fetcher` is available for secondary documents (download pages,
    /// source descriptions).
    async fn locate(
        &self,
        package: &PackageName,
        page: &Page,
        fetcher: &dyn PageFetcher,
    ) -> SourceArtifact;
}

#[async_trait]
impl<T: SourceLocator + ?Sized> SourceLocator for Box<T> {
    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    async fn locate(
        &self,
        package: &PackageName,
        page: &Page,
        fetcher: &dyn PageFetcher,
    ) -> SourceArtifact {
        (**self).locate(package, page, fetcher).await
    }
}

impl<T: DependencyExtractor + ?Sized> DependencyExtractor for Box<T> {
    fn extract(&self, page: &Page) -> Result<Vec<DependencyLink>, ParseError> {
        (**self).extract(page)
    }
}
