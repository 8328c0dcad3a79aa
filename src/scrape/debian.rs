//! Matchers and locators for the packages.debian.org page layout.
//!
//! Binary packages (`deb`) resolve through the per-architecture download
//! page to a mirror link and its SHA256. Source tarballs (`tarball`) resolve
//! to the `.orig.tar.*` link, with the checksum read from the `.dsc`.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Checksum, DependencyLink, PackageName, SourceArtifact, SourceKind};
use crate::scrape::matcher::{
    find_all, find_first, href_of, text_of, AncestorRule, Matcher, Predicate,
};
use crate::traits::{DependencyExtractor, Page, PageFetcher, ParseError, SourceLocator};

/// Architecture-independent packages publish under this label.
const ARCH_ALL: &str = "all";

/// Dependency list classes used on package pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyClass {
    Depends,
    Recommends,
    Suggests,
    Enhances,
}

impl DependencyClass {
    /// CSS class of the `<ul>` holding this dependency list.
    pub fn marker(self) -> &'static str {
        match self {
            DependencyClass::Depends => "uldep",
            DependencyClass::Recommends => "ulrec",
            DependencyClass::Suggests => "ulsug",
            DependencyClass::Enhances => "ulenh",
        }
    }
}

impl FromStr for DependencyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "depends" | "dep" => Ok(DependencyClass::Depends),
            "recommends" | "rec" => Ok(DependencyClass::Recommends),
            "suggests" | "sug" => Ok(DependencyClass::Suggests),
            "enhances" | "enh" => Ok(DependencyClass::Enhances),
            other => Err(format!("unknown dependency class '{other}'")),
        }
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyClass::Depends => "depends",
            DependencyClass::Recommends => "recommends",
            DependencyClass::Suggests => "suggests",
            DependencyClass::Enhances => "enhances",
        };
        f.write_str(name)
    }
}

/// Matches dependency links: `ul.<marker> > li > dl > dt > a`.
pub fn dependency_matcher(classes: &[DependencyClass]) -> Matcher {
    let markers = classes.iter().map(|c| c.marker().to_string()).collect();
    Matcher::element("a").ancestor(
        AncestorRule::at(4)
            .element("ul")
            .attr("class", Predicate::OneOf(markers)),
    )
}

/// Matches the per-architecture download link in the package table header.
pub fn download_matcher(arch: &str) -> Matcher {
    Matcher::element("a")
        .text(Predicate::Equals(arch.to_string()))
        .ancestor(AncestorRule::at(1).element("th"))
}

/// Matches the mirror link inside a download page card.
pub fn mirror_matcher(mirror: &str) -> Matcher {
    Matcher::element("a")
        .text(Predicate::Equals(mirror.to_string()))
        .ancestor(AncestorRule::at(3).attr("class", Predicate::Contains("card".into())))
        .ancestor(AncestorRule::at(4).element("div"))
}

/// Matches the `<tt>` in the table row headed "SHA256 checksum".
pub fn sha256_matcher() -> Matcher {
    Matcher::element("tt").ancestor(
        AncestorRule::at(2).first_child_text(Predicate::Equals("SHA256 checksum".into())),
    )
}

/// Matches links whose href contains `needle`.
pub fn href_matcher(needle: &str) -> Matcher {
    Matcher::element("a").attr("href", Predicate::Contains(needle.to_string()))
}

/// Extracts the SHA256 of the `.orig` tarball from a `.dsc` file.
pub fn dsc_sha256(dsc: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^\s*([A-Fa-f0-9]{64})\s+\d+\s+\S*\.orig\.tar\S*\s*$").ok()?;
    re.captures(dsc).map(|caps| caps[1].to_ascii_lowercase())
}

// ============================================================================
// Dependency Extractor
// ============================================================================

pub struct DebianDependencyExtractor {
    classes: Vec<DependencyClass>,
    matcher: Matcher,
}

impl DebianDependencyExtractor {
    pub fn new(classes: Vec<DependencyClass>) -> Self {
        let matcher = dependency_matcher(&classes);
        Self { classes, matcher }
    }

    pub fn classes(&self) -> &[DependencyClass] {
        &self.classes
    }
}

impl Default for DebianDependencyExtractor {
    fn default() -> Self {
        Self::new(vec![DependencyClass::Depends])
    }
}

impl DependencyExtractor for DebianDependencyExtractor {
    fn extract(&self, page: &Page) -> Result<Vec<DependencyLink>, ParseError> {
        if !page.is_html() {
            return Err(ParseError::NotHtml {
                url: page.url.to_string(),
                content_type: page.content_type.clone().unwrap_or_default(),
            });
        }

        let document = Html::parse_document(&page.body);
        let links = find_all(&document, &self.matcher)
            .iter()
            .filter_map(|element| {
                let name = text_of(element);
                let href = href_of(element)?;
                if name.is_empty() {
                    debug!(%href, "Ignoring dependency link without a name");
                    return None;
                }
                Some(DependencyLink {
                    name: PackageName::new(name),
                    href,
                })
            })
            .collect();
        Ok(links)
    }
}

// ============================================================================
// Source Locators
// ============================================================================

/// Locates the binary `.deb` for one architecture on one mirror.
pub struct DebLocator {
    arch: String,
    mirror: String,
}

impl DebLocator {
    pub fn new(arch: impl Into<String>, mirror: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            mirror: mirror.into(),
        }
    }

    fn download_href(&self, body: &str) -> Option<String> {
        let document = Html::parse_document(body);
        find_first(&document, &download_matcher(&self.arch))
            .or_else(|| find_first(&document, &download_matcher(ARCH_ALL)))
            .and_then(|element| href_of(&element))
    }

    fn mirror_entry(&self, body: &str) -> (Option<String>, Checksum) {
        let document = Html::parse_document(body);
        let href = find_first(&document, &mirror_matcher(&self.mirror))
            .and_then(|element| href_of(&element));
        let checksum = find_first(&document, &sha256_matcher())
            .map(|element| Checksum::sha256(text_of(&element)))
            .unwrap_or_else(Checksum::unknown);
        (href, checksum)
    }
}

#[async_trait]
impl SourceLocator for DebLocator {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    async fn locate(
        &self,
        package: &PackageName,
        page: &Page,
        fetcher: &dyn PageFetcher,
    ) -> SourceArtifact {
        let Some(href) = self.download_href(&page.body) else {
            warn!(%package, arch = %self.arch, "No download link for architecture");
            return SourceArtifact::unresolved(self.kind());
        };
        let download_url = match page.resolve(&href) {
            Ok(url) => url,
            Err(err) => {
                warn!(%package, error = %err, "Unusable download link");
                return SourceArtifact::unresolved(self.kind());
            }
        };
        let download = match fetcher.fetch(&download_url).await {
            Ok(download) => download,
            Err(err) => {
                warn!(%package, error = %err, "Download page unavailable");
                return SourceArtifact::unresolved(self.kind());
            }
        };

        let (mirror_href, sha256) = self.mirror_entry(&download.body);
        let url = match mirror_href {
            Some(href) => download
                .resolve(&href)
                .map(String::from)
                .unwrap_or(href),
            None => {
                warn!(%package, mirror = %self.mirror, "Mirror not listed on download page");
                String::new()
            }
        };

        SourceArtifact {
            kind: self.kind(),
            url,
            sha256,
        }
    }
}

/// Locates the upstream `.orig` tarball of the package's source.
#[derive(Debug, Default)]
pub struct OrigTarballLocator;

impl OrigTarballLocator {
    fn source_hrefs(body: &str) -> (Option<String>, Option<String>) {
        let document = Html::parse_document(body);
        let orig = find_first(&document, &href_matcher(".orig.tar")).and_then(|e| href_of(&e));
        let dsc = find_first(&document, &href_matcher(".dsc")).and_then(|e| href_of(&e));
        (orig, dsc)
    }
}

#[async_trait]
impl SourceLocator for OrigTarballLocator {
    fn kind(&self) -> SourceKind {
        SourceKind::Archive
    }

    async fn locate(
        &self,
        package: &PackageName,
        page: &Page,
        fetcher: &dyn PageFetcher,
    ) -> SourceArtifact {
        let (orig, dsc) = Self::source_hrefs(&page.body);

        let url = match orig {
            Some(href) => page.resolve(&href).map(String::from).unwrap_or(href),
            None => {
                warn!(%package, "No .orig tarball link");
                String::new()
            }
        };

        let mut sha256 = Checksum::unknown();
        match dsc.map(|href| page.resolve(&href)) {
            Some(Ok(dsc_url)) => match fetcher.fetch(&dsc_url).await {
                Ok(dsc) => match dsc_sha256(&dsc.body) {
                    Some(hex) => sha256 = Checksum::sha256(hex),
                    None => warn!(%package, url = %dsc_url, "No orig checksum in .dsc"),
                },
                Err(err) => warn!(%package, error = %err, ".dsc unavailable"),
            },
            Some(Err(err)) => warn!(%package, error = %err, "Unusable .dsc link"),
            None => warn!(%package, "No .dsc link"),
        }

        SourceArtifact {
            kind: self.kind(),
            url,
            sha256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FetchError;
    use std::collections::HashMap;
    use url::Url;

    struct StaticSite(HashMap<String, (String, &'static str)>);

    impl StaticSite {
        fn new(pages: &[(&str, &str, &'static str)]) -> Self {
            Self(
                pages
                    .iter()
                    .map(|(url, body, ct)| (url.to_string(), (body.to_string(), *ct)))
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl PageFetcher for StaticSite {
        async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
            let (body, ct) = self.0.get(url.as_str()).ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })?;
            Ok(Page {
                url: url.clone(),
                content_type: Some(ct.to_string()),
                body: body.clone(),
            })
        }
    }

    const PACKAGE_PAGE: &str = r#"<html><body>
      <div id="pdeps">
        <ul class="uldep">
          <li><dl><dt><span class="nonvisual">dep:</span> <a href="/bookworm/libc6">libc6</a> (&gt;= 2.34)</dt></dl></li>
          <li><dl><dt><span class="nonvisual">dep:</span> <a href="/bookworm/zlib1g">zlib1g</a></dt></dl></li>
        </ul>
        <ul class="ulrec">
          <li><dl><dt><span class="nonvisual">rec:</span> <a href="/bookworm/ca-certificates">ca-certificates</a></dt></dl></li>
        </ul>
      </div>
      <div id="pdownload"><table>
        <tr><th><a href="/bookworm/arm64/curl/download">arm64</a></th><td>1 MB</td></tr>
        <tr><th><a href="/bookworm/amd64/curl/download">amd64</a></th><td>1 MB</td></tr>
      </table></div>
      <div id="pmoreinfo"><ul>
        <li><a href="http://deb.debian.org/debian/pool/main/c/curl/curl_7.88.1-10.dsc">[curl_7.88.1-10.dsc]</a></li>
        <li><a href="http://deb.debian.org/debian/pool/main/c/curl/curl_7.88.1.orig.tar.gz">[curl_7.88.1.orig.tar.gz]</a></li>
      </ul></div>
    </body></html>"#;

    const DOWNLOAD_PAGE: &str = r#"<html><body>
      <div id="content"><div class="cardleft"><ul>
        <li><a href="http://ftp.us.debian.org/debian/pool/main/c/curl/curl_7.88.1-10_amd64.deb">ftp.us.debian.org/debian</a></li>
        <li><a href="http://ftp.de.debian.org/debian/pool/main/c/curl/curl_7.88.1-10_amd64.deb">ftp.de.debian.org/debian</a></li>
      </ul></div></div>
      <table>
        <tr><th>MD5 checksum</th><td><tt>d41d8cd98f00b204e9800998ecf8427e</tt></td></tr>
        <tr><th>SHA256 checksum</th><td><tt>AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA</tt></td></tr>
      </table>
    </body></html>"#;

    fn page(url: &str, body: &str) -> Page {
        Page::html(Url::parse(url).unwrap(), body)
    }

    #[test]
    fn test_extract_depends_only() {
        let extractor = DebianDependencyExtractor::default();
        let links = extractor
            .extract(&page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE))
            .unwrap();

        let names: Vec<_> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["libc6", "zlib1g"]);
        assert_eq!(links[0].href, "/bookworm/libc6");
    }

    #[test]
    fn test_extract_multiple_classes() {
        let extractor =
            DebianDependencyExtractor::new(vec![DependencyClass::Recommends, DependencyClass::Depends]);
        let links = extractor
            .extract(&page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE))
            .unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links[2].name.as_str(), "ca-certificates");
    }

    #[test]
    fn test_extract_rejects_non_html() {
        let mut p = page("https://packages.debian.org/bookworm/curl", "{}");
        p.content_type = Some("application/json".to_string());
        let err = DebianDependencyExtractor::default().extract(&p).unwrap_err();
        assert!(matches!(err, ParseError::NotHtml { .. }));
    }

    #[test]
    fn test_dependency_class_parsing() {
        assert_eq!("Recommends".parse::<DependencyClass>(), Ok(DependencyClass::Recommends));
        assert_eq!("sug".parse::<DependencyClass>(), Ok(DependencyClass::Suggests));
        assert!("breaks".parse::<DependencyClass>().is_err());
        assert_eq!(DependencyClass::Enhances.marker(), "ulenh");
    }

    #[test]
    fn test_dsc_sha256() {
        let dsc = format!(
            "Checksums-Sha1:\n {} 4 curl_7.88.1.orig.tar.gz\nChecksums-Sha256:\n {} 4203232 curl_7.88.1.orig.tar.gz\n {} 51236 curl_7.88.1-10.debian.tar.xz\n",
            "1".repeat(40),
            "B".repeat(64),
            "c".repeat(64),
        );
        assert_eq!(dsc_sha256(&dsc), Some("b".repeat(64)));
        assert_eq!(dsc_sha256("Format: 3.0 (native)\n"), None);
    }

    #[tokio::test]
    async fn test_deb_locator() {
        let site = StaticSite::new(&[(
            "https://packages.debian.org/bookworm/amd64/curl/download",
            DOWNLOAD_PAGE,
            "text/html",
        )]);
        let locator = DebLocator::new("amd64", "ftp.us.debian.org/debian");
        let artifact = locator
            .locate(
                &PackageName::new("curl"),
                &page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE),
                &site,
            )
            .await;

        assert_eq!(artifact.kind, SourceKind::File);
        assert_eq!(
            artifact.url,
            "http://ftp.us.debian.org/debian/pool/main/c/curl/curl_7.88.1-10_amd64.deb"
        );
        assert_eq!(artifact.sha256, Checksum::sha256("a".repeat(64)));
    }

    #[tokio::test]
    async fn test_deb_locator_missing_arch_is_unresolved() {
        let site = StaticSite::new(&[]);
        let locator = DebLocator::new("riscv64", "ftp.us.debian.org/debian");
        let artifact = locator
            .locate(
                &PackageName::new("curl"),
                &page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE),
                &site,
            )
            .await;

        assert_eq!(artifact, SourceArtifact::unresolved(SourceKind::File));
    }

    #[tokio::test]
    async fn test_deb_locator_falls_back_to_all() {
        let package_page = r#"<html><body><div id="pdownload"><table>
            <tr><th><a href="/bookworm/all/tzdata/download">all</a></th><td>250 kB</td></tr>
          </table></div></body></html>"#;
        let site = StaticSite::new(&[(
            "https://packages.debian.org/bookworm/all/tzdata/download",
            DOWNLOAD_PAGE,
            "text/html",
        )]);
        let locator = DebLocator::new("amd64", "ftp.us.debian.org/debian");
        let artifact = locator
            .locate(
                &PackageName::new("tzdata"),
                &page("https://packages.debian.org/bookworm/tzdata", package_page),
                &site,
            )
            .await;

        assert_eq!(
            artifact.url,
            "http://ftp.us.debian.org/debian/pool/main/c/curl/curl_7.88.1-10_amd64.deb"
        );
        assert_eq!(artifact.sha256, Checksum::sha256("a".repeat(64)));
    }

    #[tokio::test]
    async fn test_tarball_locator() {
        let dsc = format!(" {} 4203232 curl_7.88.1.orig.tar.gz\n", "d".repeat(64));
        let site = StaticSite::new(&[(
            "http://deb.debian.org/debian/pool/main/c/curl/curl_7.88.1-10.dsc",
            &dsc,
            "text/prs.lines.tag",
        )]);
        let artifact = OrigTarballLocator
            .locate(
                &PackageName::new("curl"),
                &page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE),
                &site,
            )
            .await;

        assert_eq!(artifact.kind, SourceKind::Archive);
        assert_eq!(
            artifact.url,
            "http://deb.debian.org/debian/pool/main/c/curl/curl_7.88.1.orig.tar.gz"
        );
        assert_eq!(artifact.sha256, Checksum::sha256("d".repeat(64)));
    }

    #[tokio::test]
    async fn test_tarball_locator_without_dsc_is_unknown() {
        let artifact = OrigTarballLocator
            .locate(
                &PackageName::new("curl"),
                &page("https://packages.debian.org/bookworm/curl", PACKAGE_PAGE),
                &StaticSite::new(&[]),
            )
            .await;

        assert!(artifact.sha256.is_unknown());
        assert!(artifact.url.ends_with(".orig.tar.gz"));
    }
}
