//! Scrape module - page retrieval and site-specific page interpretation.
//!
//! - **Matcher**: declarative element selection via [`Matcher`]
//! - **Debian**: packages.debian.org extractor and locators
//! - **Fetch**: HTTP retrieval via [`HttpFetcher`]

pub mod debian;
pub mod fetch;
pub mod matcher;

pub use debian::{DebLocator, DebianDependencyExtractor, DependencyClass, OrigTarballLocator};
pub use fetch::HttpFetcher;
pub use matcher::{AncestorRule, AttrRule, Matcher, Predicate};
