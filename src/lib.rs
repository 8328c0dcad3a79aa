pub mod config;
pub mod crawl;
pub mod manifest;
pub mod model;
pub mod scrape;
pub mod traits;

// Re-export common types for convenience
pub use config::*;
pub use crawl::*;
pub use manifest::*;
pub use model::*;
pub use traits::*;
