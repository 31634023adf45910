pub mod crawl;

pub use crawl::{crawl, load_config, CrawlArgs};
