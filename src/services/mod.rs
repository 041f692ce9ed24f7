pub mod detail_parser;
pub mod link_extractor;
pub mod page_fetcher;
pub mod registry;
pub mod scripted_fetcher;
pub mod trademark_searcher;

pub use page_fetcher::*;
pub use registry::*;
pub use scripted_fetcher::*;
pub use trademark_searcher::*;
