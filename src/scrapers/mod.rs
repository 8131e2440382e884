pub mod browser;
pub mod http;
pub mod normalize;
pub mod paginate;
pub mod state;
pub mod traits;
pub mod types;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;
pub use paginate::Paginator;
pub use traits::PageFetcher;
pub use types::ScrapeParams;
