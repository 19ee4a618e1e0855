//! Market-data caching core and its collaborators' contracts

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod market;
pub mod market_cache;
pub mod portfolio;
pub mod resolver;
pub mod service;

// Re-export main types for cleaner imports
pub use catalog::CatalogCache;
pub use error::{SubmitError, UpstreamError};
pub use market::{Identifier, MarketApi, MarketRecord};
pub use market_cache::{MarketDataCache, MarketSnapshot};
pub use portfolio::{PortfolioRow, PortfolioStore, RowFields};
pub use resolver::IdentifierResolver;
pub use service::CoinService;
