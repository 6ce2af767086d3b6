//! # Bonusvarsler
//!
//! Tells a shopper that the site they are on pays cashback through one of
//! their partner services (Trumf, re:member, ...), and which offer is best.
//!
//! ## Architecture
//!
//! ```text
//! hostname → host index check → feed cache → fetcher (retry + fallback)
//!          → merchant lookup (www-variants, aliases) → offer ranking
//! ```
//!
//! - [`cache`]: Feed cache with TTL, host index and user settings
//! - [`fetcher`]: HTTP fetching with backoff and a fallback source
//! - [`normalizer`]: Feed validation and parsing
//! - [`resolver`]: Merchant lookup and best-offer selection
//!
//! ## Quick Start
//!
//! ```bash
//! # Best offer for a page
//! bonusvarsler resolve https://www.example.no/product/123
//!
//! # Enable another service
//! bonusvarsler services enable remember
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together store,
/// fetcher and resolver.
pub mod app;

/// Feed cache and settings persisted through a [`Storage`](store::Storage).
///
/// - [`FeedCache`](cache::FeedCache): TTL-bound feed, host index, settings
pub mod cache;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/bonusvarsler/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`FeedDocument`](domain::FeedDocument): merchants and service overrides
/// - [`MerchantRecord`](domain::MerchantRecord): unified or legacy merchant
/// - [`ServiceRegistry`](domain::ServiceRegistry): built-in + feed services
/// - [`CashbackRate`](domain::CashbackRate): parsed, comparable reward
pub mod domain;

/// Feed fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for one network attempt
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`fetch_feed`](fetcher::fetch_feed): retries, backoff and fallback
pub mod fetcher;

/// Converts raw feed bodies into validated [`FeedDocument`](domain::FeedDocument)s.
pub mod normalizer;

/// Hostname → best offer.
pub mod resolver;

/// Key/value persistence.
///
/// - [`Storage`](store::Storage): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): In-process implementation
pub mod store;
