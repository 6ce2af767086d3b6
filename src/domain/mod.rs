pub mod feed;
pub mod host;
pub mod matched;
pub mod rate;
pub mod service;

pub use feed::{
    FeedDocument, LegacyMerchant, MerchantRecord, Offer, UnifiedMerchant, LEGACY_SERVICE_ID,
};
pub use host::{strip_www, with_www, www_variants, DomainAliases};
pub use matched::MatchResult;
pub use rate::{compare_cashback_rates, parse_cashback_rate, CashbackRate, RateKind};
pub use service::{Service, ServicePartial, ServiceRegistry};
