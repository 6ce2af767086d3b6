use std::collections::HashSet;

use crate::domain::{
    compare_cashback_rates, parse_cashback_rate, strip_www, www_variants, DomainAliases,
    FeedDocument, MatchResult, MerchantRecord, ServiceRegistry,
};

/// Look `host` up with its `www.` variant, exact keys only.
fn try_host<'a>(feed: &'a FeedDocument, host: &str) -> Option<(String, &'a MerchantRecord)> {
    www_variants(host)
        .into_iter()
        .find_map(|h| feed.merchant(&h).map(|record| (h, record)))
}

/// Merchant record for `hostname`: direct, then via alias, then via the alias
/// of the bare host when that differs.
pub fn find_merchant<'a>(
    feed: &'a FeedDocument,
    hostname: &str,
    aliases: &DomainAliases,
) -> Option<(String, &'a MerchantRecord)> {
    if let Some(hit) = try_host(feed, hostname) {
        return Some(hit);
    }

    let alias = aliases.resolve(hostname);
    if let Some(hit) = alias.and_then(|a| try_host(feed, a)) {
        return Some(hit);
    }

    let bare_alias = aliases.resolve(strip_www(hostname));
    if bare_alias != alias {
        return bare_alias.and_then(|a| try_host(feed, a));
    }

    None
}

/// Pick the single best enabled offer for `hostname`.
///
/// Offers whose service is disabled or unknown to `services` are ignored.
/// Ties keep feed order.
pub fn find_best_offer(
    feed: &FeedDocument,
    hostname: &str,
    enabled_service_ids: &HashSet<String>,
    services: &ServiceRegistry,
    aliases: &DomainAliases,
) -> Option<MatchResult> {
    let (host_name, record) = find_merchant(feed, hostname, aliases)?;
    best_offer_for(host_name, record, enabled_service_ids, services)
}

/// Best enabled offer of an already located merchant record.
pub fn best_offer_for(
    host_name: String,
    record: &MerchantRecord,
    enabled_service_ids: &HashSet<String>,
    services: &ServiceRegistry,
) -> Option<MatchResult> {
    let is_unified = matches!(record, MerchantRecord::Unified(_));
    let mut offers: Vec<_> = record
        .offers()
        .into_iter()
        .filter(|o| enabled_service_ids.contains(&o.service_id))
        .filter(|o| !is_unified || services.contains(&o.service_id))
        .collect();

    offers.sort_by(|a, b| {
        compare_cashback_rates(
            &parse_cashback_rate(&a.cashback_description),
            &parse_cashback_rate(&b.cashback_description),
        )
    });
    let best = offers.into_iter().next()?;

    let service = services
        .get(&best.service_id)
        .cloned()
        .unwrap_or_else(|| services.legacy_service());
    let clickthrough_url = service.clickthrough_url(&best.url_name);

    Some(MatchResult {
        host_name,
        merchant_name: record.name().to_string(),
        service_id: best.service_id,
        url_name: best.url_name,
        cashback_description: best.cashback_description,
        code: best.code,
        service,
        clickthrough_url,
    })
}
