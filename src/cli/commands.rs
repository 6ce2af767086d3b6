use url::Url;

use crate::app::{AppContext, BonusError, Result};
use crate::domain::{parse_cashback_rate, RateKind};
use crate::resolver::{normalize_hostname, Resolution};

/// Accept either a bare hostname or a full URL.
pub fn host_from_target(target: &str) -> Result<String> {
    if target.contains("://") {
        let url = Url::parse(target)?;
        let host = url
            .host_str()
            .ok_or_else(|| BonusError::Other(format!("URL has no host: {}", target)))?;
        return Ok(normalize_hostname(host));
    }
    Ok(normalize_hostname(target.split('/').next().unwrap_or(target)))
}

pub async fn resolve(ctx: &AppContext, target: &str) -> Result<()> {
    let host = host_from_target(target)?;

    match ctx.resolver.resolve_detailed(&host).await? {
        Resolution::Match(m) => {
            let rate = parse_cashback_rate(&m.cashback_description);
            let kind = match rate.kind {
                RateKind::Percent => "percent",
                RateKind::Fixed => "fixed amount",
            };
            println!(
                "{}: {} via {} ({})",
                m.merchant_name, m.cashback_description, m.service.name, kind
            );
            if let Some(code) = &m.code {
                println!("  Code: {}", code);
            }
            if let Some(url) = &m.clickthrough_url {
                println!("  Activate: {}", url);
            }
        }
        Resolution::Hidden => println!("{} is hidden", host),
        Resolution::NotAMerchant | Resolution::NoMerchant => {
            println!("No cashback offer for {}", host)
        }
        Resolution::NoEnabledOffer => {
            println!("{} has offers, but none from your enabled services", host)
        }
    }

    Ok(())
}

pub fn check(ctx: &AppContext, target: &str) -> Result<()> {
    let host = host_from_target(target)?;
    let resolver = &ctx.resolver;

    match resolver.cache().is_known_merchant_host(&host, resolver.aliases()) {
        Some(true) => println!("{} is a known merchant", host),
        Some(false) => println!("{} is not a merchant", host),
        None => println!("No host index cached; run `bonusvarsler refresh`"),
    }
    Ok(())
}

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    let doc = ctx.resolver.refresh().await?;
    println!("Fetched feed with {} merchants", doc.merchants.len());
    Ok(())
}

pub fn clear_cache(ctx: &AppContext) -> Result<()> {
    ctx.resolver.cache().try_clear()?;
    println!("Feed cache cleared");
    Ok(())
}

pub async fn list_services(ctx: &AppContext) -> Result<()> {
    let registry = ctx.resolver.services().await;
    let enabled = ctx.resolver.cache().enabled_services(&registry);

    for service in registry.iter() {
        let mark = if enabled.contains(&service.id) { "x" } else { " " };
        let note = if service.coming_soon { " (coming soon)" } else { "" };
        println!("[{}] {:<10} {}{}", mark, service.id, service.name, note);
    }
    Ok(())
}

pub async fn set_service_enabled(ctx: &AppContext, id: &str, enabled: bool) -> Result<()> {
    let registry = ctx.resolver.services().await;
    if !registry.contains(id) {
        return Err(BonusError::Other(format!("Unknown service: {}", id)));
    }

    ctx.resolver
        .cache()
        .set_service_enabled(&registry, id, enabled)?;
    println!("{} {}", if enabled { "Enabled" } else { "Disabled" }, id);
    Ok(())
}

pub fn hide(ctx: &AppContext, target: &str) -> Result<()> {
    let host = host_from_target(target)?;
    ctx.resolver.cache().hide_site(&host)?;
    println!("Hidden: {}", host);
    Ok(())
}

pub fn unhide(ctx: &AppContext, target: &str) -> Result<()> {
    let host = host_from_target(target)?;
    if ctx.resolver.cache().unhide_site(&host)? {
        println!("No longer hidden: {}", host);
    } else {
        println!("{} was not hidden", host);
    }
    Ok(())
}

pub async fn activated(ctx: &AppContext, url: &str) -> Result<()> {
    let parsed = Url::parse(url)?;
    let host = normalize_hostname(parsed.host_str().unwrap_or_default());
    let registry = ctx.resolver.services().await;

    match registry.service_for_activation_page(&host, parsed.path()) {
        Some(service) => println!("Cashback activation page for {}", service.name),
        None => println!("Not a cashback activation page"),
    }
    Ok(())
}

pub async fn probe(ctx: &AppContext, url: &str) -> Result<()> {
    if ctx.fetcher.check_url_blocked(url).await {
        println!("Blocked: {}", url);
    } else {
        println!("Reachable: {}", url);
    }
    Ok(())
}
