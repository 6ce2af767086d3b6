const WWW: &str = "www.";

/// Visited hostname -> hostname the feed publishes the merchant under.
///
/// Covers shops that redirect to, or share a merchant agreement with, a
/// differently named domain.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("www.elkjop.com", "www.elkjop.no"),
    ("www.zalando.com", "www.zalando.no"),
    ("www2.hm.com", "www.hm.com"),
    ("www.dressmann.com", "www.dressmann.no"),
    ("www.clasohlson.com", "www.clasohlson.no"),
    ("www.jysk.com", "jysk.no"),
    ("store.nike.com", "www.nike.com"),
    ("nordicfeel.com", "www.nordicfeel.no"),
];

pub fn strip_www(host: &str) -> &str {
    host.strip_prefix(WWW).unwrap_or(host)
}

pub fn with_www(host: &str) -> String {
    if host.starts_with(WWW) {
        host.to_string()
    } else {
        format!("{WWW}{host}")
    }
}

/// The hostname plus its `www.` counterpart, in lookup order.
pub fn www_variants(host: &str) -> Vec<String> {
    if host.starts_with(WWW) {
        vec![host.to_string(), strip_www(host).to_string()]
    } else {
        vec![host.to_string(), with_www(host)]
    }
}

/// Fixed alias table. Not runtime-configurable; tests may supply their own
/// static table through [`DomainAliases::from_static`].
#[derive(Debug, Clone, Copy)]
pub struct DomainAliases {
    table: &'static [(&'static str, &'static str)],
}

impl Default for DomainAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DomainAliases {
    pub fn builtin() -> Self {
        Self {
            table: BUILTIN_ALIASES,
        }
    }

    pub fn from_static(table: &'static [(&'static str, &'static str)]) -> Self {
        Self { table }
    }

    fn lookup(&self, host: &str) -> Option<&'static str> {
        self.table
            .iter()
            .find(|(from, _)| *from == host)
            .map(|(_, to)| *to)
    }

    /// Canonical feed hostname for `hostname`, or `None` when it has no alias.
    pub fn resolve(&self, hostname: &str) -> Option<&'static str> {
        if let Some(target) = self.lookup(hostname) {
            return Some(target);
        }

        let bare = strip_www(hostname);
        if bare != hostname {
            if let Some(target) = self.lookup(bare) {
                return Some(target);
            }
        }

        if !hostname.starts_with(WWW) {
            return self.lookup(&with_www(hostname));
        }

        None
    }
}
