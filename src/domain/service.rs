use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder in a clickthrough template replaced by the offer's `urlName`.
pub const URL_NAME_PLACEHOLDER: &str = "{urlName}";

/// A cashback/rewards program a merchant offer can belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickthrough_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cashback_path_patterns: Vec<String>,
    #[serde(default)]
    pub default_enabled: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub coming_soon: bool,
}

impl Service {
    /// Expand the clickthrough template for one merchant slug.
    pub fn clickthrough_url(&self, url_name: &str) -> Option<String> {
        self.clickthrough_url
            .as_ref()
            .map(|template| template.replace(URL_NAME_PLACEHOLDER, url_name))
    }

    fn matches_activation_path(&self, path: &str) -> bool {
        self.cashback_path_patterns.iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => path.starts_with(prefix),
                None => {
                    let dir = format!("{}/", pattern.trim_end_matches('/'));
                    path == pattern || path.starts_with(&dir)
                }
            }
        })
    }
}

/// Service descriptor as it appears in the feed; every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePartial {
    pub name: Option<String>,
    pub color: Option<String>,
    pub clickthrough_url: Option<String>,
    pub reminder_domain: Option<String>,
    pub cashback_path_patterns: Option<Vec<String>>,
    pub default_enabled: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub coming_soon: Option<bool>,
}

impl ServicePartial {
    fn overlay(self, id: &str, base: Option<&Service>) -> Service {
        Service {
            id: id.to_string(),
            name: self
                .name
                .or_else(|| base.map(|s| s.name.clone()))
                .unwrap_or_default(),
            color: self
                .color
                .or_else(|| base.map(|s| s.color.clone()))
                .unwrap_or_default(),
            clickthrough_url: self
                .clickthrough_url
                .or_else(|| base.and_then(|s| s.clickthrough_url.clone())),
            reminder_domain: self
                .reminder_domain
                .or_else(|| base.and_then(|s| s.reminder_domain.clone())),
            cashback_path_patterns: self
                .cashback_path_patterns
                .or_else(|| base.map(|s| s.cashback_path_patterns.clone()))
                .unwrap_or_default(),
            default_enabled: self
                .default_enabled
                .or_else(|| base.map(|s| s.default_enabled))
                .unwrap_or(false),
            kind: self.kind.or_else(|| base.and_then(|s| s.kind.clone())),
            coming_soon: self
                .coming_soon
                .or_else(|| base.map(|s| s.coming_soon))
                .unwrap_or(false),
        }
    }
}

/// Effective set of services: built-in defaults with feed overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Service>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ServiceRegistry {
    /// The hardcoded registry used whenever the feed omits or corrupts a service.
    pub fn builtin() -> Self {
        let services = builtin_services()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Self { services }
    }

    /// Merge feed-supplied partial descriptors onto the built-in registry.
    ///
    /// Entries that do not deserialize, or that end up without a name or
    /// color, are dropped with a warning and the built-in entry (if any) kept.
    pub fn from_feed(overrides: Option<&BTreeMap<String, Value>>) -> Self {
        let mut registry = Self::builtin();
        let Some(overrides) = overrides else {
            return registry;
        };

        for (id, raw) in overrides {
            let partial: ServicePartial = match serde_json::from_value(raw.clone()) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        service = %id,
                        error = %e,
                        "Dropping malformed service descriptor"
                    );
                    continue;
                }
            };

            let merged = partial.overlay(id, registry.services.get(id));
            if merged.name.trim().is_empty() || merged.color.trim().is_empty() {
                tracing::warn!(service = %id, "Dropping service descriptor without name or color");
                continue;
            }
            registry.services.insert(id.clone(), merged);
        }

        registry
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Service ids enabled when the user has not chosen any explicitly.
    pub fn default_enabled_ids(&self) -> HashSet<String> {
        self.services
            .values()
            .filter(|s| s.default_enabled && !s.coming_soon)
            .map(|s| s.id.clone())
            .collect()
    }

    /// The Trumf descriptor, used when an offer's service id is unknown.
    pub fn legacy_service(&self) -> Service {
        self.services
            .get(super::LEGACY_SERVICE_ID)
            .cloned()
            .unwrap_or_else(trumf)
    }

    /// Find the service whose own site is showing a cashback activation page.
    pub fn service_for_activation_page(&self, hostname: &str, path: &str) -> Option<&Service> {
        let host = super::strip_www(hostname);
        self.services.values().find(|s| {
            s.reminder_domain
                .as_deref()
                .is_some_and(|domain| super::strip_www(domain) == host)
                && s.matches_activation_path(path)
        })
    }
}

fn trumf() -> Service {
    Service {
        id: "trumf".into(),
        name: "Trumf".into(),
        color: "#4D4DFF".into(),
        clickthrough_url: Some("https://trumfnetthandel.no/cashback/{urlName}".into()),
        reminder_domain: Some("trumfnetthandel.no".into()),
        cashback_path_patterns: vec!["/cashback/*".into()],
        default_enabled: true,
        kind: Some("cashback".into()),
        coming_soon: false,
    }
}

fn builtin_services() -> Vec<Service> {
    vec![
        trumf(),
        Service {
            id: "remember".into(),
            name: "re:member".into(),
            color: "#f28d00".into(),
            clickthrough_url: Some("https://www.remember.no/reward/rabatt/{urlName}".into()),
            reminder_domain: Some("remember.no".into()),
            cashback_path_patterns: vec!["/reward/rabatt/*".into()],
            default_enabled: false,
            kind: Some("cashback".into()),
            coming_soon: false,
        },
        Service {
            id: "dnb".into(),
            name: "DNB".into(),
            color: "#007272".into(),
            clickthrough_url: Some("https://www.dnb.no/kundeprogram/fordeler/{urlName}".into()),
            reminder_domain: Some("dnb.no".into()),
            cashback_path_patterns: vec!["/kundeprogram/fordeler/*".into()],
            default_enabled: false,
            kind: Some("bank".into()),
            coming_soon: false,
        },
        Service {
            id: "obos".into(),
            name: "OBOS".into(),
            color: "#0047ba".into(),
            clickthrough_url: None,
            reminder_domain: None,
            cashback_path_patterns: Vec::new(),
            default_enabled: false,
            kind: Some("membership".into()),
            coming_soon: true,
        },
    ]
}
