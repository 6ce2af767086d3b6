use std::collections::BTreeMap;

use serde_json::Value;

use crate::app::{BonusError, Result};
use crate::domain::{FeedDocument, MerchantRecord};

/// Turns a raw feed body into a validated [`FeedDocument`].
///
/// A body is accepted when it is a JSON object whose `merchants` member is a
/// non-null object. Individual merchant entries that do not match either the
/// unified or the legacy shape are dropped rather than failing the document;
/// inside a unified entry, broken offers are dropped one by one.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<FeedDocument> {
        let value: Value = serde_json::from_slice(body)?;
        self.normalize_value(value)
    }

    pub fn normalize_value(&self, value: Value) -> Result<FeedDocument> {
        if !is_valid_feed(&value) {
            return Err(BonusError::InvalidFeed(
                "missing or non-object `merchants`".into(),
            ));
        }

        let Value::Object(mut root) = value else {
            return Err(BonusError::InvalidFeed("document is not an object".into()));
        };

        let services = match root.remove("services") {
            Some(Value::Object(map)) => Some(map.into_iter().collect::<BTreeMap<_, _>>()),
            Some(Value::Null) | None => None,
            Some(other) => {
                tracing::warn!(kind = %json_kind(&other), "Ignoring non-object `services` in feed");
                None
            }
        };

        let Some(Value::Object(raw_merchants)) = root.remove("merchants") else {
            return Err(BonusError::InvalidFeed("merchants disappeared".into()));
        };

        let mut merchants = BTreeMap::new();
        for (host, raw) in raw_merchants {
            match serde_json::from_value::<MerchantRecord>(raw) {
                Ok(record) => {
                    merchants.insert(host, record);
                }
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Dropping malformed merchant entry");
                }
            }
        }

        Ok(FeedDocument {
            services,
            merchants,
        })
    }
}

/// Shape check applied both when a fetch is accepted and when the cache is read.
pub fn is_valid_feed(value: &Value) -> bool {
    value
        .get("merchants")
        .is_some_and(|merchants| merchants.is_object())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
