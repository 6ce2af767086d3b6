use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Service id that legacy (offer-less) merchant records implicitly belong to.
pub const LEGACY_SERVICE_ID: &str = "trumf";

/// The merchant feed as published by the feed source.
///
/// `services` is kept as raw JSON per entry: descriptors are validated one by
/// one when the [`ServiceRegistry`](super::ServiceRegistry) is built, so a
/// single broken entry never invalidates the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, Value>>,
    pub merchants: BTreeMap<String, MerchantRecord>,
}

impl FeedDocument {
    pub fn merchant(&self, host: &str) -> Option<&MerchantRecord> {
        self.merchants.get(host)
    }

    /// Every hostname published by the feed, in key order.
    pub fn host_index(&self) -> Vec<String> {
        self.merchants.keys().cloned().collect()
    }
}

/// A merchant entry, discriminated by the presence of an `offers` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MerchantRecord {
    Unified(UnifiedMerchant),
    Legacy(LegacyMerchant),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMerchant {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

/// Older feed format: a single Trumf offer flattened onto the merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMerchant {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url_name: String,
    #[serde(default)]
    pub cashback_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub service_id: String,
    #[serde(default)]
    pub url_name: String,
    #[serde(default)]
    pub cashback_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<'de> Deserialize<'de> for MerchantRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MerchantRecord::from_value(value).map_err(de::Error::custom)
    }
}

impl MerchantRecord {
    /// A record with an `offers` key is unified, however broken its offers
    /// are; only records without one are legacy.
    ///
    /// Offers that fail to parse are dropped one by one. A non-array `offers`
    /// rejects the whole record.
    pub fn from_value(mut value: Value) -> serde_json::Result<Self> {
        let Some(fields) = value.as_object_mut() else {
            return Err(de::Error::custom("merchant entry is not an object"));
        };

        let raw_offers = match fields.remove("offers") {
            None => return serde_json::from_value(value).map(MerchantRecord::Legacy),
            Some(Value::Array(raw_offers)) => raw_offers,
            Some(_) => return Err(de::Error::custom("`offers` is not an array")),
        };

        let mut merchant: UnifiedMerchant = serde_json::from_value(value)?;
        merchant.offers = raw_offers
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Offer>(raw) {
                Ok(offer) => Some(offer),
                Err(e) => {
                    tracing::warn!(
                        merchant = %merchant.name,
                        error = %e,
                        "Dropping malformed offer"
                    );
                    None
                }
            })
            .collect();
        Ok(MerchantRecord::Unified(merchant))
    }

    pub fn name(&self) -> &str {
        match self {
            MerchantRecord::Unified(m) => &m.name,
            MerchantRecord::Legacy(m) => &m.name,
        }
    }

    pub fn host_name(&self) -> &str {
        match self {
            MerchantRecord::Unified(m) => &m.host_name,
            MerchantRecord::Legacy(m) => &m.host_name,
        }
    }

    /// All offers carried by the record. Legacy records yield one Trumf offer.
    pub fn offers(&self) -> Vec<Offer> {
        match self {
            MerchantRecord::Unified(m) => m.offers.clone(),
            MerchantRecord::Legacy(m) => vec![Offer {
                service_id: LEGACY_SERVICE_ID.to_string(),
                url_name: m.url_name.clone(),
                cashback_description: m.cashback_description.clone(),
                code: None,
            }],
        }
    }
}
