use serde::Serialize;

use super::Service;

/// The single best offer selected for the page being visited.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Feed key the merchant was found under; may differ from the visited host.
    pub host_name: String,
    pub merchant_name: String,
    pub service_id: String,
    pub url_name: String,
    pub cashback_description: String,
    pub code: Option<String>,
    pub service: Service,
    pub clickthrough_url: Option<String>,
}
