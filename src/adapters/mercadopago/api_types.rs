//! Wire types for the Mercado Pago REST API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ports::{GatewayRecord, Preference, PreferenceItem, PreferenceRequest};

#[derive(Debug, Serialize)]
pub struct MpPreferenceBody<'a> {
    pub items: &'a [PreferenceItem],
    pub metadata: &'a BTreeMap<String, String>,
    pub back_urls: MpBackUrls<'a>,
    /// Redirect automatically to the success URL once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<&'static str>,
    pub external_reference: &'a str,
    pub notification_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MpBackUrls<'a> {
    pub success: &'a str,
    pub failure: &'a str,
    pub pending: &'a str,
}

impl<'a> MpPreferenceBody<'a> {
    pub fn from_request(request: &'a PreferenceRequest) -> Self {
        let back_urls = MpBackUrls {
            success: &request.back_urls.success,
            failure: &request.back_urls.failure,
            pending: &request.back_urls.pending,
        };
        Self {
            items: &request.items,
            metadata: &request.metadata,
            auto_return: (!request.back_urls.success.is_empty()).then_some("approved"),
            back_urls,
            external_reference: &request.external_reference,
            notification_url: &request.notification_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MpPreference {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

impl From<MpPreference> for Preference {
    fn from(p: MpPreference) -> Self {
        Preference {
            id: p.id,
            init_point: p.init_point,
            sandbox_init_point: p.sandbox_init_point,
        }
    }
}

/// Payment ids arrive as JSON numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MpId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for MpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpId::Number(n) => write!(f, "{}", n),
            MpId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MpPayment {
    pub id: MpId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<f64>,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl From<MpPayment> for GatewayRecord {
    fn from(p: MpPayment) -> Self {
        GatewayRecord {
            id: p.id.to_string(),
            status: p.status,
            transaction_amount: p.transaction_amount,
            currency_id: p.currency_id,
            payment_method_id: p.payment_method_id,
            external_reference: p.external_reference.filter(|r| !r.is_empty()),
            metadata: p.metadata,
        }
    }
}
