//! Billing query.
//!
//! Display-only account balance lookup; never on the request path.

use super::{ApiConfig, ensure_success};
use crate::error::ChatError;
use secrecy::ExposeSecret;
use serde::Deserialize;

/// Credit grant totals for the configured credential.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreditGrants {
    pub total_granted: f64,
    pub total_available: f64,
    pub total_used: f64,
}

/// GET the credit grants for the configured credential.
pub async fn get_credit_grants(
    client: &reqwest::Client,
    config: &ApiConfig,
) -> Result<CreditGrants, ChatError> {
    let response = client
        .get(config.endpoint("/dashboard/billing/credit_grants"))
        .bearer_auth(config.api_key.expose_secret())
        .send()
        .await
        .map_err(|e| ChatError::Http(format!("request failed: {e}")))?;
    let response = ensure_success(response).await?;
    response
        .json::<CreditGrants>()
        .await
        .map_err(|e| ChatError::Parse(format!("invalid billing response: {e}")))
}
