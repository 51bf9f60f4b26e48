use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GatewaySettings;
use crate::error::{AppError, Result};
use crate::gateway::credentials::CredentialCache;
use crate::gateway::types::{
    AccessTokenResponse, GatewayOutcome, PayoutRequest, PayoutResponse, PushInitiation,
    ReversalQueryResponse, StkPushRequest, StkPushResponse, StkQueryRequest, StkQueryResponse,
};

/// Seam between the core and the mobile-money gateway. The reconciliation
/// scheduler and the adapter depend on this trait, not on HTTP.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    /// Submits a push-payment (customer-to-business) initiation.
    async fn initiate_push(
        &self,
        phone_number: &str,
        amount: Decimal,
        account_reference: &str,
    ) -> Result<PushInitiation>;

    /// Submits a business-to-customer payout.
    async fn initiate_payout(
        &self,
        phone_number: &str,
        amount: Decimal,
        remarks: &str,
    ) -> Result<PushInitiation>;

    /// Queries the current outcome of an initiated push-payment.
    async fn query_status(&self, checkout_request_id: &str) -> Result<GatewayOutcome>;

    /// Asks whether the gateway has reversed a confirmed transaction.
    async fn query_reversal(&self, receipt_number: &str) -> Result<bool>;
}

/// HTTPS client for the gateway. Obtains and caches the bearer credential
/// (single-flight refresh), formats the timestamped password, and maps
/// transport failures to `GatewayUnavailable` so they are never mistaken
/// for a settled outcome.
pub struct HttpGateway {
    http: reqwest::Client,
    settings: GatewaySettings,
    credentials: CredentialCache,
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("http client build failed: {e}")))?;

        let credentials = CredentialCache::new(Duration::from_secs(
            settings.credential_refresh_margin_secs,
        ));

        Ok(Self {
            http,
            settings,
            credentials,
        })
    }

    /// `base64(short_code + passkey + timestamp)`, with the timestamp the
    /// gateway expects (`YYYYMMDDHHMMSS`).
    fn password(&self, timestamp: &str) -> String {
        BASE64.encode(format!(
            "{}{}{}",
            self.settings.short_code, self.settings.passkey, timestamp
        ))
    }

    fn timestamp() -> String {
        Utc::now().format("%Y%m%d%H%M%S").to_string()
    }

    async fn bearer_token(&self) -> Result<String> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.settings.base_url
        );
        let http = self.http.clone();
        let key = self.settings.consumer_key.clone();
        let secret = self.settings.consumer_secret.clone();

        self.credentials
            .get_or_refresh(|| async move {
                debug!("refreshing gateway credential");
                let response = http
                    .get(&url)
                    .basic_auth(&key, Some(&secret))
                    .send()
                    .await
                    .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(AppError::GatewayError {
                        code: response.status().to_string(),
                        message: "credential request rejected".to_string(),
                    });
                }

                let body: AccessTokenResponse = response
                    .json()
                    .await
                    .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

                let ttl = body.expires_in.parse::<u64>().unwrap_or(3600);
                Ok((body.access_token, Duration::from_secs(ttl)))
            })
            .await
    }

    async fn post_json<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let token = self.bearer_token().await?;
        let url = format!("{}{}", self.settings.base_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Stale credential; next call refreshes.
            self.credentials.invalidate().await;
            return Err(AppError::GatewayUnavailable(
                "credential rejected, will refresh".to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "gateway request failed");
            return Err(AppError::GatewayError {
                code: status.to_string(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))
    }
}

#[async_trait]
impl MobileMoneyGateway for HttpGateway {
    async fn initiate_push(
        &self,
        phone_number: &str,
        amount: Decimal,
        account_reference: &str,
    ) -> Result<PushInitiation> {
        let timestamp = Self::timestamp();
        let request = StkPushRequest {
            business_short_code: self.settings.short_code.clone(),
            password: self.password(&timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: amount.normalize().to_string(),
            party_a: phone_number.to_string(),
            party_b: self.settings.short_code.clone(),
            phone_number: phone_number.to_string(),
            callback_url: self.settings.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: "account deposit".to_string(),
        };

        let response: StkPushResponse = self
            .post_json("/mpesa/stkpush/v1/processrequest", &request)
            .await?;

        if response.response_code != "0" {
            return Err(AppError::GatewayError {
                code: response.response_code,
                message: response.response_description,
            });
        }

        Ok(PushInitiation {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
            customer_message: response.customer_message,
        })
    }

    async fn initiate_payout(
        &self,
        phone_number: &str,
        amount: Decimal,
        remarks: &str,
    ) -> Result<PushInitiation> {
        let request = PayoutRequest {
            originator_conversation_id: Uuid::new_v4().to_string(),
            initiator_name: self.settings.short_code.clone(),
            security_credential: self.password(&Self::timestamp()),
            command_id: "BusinessPayment".to_string(),
            amount: amount.normalize().to_string(),
            party_a: self.settings.short_code.clone(),
            party_b: phone_number.to_string(),
            remarks: remarks.to_string(),
            result_url: self.settings.callback_url.clone(),
        };

        let response: PayoutResponse = self
            .post_json("/mpesa/b2c/v1/paymentrequest", &request)
            .await?;

        if response.response_code != "0" {
            return Err(AppError::GatewayError {
                code: response.response_code,
                message: response.response_description,
            });
        }

        Ok(PushInitiation {
            merchant_request_id: response.originator_conversation_id,
            checkout_request_id: response.conversation_id,
            customer_message: response.response_description,
        })
    }

    async fn query_status(&self, checkout_request_id: &str) -> Result<GatewayOutcome> {
        let timestamp = Self::timestamp();
        let request = StkQueryRequest {
            business_short_code: self.settings.short_code.clone(),
            password: self.password(&timestamp),
            timestamp,
            checkout_request_id: checkout_request_id.to_string(),
        };

        let response: StkQueryResponse =
            self.post_json("/mpesa/stkpushquery/v1/query", &request).await?;

        match response.result_code.as_deref() {
            // No result code yet: the gateway is still processing.
            None => Ok(GatewayOutcome::StillPending),
            Some(code) => {
                let code: i32 = code.parse().map_err(|_| AppError::GatewayError {
                    code: code.to_string(),
                    message: "unparseable result code".to_string(),
                })?;
                Ok(GatewayOutcome::from_result_code(
                    code,
                    response.result_desc.as_deref().unwrap_or_default(),
                    None,
                ))
            }
        }
    }

    async fn query_reversal(&self, receipt_number: &str) -> Result<bool> {
        let response: ReversalQueryResponse = self
            .post_json(
                "/mpesa/transactionstatus/v1/query",
                &serde_json::json!({
                    "TransactionID": receipt_number,
                    "PartyA": self.settings.short_code,
                    "IdentifierType": "4",
                }),
            )
            .await?;

        Ok(response.reversed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            base_url: "https://sandbox.gateway.example".to_string(),
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            short_code: "174379".to_string(),
            passkey: "passkey".to_string(),
            callback_url: "https://bank.example/callback".to_string(),
            request_timeout_secs: 5,
            credential_refresh_margin_secs: 60,
            simulate_completion: false,
        }
    }

    #[test]
    fn test_password_is_base64_of_shortcode_passkey_timestamp() {
        let gateway = HttpGateway::new(settings()).unwrap();
        let password = gateway.password("20260807120000");
        let decoded = BASE64.decode(password).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "174379passkey20260807120000"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = HttpGateway::timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_trait_object_seam_with_mock() {
        let mut mock = MockMobileMoneyGateway::new();
        mock.expect_query_status()
            .returning(|_| Ok(GatewayOutcome::StillPending));
        mock.expect_query_reversal().returning(|_| Ok(false));

        let gateway: Arc<dyn MobileMoneyGateway> = Arc::new(mock);
        assert_eq!(
            gateway.query_status("ws_CO_X").await.unwrap(),
            GatewayOutcome::StillPending
        );
        assert!(!gateway.query_reversal("ABC").await.unwrap());
    }
}
