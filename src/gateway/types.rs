use serde::{Deserialize, Serialize};

/// Gateway result codes with a defined meaning for reconciliation.
pub mod result_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_CANCELLED: i32 = 1032;
    pub const TIMEOUT: i32 = 1037;
}

/// Correlation ids returned when a push-payment request is accepted.
#[derive(Debug, Clone)]
pub struct PushInitiation {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: String,
}

/// Terminal (or not-yet-terminal) outcome of a tracked gateway request, as
/// seen by a status query or callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Request confirmed; receipt id present when the gateway supplied one.
    Completed { receipt_number: Option<String> },
    Cancelled,
    Timeout,
    Failed { code: i32, description: String },
    /// The gateway has not resolved the request yet.
    StillPending,
}

impl GatewayOutcome {
    /// Maps a gateway result code to an outcome.
    pub fn from_result_code(code: i32, description: &str, receipt: Option<String>) -> Self {
        match code {
            result_codes::SUCCESS => GatewayOutcome::Completed {
                receipt_number: receipt,
            },
            result_codes::USER_CANCELLED => GatewayOutcome::Cancelled,
            result_codes::TIMEOUT => GatewayOutcome::Timeout,
            other => GatewayOutcome::Failed {
                code: other,
                description: description.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes (gateway JSON, PascalCase field names)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Seconds, but delivered as a string by the gateway.
    pub expires_in: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: String,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    pub response_code: String,
    pub response_description: String,
    pub customer_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryResponse {
    pub response_code: String,
    /// Absent while the request is still processing.
    pub result_code: Option<String>,
    pub result_desc: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PayoutRequest {
    pub originator_conversation_id: String,
    pub initiator_name: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    pub amount: String,
    pub party_a: String,
    pub party_b: String,
    pub remarks: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PayoutResponse {
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
    #[serde(rename = "ConversationID")]
    pub conversation_id: String,
    pub response_code: String,
    pub response_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReversalQueryResponse {
    pub result_code: i32,
    pub result_desc: String,
    /// True when the gateway reports the transaction was reversed on its side.
    pub reversed: bool,
}

/// Inbound callback payload (`Body.stkCallback`).
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    pub result_code: i32,
    pub result_desc: String,
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackMetadata {
    pub item: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataItem {
    pub name: String,
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    /// Pulls the gateway receipt id out of the metadata items, when present.
    pub fn receipt_number(&self) -> Option<String> {
        self.callback_metadata.as_ref().and_then(|meta| {
            meta.item
                .iter()
                .find(|item| item.name == "MpesaReceiptNumber")
                .and_then(|item| item.value.as_ref())
                .and_then(|value| value.as_str().map(str::to_string))
        })
    }

    pub fn outcome(&self) -> GatewayOutcome {
        GatewayOutcome::from_result_code(self.result_code, &self.result_desc, self.receipt_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_CALLBACK: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": 100.00},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "PhoneNumber", "Value": 254712345678}
                    ]
                }
            }
        }
    }"#;

    const CANCELLED_CALLBACK: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-2",
                "CheckoutRequestID": "ws_CO_191220191020363926",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    }"#;

    #[test]
    fn test_parse_success_callback() {
        let payload: CallbackPayload = serde_json::from_str(SUCCESS_CALLBACK).unwrap();
        let callback = payload.body.stk_callback;
        assert_eq!(callback.result_code, 0);
        assert_eq!(callback.receipt_number().as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(
            callback.outcome(),
            GatewayOutcome::Completed {
                receipt_number: Some("NLJ7RT61SV".to_string())
            }
        );
    }

    #[test]
    fn test_parse_cancelled_callback() {
        let payload: CallbackPayload = serde_json::from_str(CANCELLED_CALLBACK).unwrap();
        let callback = payload.body.stk_callback;
        assert!(callback.receipt_number().is_none());
        assert_eq!(callback.outcome(), GatewayOutcome::Cancelled);
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            GatewayOutcome::from_result_code(0, "ok", None),
            GatewayOutcome::Completed {
                receipt_number: None
            }
        );
        assert_eq!(
            GatewayOutcome::from_result_code(1032, "cancelled", None),
            GatewayOutcome::Cancelled
        );
        assert_eq!(
            GatewayOutcome::from_result_code(1037, "timeout", None),
            GatewayOutcome::Timeout
        );
        assert!(matches!(
            GatewayOutcome::from_result_code(2001, "wrong pin", None),
            GatewayOutcome::Failed { code: 2001, .. }
        ));
    }

    #[test]
    fn test_stk_push_request_serializes_pascal_case() {
        let request = StkPushRequest {
            business_short_code: "174379".to_string(),
            password: "cGFzcw==".to_string(),
            timestamp: "20260807120000".to_string(),
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: "100".to_string(),
            party_a: "254712345678".to_string(),
            party_b: "174379".to_string(),
            phone_number: "254712345678".to_string(),
            callback_url: "https://bank.example/callback".to_string(),
            account_reference: "0001000123".to_string(),
            transaction_desc: "deposit".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("BusinessShortCode").is_some());
        assert!(json.get("CallBackURL").is_some());
        assert!(json.get("PhoneNumber").is_some());
    }
}
