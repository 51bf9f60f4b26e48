mod adapter;
mod client;
mod credentials;
mod phone;
mod types;

pub use adapter::MobileMoneyAdapter;
pub use client::{HttpGateway, MobileMoneyGateway};
pub use credentials::CredentialCache;
pub use phone::normalize_msisdn;
pub use types::{CallbackPayload, GatewayOutcome, PushInitiation, StkCallback};

#[cfg(test)]
pub use client::MockMobileMoneyGateway;
