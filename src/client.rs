//! Signed-request client for the CoinPayments API

use crate::command::Command;
use crate::crypto::{sign_and_encode, SignedRequest, HMAC_HEADER};
use crate::types::*;
use crate::{CoinPaymentsError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Client for the CoinPayments merchant API
#[derive(Debug, Clone)]
pub struct CoinPaymentsClient {
    /// Underlying HTTP client
    client: Client,
    /// Merchant credentials
    credentials: Credentials,
    /// API endpoint
    api_url: String,
}

impl CoinPaymentsClient {
    /// Create a client for the default endpoint
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(ClientConfig::new(credentials))
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = &config.user_agent {
            client_builder = client_builder.user_agent(user_agent.as_str());
        }

        let client = client_builder.build().map_err(|e| {
            CoinPaymentsError::config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            credentials: config.credentials,
            api_url: config.api_url,
        })
    }

    /// Create a client from `COINPAYMENTS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// The credentials this client signs with
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The API endpoint
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Encode `params` and sign them with the private key
    pub fn sign_and_encode(&self, params: &Params) -> SignedRequest {
        sign_and_encode(&self.credentials.private_key, params)
    }

    /// Merge the fixed fields of `command` over the caller's parameters
    pub fn build_params(&self, command: Command, extra: Option<Params>) -> Params {
        let mut params = extra.unwrap_or_default();

        params
            .set("cmd", command.name())
            .set("key", &self.credentials.public_key)
            .set("version", API_VERSION)
            .set("format", RESPONSE_FORMAT);

        if command.needs_callback_url() {
            params.set("ipn_url", &self.credentials.ipn_url);
        }

        params
    }

    /// Send a signed request and return the `result` field of the response
    ///
    /// Non-2xx responses are parsed like any other; their status is reported
    /// through the returned error when the body carries no result.
    pub async fn send_request(&self, method: RequestMethod, params: &Params) -> Result<Value> {
        let signed = self.sign_and_encode(params);

        let request = match method {
            RequestMethod::Get => {
                let mut url = self.api_url.clone();
                if !signed.encoded_body.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(signed.encoded_str());
                }
                self.client.get(url)
            }
            RequestMethod::Post => self
                .client
                .post(&self.api_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(signed.encoded_body.clone()),
        };

        let response = request
            .header(HMAC_HEADER, signed.signature.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "CoinPayments API returned non-success status");
        }

        let body = response.bytes().await?;
        parse_response(status, &body)
    }

    /// POST a command and return its raw result
    pub async fn call(&self, command: Command, params: Option<Params>) -> Result<Value> {
        let params = self.build_params(command, params);
        debug!(command = command.name(), "calling CoinPayments API");
        self.send_request(RequestMethod::Post, &params).await
    }

    /// POST a command and decode its result into `T`
    pub async fn call_as<T>(&self, command: Command, params: Option<Params>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let result = self.call(command, params).await?;
        serde_json::from_value(result).map_err(|source| CoinPaymentsError::Decode {
            command: command.name().to_string(),
            source,
        })
    }

    /// Create a transaction for a buyer to pay
    ///
    /// Usually takes `amount`, `currency1`, `currency2` and `buyer_email`.
    pub async fn create_transaction(&self, params: Option<Params>) -> Result<CreateTransaction> {
        self.call_as(Command::CreateTransaction, params).await
    }

    /// Merchant account details for the API key
    pub async fn get_basic_info(&self, params: Option<Params>) -> Result<BasicInfo> {
        self.call_as(Command::GetBasicInfo, params).await
    }

    /// Current exchange rates, keyed by coin ticker
    pub async fn rates(&self, params: Option<Params>) -> Result<HashMap<String, Rate>> {
        self.call_as(Command::Rates, params).await
    }

    /// Wallet balances, keyed by coin ticker
    pub async fn balances(&self, params: Option<Params>) -> Result<HashMap<String, Balance>> {
        self.call_as(Command::Balances, params).await
    }

    /// An address for personal deposits
    pub async fn get_deposit_address(&self, params: Option<Params>) -> Result<CallbackAddress> {
        self.call_as(Command::GetDepositAddress, params).await
    }

    /// An address whose deposits are reported to the notification URL
    pub async fn get_callback_address(&self, params: Option<Params>) -> Result<CallbackAddress> {
        self.call_as(Command::GetCallbackAddress, params).await
    }

    /// Transfer coins to another CoinPayments account by merchant ID
    pub async fn create_transfer(&self, params: Option<Params>) -> Result<Transfer> {
        self.call_as(Command::CreateTransfer, params).await
    }

    /// Withdraw coins to an external address
    pub async fn create_withdrawal(&self, params: Option<Params>) -> Result<Withdrawal> {
        self.call_as(Command::CreateWithdrawal, params).await
    }

    /// Convert a balance from one coin to another
    pub async fn convert_coins(&self, params: Option<Params>) -> Result<Conversion> {
        self.call_as(Command::Convert, params).await
    }

    /// Recent withdrawals (up to 100)
    pub async fn get_withdrawal_history(
        &self,
        params: Option<Params>,
    ) -> Result<Vec<WithdrawalInfo>> {
        self.call_as(Command::GetWithdrawalHistory, params).await
    }

    /// A single withdrawal by ID
    pub async fn get_withdrawal_info(&self, params: Option<Params>) -> Result<WithdrawalInfo> {
        self.call_as(Command::GetWithdrawalInfo, params).await
    }

    /// A single conversion by ID
    pub async fn get_conversion_info(&self, params: Option<Params>) -> Result<ConversionInfo> {
        self.call_as(Command::GetConversionInfo, params).await
    }
}

/// Turn a response body into the value of its `result` field
///
/// A `"result": null` is returned as `Value::Null`; only an absent field is
/// treated as missing.
pub fn parse_response(status: StatusCode, body: &[u8]) -> Result<Value> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|source| CoinPaymentsError::Parse { status, source })?;

    let Some(envelope) = ApiEnvelope::from_value(body) else {
        return Err(CoinPaymentsError::MissingResult {
            status,
            error: None,
        });
    };

    if let Some(message) = envelope.error_message() {
        warn!(%status, error = message, "CoinPayments API reported an error");
    }

    match envelope {
        ApiEnvelope {
            result: None,
            error,
        } => Err(CoinPaymentsError::MissingResult { status, error }),
        ApiEnvelope {
            result: Some(_),
            error: Some(message),
        } if message != "ok" => Err(CoinPaymentsError::api(status, message)),
        ApiEnvelope {
            result: Some(result),
            ..
        } => Ok(result),
    }
}
