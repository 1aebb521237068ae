//! Core types for the CoinPayments API

use crate::{CoinPaymentsError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "https://www.coinpayments.net/api.php";

/// API version sent with every command
pub const API_VERSION: u32 = 1;

/// Response format sent with every command
pub const RESPONSE_FORMAT: &str = "json";

/// Merchant credentials used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Public API key, sent as `key`
    pub public_key: String,
    /// Private API key, used as the HMAC key
    pub private_key: String,
    /// Notification callback URL, sent as `ipn_url` where a command accepts one
    pub ipn_url: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("ipn_url", &self.ipn_url)
            .finish()
    }
}

impl Credentials {
    /// Create a new set of credentials
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        ipn_url: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            ipn_url: ipn_url.into(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Merchant credentials
    pub credentials: Credentials,
    /// API endpoint
    pub api_url: String,
    /// Request timeout; reqwest's default when unset
    pub timeout: Option<Duration>,
    /// User-Agent header override
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Create a config for the default endpoint
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: None,
            user_agent: None,
        }
    }

    /// Build a config from `COINPAYMENTS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let credentials = Credentials::new(
            required_env("COINPAYMENTS_PUBLIC_KEY")?,
            required_env("COINPAYMENTS_PRIVATE_KEY")?,
            std::env::var("COINPAYMENTS_IPN_URL").unwrap_or_default(),
        );

        let mut config = Self::new(credentials);

        if let Ok(api_url) = std::env::var("COINPAYMENTS_API_URL") {
            config = config.with_api_url(api_url);
        }

        if let Ok(timeout) = std::env::var("COINPAYMENTS_TIMEOUT_SECS") {
            let secs: u64 = timeout.parse().map_err(|_| {
                CoinPaymentsError::config(format!(
                    "COINPAYMENTS_TIMEOUT_SECS must be a whole number of seconds, got {}",
                    timeout
                ))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.credentials.public_key.is_empty() {
            return Err(CoinPaymentsError::config("Public key cannot be empty"));
        }

        if self.credentials.private_key.is_empty() {
            return Err(CoinPaymentsError::config("Private key cannot be empty"));
        }

        let url = url::Url::parse(&self.api_url).map_err(|e| {
            CoinPaymentsError::config(format!("Invalid API URL {}: {}", self.api_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CoinPaymentsError::config(
                "API URL must start with http:// or https://",
            ));
        }

        Ok(())
    }

    /// Set the API endpoint
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| CoinPaymentsError::config(format!("Environment variable {} not found", name)))
}

/// HTTP method used for a signed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    /// Parameters travel in the query string
    Get,
    /// Parameters travel as a form-encoded body
    Post,
}

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Decimal(d) => write!(f, "{}", d),
            // The API takes 0/1 for boolean switches like auto_confirm
            ParamValue::Flag(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        ParamValue::Decimal(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

/// Request parameters, kept in sorted key order
///
/// The signature covers the encoded bytes, so the encoding must be the same
/// on every call regardless of the order parameters were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`Params::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a parameter
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// True when the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in encoding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encode as `application/x-www-form-urlencoded`
    pub fn to_form_urlencoded(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, &value.to_string());
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Top-level shape of every API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiEnvelope {
    /// `"ok"` on success, otherwise a description of the failure
    pub error: Option<String>,
    /// Command-specific payload; `None` only when the field is absent
    pub result: Option<Value>,
}

impl ApiEnvelope {
    /// Split a decoded body into its `error` and `result` fields
    ///
    /// Returns `None` unless the body is a JSON object.
    pub fn from_value(body: Value) -> Option<Self> {
        let Value::Object(mut fields) = body else {
            return None;
        };

        let error = match fields.remove("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message),
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            error,
            result: fields.remove("result"),
        })
    }

    /// The API's error text, unless it reports success
    pub fn error_message(&self) -> Option<&str> {
        match self.error.as_deref() {
            None | Some("ok") => None,
            Some(message) => Some(message),
        }
    }
}

/// Result of `create_transaction`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransaction {
    pub amount: Decimal,
    pub txn_id: String,
    pub address: String,
    pub confirms_needed: Decimal,
    /// Seconds until the buyer's payment window closes
    pub timeout: u64,
    pub checkout_url: String,
    pub status_url: String,
    pub qrcode_url: String,
    #[serde(default)]
    pub dest_tag: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `get_basic_info`
#[derive(Debug, Clone, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub username: Option<String>,
    pub merchant_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub public_name: Option<String>,
    #[serde(default)]
    pub time_joined: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl BasicInfo {
    /// Account creation time
    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.time_joined.and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

/// One entry of the `rates` result, keyed by coin ticker
#[derive(Debug, Clone, Deserialize)]
pub struct Rate {
    pub is_fiat: u8,
    pub rate_btc: Decimal,
    #[serde(default)]
    pub last_update: Option<Value>,
    #[serde(default)]
    pub tx_fee: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confirms: Option<Value>,
    #[serde(default)]
    pub accepted: Option<u8>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One entry of the `balances` result, keyed by coin ticker
#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    /// Balance in the coin's smallest unit
    pub balance: i64,
    /// Balance as a decimal amount
    pub balancef: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub coin_status: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `get_deposit_address` and `get_callback_address`
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackAddress {
    pub address: String,
    #[serde(default)]
    pub pubkey: Option<String>,
    #[serde(default)]
    pub dest_tag: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `create_transfer`
#[derive(Debug, Clone, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub status: i32,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `create_withdrawal`
#[derive(Debug, Clone, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub status: i32,
    pub amount: Decimal,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `convert`
#[derive(Debug, Clone, Deserialize)]
pub struct Conversion {
    pub id: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Result of `get_withdrawal_info`, and entries of `get_withdrawal_history`
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub time_created: i64,
    pub status: i32,
    pub status_text: String,
    pub coin: String,
    pub amount: i64,
    pub amountf: Decimal,
    pub send_address: String,
    #[serde(default)]
    pub send_txid: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl WithdrawalInfo {
    /// Creation time
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time_created, 0)
    }
}

/// Result of `get_conversion_info`
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionInfo {
    pub time_created: i64,
    pub status: i32,
    pub status_text: String,
    pub coin1: String,
    pub coin2: String,
    pub amount_sent: i64,
    pub amount_sentf: Decimal,
    #[serde(default)]
    pub received: Option<i64>,
    #[serde(default)]
    pub receivedf: Option<Decimal>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ConversionInfo {
    /// Creation time
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time_created, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_params_encode_in_sorted_order() {
        let mut params = Params::new();
        params.set("version", 1).set("cmd", "rates").set("key", "pub");

        assert_eq!(params.to_form_urlencoded(), "cmd=rates&key=pub&version=1");
    }

    #[test]
    fn test_params_escape_values() {
        let params = Params::new().with("a", "x y&z").with("b", "é");
        assert_eq!(params.to_form_urlencoded(), "a=x+y%26z&b=%C3%A9");
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::from(true).to_string(), "1");
        assert_eq!(ParamValue::from(false).to_string(), "0");
        assert_eq!(ParamValue::from(42i64).to_string(), "42");
        assert_eq!(
            ParamValue::from(Decimal::from_str("10.50").unwrap()).to_string(),
            "10.50"
        );
    }

    #[test]
    fn test_params_from_iter_replaces_duplicates() {
        let params: Params = vec![("amount", "1"), ("amount", "2")].into_iter().collect();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("amount"), Some(&ParamValue::from("2")));
    }

    #[test]
    fn test_credentials_debug_redacts_private_key() {
        let credentials = Credentials::new("pub", "very-secret", "https://shop.example.com/ipn");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_config_validation() {
        let credentials = Credentials::new("pub", "priv", "");
        assert!(ClientConfig::new(credentials.clone()).validate().is_ok());

        let config = ClientConfig::new(credentials.clone()).with_api_url("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(CoinPaymentsError::Config { .. })
        ));

        let config = ClientConfig::new(Credentials::new("", "priv", ""));
        assert!(config.validate().is_err());

        let config = ClientConfig::new(Credentials::new("pub", "", ""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new(Credentials::new("pub", "priv", ""))
            .with_api_url("http://localhost:1234/api.php")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("shop/1.0");

        assert_eq!(config.api_url, "http://localhost:1234/api.php");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent.as_deref(), Some("shop/1.0"));
    }

    #[test]
    fn test_envelope_error_message() {
        let ok = ApiEnvelope::from_value(json!({"error": "ok", "result": {}})).unwrap();
        assert_eq!(ok.error_message(), None);

        let failed = ApiEnvelope::from_value(json!({"error": "Invalid command"})).unwrap();
        assert_eq!(failed.error_message(), Some("Invalid command"));
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_envelope_requires_object() {
        assert_eq!(ApiEnvelope::from_value(json!(["ok", {"a": 1}])), None);
        assert_eq!(ApiEnvelope::from_value(json!("ok")), None);
    }

    #[test]
    fn test_envelope_keeps_null_result() {
        let envelope = ApiEnvelope::from_value(json!({"error": "ok", "result": null})).unwrap();
        assert_eq!(envelope.result, Some(Value::Null));

        let envelope = ApiEnvelope::from_value(json!({"error": 42})).unwrap();
        assert_eq!(envelope.error.as_deref(), Some("42"));
    }

    #[test]
    fn test_create_transaction_accepts_string_amounts() {
        let result: CreateTransaction = serde_json::from_value(json!({
            "amount": "0.00123000",
            "txn_id": "CPABC123",
            "address": "bc1qexample",
            "confirms_needed": "2",
            "timeout": 9000,
            "checkout_url": "https://www.coinpayments.net/index.php?cmd=checkout&id=CPABC123",
            "status_url": "https://www.coinpayments.net/index.php?cmd=status&id=CPABC123",
            "qrcode_url": "https://www.coinpayments.net/qrgen.php?id=CPABC123"
        }))
        .unwrap();

        assert_eq!(result.amount, Decimal::from_str("0.00123").unwrap());
        assert_eq!(result.confirms_needed, Decimal::from(2));
        assert_eq!(result.timeout, 9000);
        assert!(result.extra.is_empty());
    }

    #[test]
    fn test_withdrawal_info_timestamp() {
        let info: WithdrawalInfo = serde_json::from_value(json!({
            "time_created": 1700000000,
            "status": 2,
            "status_text": "Complete",
            "coin": "BTC",
            "amount": 100000,
            "amountf": "0.00100000",
            "send_address": "bc1qexample",
            "send_txid": "abcdef"
        }))
        .unwrap();

        assert_eq!(info.created_at().unwrap().timestamp(), 1700000000);
        assert_eq!(info.amountf, Decimal::from_str("0.001").unwrap());
    }
}
