/*******************************************************************************
*   (c) 2020 ZondaX GmbH
*
*  Licensed under the Apache License, Version 2.0 (the "License");
*  you may not use this file except in compliance with the License.
*  You may obtain a copy of the License at
*
*      http://www.apache.org/licenses/LICENSE-2.0
*
*  Unless required by applicable law or agreed to in writing, software
*  distributed under the License is distributed on an "AS IS" BASIS,
*  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
*  See the License for the specific language governing permissions and
*  limitations under the License.
********************************************************************************/
//! Normalization of wallet-supplied transactions into device sign requests

use log::{debug, warn};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::coin::EthCoin;
use crate::keypath::{parse_keypath, Keypath};
use crate::params::ADDRESS_LEN;
use crate::Error;

/// Numeric transaction field as handed over by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Plain number
    Number(u64),
    /// Hex string, `0x` prefix optional
    Hex(String),
}

impl Quantity {
    /// True for `""`, `"0x"` and `0`, which count as an absent field
    pub fn is_empty(&self) -> bool {
        match self {
            Quantity::Number(n) => *n == 0,
            Quantity::Hex(s) => hex_digits(s).is_empty(),
        }
    }

    /// Reads the quantity as a 256-bit integer
    ///
    /// An empty hex string (`""` or `"0x"`) reads as zero.
    pub fn to_u256(&self, field: &'static str) -> Result<U256, Error> {
        let s = match self {
            Quantity::Number(n) => return Ok(U256::from(*n)),
            Quantity::Hex(s) => s,
        };

        let invalid = || Error::InvalidQuantity {
            field,
            value: s.clone(),
        };

        let digits = hex_digits(s);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        if digits.len() > 64 {
            return Err(invalid());
        }

        U256::from_str_radix(digits, 16).map_err(|_| invalid())
    }

    /// Reads the quantity as a `u64`, failing if it does not fit
    pub fn to_u64(&self, field: &'static str) -> Result<u64, Error> {
        let value = self.to_u256(field)?;
        if value.bits() > 64 {
            return Err(Error::InvalidQuantity {
                field,
                value: self.to_string(),
            });
        }
        Ok(value.low_u64())
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Number(n) => write!(f, "{}", n),
            Quantity::Hex(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Quantity {
    fn from(n: u64) -> Self {
        Quantity::Number(n)
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Quantity::Hex(s.to_owned())
    }
}

fn hex_digits(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Transaction fields of a [`RawSignRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Amount in wei
    pub value: Option<Quantity>,
    /// Calldata as hex; the top-level [`RawSignRequest::data`] is what gets signed
    pub data: Option<String>,
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: Option<Quantity>,
    /// Gas limit
    pub gas_limit: Quantity,
    /// Gas price in wei
    pub gas_price: Quantity,
}

/// Transaction to sign, as supplied by a wallet integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignRequest {
    /// Account number, informational only; the keypath selects the key
    #[serde(default)]
    pub account: u32,
    /// Recipient address
    #[serde(with = "crate::serde_hex")]
    pub recipient: Vec<u8>,
    /// Transaction fields
    pub tx: RawTransaction,
    /// Calldata
    #[serde(default, with = "crate::serde_hex")]
    pub data: Vec<u8>,
    /// Signing key, e.g. `m/44'/60'/0'/0/0`
    pub keypath: String,
}

/// Normalized request in the shape the signing device expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Network shown on the device
    pub coin: EthCoin,
    /// Signing key
    pub keypath: Keypath,
    /// Sender nonce
    pub nonce: u64,
    /// Gas price in wei, decimal
    pub gas_price: String,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient address, copied as given
    #[serde(with = "crate::serde_hex")]
    pub recipient: Vec<u8>,
    /// Amount in wei, decimal
    pub value: String,
    /// Calldata, copied as given
    #[serde(with = "crate::serde_hex")]
    pub data: Vec<u8>,
    /// EIP-155 chain id
    pub chain_id: u64,
}

/// Failure to build a [`SignRequest`]; the cause is the first field that failed
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("transaction data sanitization failed: {0}")]
pub struct SanitizationError(#[from] Error);

impl SanitizationError {
    /// Underlying failure
    pub fn cause(&self) -> &Error {
        &self.0
    }

    /// Consumes the error, returning the underlying failure
    pub fn into_cause(self) -> Error {
        self.0
    }
}

/// Normalizes a wallet transaction into a device [`SignRequest`]
///
/// Hex quantities are re-rendered as decimal strings without loss of
/// precision. `nonce` defaults to 0 and `value` to `"0"` when absent.
/// Recipient and data bytes are passed through without length checks.
pub fn sanitize(raw: &RawSignRequest) -> Result<SignRequest, SanitizationError> {
    let coin = EthCoin::from_chain_id(raw.tx.chain_id)?;
    let keypath = parse_keypath(&raw.keypath)?;

    let nonce = match &raw.tx.nonce {
        Some(nonce) if !nonce.is_empty() => nonce.to_u64("nonce")?,
        _ => 0,
    };
    let gas_price = raw.tx.gas_price.to_u256("gasPrice")?.to_string();
    let gas_limit = raw.tx.gas_limit.to_u64("gasLimit")?;

    if raw.recipient.len() != ADDRESS_LEN {
        warn!(
            "recipient is {} bytes, expected {}",
            raw.recipient.len(),
            ADDRESS_LEN
        );
    }

    let value = match &raw.tx.value {
        Some(value) if !value.is_empty() => value.to_u256("value")?.to_string(),
        _ => "0".to_owned(),
    };

    debug!(
        "sanitized {} transaction for {} (chain id {})",
        coin, keypath, raw.tx.chain_id
    );

    Ok(SignRequest {
        coin,
        keypath,
        nonce,
        gas_price,
        gas_limit,
        recipient: raw.recipient.clone(),
        value,
        data: raw.data.clone(),
        chain_id: raw.tx.chain_id,
    })
}

#[cfg(test)]
mod tests {
    use crate::coin::EthCoin;
    use crate::sanitize::{sanitize, Quantity, RawSignRequest, RawTransaction};
    use crate::Error;

    fn raw_request() -> RawSignRequest {
        RawSignRequest {
            account: 0,
            recipient: hex::decode("04f264cf34440313b4a0192a352814fbe927b885").unwrap(),
            tx: RawTransaction {
                value: Some("0x2386f26fc10000".into()),
                data: None,
                chain_id: 1,
                nonce: Some("0x1c".into()),
                gas_limit: "0x5208".into(),
                gas_price: "0x3b9aca00".into(),
            },
            data: Vec::new(),
            keypath: "m/44'/60'/0'/0/0".to_owned(),
        }
    }

    #[test]
    fn mainnet_transfer() {
        let request = sanitize(&raw_request()).unwrap();

        assert_eq!(request.coin, EthCoin::Eth);
        assert_eq!(
            request.keypath.as_slice(),
            &[2147483692, 2147483708, 2147483648, 0, 0]
        );
        assert_eq!(request.nonce, 28);
        assert_eq!(request.gas_price, "1000000000");
        assert_eq!(request.gas_limit, 21000);
        assert_eq!(request.value, "10000000000000000");
        assert_eq!(
            hex::encode(&request.recipient),
            "04f264cf34440313b4a0192a352814fbe927b885"
        );
        assert!(request.data.is_empty());
        assert_eq!(request.chain_id, 1);
    }

    #[test]
    fn rinkeby_defaults() {
        let mut raw = raw_request();
        raw.tx.chain_id = 4;
        raw.tx.value = None;
        raw.tx.nonce = None;
        raw.keypath = "m/44'/1'/0'/0".to_owned();

        let request = sanitize(&raw).unwrap();
        assert_eq!(request.coin, EthCoin::RinkebyEth);
        assert_eq!(request.value, "0");
        assert_eq!(request.nonce, 0);
        assert_eq!(request.chain_id, 4);
    }

    #[test]
    fn empty_quantities_default() {
        let mut raw = raw_request();
        raw.tx.value = Some("0x".into());
        raw.tx.nonce = Some("".into());

        let request = sanitize(&raw).unwrap();
        assert_eq!(request.value, "0");
        assert_eq!(request.nonce, 0);
    }

    #[test]
    fn numeric_quantities() {
        let mut raw = raw_request();
        raw.tx.gas_price = 20_000_000_000u64.into();
        raw.tx.gas_limit = 21000u64.into();
        raw.tx.nonce = Some(7u64.into());

        let request = sanitize(&raw).unwrap();
        assert_eq!(request.gas_price, "20000000000");
        assert_eq!(request.gas_limit, 21000);
        assert_eq!(request.nonce, 7);
    }

    #[test]
    fn large_value_keeps_precision() {
        let mut raw = raw_request();
        raw.tx.value = Some("0xffffffffffffffffffffffffffffffff".into());
        raw.tx.gas_price = "0x1fffffffffffff1".into();

        let request = sanitize(&raw).unwrap();
        assert_eq!(request.value, "340282366920938463463374607431768211455");
        assert_eq!(request.gas_price, "144115188075855857");
    }

    #[test]
    fn bad_keypath_is_wrapped() {
        let mut raw = raw_request();
        raw.keypath = "44'/60'/0'/0".to_owned();

        let err = sanitize(&raw).unwrap_err();
        assert!(matches!(err.cause(), Error::InvalidKeypath(_)));
        assert!(err.to_string().starts_with("transaction data sanitization failed"));
    }

    #[test]
    fn cause_is_error_source() {
        use std::error::Error as _;

        let mut raw = raw_request();
        raw.keypath = "x".to_owned();

        let err = sanitize(&raw).unwrap_err();
        assert_eq!(
            err.source().map(|cause| cause.to_string()),
            Some("invalid keypath: x".to_owned())
        );
    }

    #[test]
    fn unsupported_chain_is_wrapped() {
        let mut raw = raw_request();
        raw.tx.chain_id = 99;

        let err = sanitize(&raw).unwrap_err();
        assert_eq!(err.into_cause(), Error::UnsupportedNetwork(99));
    }

    #[test]
    fn bad_quantities() {
        let mut raw = raw_request();
        raw.tx.gas_price = "0xzz".into();
        assert_eq!(
            sanitize(&raw).unwrap_err().into_cause(),
            Error::InvalidQuantity {
                field: "gasPrice",
                value: "0xzz".to_owned()
            }
        );

        let mut raw = raw_request();
        raw.tx.gas_limit = "0x10000000000000000".into();
        assert!(matches!(
            sanitize(&raw).unwrap_err().cause(),
            Error::InvalidQuantity { field: "gasLimit", .. }
        ));

        let mut raw = raw_request();
        raw.tx.value = Some(Quantity::Hex(format!("0x1{}", "0".repeat(64))));
        assert!(matches!(
            sanitize(&raw).unwrap_err().cause(),
            Error::InvalidQuantity { field: "value", .. }
        ));
    }

    #[test]
    fn recipient_and_data_pass_through() {
        let mut raw = raw_request();
        raw.recipient = vec![0xab; 3];
        raw.data = hex::decode("a9059cbb").unwrap();

        let request = sanitize(&raw).unwrap();
        assert_eq!(request.recipient, vec![0xab; 3]);
        assert_eq!(hex::encode(&request.data), "a9059cbb");
    }
}
