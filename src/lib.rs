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
//! Support library to prepare Ethereum transactions for hardware signing devices
//!
//! Wallet-supplied transactions ([`RawSignRequest`]) are normalized with
//! [`sanitize`] into the [`SignRequest`] shape the device expects.
//! [`EthApp::sign`] sends a request to the Ledger Ethereum app as an
//! RLP-encoded EIP-155 transaction.

#![deny(warnings, trivial_casts, trivial_numeric_casts)]
#![deny(unused_import_braces, unused_qualifications)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/ledger-ethereum/0.1.0")]

use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::trace;

mod coin;
mod keypath;
mod params;
mod payload;
mod sanitize;
mod serde_hex;

use params::{
    InstructionCode, CLA, ECDSA_COMPONENT_LEN, P1_FIRST_CHUNK, P1_MORE_CHUNKS, SIGNATURE_LEN,
    SW_OK, SW_USER_REJECTED,
};
use payload::sign_chunks;

pub use coin::EthCoin;
pub use keypath::{parse_keypath, Keypath};
pub use params::HARDENED;
pub use payload::{encode_sign_request, serialize_keypath};
pub use sanitize::{
    sanitize, Quantity, RawSignRequest, RawTransaction, SanitizationError, SignRequest,
};

/// Request Error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed keypath or not a supported BIP44 keypath
    #[error("invalid keypath: {0}")]
    InvalidKeypath(String),

    /// Chain id without a matching device network
    #[error("unsupported network (chain id {0})")]
    UnsupportedNetwork(u64),

    /// Numeric field that is not a valid quantity or does not fit
    #[error("invalid {field} value {value:?}")]
    InvalidQuantity {
        /// Field name
        field: &'static str,
        /// Value as received
        value: String,
    },
}

/// Ethereum App Error
#[derive(Debug, thiserror::Error)]
pub enum EthAppError<E>
where
    E: std::error::Error,
{
    /// Transport related errors
    #[error("Transport error: {0}")]
    Transport(E),

    /// The app answered with an error status word
    #[error("Device error: status word {0:#06x}")]
    Device(u16),

    /// The user declined the transaction on the device
    #[error("transaction rejected on the device")]
    UserRejected,

    /// The request cannot be encoded
    #[error("invalid request: {0}")]
    Request(#[from] Error),

    /// Invalid version error
    #[error("This version is not supported")]
    InvalidVersion,

    /// No signature has been returned
    #[error("received no signature back")]
    NoSignature,

    /// The signature is not valid
    #[error("received an invalid signature")]
    InvalidSignature,

    /// Signature parsing errors
    #[error("Ecdsa error: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

/// Ethereum App
pub struct EthApp<E: Exchange> {
    apdu_transport: E,
}

/// Ethereum App Version
pub struct Version {
    /// App feature flags
    pub flags: u8,
    /// Version Major
    pub major: u8,
    /// Version Minor
    pub minor: u8,
    /// Version Patch
    pub patch: u8,
}

/// Transaction signature (includes V, R, S)
pub struct Signature {
    /// v value
    pub v: u8,

    /// r value
    pub r: [u8; 32],

    /// s value
    pub s: [u8; 32],

    /// r and s as an ecdsa signature
    pub sig: k256::ecdsa::Signature,
}

impl<E> EthApp<E>
where
    E: Exchange + Send + Sync,
    E::Error: std::error::Error,
{
    /// Connect to the Ledger App
    pub const fn new(apdu_transport: E) -> Self {
        EthApp { apdu_transport }
    }

    async fn exchange(
        &self,
        command: &APDUCommand<Vec<u8>>,
    ) -> Result<APDUAnswer<E::AnswerType>, EthAppError<E::Error>> {
        let response = self
            .apdu_transport
            .exchange(command)
            .await
            .map_err(EthAppError::Transport)?;

        match response.retcode() {
            SW_OK => Ok(response),
            SW_USER_REJECTED => Err(EthAppError::UserRejected),
            retcode => Err(EthAppError::Device(retcode)),
        }
    }

    /// Retrieve the app version
    pub async fn version(&self) -> Result<Version, EthAppError<E::Error>> {
        let command = APDUCommand {
            cla: CLA,
            ins: InstructionCode::GetAppConfiguration as u8,
            p1: 0x00,
            p2: 0x00,
            data: Vec::new(),
        };

        let response = self.exchange(&command).await?;
        let response_data = response.data();
        if response_data.len() < 4 {
            return Err(EthAppError::InvalidVersion);
        }

        let version = Version {
            flags: response_data[0],
            major: response_data[1],
            minor: response_data[2],
            patch: response_data[3],
        };

        Ok(version)
    }

    /// Sign a sanitized transaction
    ///
    /// The first packet carries the keypath followed by the start of the RLP
    /// encoded transaction, the rest follows in full packets.
    pub async fn sign(&self, request: &SignRequest) -> Result<Signature, EthAppError<E::Error>> {
        let keypath = serialize_keypath(&request.keypath)?;
        let tx = encode_sign_request(request)?;
        let chunks = sign_chunks(&keypath, &tx);

        trace!(
            "signing {} transaction: {} bytes in {} packets",
            request.coin,
            tx.len(),
            chunks.len()
        );

        let mut response_data = Vec::new();
        for (packet_idx, chunk) in chunks.into_iter().enumerate() {
            let p1 = if packet_idx == 0 {
                P1_FIRST_CHUNK
            } else {
                P1_MORE_CHUNKS
            };

            let command = APDUCommand {
                cla: CLA,
                ins: InstructionCode::SignTransaction as u8,
                p1,
                p2: 0x00,
                data: chunk,
            };

            let response = self.exchange(&command).await?;
            response_data = response.data().to_vec();
        }

        // Last response should contain the answer
        if response_data.is_empty() {
            return Err(EthAppError::NoSignature);
        }

        if response_data.len() < SIGNATURE_LEN {
            return Err(EthAppError::InvalidSignature);
        }

        let v = response_data[0];

        let mut r = [0u8; ECDSA_COMPONENT_LEN];
        r.copy_from_slice(&response_data[1..1 + ECDSA_COMPONENT_LEN]);

        let mut s = [0u8; ECDSA_COMPONENT_LEN];
        s.copy_from_slice(&response_data[1 + ECDSA_COMPONENT_LEN..SIGNATURE_LEN]);

        let sig = k256::ecdsa::Signature::from_slice(&response_data[1..SIGNATURE_LEN])?;

        Ok(Signature { v, r, s, sig })
    }
}
