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

/// APDU Class byte
pub const CLA: u8 = 0xe0;

/// BIP32 hardened derivation flag (2^31)
pub const HARDENED: u32 = 0x8000_0000;

/// BIP44 purpose value
pub const BIP44_PURPOSE: u32 = 44;

/// Ethereum mainnet coin type
pub const ETH_COIN_TYPE: u32 = 60;

/// Coin type shared by all testnets
pub const TESTNET_COIN_TYPE: u32 = 1;

/// Mainnet chain id
pub const CHAIN_ID_MAINNET: u64 = 1;

/// Ropsten chain id
pub const CHAIN_ID_ROPSTEN: u64 = 3;

/// Rinkeby chain id
pub const CHAIN_ID_RINKEBY: u64 = 4;

/// Ethereum address byte length
pub const ADDRESS_LEN: usize = 20;

/// ECDSA signature component length (r and s)
pub const ECDSA_COMPONENT_LEN: usize = 32;

/// Signature response length: v + r + s
pub const SIGNATURE_LEN: usize = 65;

/// Deepest keypath the device accepts
pub const MAX_KEYPATH_DEPTH: usize = 10;

/// Largest APDU data field
pub const MAX_APDU_DATA_LEN: usize = 255;

/// P1 of the first transaction packet
pub const P1_FIRST_CHUNK: u8 = 0x00;

/// P1 of every following transaction packet
pub const P1_MORE_CHUNKS: u8 = 0x80;

/// Status word of a successful exchange
pub const SW_OK: u16 = 0x9000;

/// Status word when the user declines on the device
pub const SW_USER_REJECTED: u16 = 0x6985;

/// APDU instruction codes
#[repr(u8)]
pub enum InstructionCode {
    /// Sign a legacy transaction
    SignTransaction = 0x04,
    /// Get app flags and version
    GetAppConfiguration = 0x06,
}
