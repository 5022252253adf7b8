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
//! Binary encoding of sign requests for the Ethereum app

use byteorder::{BigEndian, ByteOrder};
use primitive_types::U256;
use rlp::RlpStream;

use crate::keypath::Keypath;
use crate::params::{MAX_APDU_DATA_LEN, MAX_KEYPATH_DEPTH};
use crate::sanitize::SignRequest;
use crate::Error;

/// Serializes a keypath as a depth byte followed by big-endian levels
pub fn serialize_keypath(keypath: &Keypath) -> Result<Vec<u8>, Error> {
    if keypath.len() > MAX_KEYPATH_DEPTH {
        return Err(Error::InvalidKeypath(keypath.to_string()));
    }

    let mut m = vec![0u8; 1 + 4 * keypath.len()];
    m[0] = keypath.len() as u8;
    BigEndian::write_u32_into(keypath.as_slice(), &mut m[1..]);

    Ok(m)
}

/// RLP encodes a sign request as an unsigned EIP-155 legacy transaction
///
/// `[nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]`
pub fn encode_sign_request(request: &SignRequest) -> Result<Vec<u8>, Error> {
    let gas_price = amount_bytes("gasPrice", &request.gas_price)?;
    let value = amount_bytes("value", &request.value)?;

    let mut stream = RlpStream::new_list(9);
    stream.append(&request.nonce);
    stream.append(&gas_price);
    stream.append(&request.gas_limit);
    stream.append(&request.recipient);
    stream.append(&value);
    stream.append(&request.data);
    stream.append(&request.chain_id);
    stream.append(&0u8);
    stream.append(&0u8);

    Ok(stream.out().to_vec())
}

/// Splits a signing payload into APDU data fields
///
/// The first packet starts with the serialized keypath and is filled up with
/// the transaction, the rest of the transaction follows in full packets.
pub(crate) fn sign_chunks(keypath: &[u8], tx: &[u8]) -> Vec<Vec<u8>> {
    let head = tx.len().min(MAX_APDU_DATA_LEN - keypath.len());

    let mut first = Vec::with_capacity(keypath.len() + head);
    first.extend_from_slice(keypath);
    first.extend_from_slice(&tx[..head]);

    let mut chunks = vec![first];
    chunks.extend(tx[head..].chunks(MAX_APDU_DATA_LEN).map(<[u8]>::to_vec));
    chunks
}

/// Minimal big-endian bytes of a decimal amount, empty for zero
fn amount_bytes(field: &'static str, decimal: &str) -> Result<Vec<u8>, Error> {
    let amount = U256::from_dec_str(decimal).map_err(|_| Error::InvalidQuantity {
        field,
        value: decimal.to_owned(),
    })?;

    let be = amount.to_big_endian();
    let start = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    Ok(be[start..].to_vec())
}
