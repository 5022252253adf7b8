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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keypath::Keypath;
use crate::params::{
    BIP44_PURPOSE, CHAIN_ID_MAINNET, CHAIN_ID_RINKEBY, CHAIN_ID_ROPSTEN, ETH_COIN_TYPE, HARDENED,
    TESTNET_COIN_TYPE,
};
use crate::Error;

/// Ethereum network as understood by the signing device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EthCoin {
    /// Mainnet
    Eth = 0,
    /// Ropsten testnet
    RopstenEth = 1,
    /// Rinkeby testnet
    RinkebyEth = 2,
}

impl EthCoin {
    /// Resolves the network from an EIP-155 chain id
    pub fn from_chain_id(chain_id: u64) -> Result<Self, Error> {
        match chain_id {
            CHAIN_ID_MAINNET => Ok(EthCoin::Eth),
            CHAIN_ID_ROPSTEN => Ok(EthCoin::RopstenEth),
            CHAIN_ID_RINKEBY => Ok(EthCoin::RinkebyEth),
            _ => Err(Error::UnsupportedNetwork(chain_id)),
        }
    }

    /// Resolves the network from the coin type of a BIP44 keypath
    ///
    /// `m/44'/60'/..` is mainnet and `m/44'/1'/..` is Ropsten. Rinkeby has no
    /// coin type of its own, so Rinkeby keypaths also resolve to
    /// [`EthCoin::RopstenEth`]; use [`EthCoin::from_chain_id`] when the exact
    /// testnet matters.
    pub fn from_keypath(keypath: &Keypath) -> Result<Self, Error> {
        if keypath.get(0) != Some(BIP44_PURPOSE + HARDENED) {
            return Err(Error::InvalidKeypath(keypath.to_string()));
        }

        match keypath.get(1) {
            Some(coin) if coin == ETH_COIN_TYPE + HARDENED => Ok(EthCoin::Eth),
            Some(coin) if coin == TESTNET_COIN_TYPE + HARDENED => Ok(EthCoin::RopstenEth),
            _ => Err(Error::InvalidKeypath(keypath.to_string())),
        }
    }
}

impl fmt::Display for EthCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EthCoin::Eth => "ETH",
            EthCoin::RopstenEth => "RopstenETH",
            EthCoin::RinkebyEth => "RinkebyETH",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::coin::EthCoin;
    use crate::keypath::{parse_keypath, Keypath};
    use crate::Error;

    #[test]
    fn chain_ids() {
        assert_eq!(EthCoin::from_chain_id(1).unwrap(), EthCoin::Eth);
        assert_eq!(EthCoin::from_chain_id(3).unwrap(), EthCoin::RopstenEth);
        assert_eq!(EthCoin::from_chain_id(4).unwrap(), EthCoin::RinkebyEth);
        assert!(matches!(
            EthCoin::from_chain_id(99),
            Err(Error::UnsupportedNetwork(99))
        ));
        assert!(EthCoin::from_chain_id(0).is_err());
    }

    #[test]
    fn keypath_coin_types() {
        let mainnet = parse_keypath("m/44'/60'/0'/0/0").unwrap();
        assert_eq!(EthCoin::from_keypath(&mainnet).unwrap(), EthCoin::Eth);

        let testnet = parse_keypath("m/44'/1'/0'/0").unwrap();
        assert_eq!(EthCoin::from_keypath(&testnet).unwrap(), EthCoin::RopstenEth);
    }

    #[test]
    fn rinkeby_keypath_reports_ropsten() {
        let rinkeby = parse_keypath("m/44'/1'/0'/0").unwrap();
        assert_ne!(
            EthCoin::from_keypath(&rinkeby).unwrap(),
            EthCoin::from_chain_id(4).unwrap()
        );
    }

    #[test]
    fn unknown_coin_type() {
        let path = Keypath::from(vec![2147483692, 2147483709, 2147483648, 0]);
        assert!(matches!(
            EthCoin::from_keypath(&path),
            Err(Error::InvalidKeypath(_))
        ));

        // unhardened coin type
        let path = Keypath::from(vec![2147483692, 60]);
        assert!(EthCoin::from_keypath(&path).is_err());
    }

    #[test]
    fn wrong_purpose() {
        for levels in vec![vec![], vec![2147483692], vec![44, 2147483708], vec![2147483697, 2147483708]] {
            assert!(matches!(
                EthCoin::from_keypath(&Keypath::from(levels)),
                Err(Error::InvalidKeypath(_))
            ));
        }
    }

    #[test]
    fn wire_tags() {
        assert_eq!(EthCoin::Eth as u8, 0);
        assert_eq!(EthCoin::RopstenEth as u8, 1);
        assert_eq!(EthCoin::RinkebyEth as u8, 2);
        assert_eq!(EthCoin::RinkebyEth.to_string(), "RinkebyETH");
    }
}
