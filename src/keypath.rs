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
//! BIP32 keypath parsing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::params::HARDENED;
use crate::Error;

/// BIP32 keypath, one `u32` per level with bit 31 marking hardened levels
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keypath(Vec<u32>);

impl Keypath {
    /// Encoded levels
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the bare `m` path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level at `depth`, if any
    pub fn get(&self, depth: usize) -> Option<u32> {
        self.0.get(depth).copied()
    }
}

impl From<Vec<u32>> for Keypath {
    fn from(levels: Vec<u32>) -> Self {
        Keypath(levels)
    }
}

impl From<Keypath> for Vec<u32> {
    fn from(path: Keypath) -> Self {
        path.0
    }
}

impl FromStr for Keypath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_keypath(s)
    }
}

impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for level in &self.0 {
            if level & HARDENED != 0 {
                write!(f, "/{}'", level & !HARDENED)?;
            } else {
                write!(f, "/{}", level)?;
            }
        }
        Ok(())
    }
}

/// Parses a keypath such as `m/44'/1'/0'/0` into `[2147483692, 2147483649, 2147483648, 0]`
///
/// The leading `m` is matched case-insensitively. Each level is a decimal
/// index below 2^31, optionally followed by `'` to mark it hardened.
pub fn parse_keypath(keypath: &str) -> Result<Keypath, Error> {
    let mut levels = keypath.split('/');

    match levels.next() {
        Some(root) if root.eq_ignore_ascii_case("m") => {}
        _ => return Err(Error::InvalidKeypath(keypath.to_owned())),
    }

    levels
        .map(|level| parse_level(level).ok_or_else(|| Error::InvalidKeypath(keypath.to_owned())))
        .collect::<Result<Vec<_>, _>>()
        .map(Keypath)
}

fn parse_level(level: &str) -> Option<u32> {
    let (index, hardened) = match level.strip_suffix('\'') {
        Some(index) => (index, true),
        None => (level, false),
    };

    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let index = index.parse::<u32>().ok().filter(|i| *i < HARDENED)?;
    Some(if hardened { index + HARDENED } else { index })
}
