// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IPv4 subnet to sweep during discovery.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::ValueError;

/// Shortest prefix accepted for a sweep (65 534 hosts).
pub const MIN_PREFIX: u8 = 16;

/// An IPv4 network in CIDR notation.
///
/// Host bits given in the input are cleared, so `192.168.2.17/24` and
/// `192.168.2.0/24` are the same subnet.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::source::Subnet;
///
/// let subnet: Subnet = "192.168.2.0/24".parse().unwrap();
/// assert_eq!(subnet.hosts().count(), 254);
/// assert_eq!(subnet.to_string(), "192.168.2.0/24");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    network: Ipv4Addr,
    prefix: u8,
}

impl Subnet {
    /// Creates a subnet, clearing host bits.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidSubnet`] if `prefix` exceeds 32 and
    /// [`ValueError::SubnetTooLarge`] if it is shorter than [`MIN_PREFIX`].
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, ValueError> {
        if prefix > 32 {
            return Err(ValueError::InvalidSubnet(format!(
                "prefix /{prefix} is longer than 32 bits"
            )));
        }
        if prefix < MIN_PREFIX {
            return Err(ValueError::SubnetTooLarge {
                prefix,
                min: MIN_PREFIX,
            });
        }
        Ok(Self {
            network: Ipv4Addr::from(u32::from(address) & mask(prefix)),
            prefix,
        })
    }

    /// Returns the network address.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns `true` if `address` lies inside the subnet.
    #[must_use]
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & mask(self.prefix) == u32::from(self.network)
    }

    /// Iterates over the addresses worth probing.
    ///
    /// The network and broadcast addresses are skipped, except for /31 and
    /// /32 where every address is a host.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let first = u32::from(self.network);
        let last = first | !mask(self.prefix);
        let range = if self.prefix >= 31 {
            first..=last
        } else {
            first + 1..=last - 1
        };
        range.map(Ipv4Addr::from)
    }
}

impl Default for Subnet {
    /// `192.168.2.0/24`.
    fn default() -> Self {
        Self {
            network: Ipv4Addr::new(192, 168, 2, 0),
            prefix: 24,
        }
    }
}

const fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

impl FromStr for Subnet {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ValueError::InvalidSubnet(format!("{s}: missing /prefix")))?;

        let address: Ipv4Addr = address
            .parse()
            .map_err(|_| ValueError::InvalidSubnet(format!("{s}: bad address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| ValueError::InvalidSubnet(format!("{s}: bad prefix")))?;

        Self::new(address, prefix)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}
