// ── Interface address ──
//
// An IP address together with the prefix length of the subnet it lives
// in (what NetBox calls an "IP address" and Python calls an
// `ip_interface`). Rendered and parsed as CIDR text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("missing prefix length in {0:?}")]
    MissingPrefix(String),

    #[error("invalid IP address in {0:?}")]
    InvalidIp(String),

    #[error("invalid prefix length in {0:?}")]
    InvalidPrefix(String),
}

/// IP address plus subnet prefix length, e.g. `192.0.2.1/31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    ip: IpAddr,
    prefix_len: u8,
}

impl Address {
    pub fn new(ip: IpAddr, prefix_len: u8) -> Option<Self> {
        (prefix_len <= max_prefix_len(ip)).then_some(Self { ip, prefix_len })
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn is_ipv4(&self) -> bool {
        self.ip.is_ipv4()
    }

    /// The subnet this address belongs to, host bits cleared.
    pub fn network(&self) -> Self {
        let ip = match self.ip {
            IpAddr::V4(v4) => {
                let bits = u32::from(v4) & v4_mask(self.prefix_len);
                IpAddr::V4(Ipv4Addr::from(bits))
            }
            IpAddr::V6(v6) => {
                let bits = u128::from(v6) & v6_mask(self.prefix_len);
                IpAddr::V6(Ipv6Addr::from(bits))
            }
        };
        Self {
            ip,
            prefix_len: self.prefix_len,
        }
    }

    /// Whether `ip` falls inside this address's subnet.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.ip, ip) {
            (IpAddr::V4(own), IpAddr::V4(other)) => {
                let mask = v4_mask(self.prefix_len);
                u32::from(own) & mask == u32::from(other) & mask
            }
            (IpAddr::V6(own), IpAddr::V6(other)) => {
                let mask = v6_mask(self.prefix_len);
                u128::from(own) & mask == u128::from(other) & mask
            }
            _ => false,
        }
    }

    /// Same IP, different mask. Used to re-mask /32 FHRP virtual addresses
    /// and transit peer IPs onto the prefix of the local subnet.
    pub fn with_prefix_len(&self, prefix_len: u8) -> Option<Self> {
        Self::new(self.ip, prefix_len)
    }
}

fn max_prefix_len(ip: IpAddr) -> u8 {
    if ip.is_ipv4() { 32 } else { 128 }
}

fn v4_mask(prefix_len: u8) -> u32 {
    u32::MAX
        .checked_shl(32 - u32::from(prefix_len))
        .unwrap_or(0)
}

fn v6_mask(prefix_len: u8) -> u128 {
    u128::MAX
        .checked_shl(128 - u32::from(prefix_len))
        .unwrap_or(0)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip, prefix) = s
            .split_once('/')
            .ok_or_else(|| AddressParseError::MissingPrefix(s.to_owned()))?;
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| AddressParseError::InvalidIp(s.to_owned()))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| AddressParseError::InvalidPrefix(s.to_owned()))?;
        Self::new(ip, prefix_len).ok_or_else(|| AddressParseError::InvalidPrefix(s.to_owned()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}
