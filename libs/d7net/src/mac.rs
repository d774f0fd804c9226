use serde::{Deserialize, Serialize};

use crate::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0, 0, 0, 0, 0, 0]);
    pub const BROADCAST: Self = Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

    /// Hardware address length as carried in the ARP HLEN field
    pub const LEN: u8 = 6;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 6 {
            return None;
        }
        let mut data = [0; 6];
        data.copy_from_slice(bytes);
        Some(MacAddr(data))
    }

    /// Ethernet group address for an IPv4 multicast address
    /// https://tools.ietf.org/html/rfc1112#section-6.4
    ///
    /// The low-order 23 bits of the IP address are placed into 01:00:5e:00:00:00.
    pub fn multicast_from_ipv4(ip: Ipv4Addr) -> Self {
        let b = ip.0;
        Self([0x01, 0x00, 0x5e, b[1] & 0x7f, b[2], b[3]])
    }
}
