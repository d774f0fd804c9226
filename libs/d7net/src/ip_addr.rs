use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Ipv4Addr(pub [u8; 4]);

impl Ipv4Addr {
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    pub const LOOPBACK: Self = Self([127, 0, 0, 1]);
    pub const BROADCAST: Self = Self([255, 255, 255, 255]);

    /// Protocol address length as carried in the ARP PLEN field
    pub const LEN: u8 = 4;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 4 {
            return None;
        }
        let mut data = [0; 4];
        data.copy_from_slice(bytes);
        Some(Ipv4Addr(data))
    }

    pub fn from_str(s: &str) -> Option<Self> {
        if s.chars().filter(|&c| c == '.').count() != 3 {
            return None;
        }
        let mut bytes = [0; 4];
        for (i, item) in s.split('.').enumerate() {
            bytes[i] = item.parse::<u8>().ok()?;
        }
        Some(Self(bytes))
    }

    pub fn as_int(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn is_unspecified(self) -> bool {
        self == Self::ZERO
    }

    /// Limited (local) broadcast, 255.255.255.255
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    /// Class D, 224.0.0.0/4
    pub fn is_multicast(self) -> bool {
        self.0[0] & 0xf0 == 0xe0
    }
}

impl fmt::Debug for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_ipv4_parse_and_format() {
        assert_eq!(&format!("{:?}", Ipv4Addr::ZERO), "0.0.0.0");
        assert_eq!(&format!("{:?}", Ipv4Addr::LOOPBACK), "127.0.0.1");

        let addr0 = Ipv4Addr::from_str("0.0.0.0").unwrap();
        let addr1 = Ipv4Addr::from_str("127.0.0.1").unwrap();
        let addr2 = Ipv4Addr::from_str("12.34.56.78").unwrap();
        let addr3 = Ipv4Addr::from_str("002.020.200.000").unwrap();

        assert_eq!(&format!("{:?}", addr0), "0.0.0.0");
        assert_eq!(&format!("{:?}", addr1), "127.0.0.1");
        assert_eq!(&format!("{:?}", addr2), "12.34.56.78");
        assert_eq!(&format!("{:?}", addr3), "2.20.200.0");

        assert_eq!(Ipv4Addr::from_str("1.2.3"), None);
        assert_eq!(Ipv4Addr::from_str("1.2.3.4.5"), None);
        assert_eq!(Ipv4Addr::from_str(""), None);
        assert_eq!(Ipv4Addr::from_str("256.0.0.0"), None);
        assert_eq!(Ipv4Addr::from_str("1..2"), None);
    }

    #[test]
    fn test_classify() {
        assert!(Ipv4Addr::BROADCAST.is_broadcast());
        assert!(Ipv4Addr::ZERO.is_unspecified());
        assert!(Ipv4Addr([224, 0, 0, 1]).is_multicast());
        assert!(Ipv4Addr([239, 255, 255, 250]).is_multicast());
        assert!(!Ipv4Addr([240, 0, 0, 1]).is_multicast());
        assert!(!Ipv4Addr([10, 0, 0, 5]).is_multicast());
        assert!(!Ipv4Addr([10, 0, 0, 255]).is_broadcast());
        assert_eq!(Ipv4Addr::from_bytes(&[1, 2, 3]), None);
        assert_eq!(Ipv4Addr([10, 0, 0, 1]).as_int(), 0x0a00_0001);
    }
}
