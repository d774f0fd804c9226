//! Wire formats for link-layer address resolution.
//!
//! Parsing never panics: malformed input is reported as an error,
//! as frames come straight from a shared medium.

#![cfg_attr(not(test), no_std)]
#![deny(unused_must_use)]

extern crate alloc;

mod ethertype;
mod ip_addr;
mod mac;

pub mod arp;

pub use self::ethertype::EtherType;
pub use self::ip_addr::Ipv4Addr;
pub use self::mac::MacAddr;
