//! https://en.wikipedia.org/wiki/Address_Resolution_Protocol
//!
//! Addresses are carried as raw bytes, so any HTYPE/PTYPE combination
//! can be represented. Lengths come from the HLEN and PLEN fields.

use alloc::vec::Vec;
use core::convert::TryFrom;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// HTYPE, HLEN, PTYPE, PLEN and OPER
pub const HEADER_LEN: usize = 8;

/// HTYPE for Ethernet
pub const HTYPE_ETHERNET: u16 = 1;

/// https://en.wikipedia.org/wiki/Address_Resolution_Protocol#Packet_structure
///
/// Both hardware addresses must have the same length,
/// and so must both protocol addresses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Packet {
    pub htype: u16,
    pub ptype: u16,
    pub operation: Operation,
    pub sender_hw: Vec<u8>,
    pub sender_proto: Vec<u8>,
    pub target_hw: Vec<u8>,
    pub target_proto: Vec<u8>,
}
impl Packet {
    /// Trailing bytes after the target protocol address (link padding) are ignored
    pub fn from_bytes(input: &[u8]) -> Result<Self, ParseError> {
        if input.len() < HEADER_LEN {
            return Err(ParseError::Truncated);
        }

        let htype = u16::from_be_bytes([input[0], input[1]]);
        let ptype = u16::from_be_bytes([input[2], input[3]]);
        let hlen = input[4] as usize;
        let plen = input[5] as usize;
        let operation = Operation::from_bytes(&input[6..8])?;

        if hlen == 0 || plen == 0 {
            return Err(ParseError::ZeroLength);
        }
        if input.len() < HEADER_LEN + 2 * (hlen + plen) {
            return Err(ParseError::Truncated);
        }

        let mut offset = HEADER_LEN;
        let mut take = |n: usize| {
            let field = input[offset..offset + n].to_vec();
            offset += n;
            field
        };

        Ok(Self {
            htype,
            ptype,
            operation,
            sender_hw: take(hlen),
            sender_proto: take(plen),
            target_hw: take(hlen),
            target_proto: take(plen),
        })
    }

    /// https://en.wikipedia.org/wiki/Address_Resolution_Protocol#Packet_structure
    pub fn to_bytes(&self) -> Vec<u8> {
        debug_assert_eq!(self.sender_hw.len(), self.target_hw.len());
        debug_assert_eq!(self.sender_proto.len(), self.target_proto.len());

        let mut result = Vec::with_capacity(self.wire_len());
        // HTYPE
        result.extend(&self.htype.to_be_bytes());
        // PTYPE
        result.extend(&self.ptype.to_be_bytes());
        // HLEN
        result.push(self.hlen());
        // PLEN
        result.push(self.plen());
        // Operation
        result.extend(&self.operation.to_bytes());
        // Sender hardware address
        result.extend(&self.sender_hw);
        // Sender protocol address
        result.extend(&self.sender_proto);
        // Target hardware address
        result.extend(&self.target_hw);
        // Target protocol address
        result.extend(&self.target_proto);
        // Return
        result
    }

    pub fn hlen(&self) -> u8 {
        self.sender_hw.len() as u8
    }

    pub fn plen(&self) -> u8 {
        self.sender_proto.len() as u8
    }

    pub fn wire_len(&self) -> usize {
        HEADER_LEN + 2 * (self.sender_hw.len() + self.sender_proto.len())
    }

    pub fn is_request(&self) -> bool {
        self.operation == Operation::Request
    }

    /// Turns a request into the reply announcing `hw` as the owner of `proto`
    pub fn to_reply(mut self, hw: &[u8], proto: &[u8]) -> Self {
        assert!(self.is_request());

        self.operation = Operation::Reply;
        self.target_hw = self.sender_hw;
        self.target_proto = self.sender_proto;
        self.sender_hw = hw.to_vec();
        self.sender_proto = proto.to_vec();

        self
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TryFromPrimitive,
    Deserialize,
    Serialize,
)]
#[repr(u16)]
pub enum Operation {
    Request = 1,
    Reply = 2,
}
impl Operation {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < 2 {
            return Err(ParseError::Truncated);
        }
        let n = u16::from_be_bytes([bytes[0], bytes[1]]);
        Self::try_from(n).map_err(|_| ParseError::UnknownOperation(n))
    }

    pub fn to_bytes(self) -> [u8; 2] {
        u16::to_be_bytes(self as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseError {
    /// Input ends before the last address field
    Truncated,
    /// HLEN or PLEN is zero
    ZeroLength,
    /// OPER is neither request nor reply
    UnknownOperation(u16),
}
