//! Boundary to the link layer driver.
//!
//! The driver owns media framing: `send` receives a bare ARP packet and the
//! destination hardware address, and `receive` yields bare ARP packets that
//! were already demultiplexed by ethertype.

use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportError {
    /// Link is down or no media is present
    NoMedia,
    /// Transmit queue is full
    QueueFull,
    /// The requested mapping is not supported by this link
    Unsupported,
}

pub trait Transport: Send {
    /// HTYPE of this link, e.g. 1 for Ethernet
    fn hardware_type(&self) -> u16;

    /// Hardware address of this interface. Its length is the HLEN of the link.
    fn hardware_address(&self) -> Vec<u8>;

    fn hardware_len(&self) -> u8 {
        self.hardware_address().len() as u8
    }

    fn broadcast_address(&self) -> Vec<u8>;

    /// Maps a protocol multicast address to a link-layer group address
    fn multicast_to_hardware(&self, sw_type: u16, address: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Fire-and-forget transmit
    fn send(&mut self, dst_hw: &[u8], packet: Vec<u8>) -> Result<(), TransportError>;

    /// Next received packet, if any. Each call re-arms the receive.
    fn receive(&mut self) -> Option<Vec<u8>>;
}
