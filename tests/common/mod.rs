#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use d7arp::d7net::arp::{self, Operation};
use d7arp::d7net::{EtherType, Ipv4Addr, MacAddr};
use d7arp::*;

pub const LOCAL_MAC: MacAddr = MacAddr([0x52, 0x54, 0, 0x12, 0x34, 0x56]);
pub const LOCAL_IP: Ipv4Addr = Ipv4Addr([10, 0, 0, 1]);
pub const OTHER_IP: Ipv4Addr = Ipv4Addr([10, 0, 0, 9]);
pub const PEER_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x02]);
pub const PEER_IP: Ipv4Addr = Ipv4Addr([10, 0, 0, 2]);

#[derive(Debug, Default)]
pub struct Wire {
    /// (destination, packet) in send order
    pub sent: Vec<(Vec<u8>, Vec<u8>)>,
    pub inbound: VecDeque<Vec<u8>>,
}
impl Wire {
    pub fn requests_for(&self, target: Ipv4Addr) -> usize {
        self.parsed()
            .filter(|(_, p)| p.is_request() && p.target_proto == target.0)
            .count()
    }

    pub fn parsed(&self) -> impl Iterator<Item = (Vec<u8>, arp::Packet)> + '_ {
        self.sent
            .iter()
            .map(|(dst, bytes)| (dst.clone(), arp::Packet::from_bytes(bytes).unwrap()))
    }
}

/// Ethernet-like link recording everything sent
#[derive(Clone, Default)]
pub struct MockTransport {
    pub wire: Arc<Mutex<Wire>>,
}
impl Transport for MockTransport {
    fn hardware_type(&self) -> u16 {
        arp::HTYPE_ETHERNET
    }

    fn hardware_address(&self) -> Vec<u8> {
        LOCAL_MAC.0.to_vec()
    }

    fn broadcast_address(&self) -> Vec<u8> {
        MacAddr::BROADCAST.0.to_vec()
    }

    fn multicast_to_hardware(&self, sw_type: u16, address: &[u8]) -> Result<Vec<u8>, TransportError> {
        if !EtherType::Ipv4.is(sw_type) {
            return Err(TransportError::Unsupported);
        }
        let ip = Ipv4Addr::from_bytes(address).ok_or(TransportError::Unsupported)?;
        Ok(MacAddr::multicast_from_ipv4(ip).0.to_vec())
    }

    fn send(&mut self, dst_hw: &[u8], packet: Vec<u8>) -> Result<(), TransportError> {
        self.wire.lock().unwrap().sent.push((dst_hw.to_vec(), packet));
        Ok(())
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        self.wire.lock().unwrap().inbound.pop_front()
    }
}

pub struct Setup {
    pub service: Arc<ArpService>,
    pub wire: Arc<Mutex<Wire>>,
}
impl Setup {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let transport = MockTransport::default();
        let wire = transport.wire.clone();
        Self {
            service: ArpService::new(transport, config),
            wire,
        }
    }

    /// Instance bound to `ip` with the given retry interval
    pub fn instance(&self, ip: Ipv4Addr, retry_interval: Duration) -> ArpInstance {
        let instance = self.service.create_instance();
        instance
            .configure(Some(&InstanceConfig::ipv4(ip).with_retry(2, retry_interval)))
            .unwrap();
        instance
    }

    pub fn sent_count(&self) -> usize {
        self.wire.lock().unwrap().sent.len()
    }

    pub fn requests_for(&self, target: Ipv4Addr) -> usize {
        self.wire.lock().unwrap().requests_for(target)
    }

    pub fn last_sent(&self) -> (Vec<u8>, arp::Packet) {
        let wire = self.wire.lock().unwrap();
        let (dst, bytes) = wire.sent.last().unwrap();
        (dst.clone(), arp::Packet::from_bytes(bytes).unwrap())
    }

    pub fn ticks(&self, n: usize) {
        for _ in 0..n {
            self.service.tick();
        }
    }
}

pub fn packet(
    operation: Operation, sender: (MacAddr, Ipv4Addr), target: (MacAddr, Ipv4Addr),
) -> Vec<u8> {
    arp::Packet {
        htype: arp::HTYPE_ETHERNET,
        ptype: EtherType::Ipv4 as u16,
        operation,
        sender_hw: sender.0 .0.to_vec(),
        sender_proto: sender.1 .0.to_vec(),
        target_hw: target.0 .0.to_vec(),
        target_proto: target.1 .0.to_vec(),
    }
    .to_bytes()
}

pub fn reply_from(mac: MacAddr, ip: Ipv4Addr) -> Vec<u8> {
    packet(Operation::Reply, (mac, ip), (LOCAL_MAC, LOCAL_IP))
}
