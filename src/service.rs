//! Shared resolver state for one network interface.
//!
//! Every entry point takes the state lock for its whole critical section.
//! Events queued during that section are signalled only after the lock
//! has been released.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;
use hashbrown::HashMap;
use spin::Mutex;

use d7net::arp::{Operation, Packet};

use crate::address::{AddressEntry, AddressFamily, AddressKind, AddressMatch};
use crate::cache::{CacheEntry, CacheTable, EntryId, Lookup};
use crate::config::{ActiveConfig, ServiceConfig};
use crate::deferred::DeferredQueue;
use crate::error::{ArpError, ArpResult};
use crate::instance::{ArpInstance, InstanceId};
use crate::transport::Transport;

/// Table sizes at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub pending: usize,
    pub resolved: usize,
    pub denied: usize,
    pub instances: usize,
}

#[derive(Debug, Default)]
pub(crate) struct InstanceState {
    pub active: Option<ActiveConfig>,
}

pub(crate) struct ServiceState {
    pub hw_family: AddressFamily,
    pub broadcast: Vec<u8>,
    pub station_hw: Vec<u8>,
    pub pending: CacheTable,
    pub resolved: CacheTable,
    pub denied: CacheTable,
    pub instances: HashMap<InstanceId, InstanceState>,
    next_instance: InstanceId,
    next_entry: EntryId,
    pub deferred: DeferredQueue,
    pub config: ServiceConfig,
    pub transport: Box<dyn Transport>,
}
impl ServiceState {
    fn new(transport: Box<dyn Transport>, config: ServiceConfig) -> Self {
        let station_hw = transport.hardware_address();
        Self {
            hw_family: AddressFamily::new(transport.hardware_type(), transport.hardware_len()),
            broadcast: transport.broadcast_address(),
            station_hw,
            pending: CacheTable::new(),
            resolved: CacheTable::new(),
            denied: CacheTable::new(),
            instances: HashMap::new(),
            next_instance: InstanceId::new(1),
            next_entry: EntryId::new(1),
            deferred: DeferredQueue::new(),
            config,
            transport,
        }
    }

    pub fn register_instance(&mut self) -> InstanceId {
        let id = self.next_instance;
        self.next_instance = id.next();
        self.instances.insert(id, InstanceState::default());
        id
    }

    pub fn unregister_instance(&mut self, id: InstanceId) {
        self.reset_instance(id);
        self.instances.remove(&id);
    }

    /// Instance ids in creation order
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self.instances.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn active(&self, id: InstanceId) -> ArpResult<&ActiveConfig> {
        self.instances
            .get(&id)
            .and_then(|s| s.active.as_ref())
            .ok_or(ArpError::NotConfigured)
    }

    pub fn next_entry_id(&mut self) -> EntryId {
        let id = self.next_entry;
        self.next_entry = id.next();
        id
    }

    pub fn entry_count(&self) -> usize {
        self.pending.len() + self.resolved.len() + self.denied.len()
    }

    /// New entry with the timing parameters of `owner`
    pub fn alloc_entry(&self, owner: InstanceId) -> ArpResult<CacheEntry> {
        let config = self.active(owner)?;
        if self.entry_count() >= self.config.max_entries {
            log::warn!("ARP: cache full ({} entries)", self.config.max_entries);
            return Err(ArpError::OutOfResources);
        }
        Ok(CacheEntry::new(owner, self.hw_family, config))
    }

    /// Denied entry covering either address, protocol address first
    pub fn find_denied(
        &self, family: AddressFamily, proto: Option<&[u8]>, hw: Option<&[u8]>,
    ) -> Option<EntryId> {
        proto
            .and_then(|p| {
                self.denied
                    .find_first(&Lookup::Protocol(AddressMatch::exact(family, p)))
            })
            .or_else(|| {
                hw.and_then(|h| {
                    self.denied
                        .find_first(&Lookup::Hardware(AddressMatch::exact(self.hw_family, h)))
                })
            })
    }

    pub fn broadcast_entry(&self) -> ArpResult<AddressEntry> {
        AddressEntry::new(AddressKind::Hardware, self.hw_family, &self.broadcast)
    }

    /// Sends a frame from `instance` about `target_proto`.
    /// Requests are broadcast with a zeroed target hardware address,
    /// replies go to `target_hw`.
    pub fn send_frame(
        &mut self, instance: InstanceId, operation: Operation, target_proto: &[u8],
        target_hw: Option<&[u8]>,
    ) {
        let config = match self.active(instance) {
            Ok(c) => c,
            Err(_) => {
                log::trace!("ARP: instance {:?} not configured, not sending", instance);
                return;
            },
        };

        let (dst, target_hw) = match (operation, target_hw) {
            (Operation::Request, _) => (self.broadcast.clone(), vec![0; self.station_hw.len()]),
            (Operation::Reply, Some(hw)) => (hw.to_vec(), hw.to_vec()),
            (Operation::Reply, None) => {
                log::warn!("ARP: reply without a target hardware address");
                return;
            },
        };

        let packet = Packet {
            htype: self.hw_family.ty,
            ptype: config.family.ty,
            operation,
            sender_hw: self.station_hw.clone(),
            sender_proto: config.station.as_bytes().to_vec(),
            target_hw,
            target_proto: target_proto.to_vec(),
        };
        self.transmit(&dst, packet);
    }

    pub fn transmit(&mut self, dst: &[u8], packet: Packet) {
        log::trace!("ARP: send {:?}", packet);
        if let Err(error) = self.transport.send(dst, packet.to_bytes()) {
            log::warn!("ARP: transmit failed: {:?}", error);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            pending: self.pending.len(),
            resolved: self.resolved.len(),
            denied: self.denied.len(),
            instances: self.instances.len(),
        }
    }
}

/// Address resolution service bound to one transport
pub struct ArpService {
    state: Mutex<ServiceState>,
}
impl ArpService {
    pub fn new<T: Transport + 'static>(transport: T, config: ServiceConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ServiceState::new(Box::new(transport), config)),
        })
    }

    pub fn create_instance(self: &Arc<Self>) -> ArpInstance {
        ArpInstance::new(self)
    }

    /// Runs `f` under the lock, then signals the events it queued
    pub(crate) fn exclusive<F, R>(&self, f: F) -> R
    where F: FnOnce(&mut ServiceState) -> R {
        let (result, ready) = {
            let mut state = self.state.lock();
            let result = f(&mut *state);
            (result, mem::take(&mut state.deferred))
        };
        Self::dispatch(ready);
        result
    }

    fn dispatch(mut ready: DeferredQueue) {
        while let Some(event) = ready.pop() {
            event.signal();
        }
    }

    /// Retry and decay maintenance, called every `ServiceConfig::tick_interval`
    pub fn tick(&self) {
        self.exclusive(|s| s.on_tick());
    }

    /// Handles one raw ARP packet
    pub fn on_frame_received(&self, raw: &[u8]) {
        self.exclusive(|s| s.on_frame(raw));
    }

    /// Processes frames until the transport has none left.
    /// Returns the number of frames processed.
    pub fn poll(&self) -> usize {
        let mut count = 0;
        while let Some(frame) = self.exclusive(|s| s.transport.receive()) {
            self.on_frame_received(&frame);
            count += 1;
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        self.exclusive(|s| s.stats())
    }

    pub fn hardware_address(&self) -> Vec<u8> {
        self.exclusive(|s| s.station_hw.clone())
    }
}
