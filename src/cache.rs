//! Resolution records and the tables holding them

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Bound::{Excluded, Unbounded};
use core::time::Duration;

use crate::address::{AddressEntry, AddressFamily, AddressKind, AddressMatch};
use crate::config::ActiveConfig;
use crate::deferred::DeferredQueue;
use crate::error::ArpResult;
use crate::event::{AddressBuffer, Event};
use crate::instance::InstanceId;

/// Allocation order of cache entries, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);
impl EntryId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Which slots a search compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Protocol(AddressMatch<'a>),
    Hardware(AddressMatch<'a>),
    Both(AddressMatch<'a>, AddressMatch<'a>),
}

/// A caller blocked on a pending entry
#[derive(Debug, Clone)]
pub struct Waiter {
    pub instance: InstanceId,
    pub event: Event,
    pub buffer: AddressBuffer,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub(crate) owner: InstanceId,
    proto_family: AddressFamily,
    hw_family: AddressFamily,
    protocol: Option<AddressEntry>,
    hardware: Option<AddressEntry>,
    pub(crate) retry_count: u32,
    pub(crate) retry_interval: Duration,
    /// Time left until the next retransmit or exhaustion
    pub(crate) next_retry: Duration,
    /// Zero means permanent
    pub(crate) default_decay: Duration,
    pub(crate) decay: Duration,
    waiters: Vec<Waiter>,
}
impl CacheEntry {
    pub(crate) fn new(owner: InstanceId, hw_family: AddressFamily, config: &ActiveConfig) -> Self {
        Self {
            owner,
            proto_family: config.family,
            hw_family,
            protocol: None,
            hardware: None,
            retry_count: config.retry_count,
            retry_interval: config.retry_interval,
            next_retry: config.retry_interval,
            default_decay: config.entry_timeout,
            decay: config.entry_timeout,
            waiters: Vec::new(),
        }
    }

    pub fn protocol(&self) -> Option<&AddressEntry> {
        self.protocol.as_ref()
    }

    pub fn hardware(&self) -> Option<&AddressEntry> {
        self.hardware.as_ref()
    }

    pub fn owner(&self) -> InstanceId {
        self.owner
    }

    /// Copies the given sides into the slots, leaving absent sides untouched.
    /// Nothing is written unless both given sides have the right length.
    pub fn fill(&mut self, hw: Option<&[u8]>, proto: Option<&[u8]>) -> ArpResult<()> {
        let hw = hw
            .map(|b| AddressEntry::new(AddressKind::Hardware, self.hw_family, b))
            .transpose()?;
        let proto = proto
            .map(|b| AddressEntry::new(AddressKind::Protocol, self.proto_family, b))
            .transpose()?;
        if hw.is_some() {
            self.hardware = hw;
        }
        if proto.is_some() {
            self.protocol = proto;
        }
        Ok(())
    }

    /// Sets both slots exactly as given, clearing absent sides.
    /// Nothing is written unless both given sides have the right length.
    pub fn replace_addresses(&mut self, hw: Option<&[u8]>, proto: Option<&[u8]>) -> ArpResult<()> {
        let hw = hw
            .map(|b| AddressEntry::new(AddressKind::Hardware, self.hw_family, b))
            .transpose()?;
        let proto = proto
            .map(|b| AddressEntry::new(AddressKind::Protocol, self.proto_family, b))
            .transpose()?;
        self.hardware = hw;
        self.protocol = proto;
        Ok(())
    }

    pub fn fill_hardware(&mut self, hw: &[u8]) -> ArpResult<()> {
        self.fill(Some(hw), None)
    }

    pub fn fill_protocol(&mut self, proto: &[u8]) -> ArpResult<()> {
        self.fill(None, Some(proto))
    }

    pub fn matches(&self, lookup: &Lookup<'_>) -> bool {
        match lookup {
            Lookup::Protocol(p) => p.matches(self.proto_family, self.protocol.as_ref()),
            Lookup::Hardware(h) => h.matches(self.hw_family, self.hardware.as_ref()),
            Lookup::Both(p, h) => {
                p.matches(self.proto_family, self.protocol.as_ref())
                    && h.matches(self.hw_family, self.hardware.as_ref())
            },
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.default_decay == Duration::from_secs(0)
    }

    /// Restarts the decay countdown
    pub fn refresh(&mut self) {
        self.decay = self.default_decay;
    }

    pub fn set_decay(&mut self, timeout: Duration) {
        self.default_decay = timeout;
        self.decay = timeout;
    }

    /// Restarts the retry budget, used when another request joins
    pub fn reset_retry(&mut self, count: u32, interval: Duration) {
        self.retry_count = count;
        self.retry_interval = interval;
        self.next_retry = interval;
    }

    pub fn attach(&mut self, waiter: Waiter) {
        self.waiters.push(waiter);
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub fn waiters(&self) -> &[Waiter] {
        &self.waiters
    }

    /// Releases every waiter passing both filters.
    /// Known hardware addresses are written to the waiter buffers,
    /// events are queued for signalling after the lock is released.
    pub fn resolve_and_notify(
        &mut self, instance: Option<InstanceId>, event: Option<&Event>,
        deferred: &mut DeferredQueue,
    ) -> usize {
        let hardware = self.hardware.clone();
        let before = self.waiters.len();
        self.waiters.retain(|w| {
            let selected = instance.map_or(true, |i| w.instance == i)
                && event.map_or(true, |e| w.event.same_as(e));
            if selected {
                if let Some(hw) = &hardware {
                    w.buffer.write(hw.clone());
                }
                deferred.push(w.event.clone());
            }
            !selected
        });
        before - self.waiters.len()
    }
}

/// One of the pending, resolved or denied partitions
#[derive(Debug, Clone, Default)]
pub struct CacheTable {
    entries: BTreeMap<EntryId, CacheEntry>,
}
impl CacheTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Resumable search. Starts after `cursor`, or from the beginning without one.
    pub fn find_next(&self, cursor: Option<EntryId>, lookup: &Lookup<'_>) -> Option<EntryId> {
        let start = match cursor {
            Some(c) => Excluded(c),
            None => Unbounded,
        };
        self.entries
            .range((start, Unbounded))
            .find(|(_, e)| e.matches(lookup))
            .map(|(id, _)| *id)
    }

    pub fn find_first(&self, lookup: &Lookup<'_>) -> Option<EntryId> {
        self.find_next(None, lookup)
    }

    pub fn get(&self, id: EntryId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&id)
    }

    pub fn insert(&mut self, id: EntryId, entry: CacheEntry) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: EntryId) -> Option<CacheEntry> {
        self.entries.remove(&id)
    }

    /// Returns the number of removed entries
    pub fn remove_matching(&mut self, lookup: &Lookup<'_>, include_permanent: bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| !(e.matches(lookup) && (include_permanent || !e.is_permanent())));
        before - self.entries.len()
    }

    pub fn retain<F>(&mut self, f: F)
    where F: FnMut(&EntryId, &mut CacheEntry) -> bool {
        self.entries.retain(f);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntryId, &mut CacheEntry)> {
        self.entries.iter_mut()
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.keys().copied().collect()
    }
}
