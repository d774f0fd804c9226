//! Per-consumer handle and the table operations it exposes

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::time::Duration;

use d7net::arp::Operation;
use d7net::Ipv4Addr;

use crate::address::{AddressEntry, AddressFamily, AddressKind, AddressMatch};
use crate::cache::{Lookup, Waiter};
use crate::config::{ActiveConfig, InstanceConfig};
use crate::error::{ArpError, ArpResult};
use crate::event::{AddressBuffer, Event};
use crate::service::{ArpService, ServiceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);
impl InstanceId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Outcome of a successful `request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Known immediately, also written to the buffer
    Resolved(AddressEntry),
    /// The event is signalled when the wait ends
    Pending,
}

/// One row returned by `find`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindData {
    pub protocol: AddressEntry,
    pub hardware: AddressEntry,
    pub permanent: bool,
}

/// Consumer binding on a shared `ArpService`.
/// Dropping the handle resets it and releases its waiters.
pub struct ArpInstance {
    id: InstanceId,
    service: Arc<ArpService>,
}
impl ArpInstance {
    pub fn new(service: &Arc<ArpService>) -> Self {
        let id = service.exclusive(|s| s.register_instance());
        log::debug!("ARP: instance {:?} created", id);
        Self {
            id,
            service: Arc::clone(service),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn is_configured(&self) -> bool {
        self.service.exclusive(|s| s.active(self.id).is_ok())
    }

    pub fn station_address(&self) -> Option<AddressEntry> {
        self.service
            .exclusive(|s| s.active(self.id).ok().map(|c| c.station.clone()))
    }

    /// Binds the instance, or resets it when `config` is None
    pub fn configure(&self, config: Option<&InstanceConfig>) -> ArpResult<()> {
        self.service.exclusive(|s| s.configure(self.id, config))
    }

    /// Inserts a static or dynamic entry. `timeout` of zero makes it permanent.
    pub fn add(
        &self, deny: bool, proto: Option<&[u8]>, hw: Option<&[u8]>, timeout: Duration,
        overwrite: bool,
    ) -> ArpResult<()> {
        self.service
            .exclusive(|s| s.add(self.id, deny, proto, hw, timeout, overwrite))
    }

    pub fn find(
        &self, by_protocol: bool, address: Option<&[u8]>, refresh: bool,
    ) -> ArpResult<Vec<FindData>> {
        self.service
            .exclusive(|s| s.find(self.id, by_protocol, address, refresh))
    }

    /// Returns the number of removed entries
    pub fn delete(&self, by_protocol: bool, address: Option<&[u8]>) -> ArpResult<usize> {
        self.service
            .exclusive(|s| s.delete(self.id, by_protocol, address))
    }

    /// Removes dynamic entries of this protocol family
    pub fn flush(&self) -> ArpResult<usize> {
        self.service.exclusive(|s| s.flush(self.id))
    }

    /// Resolves `target`, or the broadcast address when it is None.
    ///
    /// Synchronous results are written to `buffer` and `event` is still
    /// signalled. Otherwise `event` is signalled when the wait ends, and
    /// `buffer` stays empty unless the address was found.
    pub fn request(
        &self, target: Option<&[u8]>, event: Option<&Event>, buffer: &AddressBuffer,
    ) -> ArpResult<Resolution> {
        self.service
            .exclusive(|s| s.request(self.id, target, event, buffer))
    }

    /// Releases waiters without an address.
    /// `target` and `event` must be both given or both omitted.
    pub fn cancel(&self, target: Option<&[u8]>, event: Option<&Event>) -> ArpResult<usize> {
        self.service.exclusive(|s| s.cancel(self.id, target, event))
    }
}

impl Drop for ArpInstance {
    fn drop(&mut self) {
        let id = self.id;
        self.service.exclusive(|s| s.unregister_instance(id));
        log::debug!("ARP: instance {:?} destroyed", id);
    }
}

fn pattern(family: AddressFamily, bytes: Option<&[u8]>) -> AddressMatch<'_> {
    AddressMatch { family, bytes }
}

fn check_len(family: AddressFamily, bytes: Option<&[u8]>) -> ArpResult<()> {
    match bytes {
        Some(b) if b.len() != family.len as usize => Err(ArpError::InvalidArgument),
        _ => Ok(()),
    }
}

impl ServiceState {
    pub(crate) fn configure(
        &mut self, id: InstanceId, config: Option<&InstanceConfig>,
    ) -> ArpResult<()> {
        let config = match config {
            Some(c) => c,
            None => {
                self.reset_instance(id);
                return Ok(());
            },
        };
        config.validate()?;

        let state = self.instances.get_mut(&id).ok_or(ArpError::NotConfigured)?;
        if let Some(active) = &mut state.active {
            if !active.is_rebind_of(config) {
                return Err(ArpError::AccessDenied);
            }
            active.update_timing(config);
            return Ok(());
        }

        let active = ActiveConfig::from_config(config)?;
        log::debug!("ARP: instance {:?} bound to {}", id, active.station);
        state.active = Some(active);
        Ok(())
    }

    /// Cancels the instance's waiters and drops the dynamic entries it created
    pub(crate) fn reset_instance(&mut self, id: InstanceId) {
        let was_active = self
            .instances
            .get_mut(&id)
            .and_then(|s| s.active.take())
            .is_some();
        if !was_active {
            return;
        }

        let mut released = 0;
        for (_, entry) in self.pending.iter_mut() {
            released += entry.resolve_and_notify(Some(id), None, &mut self.deferred);
        }
        self.resolved.retain(|_, e| e.owner() != id || e.is_permanent());
        self.denied.retain(|_, e| e.owner() != id || e.is_permanent());
        log::debug!("ARP: instance {:?} reset, {} waiters released", id, released);
    }

    pub(crate) fn add(
        &mut self, id: InstanceId, deny: bool, proto: Option<&[u8]>, hw: Option<&[u8]>,
        timeout: Duration, overwrite: bool,
    ) -> ArpResult<()> {
        let family = self.active(id)?.family;

        let valid = match (deny, proto.is_some(), hw.is_some()) {
            (false, true, true) => true,
            (true, has_proto, has_hw) => has_proto != has_hw,
            _ => false,
        };
        if !valid {
            return Err(ArpError::InvalidArgument);
        }
        check_len(family, proto)?;
        check_len(self.hw_family, hw)?;

        let existing = self
            .find_denied(family, proto, hw)
            .map(|e| (true, e))
            .or_else(|| {
                let both = Lookup::Both(pattern(family, proto), pattern(self.hw_family, hw));
                self.resolved.find_first(&both).map(|e| (false, e))
            });

        let taken = match existing {
            Some(_) if !overwrite => return Err(ArpError::AccessDenied),
            Some((true, eid)) => self.denied.remove(eid).map(|e| (eid, e)),
            Some((false, eid)) => self.resolved.remove(eid).map(|e| (eid, e)),
            None => proto
                .and_then(|p| {
                    self.pending
                        .find_first(&Lookup::Protocol(AddressMatch::exact(family, p)))
                })
                .and_then(|pid| self.pending.remove(pid).map(|e| (pid, e))),
        };
        let (entry_id, mut entry) = match taken {
            Some(t) => t,
            None => {
                let entry = self.alloc_entry(id)?;
                (self.next_entry_id(), entry)
            },
        };

        entry.replace_addresses(hw, proto)?;
        entry.set_decay(timeout);
        let released = entry.resolve_and_notify(None, None, &mut self.deferred);
        log::debug!(
            "ARP: {} entry {:?} -> {:?}, {} waiters released",
            if deny { "denied" } else { "static" },
            entry.protocol().map(|a| a.as_bytes()),
            entry.hardware().map(|a| a.as_bytes()),
            released
        );

        if deny {
            self.denied.insert(entry_id, entry);
        } else {
            self.resolved.insert(entry_id, entry);
        }
        Ok(())
    }

    /// Lookup for `find` and `delete`, restricted to the instance's protocol family
    fn address_lookup<'a>(
        &self, family: AddressFamily, by_protocol: bool, address: Option<&'a [u8]>,
    ) -> ArpResult<Lookup<'a>> {
        if by_protocol {
            check_len(family, address)?;
            Ok(Lookup::Protocol(pattern(family, address)))
        } else {
            check_len(self.hw_family, address)?;
            Ok(Lookup::Both(
                AddressMatch::any(family),
                pattern(self.hw_family, address),
            ))
        }
    }

    pub(crate) fn find(
        &mut self, id: InstanceId, by_protocol: bool, address: Option<&[u8]>, refresh: bool,
    ) -> ArpResult<Vec<FindData>> {
        let family = self.active(id)?.family;
        let lookup = self.address_lookup(family, by_protocol, address)?;

        let mut ids = Vec::new();
        let mut cursor = None;
        while let Some(eid) = self.resolved.find_next(cursor, &lookup) {
            ids.push(eid);
            cursor = Some(eid);
        }
        if ids.is_empty() {
            return Err(ArpError::NotFound);
        }

        if refresh && address.is_some() && ids.len() == 1 {
            if let Some(entry) = self.resolved.get_mut(ids[0]) {
                entry.refresh();
            }
        }

        Ok(ids
            .into_iter()
            .filter_map(|eid| self.resolved.get(eid))
            .filter_map(|e| {
                Some(FindData {
                    protocol: e.protocol()?.clone(),
                    hardware: e.hardware()?.clone(),
                    permanent: e.is_permanent(),
                })
            })
            .collect())
    }

    pub(crate) fn delete(
        &mut self, id: InstanceId, by_protocol: bool, address: Option<&[u8]>,
    ) -> ArpResult<usize> {
        let family = self.active(id)?.family;
        let lookup = self.address_lookup(family, by_protocol, address)?;

        let removed =
            self.denied.remove_matching(&lookup, true) + self.resolved.remove_matching(&lookup, true);
        log::debug!("ARP: deleted {} entries", removed);
        if removed == 0 {
            Err(ArpError::NotFound)
        } else {
            Ok(removed)
        }
    }

    pub(crate) fn flush(&mut self, id: InstanceId) -> ArpResult<usize> {
        let family = self.active(id)?.family;
        let lookup = Lookup::Protocol(AddressMatch::any(family));

        let removed = self.denied.remove_matching(&lookup, false)
            + self.resolved.remove_matching(&lookup, false);
        log::debug!("ARP: flushed {} entries", removed);
        if removed == 0 {
            Err(ArpError::NotFound)
        } else {
            Ok(removed)
        }
    }

    /// Writes a synchronously known address and queues the caller's event
    fn resolved_now(
        &mut self, hw: AddressEntry, event: Option<&Event>, buffer: &AddressBuffer,
    ) -> Resolution {
        buffer.write(hw.clone());
        if let Some(event) = event {
            self.deferred.push(event.clone());
        }
        Resolution::Resolved(hw)
    }

    pub(crate) fn request(
        &mut self, id: InstanceId, target: Option<&[u8]>, event: Option<&Event>,
        buffer: &AddressBuffer,
    ) -> ArpResult<Resolution> {
        let config = self.active(id)?.clone();

        let target = match target {
            Some(t) => t,
            None => {
                let hw = self.broadcast_entry()?;
                return Ok(self.resolved_now(hw, event, buffer));
            },
        };
        check_len(config.family, Some(target))?;

        if config.is_ipv4 {
            let ip = Ipv4Addr::from_bytes(target).ok_or(ArpError::InvalidArgument)?;
            if ip.is_broadcast() {
                let hw = self.broadcast_entry()?;
                return Ok(self.resolved_now(hw, event, buffer));
            }
            if ip.is_multicast() {
                let hw = self.transport.multicast_to_hardware(config.family.ty, target)?;
                let hw = AddressEntry::new(AddressKind::Hardware, self.hw_family, &hw)?;
                return Ok(self.resolved_now(hw, event, buffer));
            }
        }

        if self.find_denied(config.family, Some(target), None).is_some() {
            log::debug!("ARP: request for denied address {:?}", target);
            return Err(ArpError::AccessDenied);
        }

        let by_proto = Lookup::Protocol(AddressMatch::exact(config.family, target));
        let known = self
            .resolved
            .find_first(&by_proto)
            .and_then(|eid| self.resolved.get(eid))
            .and_then(|e| e.hardware().cloned());
        if let Some(hw) = known {
            return Ok(self.resolved_now(hw, event, buffer));
        }

        let event = event.ok_or(ArpError::NotReady)?;

        let existing = self.pending.find_first(&by_proto);
        let waiting = existing
            .and_then(|eid| self.pending.get(eid))
            .map_or(0, |e| e.waiter_count());
        if waiting >= self.config.max_waiters {
            log::warn!("ARP: too many waiters for {:?}", target);
            return Err(ArpError::OutOfResources);
        }

        let entry_id = match existing {
            Some(eid) => eid,
            None => {
                let mut entry = self.alloc_entry(id)?;
                entry.fill_protocol(target)?;
                let eid = self.next_entry_id();
                self.pending.insert(eid, entry);
                log::debug!("ARP: resolving {:?}", target);
                eid
            },
        };
        if let Some(entry) = self.pending.get_mut(entry_id) {
            entry.reset_retry(config.retry_count, config.retry_interval);
            entry.attach(Waiter {
                instance: id,
                event: event.clone(),
                buffer: buffer.clone(),
            });
        }

        self.send_frame(id, Operation::Request, target, None);
        Ok(Resolution::Pending)
    }

    pub(crate) fn cancel(
        &mut self, id: InstanceId, target: Option<&[u8]>, event: Option<&Event>,
    ) -> ArpResult<usize> {
        let family = self.active(id)?.family;
        if target.is_some() != event.is_some() {
            return Err(ArpError::InvalidArgument);
        }
        check_len(family, target)?;

        let lookup = Lookup::Protocol(pattern(family, target));
        let mut released = 0;
        for (_, entry) in self.pending.iter_mut() {
            if entry.matches(&lookup) {
                released += entry.resolve_and_notify(Some(id), event, &mut self.deferred);
            }
        }
        log::debug!("ARP: instance {:?} cancelled {} waiters", id, released);
        if released == 0 {
            Err(ArpError::NotFound)
        } else {
            Ok(released)
        }
    }
}
