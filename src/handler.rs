//! Inbound frame processing

use alloc::vec::Vec;

use d7net::arp::Packet;

use crate::address::{AddressFamily, AddressMatch};
use crate::cache::Lookup;
use crate::error::ArpResult;
use crate::instance::InstanceId;
use crate::service::ServiceState;

impl ServiceState {
    pub(crate) fn on_frame(&mut self, raw: &[u8]) {
        let packet = match Packet::from_bytes(raw) {
            Ok(p) => p,
            Err(error) => {
                log::trace!("ARP: dropping malformed frame: {:?}", error);
                return;
            },
        };

        if packet.htype != self.hw_family.ty || packet.hlen() != self.hw_family.len {
            log::trace!(
                "ARP: dropping frame for hardware type {} len {}",
                packet.htype,
                packet.hlen()
            );
            return;
        }

        let family = AddressFamily::new(packet.ptype, packet.plen());
        let matched: Vec<InstanceId> = self
            .instance_ids()
            .into_iter()
            .filter(|id| self.active(*id).map_or(false, |c| c.family == family))
            .collect();
        let owner = match matched.first() {
            Some(id) => *id,
            None => {
                log::trace!("ARP: no instance for protocol type {:#06x}", packet.ptype);
                return;
            },
        };
        let target = matched.iter().copied().find(|id| {
            self.active(*id)
                .map_or(false, |c| c.station.as_bytes() == &packet.target_proto[..])
        });

        if self
            .find_denied(family, Some(&packet.sender_proto), Some(&packet.sender_hw))
            .is_some()
        {
            log::debug!("ARP: ignoring frame from denied sender {:?}", packet.sender_proto);
            return;
        }

        if packet.sender_proto.iter().any(|b| *b != 0) {
            let owner = target.unwrap_or(owner);
            if let Err(error) = self.learn(owner, family, &packet.sender_proto, &packet.sender_hw) {
                log::warn!("ARP: could not learn {:?}: {}", packet.sender_proto, error);
            }
        }

        if packet.is_request() {
            if let Some(id) = target {
                self.reply(id, packet);
            }
        }
    }

    /// Records `proto` at `hw` and releases everyone waiting for it
    fn learn(
        &mut self, owner: InstanceId, family: AddressFamily, proto: &[u8], hw: &[u8],
    ) -> ArpResult<()> {
        let by_proto = Lookup::Protocol(AddressMatch::exact(family, proto));
        let pending = self
            .pending
            .find_first(&by_proto)
            .and_then(|eid| self.pending.remove(eid).map(|e| (eid, e)));

        if let Some(eid) = self.resolved.find_first(&by_proto) {
            if let Some(entry) = self.resolved.get_mut(eid) {
                if !entry.is_permanent() {
                    entry.fill_hardware(hw)?;
                }
                entry.refresh();
                entry.resolve_and_notify(None, None, &mut self.deferred);
            }
            if let Some((_, mut stale)) = pending {
                stale.fill_hardware(hw)?;
                stale.resolve_and_notify(None, None, &mut self.deferred);
            }
            return Ok(());
        }

        let (eid, mut entry) = match pending {
            Some(p) => p,
            None => {
                let entry = self.alloc_entry(owner)?;
                (self.next_entry_id(), entry)
            },
        };
        entry.fill(Some(hw), Some(proto))?;
        entry.refresh();
        let released = entry.resolve_and_notify(None, None, &mut self.deferred);
        log::debug!(
            "ARP: {:?} is at {:?}, {} waiters released",
            proto,
            hw,
            released
        );
        self.resolved.insert(eid, entry);
        Ok(())
    }

    fn reply(&mut self, id: InstanceId, request: Packet) {
        let station = match self.active(id) {
            Ok(c) => c.station.as_bytes().to_vec(),
            Err(_) => return,
        };
        let dst = request.sender_hw.clone();
        log::trace!("ARP: replying to {:?}", request.sender_proto);
        let reply = request.to_reply(&self.station_hw, &station);
        self.transmit(&dst, reply);
    }
}
