//! Periodic retry and decay maintenance

use alloc::vec::Vec;
use core::time::Duration;

use d7net::arp::Operation;

use crate::cache::CacheTable;
use crate::instance::InstanceId;
use crate::service::ServiceState;

/// Counts down decay, dropping entries that run out. Permanent entries are skipped.
fn decay(table: &mut CacheTable, interval: Duration) -> usize {
    let before = table.len();
    table.retain(|_, entry| {
        if entry.is_permanent() {
            true
        } else if entry.decay <= interval {
            false
        } else {
            entry.decay -= interval;
            true
        }
    });
    before - table.len()
}

impl ServiceState {
    pub(crate) fn on_tick(&mut self) {
        let interval = self.config.tick_interval();

        // (first waiter's instance, owner, target)
        let mut retransmit: Vec<(Option<InstanceId>, InstanceId, Vec<u8>)> = Vec::new();
        let deferred = &mut self.deferred;
        self.pending.retain(|_, entry| {
            if entry.next_retry > interval {
                entry.next_retry -= interval;
                return true;
            }

            if entry.retry_count == 0 {
                let released = entry.resolve_and_notify(None, None, deferred);
                log::debug!(
                    "ARP: giving up on {:?}, {} waiters released",
                    entry.protocol().map(|a| a.as_bytes()),
                    released
                );
                return false;
            }

            entry.retry_count -= 1;
            entry.next_retry = entry.retry_interval;
            if let Some(proto) = entry.protocol() {
                retransmit.push((
                    entry.waiters().first().map(|w| w.instance),
                    entry.owner(),
                    proto.as_bytes().to_vec(),
                ));
            }
            true
        });

        for (waiter, owner, target) in retransmit {
            let sender = waiter
                .filter(|id| self.active(*id).is_ok())
                .or_else(|| Some(owner).filter(|id| self.active(*id).is_ok()));
            match sender {
                Some(id) => self.send_frame(id, Operation::Request, &target, None),
                None => log::trace!("ARP: no configured instance to retry {:?}", target),
            }
        }

        let expired = decay(&mut self.resolved, interval) + decay(&mut self.denied, interval);
        if expired != 0 {
            log::debug!("ARP: {} entries expired", expired);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address::AddressFamily;
    use crate::cache::{CacheEntry, EntryId};
    use crate::config::{ActiveConfig, InstanceConfig};
    use d7net::Ipv4Addr;

    fn entry(timeout: Duration) -> CacheEntry {
        let config = ActiveConfig::from_config(
            &InstanceConfig::ipv4(Ipv4Addr([10, 0, 0, 1])).with_entry_timeout(timeout),
        )
        .unwrap();
        CacheEntry::new(InstanceId::new(1), AddressFamily::new(1, 6), &config)
    }

    #[test]
    fn test_decay_counts_down() {
        let tick = Duration::from_millis(500);
        let mut table = CacheTable::new();
        table.insert(EntryId::new(1), entry(Duration::from_millis(1200)));
        let mut permanent = entry(Duration::from_millis(1200));
        permanent.set_decay(Duration::from_secs(0));
        table.insert(EntryId::new(2), permanent);

        assert_eq!(decay(&mut table, tick), 0);
        assert_eq!(decay(&mut table, tick), 0);
        assert_eq!(table.get(EntryId::new(1)).unwrap().decay, Duration::from_millis(200));
        assert_eq!(decay(&mut table, tick), 1);
        assert_eq!(table.ids(), vec![EntryId::new(2)]);
    }
}
