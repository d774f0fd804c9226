use alloc::vec::Vec;
use core::time::Duration;
use serde::{Deserialize, Serialize};

use d7net::{EtherType, Ipv4Addr};

use crate::address::{AddressEntry, AddressFamily, AddressKind};
use crate::error::{ArpError, ArpResult};

/// Period of the maintenance tick
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Decay of dynamic cache entries
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(40);

pub const DEFAULT_RETRY_COUNT: u32 = 2;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Entries over all three tables
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Waiters attached to a single pending entry
pub const DEFAULT_MAX_WAITERS: usize = 64;

/// Binding of one instance. Zero timing values select the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Protocol type, same values as EtherType
    pub sw_type: u16,
    /// Protocol address this instance answers to
    pub station_address: Vec<u8>,
    #[serde(default)]
    pub entry_timeout_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub retry_interval_ms: u64,
}
impl InstanceConfig {
    pub fn new(sw_type: u16, station_address: &[u8]) -> Self {
        Self {
            sw_type,
            station_address: station_address.to_vec(),
            entry_timeout_ms: 0,
            retry_count: 0,
            retry_interval_ms: 0,
        }
    }

    pub fn ipv4(station: Ipv4Addr) -> Self {
        Self::new(EtherType::Ipv4 as u16, &station.0)
    }

    pub fn with_entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retry(mut self, count: u32, interval: Duration) -> Self {
        self.retry_count = count;
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::new(self.sw_type, self.station_address.len() as u8)
    }

    pub fn is_ipv4(&self) -> bool {
        EtherType::Ipv4.is(self.sw_type)
    }

    pub fn entry_timeout(&self) -> Duration {
        or_default(self.entry_timeout_ms, DEFAULT_ENTRY_TIMEOUT)
    }

    pub fn retry_interval(&self) -> Duration {
        or_default(self.retry_interval_ms, DEFAULT_RETRY_INTERVAL)
    }

    pub fn effective_retry_count(&self) -> u32 {
        if self.retry_count == 0 {
            DEFAULT_RETRY_COUNT
        } else {
            self.retry_count
        }
    }

    /// Station address must be present, and for IPv4 it must be
    /// a four byte unicast-capable address
    pub fn validate(&self) -> ArpResult<()> {
        if self.station_address.is_empty() || self.station_address.len() > u8::MAX as usize {
            return Err(ArpError::InvalidArgument);
        }
        if self.is_ipv4() {
            let ip = Ipv4Addr::from_bytes(&self.station_address).ok_or(ArpError::InvalidArgument)?;
            if ip.is_unspecified() || ip.is_broadcast() {
                return Err(ArpError::InvalidArgument);
            }
        }
        Ok(())
    }
}

fn or_default(ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        default
    } else {
        Duration::from_millis(ms)
    }
}

/// Validated, owned copy of an `InstanceConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveConfig {
    pub family: AddressFamily,
    pub station: AddressEntry,
    pub is_ipv4: bool,
    pub entry_timeout: Duration,
    pub retry_count: u32,
    pub retry_interval: Duration,
}
impl ActiveConfig {
    pub fn from_config(config: &InstanceConfig) -> ArpResult<Self> {
        config.validate()?;
        let family = config.family();
        Ok(Self {
            family,
            station: AddressEntry::new(AddressKind::Protocol, family, &config.station_address)?,
            is_ipv4: config.is_ipv4(),
            entry_timeout: config.entry_timeout(),
            retry_count: config.effective_retry_count(),
            retry_interval: config.retry_interval(),
        })
    }

    /// Same binding, only timing may differ
    pub fn is_rebind_of(&self, config: &InstanceConfig) -> bool {
        self.family == config.family() && self.station.as_bytes() == &config.station_address[..]
    }

    pub fn update_timing(&mut self, config: &InstanceConfig) {
        self.entry_timeout = config.entry_timeout();
        self.retry_count = config.effective_retry_count();
        self.retry_interval = config.retry_interval();
    }
}

/// Service-wide settings, shared by all instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub tick_interval_ms: u64,
    pub max_entries: usize,
    pub max_waiters: usize,
}
impl ServiceConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn tick_interval(&self) -> Duration {
        or_default(self.tick_interval_ms, TICK_INTERVAL)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL.as_millis() as u64,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_waiters: DEFAULT_MAX_WAITERS,
        }
    }
}
