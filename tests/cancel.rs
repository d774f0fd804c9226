mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use d7arp::d7net::Ipv4Addr;
use d7arp::*;

use common::*;

const RETRY: Duration = Duration::from_millis(1000);
const PEER2_IP: Ipv4Addr = Ipv4Addr([10, 0, 0, 3]);

fn pending(arp: &ArpInstance, target: Ipv4Addr) -> (Event, AddressBuffer) {
    let event = Event::new();
    let buffer = AddressBuffer::new();
    assert_eq!(
        arp.request(Some(&target.0), Some(&event), &buffer),
        Ok(Resolution::Pending)
    );
    (event, buffer)
}

#[test]
fn test_cancel_all_of_one_instance() {
    let setup = Setup::new();
    let a = setup.instance(LOCAL_IP, RETRY);
    let b = setup.instance(OTHER_IP, RETRY);

    let (a1, _) = pending(&a, PEER_IP);
    let (a2, _) = pending(&a, PEER2_IP);
    let (b1, b1_buffer) = pending(&b, PEER_IP);

    assert_eq!(a.cancel(None, None), Ok(2));
    assert_eq!(a1.signal_count(), 1);
    assert_eq!(a2.signal_count(), 1);
    assert!(!b1.is_signaled());
    assert_eq!(a.cancel(None, None), Err(ArpError::NotFound));

    // The entry without waiters stays until retries run out
    assert_eq!(setup.service.stats().pending, 2);

    setup.service.on_frame_received(&reply_from(PEER_MAC, PEER_IP));
    assert_eq!(b1.signal_count(), 1);
    assert_eq!(b1_buffer.get().unwrap().as_bytes(), &PEER_MAC.0);
    assert_eq!(a1.signal_count(), 1);

    setup.ticks(6);
    assert_eq!(setup.service.stats().pending, 0);
    assert_eq!(a2.signal_count(), 1);
}

#[test]
fn test_cancel_single_waiter() {
    let setup = Setup::new();
    let arp = setup.instance(LOCAL_IP, RETRY);

    let (e1, b1) = pending(&arp, PEER_IP);
    let (e2, _) = pending(&arp, PEER_IP);

    assert_eq!(arp.cancel(Some(&PEER_IP.0), Some(&e1)), Ok(1));
    assert_eq!(e1.signal_count(), 1);
    assert!(b1.is_empty());
    assert!(!e2.is_signaled());

    assert_eq!(arp.cancel(Some(&PEER_IP.0), Some(&e1)), Err(ArpError::NotFound));
    assert_eq!(arp.cancel(Some(&PEER2_IP.0), Some(&e2)), Err(ArpError::NotFound));
}

#[test]
fn test_cancel_argument_checks() {
    let setup = Setup::new();
    let arp = setup.instance(LOCAL_IP, RETRY);
    let (event, _) = pending(&arp, PEER_IP);

    assert_eq!(arp.cancel(Some(&PEER_IP.0), None), Err(ArpError::InvalidArgument));
    assert_eq!(arp.cancel(None, Some(&event)), Err(ArpError::InvalidArgument));
    assert_eq!(arp.cancel(Some(&[10, 0]), Some(&event)), Err(ArpError::InvalidArgument));
    assert!(!event.is_signaled());

    let unconfigured = setup.service.create_instance();
    assert_eq!(unconfigured.cancel(None, None), Err(ArpError::NotConfigured));
}

#[test]
fn test_configure_rules() {
    let setup = Setup::new();
    let arp = setup.service.create_instance();
    assert!(!arp.is_configured());

    assert_eq!(
        arp.configure(Some(&InstanceConfig::ipv4(Ipv4Addr::ZERO))),
        Err(ArpError::InvalidArgument)
    );
    assert_eq!(
        arp.configure(Some(&InstanceConfig::new(0x0800, &[]))),
        Err(ArpError::InvalidArgument)
    );

    arp.configure(Some(&InstanceConfig::ipv4(LOCAL_IP))).unwrap();
    assert_eq!(arp.station_address().unwrap().as_bytes(), &LOCAL_IP.0);

    assert_eq!(
        arp.configure(Some(&InstanceConfig::ipv4(OTHER_IP))),
        Err(ArpError::AccessDenied)
    );
    arp.configure(Some(
        &InstanceConfig::ipv4(LOCAL_IP).with_retry(4, Duration::from_secs(1)),
    ))
    .unwrap();

    arp.configure(None).unwrap();
    arp.configure(None).unwrap();
    arp.configure(Some(&InstanceConfig::ipv4(OTHER_IP))).unwrap();
    assert_eq!(arp.station_address().unwrap().as_bytes(), &OTHER_IP.0);
}

#[test]
fn test_reset_releases_waiters_and_dynamic_entries() {
    let setup = Setup::new();
    let arp = setup.instance(LOCAL_IP, RETRY);

    let (event, buffer) = pending(&arp, PEER_IP);
    arp.add(false, Some(&PEER2_IP.0), Some(&PEER_MAC.0), Duration::from_secs(30), false)
        .unwrap();
    arp.add(false, Some(&OTHER_IP.0), Some(&PEER_MAC.0), Duration::from_secs(0), false)
        .unwrap();

    arp.configure(None).unwrap();
    assert_eq!(event.signal_count(), 1);
    assert!(buffer.is_empty());
    assert!(!arp.is_configured());

    let stats = setup.service.stats();
    assert_eq!(stats.resolved, 1);
    assert_eq!(
        arp.request(Some(&PEER_IP.0), Some(&Event::new()), &AddressBuffer::new()),
        Err(ArpError::NotConfigured)
    );
}

#[test]
fn test_dropping_instance_releases_waiters() {
    let setup = Setup::new();
    let keep = setup.instance(OTHER_IP, RETRY);
    let arp = setup.instance(LOCAL_IP, RETRY);
    let (event, _) = pending(&arp, PEER_IP);
    assert_eq!(setup.service.stats().instances, 2);

    drop(arp);
    assert_eq!(event.signal_count(), 1);
    assert_eq!(setup.service.stats().instances, 1);
    assert!(keep.is_configured());
}

#[test]
fn test_callback_may_reenter() {
    let setup = Setup::new();
    let arp = Arc::new(setup.instance(LOCAL_IP, RETRY));
    let outcome: Arc<Mutex<Option<ArpResult<Resolution>>>> = Arc::new(Mutex::new(None));

    let event = {
        let arp = arp.clone();
        let outcome = outcome.clone();
        Event::with_notify(move || {
            let result = arp.request(Some(&PEER2_IP.0), Some(&Event::new()), &AddressBuffer::new());
            *outcome.lock().unwrap() = Some(result);
        })
    };
    arp.request(Some(&PEER_IP.0), Some(&event), &AddressBuffer::new())
        .unwrap();

    setup.service.on_frame_received(&reply_from(PEER_MAC, PEER_IP));

    assert_eq!(event.signal_count(), 1);
    assert_eq!(*outcome.lock().unwrap(), Some(Ok(Resolution::Pending)));
    assert_eq!(setup.requests_for(PEER2_IP), 1);
}
