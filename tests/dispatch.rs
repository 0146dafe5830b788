use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use onewol::common::check_wol_payload;
use onewol::dispatch::{Dispatcher, Transport, UdpTransport};
use onewol::iface::{BroadcastTarget, InterfaceSource, NetworkInterface};
use onewol::{MagicPacket, WakeError};

struct FixedInterfaces(Vec<NetworkInterface>);

impl InterfaceSource for FixedInterfaces {
    fn survey(&self) -> Vec<NetworkInterface> {
        self.0.clone()
    }
}

/// Records every send; fails the ones aimed at `fail_on`.
#[derive(Default)]
struct RecordingTransport {
    attempts: AtomicUsize,
    finished: AtomicUsize,
    fail_on: Option<Ipv4Addr>,
    slow_on: Option<Ipv4Addr>,
    sent: Mutex<Vec<(Ipv4Addr, Vec<u8>)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, target: &BroadcastTarget, packet: &MagicPacket) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.slow_on == Some(target.broadcast_address) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.sent.lock().unwrap().push((target.broadcast_address, packet.as_bytes().to_vec()));
        self.finished.fetch_add(1, Ordering::SeqCst);

        if self.fail_on == Some(target.broadcast_address) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "broadcast not permitted"));
        }
        Ok(())
    }
}

fn net(name: &str, address: [u8; 4], netmask: [u8; 4]) -> NetworkInterface {
    NetworkInterface {
        name: name.to_string(),
        address: Ipv4Addr::from(address),
        netmask: Ipv4Addr::from(netmask),
        internal: false,
    }
}

fn two_lans() -> Vec<NetworkInterface> {
    vec![
        net("enp9s0", [192, 168, 1, 50], [255, 255, 255, 0]),
        net("wlan0", [10, 0, 0, 23], [255, 255, 0, 0]),
    ]
}

fn dispatcher(interfaces: Vec<NetworkInterface>, transport: Arc<RecordingTransport>) -> Dispatcher {
    Dispatcher::new(Arc::new(FixedInterfaces(interfaces)), transport)
}

#[tokio::test]
async fn sends_from_every_eligible_interface() {
    let transport = Arc::new(RecordingTransport::default());
    let d = dispatcher(two_lans(), transport.clone());

    let report = d.send_wake("AA:BB:CC:DD:EE:FF").await.unwrap();
    assert_eq!(report.mac, "aabbccddeeff");
    assert_eq!(report.targets.len(), 2);

    let mut dests: Vec<Ipv4Addr> = transport.sent.lock().unwrap().iter().map(|(a, _)| *a).collect();
    dests.sort();
    assert_eq!(dests, vec![Ipv4Addr::new(10, 0, 255, 255), Ipv4Addr::new(192, 168, 1, 255)]);
    for (_, payload) in transport.sent.lock().unwrap().iter() {
        assert!(check_wol_payload(payload));
    }
}

#[tokio::test]
async fn invalid_mac_touches_no_socket() {
    let transport = Arc::new(RecordingTransport::default());
    let d = dispatcher(two_lans(), transport.clone());

    let err = d.send_wake("12:34").await.unwrap_err();
    assert!(matches!(err, WakeError::InvalidMacFormat(_)));
    assert!(err.is_client_error());
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn virtual_only_host_has_no_eligible_interfaces() {
    let transport = Arc::new(RecordingTransport::default());
    let d = dispatcher(vec![
        net("docker0", [172, 17, 0, 1], [255, 255, 0, 0]),
        net("veth1234", [172, 18, 0, 1], [255, 255, 0, 0]),
    ], transport.clone());

    let err = d.send_wake("aa-bb-cc-dd-ee-ff").await.unwrap_err();
    assert!(matches!(err, WakeError::NoEligibleInterfaces));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn only_limited_broadcast_targets_is_no_eligible_interfaces() {
    let transport = Arc::new(RecordingTransport::default());
    let d = dispatcher(vec![net("eth0", [192, 168, 1, 50], [0, 0, 0, 0])], transport.clone());

    let err = d.send_wake("aabbccddeeff").await.unwrap_err();
    assert!(matches!(err, WakeError::NoEligibleInterfaces));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_failed_send_fails_the_request() {
    let transport = Arc::new(RecordingTransport {
        fail_on: Some(Ipv4Addr::new(192, 168, 1, 255)),
        ..Default::default()
    });
    let d = dispatcher(two_lans(), transport.clone());

    let err = d.send_wake("aabbccddeeff").await.unwrap_err();
    assert!(!err.is_client_error());
    match err {
        WakeError::PartialOrTotalSendFailure { failed, attempted } => {
            assert_eq!((failed, attempted), (1, 2));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_waits_for_slow_siblings() {
    let transport = Arc::new(RecordingTransport {
        fail_on: Some(Ipv4Addr::new(192, 168, 1, 255)),
        slow_on: Some(Ipv4Addr::new(10, 0, 255, 255)),
        ..Default::default()
    });
    let d = dispatcher(two_lans(), transport.clone());

    assert!(d.send_wake("aabbccddeeff").await.is_err());
    assert_eq!(transport.finished.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn repeated_wakes_send_identical_payloads() {
    let transport = Arc::new(RecordingTransport::default());
    let d = dispatcher(vec![two_lans().remove(0)], transport.clone());

    d.send_wake("AA:BB:CC:DD:EE:FF").await.unwrap();
    d.send_wake("AA:BB:CC:DD:EE:FF").await.unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, sent[1].1);
    assert_eq!(sent[0].1.len(), 102);
}

fn target(name: &str, source: [u8; 4], broadcast: [u8; 4]) -> BroadcastTarget {
    BroadcastTarget {
        interface_name: name.to_string(),
        source_address: Ipv4Addr::from(source),
        broadcast_address: Ipv4Addr::from(broadcast),
    }
}

#[tokio::test]
async fn udp_transport_sends_on_loopback() {
    let packet = onewol::encode_magic_packet("aa:bb:cc:dd:ee:ff").unwrap();
    UdpTransport.send(&target("lo", [127, 0, 0, 1], [127, 0, 0, 1]), &packet).await.unwrap();
}

#[tokio::test]
async fn udp_transport_reports_bind_failure() {
    let packet = onewol::encode_magic_packet("aa:bb:cc:dd:ee:ff").unwrap();
    let err = UdpTransport
        .send(&target("eth0", [203, 0, 113, 7], [203, 0, 113, 255]), &packet)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::AddrNotAvailable);
}

#[tokio::test]
async fn unbindable_interface_fails_the_request() {
    let d = Dispatcher::new(
        Arc::new(FixedInterfaces(vec![net("eth0", [203, 0, 113, 7], [255, 255, 255, 0])])),
        Arc::new(UdpTransport),
    );

    match d.send_wake("aabbccddeeff").await {
        Err(WakeError::PartialOrTotalSendFailure { failed, attempted }) => {
            assert_eq!((failed, attempted), (1, 1));
        }
        other => panic!("unexpected {other:?}"),
    }
}
