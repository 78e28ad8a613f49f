use coap_node::clock::{Cms, ManualClock, CMS_DISTANT_FUTURE};
use coap_node::engine::{DispatchContext, OutboundSink, ProtocolEngine};
use coap_node::message::{MessageRead, MessageWrite, MsgCode, MsgToken, MsgType};
use coap_node::message::{OwnedInboundRequest, OwnedMessage};
use coap_node::observable::ObserverKey;
use coap_node::option::OptionNumber;
use coap_node::readiness::{Interest, WaitSet};
use coap_node::var_node::{RequestOutcome, VarNode, VarNodeParams};
use coap_node::{Error, SessionKind};
use coap_node_bsd::*;
use std::io::Write;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn loopback_transport() -> Transport {
    init_logging();
    let mut transport = Transport::new(TransportConfig {
        family: AddressFamily::Inet4,
        join_all_coap_devices: false,
        ..TransportConfig::default()
    });
    transport
        .bind(SessionKind::Udp, "127.0.0.1:0".parse().unwrap())
        .expect("UDP bind failed");
    transport
}

/// Echoes every datagram and remembers what it saw.
#[derive(Default)]
struct Recorder {
    contexts: Vec<DispatchContext>,
    datagrams: Vec<Vec<u8>>,
    timer_sweeps: usize,
    fail_inbound: bool,
}

impl ProtocolEngine for Recorder {
    fn inbound_process(
        &mut self,
        datagram: &[u8],
        out: &mut dyn OutboundSink,
    ) -> Result<(), Error> {
        self.contexts.push(*out.context());
        self.datagrams.push(datagram.to_vec());
        if self.fail_inbound {
            return Err(Error::InvalidArgument);
        }
        out.set_responding(true);
        out.send(datagram)
    }

    fn run_due_timers(&mut self, out: &mut dyn OutboundSink) {
        assert!(!out.is_responding());
        assert!(!out.context().is_active());
        self.timer_sweeps += 1;
    }

    fn next_timer_deadline(&self) -> Cms {
        CMS_DISTANT_FUTURE
    }
}

fn wait_for_datagram(transport: &Transport, engine: &Recorder) {
    let outcome = transport.wait(engine, 2000, &WaitSet::new()).unwrap();
    assert!(
        matches!(outcome, WaitOutcome::Ready(ref ready) if ready.sessions == vec![SessionKind::Udp]),
        "unexpected {:?}",
        outcome
    );
}

#[test]
fn bind_twice_is_address_in_use() {
    let mut transport = loopback_transport();
    let port = transport.port();
    assert_ne!(port, 0);

    assert_eq!(
        transport.bind(SessionKind::Udp, "127.0.0.1:0".parse().unwrap()),
        Err(Error::AddressInUse)
    );
    assert_eq!(transport.readiness_set().len(), 1);
    assert_eq!(transport.port(), port);

    transport.close_all();
    transport.close_all();
    assert!(transport.readiness_set().is_empty());
    assert_eq!(transport.port(), 0);
}

#[test]
fn bind_conflict_with_other_socket() {
    init_logging();
    let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut transport = Transport::new(TransportConfig {
        family: AddressFamily::Inet4,
        join_all_coap_devices: false,
        ..TransportConfig::default()
    });

    assert_eq!(
        transport.bind(SessionKind::Udp, holder.local_addr().unwrap()),
        Err(Error::AddressInUse)
    );
    assert!(!transport.is_bound(SessionKind::Udp));
}

#[test]
fn dispatch_echoes_from_the_local_address() {
    let mut transport = loopback_transport();
    let local = transport.local_addr(SessionKind::Udp).unwrap();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    peer.send_to(b"ping", local).unwrap();

    let mut engine = Recorder::default();
    wait_for_datagram(&transport, &engine);
    transport.process(&mut engine).unwrap();

    assert_eq!(engine.datagrams, vec![b"ping".to_vec()]);
    assert_eq!(engine.timer_sweeps, 1);

    let context = engine.contexts[0];
    assert_eq!(context.remote, Some(peer.local_addr().unwrap()));
    assert_eq!(context.local, Some(local));
    assert_eq!(context.session, SessionKind::Udp);

    let mut buf = [0u8; 16];
    let (len, from) = peer.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"ping");
    assert_eq!(from, local);
}

#[cfg(feature = "dtls")]
#[test]
fn dispatch_reports_the_port_of_the_receiving_socket() {
    let mut transport = loopback_transport();
    transport
        .bind(SessionKind::Dtls, "127.0.0.1:0".parse().unwrap())
        .unwrap();
    let dtls = transport.local_addr(SessionKind::Dtls).unwrap();
    assert_ne!(dtls.port(), transport.port());

    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.send_to(b"ping", dtls).unwrap();

    let mut engine = Recorder::default();
    let outcome = transport.wait(&engine, 2000, &WaitSet::new()).unwrap();
    assert!(matches!(outcome, WaitOutcome::Ready(_)), "unexpected {:?}", outcome);
    transport.process(&mut engine).unwrap();

    let context = engine.contexts[0];
    assert_eq!(context.session, SessionKind::Dtls);
    assert_eq!(context.local, Some(dtls));
}

#[test]
fn oversized_datagram_is_dropped() {
    init_logging();
    let mut transport = Transport::new(TransportConfig {
        family: AddressFamily::Inet4,
        max_packet_len: 16,
        join_all_coap_devices: false,
    });
    transport
        .bind(SessionKind::Udp, "127.0.0.1:0".parse().unwrap())
        .unwrap();
    let local = transport.local_addr(SessionKind::Udp).unwrap();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();

    let mut engine = Recorder::default();
    peer.send_to(&[0x40; 64], local).unwrap();
    wait_for_datagram(&transport, &engine);
    transport.process(&mut engine).unwrap();

    assert!(engine.datagrams.is_empty());
    assert_eq!(engine.timer_sweeps, 1);

    peer.send_to(&[0x40; 16], local).unwrap();
    wait_for_datagram(&transport, &engine);
    transport.process(&mut engine).unwrap();
    assert_eq!(engine.datagrams, vec![vec![0x40; 16]]);
}

#[test]
fn timers_fire_without_traffic() {
    let mut transport = loopback_transport();
    let mut engine = Recorder::default();

    transport.process(&mut engine).unwrap();
    transport.process(&mut engine).unwrap();

    assert!(engine.datagrams.is_empty());
    assert_eq!(engine.timer_sweeps, 2);
}

#[test]
fn engine_error_aborts_the_pass() {
    let mut transport = loopback_transport();
    let local = transport.local_addr(SessionKind::Udp).unwrap();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.send_to(b"bad", local).unwrap();

    let mut engine = Recorder {
        fail_inbound: true,
        ..Recorder::default()
    };
    wait_for_datagram(&transport, &engine);

    assert_eq!(transport.process(&mut engine), Err(Error::InvalidArgument));
    assert_eq!(engine.timer_sweeps, 0);

    engine.fail_inbound = false;
    transport.process(&mut engine).unwrap();
    assert_eq!(engine.timer_sweeps, 1);
}

#[test]
fn wait_times_out() {
    let transport = loopback_transport();
    let engine = Recorder::default();
    let outcome = transport.wait(&engine, 10, &WaitSet::new()).unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[test]
fn wait_reports_wait_set_descriptors() {
    let transport = loopback_transport();
    let engine = Recorder::default();
    let other = UdpSocket::bind("127.0.0.1:0").unwrap();
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender.send_to(b"x", other.local_addr().unwrap()).unwrap();

    let fd = std::os::unix::io::AsRawFd::as_raw_fd(&other);
    let mut set = WaitSet::new();
    set.add(fd, Interest::Readable);

    match transport.wait(&engine, 2000, &set).unwrap() {
        WaitOutcome::Ready(ready) => {
            assert!(ready.sessions.is_empty());
            assert_eq!(ready.descriptors, vec![(fd, Interest::Readable)]);
        }
        WaitOutcome::TimedOut => panic!("wait set descriptor not reported"),
    }
}

#[test]
fn send_rejects_empty_and_unaddressed_datagrams() {
    let mut transport = loopback_transport();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let remote = peer.local_addr().unwrap();

    let context = DispatchContext::inbound(remote, None, SessionKind::Udp);
    assert_eq!(transport.send(&context, b""), Err(Error::InvalidArgument));
    assert_eq!(
        transport.send(&DispatchContext::new(SessionKind::Udp), b"hi"),
        Err(Error::InvalidArgument)
    );
    assert_eq!(
        transport.send(
            &DispatchContext::inbound(remote, None, SessionKind::Dtls),
            b"hi"
        ),
        Err(Error::SessionNotOpen)
    );
}

#[test]
fn send_falls_back_when_families_differ() {
    let mut transport = loopback_transport();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let remote = peer.local_addr().unwrap();

    let local: SocketAddr = "[2001:db8::1]:5683".parse().unwrap();
    assert_eq!(source_pin(Some(local), &remote), None);

    let context = DispatchContext::inbound(remote, Some(local), SessionKind::Udp);
    transport.send(&context, b"hello").unwrap();

    let mut buf = [0u8; 16];
    let (len, from) = peer.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"hello");
    assert_eq!(from.port(), transport.port());
}

#[test]
fn send_on_inet6_ignores_ipv4_local() {
    init_logging();
    let mut transport = Transport::new(TransportConfig {
        family: AddressFamily::Inet6,
        join_all_coap_devices: false,
        ..TransportConfig::default()
    });
    if let Err(err) = transport.bind(SessionKind::Udp, "[::1]:0".parse().unwrap()) {
        eprintln!("IPv6 loopback unavailable, skipping: {}", err);
        return;
    }

    let peer = UdpSocket::bind("[::1]:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let remote = peer.local_addr().unwrap();

    for local in &["127.0.0.1:5683", "[::ffff:127.0.0.1]:5683"] {
        let local: SocketAddr = local.parse().unwrap();
        let context = DispatchContext::inbound(remote, Some(local), SessionKind::Udp);
        transport.send(&context, b"hello").unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from.port(), transport.port());
    }
}

#[test]
fn join_is_idempotent() {
    init_logging();
    let mut transport = Transport::new(TransportConfig {
        join_all_coap_devices: false,
        ..TransportConfig::default()
    });

    if let Err(err) = transport.join_multicast(coap_node::ALL_COAP_DEVICES_V6_LL) {
        eprintln!("multicast unavailable, skipping: {}", err);
        return;
    }

    transport
        .join_multicast(coap_node::ALL_COAP_DEVICES_V6_LL)
        .unwrap();
    assert_eq!(transport.multicast_groups().len(), 1);
    assert!(transport.readiness_set().is_empty());
}

#[test]
fn resolve_multicast_literal() {
    let mut msg_type = MsgType::Con;
    let addr = resolve("ff02::fd", AddressFamily::Inet6, Some(&mut msg_type)).unwrap();
    assert!(is_multicast(&addr));
    assert_eq!(msg_type, MsgType::Non);
}

fn request(code: MsgCode) -> OwnedInboundRequest {
    let mut msg = OwnedMessage::request(code);
    msg.set_msg_token(MsgToken::from(7u32));
    OwnedInboundRequest::new(msg, "[::1]:40000".parse().unwrap())
}

fn file_node(content: &[u8]) -> (VarNode<FileVarStore, ManualClock>, tempfile::NamedTempFile, ManualClock) {
    init_logging();
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(content).unwrap();
    tmp.flush().unwrap();

    let store = FileVarStore::open(tmp.path().to_str().unwrap()).unwrap();
    let clock = ManualClock::default();
    let node = VarNode::new(store, clock.clone(), VarNodeParams::default()).unwrap();
    (node, tmp, clock)
}

fn get(node: &mut VarNode<FileVarStore, ManualClock>) -> OwnedMessage {
    let mut response = OwnedMessage::default();
    let outcome = node.handle_request(&request(MsgCode::MethodGet), &mut response);
    assert_eq!(outcome, Ok(RequestOutcome::Responded(MsgCode::SuccessContent)));
    response
}

#[test]
fn file_node_get_is_stable() {
    let (mut node, _tmp, _) = file_node(b"42\n");
    let first = get(&mut node);
    let second = get(&mut node);
    assert_eq!(first.payload(), b"42\n");
    assert_eq!(
        first.option_values(OptionNumber::ETAG),
        second.option_values(OptionNumber::ETAG)
    );
}

#[test]
fn file_node_put_then_get() {
    let (mut node, tmp, _) = file_node(b"off");

    let mut put = request(MsgCode::MethodPut);
    put.message.append_payload_bytes(b"on").unwrap();
    let mut response = OwnedMessage::default();
    node.handle_request(&put, &mut response).unwrap();
    assert_eq!(response.payload(), b"on");

    assert_eq!(std::fs::read(tmp.path()).unwrap(), b"on".to_vec());
    assert_eq!(get(&mut node).payload(), b"on");
}

#[test]
fn file_node_notices_external_change() {
    let (mut node, tmp, clock) = file_node(b"1");
    node.observable_mut()
        .subscribe(ObserverKey::of(&request(MsgCode::MethodGet)));

    clock.advance(500);
    assert!(!node.process());

    std::fs::write(tmp.path(), b"2").unwrap();
    clock.advance(500);
    assert!(node.process());
    assert_eq!(node.observable().trigger_count(), 1);

    let mut set = WaitSet::new();
    node.update_wait_set(&mut set);
    assert!(set
        .entries()
        .iter()
        .any(|(_, interest)| *interest == Interest::Urgent));
    assert!(set.timeout().unwrap() <= 1000);
}
