//! Full DISCOVER → OFFER → REQUEST → ACK exchanges against a forged
//! server.

mod common;

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use common::{ack, decode, msg_type_of, offer, proxy_offer, test_device, TestTransport, OFFERED, SERVER, XID};
use netboot::dhcp::{DhcpSession, DHCP_SETTINGS_NAME, PROXYDHCP_SETTINGS_NAME, PROXYDHCP_WAIT};
use netboot::settings::SettingsTree;
use netboot::types::dhcp::{DhcpMessageType, DhcpTag};

fn fetch_ipv4(settings: &SettingsTree, name: &str, tag: DhcpTag) -> Option<Ipv4Addr> {
    let provider = settings.find(name)?;
    let mut buf = [0u8; 4];
    match provider.fetch(tag, &mut buf) {
        Ok(n) if n >= 4 => Some(Ipv4Addr::from(buf)),
        _ => None,
    }
}

#[test]
fn waits_out_the_proxydhcp_window() {
    let t0 = Instant::now();
    let (transport, log) = TestTransport::new();
    let settings = SettingsTree::new();
    let mut session = DhcpSession::start(test_device(), transport, settings.clone(), t0);

    // initial deadline is immediate; the first poll broadcasts DISCOVER
    assert_eq!(session.deadline(), Some(t0));
    session.handle_timeout(t0);
    assert_eq!(log.sent_count(), 1);
    let (header, _) = decode(&log.last_sent());
    assert_eq!(header.xid, XID);
    assert_eq!(msg_type_of(&log.last_sent()), DhcpMessageType::Discover);

    // an offer inside the window must not trigger the REQUEST yet
    session.handle_datagram(t0 + Duration::from_millis(100), &offer(OFFERED, SERVER));
    assert_eq!(log.sent_count(), 1);
    assert!(!session.is_finished());

    // the transaction stays open: expiries keep re-broadcasting DISCOVER
    let d = session.deadline().expect("timer armed");
    session.handle_timeout(d);
    assert_eq!(log.sent_count(), 2);
    assert_eq!(msg_type_of(&log.last_sent()), DhcpMessageType::Discover);

    // once the window has elapsed, the next offer flips to REQUEST
    let late = t0 + PROXYDHCP_WAIT + Duration::from_millis(100);
    session.handle_datagram(late, &offer(OFFERED, SERVER));
    assert_eq!(log.sent_count(), 3);
    let (header, opts) = decode(&log.last_sent());
    assert_eq!(header.xid, XID);
    assert_eq!(msg_type_of(&log.last_sent()), DhcpMessageType::Request);
    assert_eq!(opts.fetch_ipv4(DhcpTag::REQUESTED_ADDRESS), Some(OFFERED));
    assert_eq!(opts.fetch_ipv4(DhcpTag::SERVER_IDENTIFIER), Some(SERVER));

    // the ACK completes the session
    session.handle_datagram(late + Duration::from_millis(50), &ack(OFFERED, SERVER, |_| {}));
    assert!(session.is_finished());
    session.take_outcome().expect("terminal outcome").expect("success");

    assert_eq!(
        fetch_ipv4(&settings, DHCP_SETTINGS_NAME, DhcpTag::EB_YIADDR),
        Some(OFFERED)
    );
}

#[test]
fn no_proxydhcp_flag_skips_the_window() {
    let t0 = Instant::now();
    let (transport, log) = TestTransport::new();
    let settings = SettingsTree::new();
    let mut session = DhcpSession::start(test_device(), transport, settings.clone(), t0);
    session.handle_timeout(t0);

    let flagged = common::reply(DhcpMessageType::Offer, XID, OFFERED, |opts| {
        opts.store_ipv4(DhcpTag::SERVER_IDENTIFIER, SERVER).unwrap();
        opts.store_u8(DhcpTag::EB_NO_PROXYDHCP, 1).unwrap();
    });
    session.handle_datagram(t0 + Duration::from_millis(100), &flagged);

    // REQUEST went out immediately, well inside the window
    assert_eq!(log.sent_count(), 2);
    assert_eq!(msg_type_of(&log.last_sent()), DhcpMessageType::Request);

    session.handle_datagram(t0 + Duration::from_millis(150), &ack(OFFERED, SERVER, |_| {}));
    assert!(session.is_finished());
    session.take_outcome().unwrap().unwrap();
}

#[test]
fn ack_options_are_exposed_through_settings() {
    let t0 = Instant::now();
    let (transport, _log) = TestTransport::new();
    let settings = SettingsTree::new();
    let mut session = DhcpSession::start(test_device(), transport, settings.clone(), t0);
    session.handle_timeout(t0);

    session.handle_datagram(t0 + Duration::from_millis(100), &offer(OFFERED, SERVER));
    // a ProxyDHCP reply shares the transaction inside the window
    session.handle_datagram(
        t0 + Duration::from_millis(200),
        &proxy_offer(1, |opts| {
            opts.store(DhcpTag::BOOTFILE_NAME, b"undionly.kpxe").unwrap();
        }),
    );

    let late = t0 + PROXYDHCP_WAIT + Duration::from_millis(50);
    session.handle_datagram(late, &offer(OFFERED, SERVER));
    session.handle_datagram(
        late + Duration::from_millis(20),
        &ack(OFFERED, SERVER, |opts| {
            opts.store_ipv4(DhcpTag::ROUTERS, Ipv4Addr::new(10, 0, 0, 254)).unwrap();
        }),
    );
    assert!(session.is_finished());
    session.take_outcome().unwrap().unwrap();

    // every option of the ACK is visible
    assert_eq!(
        fetch_ipv4(&settings, DHCP_SETTINGS_NAME, DhcpTag::ROUTERS),
        Some(Ipv4Addr::new(10, 0, 0, 254))
    );
    assert_eq!(
        fetch_ipv4(&settings, DHCP_SETTINGS_NAME, DhcpTag::EB_YIADDR),
        Some(OFFERED)
    );

    // and the ProxyDHCP block is registered alongside
    let proxy = settings.find(PROXYDHCP_SETTINGS_NAME).expect("proxy settings");
    let mut buf = [0u8; 32];
    let n = proxy.fetch(DhcpTag::BOOTFILE_NAME, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"undionly.kpxe");
}
