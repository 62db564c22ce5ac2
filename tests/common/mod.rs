//! Shared harness: an in-memory transport plus server-packet forgery.
#![allow(dead_code)]

use std::io::Result;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use netboot::device::{DeviceDescription, NetDevice, BUS_TYPE_PCI};
use netboot::transport::DatagramTransport;
use netboot::types::dhcp::{
    BootpOp, DhcpHeader, DhcpMessageType, DhcpOptions, DhcpTag, DHCP_HDR_LEN,
};
use netboot::types::iface::MacAddress;

/// Transaction id derived from [`test_device`]'s hardware address.
pub const XID: u32 = 0xccdd_eeff;

pub const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const OFFERED: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

pub fn test_device() -> Arc<NetDevice> {
    Arc::new(NetDevice::ethernet(
        "eth0",
        "aa:bb:cc:dd:ee:ff".parse::<MacAddress>().unwrap(),
        DeviceDescription {
            bus_type: BUS_TYPE_PCI,
            vendor: 0x8086,
            device: 0x100e,
        },
    ))
}

#[derive(Default)]
struct LogInner {
    sent: Vec<Vec<u8>>,
    closed: bool,
}

/// Observer handle onto a [`TestTransport`].
#[derive(Clone, Default)]
pub struct TransportLog {
    inner: Arc<Mutex<LogInner>>,
}

impl TransportLog {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.lock().unwrap().sent.len()
    }

    pub fn last_sent(&self) -> Vec<u8> {
        self.inner.lock().unwrap().sent.last().cloned().expect("nothing sent")
    }

    pub fn closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

/// Transport that records instead of transmitting.
pub struct TestTransport {
    log: TransportLog,
}

impl TestTransport {
    pub fn new() -> (TestTransport, TransportLog) {
        let log = TransportLog::default();
        (TestTransport { log: log.clone() }, log)
    }
}

impl DatagramTransport for TestTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.log.inner.lock().unwrap().sent.push(data.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.log.inner.lock().unwrap().closed = true;
    }
}

/// Decodes a recorded packet into its header and options.
pub fn decode(packet: &[u8]) -> (DhcpHeader, DhcpOptions) {
    let header = DhcpHeader::read_from(&mut std::io::Cursor::new(packet)).unwrap();
    let opts = DhcpOptions::parse(&packet[DHCP_HDR_LEN..]).unwrap();
    (header, opts)
}

pub fn msg_type_of(packet: &[u8]) -> DhcpMessageType {
    let (_, opts) = decode(packet);
    DhcpMessageType::from_raw(opts.fetch_u8(DhcpTag::MESSAGE_TYPE).unwrap()).unwrap()
}

/// Forges a server reply with the given message type and offered
/// address; `fill` adds further options.
pub fn reply(
    msgtype: DhcpMessageType,
    xid: u32,
    yiaddr: Ipv4Addr,
    fill: impl FnOnce(&mut DhcpOptions),
) -> Vec<u8> {
    let mut header = DhcpHeader::new(BootpOp::Reply, xid);
    header.htype = 1;
    header.hlen = 6;
    header.yiaddr = yiaddr;
    let mut opts = DhcpOptions::unbounded();
    opts.store_u8(DhcpTag::MESSAGE_TYPE, msgtype as u8).unwrap();
    fill(&mut opts);
    let mut raw = Vec::new();
    header.write_to(&mut raw).unwrap();
    opts.append_to(&mut raw).unwrap();
    raw
}

/// A plain standard OFFER carrying a server identifier.
pub fn offer(yiaddr: Ipv4Addr, server: Ipv4Addr) -> Vec<u8> {
    reply(DhcpMessageType::Offer, XID, yiaddr, |opts| {
        opts.store_ipv4(DhcpTag::SERVER_IDENTIFIER, server).unwrap();
    })
}

/// A ProxyDHCP OFFER (no address) with the given priority.
pub fn proxy_offer(priority: u8, fill: impl FnOnce(&mut DhcpOptions)) -> Vec<u8> {
    reply(DhcpMessageType::Offer, XID, Ipv4Addr::UNSPECIFIED, |opts| {
        opts.store_u8(DhcpTag::EB_PRIORITY, priority).unwrap();
        fill(opts);
    })
}

/// A standard ACK confirming `yiaddr`.
pub fn ack(yiaddr: Ipv4Addr, server: Ipv4Addr, fill: impl FnOnce(&mut DhcpOptions)) -> Vec<u8> {
    reply(DhcpMessageType::Ack, XID, yiaddr, |opts| {
        opts.store_ipv4(DhcpTag::SERVER_IDENTIFIER, server).unwrap();
        fill(opts);
    })
}
