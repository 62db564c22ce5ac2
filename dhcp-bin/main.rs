//! One-shot DHCP acquisition over a real broadcast socket.
//!
//! Usage: `dhcp-bin <mac> [ifname]`

use std::env;
use std::io::Result;
use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use netboot::device::{DeviceDescription, NetDevice, BUS_TYPE_PCI};
use netboot::dhcp::{DhcpSession, DHCP_SETTINGS_NAME, PROXYDHCP_SETTINGS_NAME};
use netboot::settings::{SettingsProvider, SettingsTree};
use netboot::transport::UdpTransport;
use netboot::types::dhcp::{DhcpTag, DHCP_MIN_LEN};
use netboot::types::iface::MacAddress;

fn fetch_ipv4(provider: &dyn SettingsProvider, tag: DhcpTag) -> Option<Ipv4Addr> {
    let mut buf = [0u8; 4];
    match provider.fetch(tag, &mut buf) {
        Ok(n) if n >= 4 => Some(Ipv4Addr::from(buf)),
        _ => None,
    }
}

fn fetch_string(provider: &dyn SettingsProvider, tag: DhcpTag) -> Option<String> {
    let mut buf = [0u8; 128];
    let n = provider.fetch(tag, &mut buf).ok()?.min(buf.len());
    Some(String::from_utf8_lossy(&buf[..n]).into_owned())
}

fn run(mac: MacAddress, name: &str) -> Result<bool> {
    let netdev = Arc::new(NetDevice::ethernet(
        name,
        mac,
        DeviceDescription {
            bus_type: BUS_TYPE_PCI,
            vendor: 0,
            device: 0,
        },
    ));
    let settings = SettingsTree::new();

    let transport = UdpTransport::open()?;
    let rx = transport.try_clone()?;
    let mut session = DhcpSession::start(netdev, transport, settings.clone(), Instant::now());

    let mut buf = [0u8; DHCP_MIN_LEN * 2];
    let outcome = loop {
        session.handle_timeout(Instant::now());
        if let Some(outcome) = session.take_outcome() {
            break outcome;
        }
        if let Some(n) = rx.recv_deadline(&mut buf, session.deadline())? {
            session.handle_datagram(Instant::now(), &buf[..n]);
        }
    };

    match outcome {
        Ok(()) => {
            let acquired = settings.find(DHCP_SETTINGS_NAME).expect("settings registered");
            if let Some(addr) = fetch_ipv4(&*acquired, DhcpTag::EB_YIADDR) {
                println!("address:  {addr}");
            }
            if let Some(router) = fetch_ipv4(&*acquired, DhcpTag::ROUTERS) {
                println!("router:   {router}");
            }
            if let Some(bootfile) = fetch_string(&*acquired, DhcpTag::BOOTFILE_NAME) {
                println!("bootfile: {bootfile}");
            }
            if settings.find(PROXYDHCP_SETTINGS_NAME).is_some() {
                println!("proxydhcp settings present");
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("dhcp failed: {e}");
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(mac) = args.next().and_then(|s| s.parse::<MacAddress>().ok()) else {
        eprintln!("usage: dhcp-bin <mac> [ifname]");
        return ExitCode::from(2);
    };
    let name = args.next().unwrap_or_else(|| "eth0".to_string());

    match run(mac, &name) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("dhcp-bin: {e}");
            ExitCode::FAILURE
        }
    }
}
