//! Received server responses, wrapped as queryable settings blocks.

use bytes::Bytes;

use std::io::{Cursor, Error, ErrorKind, Result};
use std::net::Ipv4Addr;
use std::sync::Mutex;

use netboot_types::dhcp::{DhcpHeader, DhcpMessageType, DhcpOptions, DhcpTag, DHCP_HDR_LEN};

use crate::settings::SettingsProvider;

/// One received DHCP packet, frozen at arrival.
///
/// The block keeps the raw bytes and an owned option store; the header's
/// address fields are mirrored into their diagnostic option copies at
/// construction, so every value the packet carries is reachable through
/// the option interface. Shared by reference count; a session holds at
/// most one standard and one ProxyDHCP block at a time.
#[derive(Debug)]
pub struct DhcpResponse {
    raw: Bytes,
    xid: u32,
    yiaddr: Ipv4Addr,
    msg_type: Option<DhcpMessageType>,
    options: Mutex<DhcpOptions>,
}

impl DhcpResponse {
    /// Decodes a received packet.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` on a truncated header, a missing magic
    /// cookie or a corrupt options region. The caller discards such
    /// packets without surfacing the error.
    pub fn parse(raw: Bytes) -> Result<DhcpResponse> {
        let header = DhcpHeader::read_from(&mut Cursor::new(&raw[..]))
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        let mut options = DhcpOptions::parse(&raw[DHCP_HDR_LEN..])?;

        if !header.yiaddr.is_unspecified() && options.fetch(DhcpTag::EB_YIADDR).is_none() {
            options.store_ipv4(DhcpTag::EB_YIADDR, header.yiaddr)?;
        }
        if !header.siaddr.is_unspecified() && options.fetch(DhcpTag::EB_SIADDR).is_none() {
            options.store_ipv4(DhcpTag::EB_SIADDR, header.siaddr)?;
        }

        let msg_type = options
            .fetch_u8(DhcpTag::MESSAGE_TYPE)
            .and_then(DhcpMessageType::from_raw);

        Ok(DhcpResponse {
            xid: header.xid,
            yiaddr: header.yiaddr,
            msg_type,
            options: Mutex::new(options),
            raw,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    #[must_use]
    pub fn xid(&self) -> u32 {
        self.xid
    }

    /// The client address offered by the server, zero for ProxyDHCP
    /// responses.
    #[must_use]
    pub fn yiaddr(&self) -> Ipv4Addr {
        self.yiaddr
    }

    /// A response that offers no address augments the transaction
    /// instead of answering it.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.yiaddr.is_unspecified()
    }

    #[must_use]
    pub fn msg_type(&self) -> Option<DhcpMessageType> {
        self.msg_type
    }

    /// Arbitration priority, defaulting to zero when the server sent
    /// none.
    #[must_use]
    pub fn priority(&self) -> u8 {
        self.fetch_u8(DhcpTag::EB_PRIORITY).unwrap_or(0)
    }

    /// Whether the server asks the client to disregard ProxyDHCP
    /// responses for this transaction.
    #[must_use]
    pub fn no_proxydhcp(&self) -> bool {
        self.fetch_u8(DhcpTag::EB_NO_PROXYDHCP).unwrap_or(0) != 0
    }

    #[must_use]
    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        self.fetch_ipv4(DhcpTag::SERVER_IDENTIFIER)
    }

    #[must_use]
    pub fn fetch_u8(&self, tag: DhcpTag) -> Option<u8> {
        self.options.lock().expect("options poisoned").fetch_u8(tag)
    }

    #[must_use]
    pub fn fetch_ipv4(&self, tag: DhcpTag) -> Option<Ipv4Addr> {
        self.options
            .lock()
            .expect("options poisoned")
            .fetch_ipv4(tag)
    }
}

impl SettingsProvider for DhcpResponse {
    fn store(&self, tag: DhcpTag, value: &[u8]) -> Result<()> {
        self.options
            .lock()
            .expect("options poisoned")
            .store(tag, value)
    }

    fn fetch(&self, tag: DhcpTag, buf: &mut [u8]) -> Result<usize> {
        let options = self.options.lock().expect("options poisoned");
        let value = options
            .fetch(tag)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no such option"))?;
        let n = value.len().min(buf.len());
        buf[..n].copy_from_slice(&value[..n]);
        Ok(value.len())
    }
}
