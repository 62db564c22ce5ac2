//! The tag/length/value option store of a DHCP packet.

use std::fmt::{self, Display};
use std::io::{Error, ErrorKind, Result, Write};
use std::net::Ipv4Addr;

/// A DHCP option tag.
///
/// Plain tags occupy a single byte. Options nested inside an
/// encapsulating option are addressed as `(outer << 8) | sub`, so the
/// full tag space is 16 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DhcpTag(pub u16);

impl DhcpTag {
    pub const PAD: DhcpTag = DhcpTag(0);
    pub const SUBNET_MASK: DhcpTag = DhcpTag(1);
    pub const ROUTERS: DhcpTag = DhcpTag(3);
    pub const DNS_SERVERS: DhcpTag = DhcpTag(6);
    pub const LOG_SERVERS: DhcpTag = DhcpTag(7);
    pub const HOST_NAME: DhcpTag = DhcpTag(12);
    pub const DOMAIN_NAME: DhcpTag = DhcpTag(15);
    pub const ROOT_PATH: DhcpTag = DhcpTag(17);
    pub const VENDOR_ENCAP: DhcpTag = DhcpTag(43);
    pub const REQUESTED_ADDRESS: DhcpTag = DhcpTag(50);
    pub const LEASE_TIME: DhcpTag = DhcpTag(51);
    pub const MESSAGE_TYPE: DhcpTag = DhcpTag(53);
    pub const SERVER_IDENTIFIER: DhcpTag = DhcpTag(54);
    pub const PARAMETER_REQUEST_LIST: DhcpTag = DhcpTag(55);
    pub const MAX_MESSAGE_SIZE: DhcpTag = DhcpTag(57);
    pub const VENDOR_CLASS_ID: DhcpTag = DhcpTag(60);
    pub const CLIENT_ID: DhcpTag = DhcpTag(61);
    pub const TFTP_SERVER_NAME: DhcpTag = DhcpTag(66);
    pub const BOOTFILE_NAME: DhcpTag = DhcpTag(67);
    pub const CLIENT_ARCHITECTURE: DhcpTag = DhcpTag(93);
    pub const CLIENT_NDI: DhcpTag = DhcpTag(94);
    pub const CLIENT_UUID: DhcpTag = DhcpTag(97);
    /// Outer option carrying the client's vendor extensions.
    pub const EB_ENCAP: DhcpTag = DhcpTag(175);
    pub const ISCSI_INITIATOR_IQN: DhcpTag = DhcpTag(203);
    pub const END: DhcpTag = DhcpTag(255);

    /// Arbitration priority of a response block.
    pub const EB_PRIORITY: DhcpTag = DhcpTag::encap(175, 0x01);
    /// Diagnostic copy of the offered client address.
    pub const EB_YIADDR: DhcpTag = DhcpTag::encap(175, 0x02);
    /// Diagnostic copy of the next-server address.
    pub const EB_SIADDR: DhcpTag = DhcpTag::encap(175, 0x03);
    /// Instructs the client to disregard ProxyDHCP responses.
    pub const EB_NO_PROXYDHCP: DhcpTag = DhcpTag::encap(175, 0xb0);
    /// Bus description of the requesting network device.
    pub const EB_BUS_ID: DhcpTag = DhcpTag::encap(175, 0xb1);

    /// Addresses option `sub` nested inside the outer option `outer`.
    #[must_use]
    pub const fn encap(outer: u8, sub: u8) -> DhcpTag {
        DhcpTag(((outer as u16) << 8) | sub as u16)
    }

    #[must_use]
    pub const fn is_encapsulated(self) -> bool {
        self.0 > 0xff
    }

    const fn outer(self) -> u8 {
        (self.0 >> 8) as u8
    }

    const fn byte(self) -> u8 {
        self.0 as u8
    }
}

impl Display for DhcpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_encapsulated() {
            write!(f, "{}.{}", self.outer(), self.byte())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// An owned store of DHCP options.
///
/// Holds the options region of one packet as a normalized TLV sequence
/// (padding dropped, no terminator). A byte budget models the fixed-size
/// buffer the region must ultimately fit in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpOptions {
    data: Vec<u8>,
    limit: usize,
}

/// Locates `tag` in a TLV region, returning the span of the whole
/// option and of its value.
fn find(region: &[u8], tag: u8) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let mut i = 0;
    while i < region.len() {
        let t = region[i];
        if t == DhcpTag::PAD.byte() {
            i += 1;
            continue;
        }
        if t == DhcpTag::END.byte() {
            break;
        }
        if i + 1 >= region.len() {
            break;
        }
        let len = region[i + 1] as usize;
        if i + 2 + len > region.len() {
            break;
        }
        if t == tag {
            return Some((i..i + 2 + len, i + 2..i + 2 + len));
        }
        i += 2 + len;
    }
    None
}

impl DhcpOptions {
    /// Creates an empty store whose serialized form (including the END
    /// tag) may not exceed `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> DhcpOptions {
        DhcpOptions {
            data: Vec::new(),
            limit,
        }
    }

    /// Creates an empty store without a byte budget.
    #[must_use]
    pub fn unbounded() -> DhcpOptions {
        DhcpOptions::new(usize::MAX)
    }

    /// Parses the options region of a received packet.
    ///
    /// Padding is dropped and everything after an END tag is ignored.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` if an option's declared length runs past
    /// the end of the region.
    pub fn parse(region: &[u8]) -> Result<DhcpOptions> {
        let mut data = Vec::with_capacity(region.len());
        let mut i = 0;
        while i < region.len() {
            let tag = region[i];
            if tag == DhcpTag::PAD.byte() {
                i += 1;
                continue;
            }
            if tag == DhcpTag::END.byte() {
                break;
            }
            if i + 1 >= region.len() {
                return Err(Error::new(ErrorKind::InvalidData, "option without length"));
            }
            let len = region[i + 1] as usize;
            if i + 2 + len > region.len() {
                return Err(Error::new(ErrorKind::InvalidData, "truncated option"));
            }
            data.extend_from_slice(&region[i..i + 2 + len]);
            i += 2 + len;
        }
        Ok(DhcpOptions {
            data,
            limit: usize::MAX,
        })
    }

    /// Serialized length including the END tag.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len() + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fetches the value of `tag`, descending into the encapsulating
    /// option for nested tags.
    #[must_use]
    pub fn fetch(&self, tag: DhcpTag) -> Option<&[u8]> {
        if tag.is_encapsulated() {
            let (_, outer) = find(&self.data, tag.outer())?;
            let block = &self.data[outer];
            let (_, value) = find(block, tag.byte())?;
            Some(&block[value])
        } else {
            let (_, value) = find(&self.data, tag.byte())?;
            Some(&self.data[value])
        }
    }

    #[must_use]
    pub fn fetch_u8(&self, tag: DhcpTag) -> Option<u8> {
        self.fetch(tag)?.first().copied()
    }

    #[must_use]
    pub fn fetch_u16(&self, tag: DhcpTag) -> Option<u16> {
        let value = self.fetch(tag)?;
        Some(u16::from_be_bytes(value.get(..2)?.try_into().ok()?))
    }

    #[must_use]
    pub fn fetch_ipv4(&self, tag: DhcpTag) -> Option<Ipv4Addr> {
        let value = self.fetch(tag)?;
        let octets: [u8; 4] = value.get(..4)?.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Stores `value` under `tag`, replacing any previous value. An
    /// empty `value` removes the option. Nested tags create or extend
    /// the encapsulating option as needed.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidInput` if a single option would exceed 255
    /// bytes and with `WriteZero` if the region would exceed its byte
    /// budget.
    pub fn store(&mut self, tag: DhcpTag, value: &[u8]) -> Result<()> {
        if tag.is_encapsulated() {
            let mut block = self
                .fetch(DhcpTag(u16::from(tag.outer())))
                .map(<[u8]>::to_vec)
                .unwrap_or_default();
            if let Some((span, _)) = find(&block, tag.byte()) {
                block.drain(span);
            }
            if !value.is_empty() {
                if value.len() > u8::MAX as usize {
                    return Err(Error::new(ErrorKind::InvalidInput, "option value too long"));
                }
                block.push(tag.byte());
                block.push(value.len() as u8);
                block.extend_from_slice(value);
            }
            self.store_plain(tag.outer(), &block)
        } else {
            self.store_plain(tag.byte(), value)
        }
    }

    fn store_plain(&mut self, tag: u8, value: &[u8]) -> Result<()> {
        if value.len() > u8::MAX as usize {
            return Err(Error::new(ErrorKind::InvalidInput, "option value too long"));
        }
        let mut data = self.data.clone();
        if let Some((span, _)) = find(&data, tag) {
            data.drain(span);
        }
        if !value.is_empty() {
            data.push(tag);
            data.push(value.len() as u8);
            data.extend_from_slice(value);
        }
        if data.len() + 1 > self.limit {
            return Err(Error::new(ErrorKind::WriteZero, "options region full"));
        }
        self.data = data;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`DhcpOptions::store`].
    pub fn store_u8(&mut self, tag: DhcpTag, value: u8) -> Result<()> {
        self.store(tag, &[value])
    }

    /// # Errors
    ///
    /// See [`DhcpOptions::store`].
    pub fn store_u16(&mut self, tag: DhcpTag, value: u16) -> Result<()> {
        self.store(tag, &value.to_be_bytes())
    }

    /// # Errors
    ///
    /// See [`DhcpOptions::store`].
    pub fn store_ipv4(&mut self, tag: DhcpTag, value: Ipv4Addr) -> Result<()> {
        self.store(tag, &value.octets())
    }

    /// Writes the region terminated by the END tag.
    ///
    /// # Errors
    ///
    /// Fails if the writer cannot hold [`DhcpOptions::byte_len`] bytes.
    pub fn append_to(&self, w: &mut impl Write) -> Result<()> {
        w.write_all(&self.data)?;
        w.write_all(&[DhcpTag::END.byte()])?;
        Ok(())
    }
}
