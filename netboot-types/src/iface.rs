use rand::random;

use std::fmt::{self, Display};
use std::io::{Error, ErrorKind};
use std::str::FromStr;

/// Hardware type assigned to Ethernet links (shared with ARP).
pub const ARPHRD_ETHER: u16 = 1;
/// Hardware type assigned to Infiniband links.
pub const ARPHRD_INFINIBAND: u16 = 32;

/// Largest link-layer address any supported link type produces.
pub const MAX_LINK_ADDR_LEN: usize = 32;

/// Largest payload an Ethernet frame carries.
pub const ETH_MAX_MTU: u16 = 1518;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const NULL: MacAddress = MacAddress([0; 6]);
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Generates a random unicast address.
    #[must_use]
    pub fn gen() -> MacAddress {
        let mut mac = random::<[u8; 6]>();
        mac[0] &= 0b1111_1110;
        MacAddress(mac)
    }

    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        *self == MacAddress::NULL
    }

    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        *self == MacAddress::BROADCAST
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(value: [u8; 6]) -> Self {
        MacAddress(value)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(value: MacAddress) -> Self {
        value.0
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts
                .next()
                .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "expected 6 octets"))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| Error::new(ErrorKind::InvalidInput, "invalid octet"))?;
        }
        if parts.next().is_some() {
            return Err(Error::new(ErrorKind::InvalidInput, "expected 6 octets"));
        }
        Ok(MacAddress(bytes))
    }
}

/// A link-layer address of arbitrary length.
///
/// Most links use 6-byte addresses, but some (e.g. Infiniband) carry
/// identifiers wider than the 16-byte `chaddr` field of a BOOTP header,
/// which changes how a request must be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddr {
    bytes: [u8; MAX_LINK_ADDR_LEN],
    len: u8,
}

impl LinkAddr {
    /// Creates a link-layer address from raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `addr` exceeds [`MAX_LINK_ADDR_LEN`].
    #[must_use]
    pub fn new(addr: &[u8]) -> LinkAddr {
        assert!(
            addr.len() <= MAX_LINK_ADDR_LEN,
            "link-layer address too long"
        );
        let mut bytes = [0u8; MAX_LINK_ADDR_LEN];
        bytes[..addr.len()].copy_from_slice(addr);
        LinkAddr {
            bytes,
            len: addr.len() as u8,
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the trailing four address bytes as a big-endian word,
    /// zero-extended if the address is shorter than four bytes.
    #[must_use]
    pub fn trailing4(&self) -> u32 {
        let slice = self.as_slice();
        let mut word = [0u8; 4];
        let n = slice.len().min(4);
        word[4 - n..].copy_from_slice(&slice[slice.len() - n..]);
        u32::from_be_bytes(word)
    }
}

impl From<MacAddress> for LinkAddr {
    fn from(value: MacAddress) -> Self {
        LinkAddr::new(value.as_slice())
    }
}

impl Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
