//! The BOOTP/DHCP wire format.

use bytestream::{ByteOrder::BigEndian, StreamReader, StreamWriter};

use std::fmt::{self, Display};
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::net::Ipv4Addr;

pub mod options;

pub use options::{DhcpOptions, DhcpTag};

/// UDP port DHCP servers listen on.
pub const SERVER_PORT: u16 = 67;
/// UDP port DHCP clients listen on.
pub const CLIENT_PORT: u16 = 68;

/// Magic cookie separating the fixed header from the options region.
pub const DHCP_MAGIC: u32 = 0x6382_5363;

/// Length of the fixed header up to and including the magic cookie.
pub const DHCP_HDR_LEN: usize = 240;
/// Smallest buffer a transmitted DHCP packet is built in.
pub const DHCP_MIN_LEN: usize = 552;

/// Width of the `chaddr` hardware-address field.
pub const CHADDR_LEN: usize = 16;

/// Flag requesting that replies be broadcast rather than unicast.
pub const BOOTP_FL_BROADCAST: u16 = 0x8000;

const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BootpOp {
    Request = 1,
    Reply = 2,
}

impl BootpOp {
    #[must_use]
    pub fn from_raw(value: u8) -> Option<BootpOp> {
        match value {
            1 => Some(BootpOp::Request),
            2 => Some(BootpOp::Reply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl DhcpMessageType {
    #[must_use]
    pub fn from_raw(value: u8) -> Option<DhcpMessageType> {
        match value {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            _ => None,
        }
    }

    /// The `op` field value a packet of this type carries.
    #[must_use]
    pub fn bootp_op(self) -> BootpOp {
        match self {
            DhcpMessageType::Discover
            | DhcpMessageType::Request
            | DhcpMessageType::Decline
            | DhcpMessageType::Release
            | DhcpMessageType::Inform => BootpOp::Request,
            DhcpMessageType::Offer | DhcpMessageType::Ack | DhcpMessageType::Nak => BootpOp::Reply,
        }
    }
}

impl Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DhcpMessageType::Discover => "DHCPDISCOVER",
            DhcpMessageType::Offer => "DHCPOFFER",
            DhcpMessageType::Request => "DHCPREQUEST",
            DhcpMessageType::Decline => "DHCPDECLINE",
            DhcpMessageType::Ack => "DHCPACK",
            DhcpMessageType::Nak => "DHCPNAK",
            DhcpMessageType::Release => "DHCPRELEASE",
            DhcpMessageType::Inform => "DHCPINFORM",
        };
        write!(f, "{name}")
    }
}

/// The fixed part of a BOOTP/DHCP packet, up to the magic cookie.
///
/// The unused `sname` and `file` fields are written as zeros and skipped
/// when reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DhcpHeader {
    pub op: BootpOp,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,

    pub xid: u32,

    pub secs: u16,
    pub flags: u16,

    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; CHADDR_LEN],
}

impl DhcpHeader {
    #[must_use]
    pub fn new(op: BootpOp, xid: u32) -> DhcpHeader {
        DhcpHeader {
            op,
            htype: 0,
            hlen: 0,
            hops: 0,
            xid,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; CHADDR_LEN],
        }
    }

    /// Writes the header including the magic cookie.
    ///
    /// # Errors
    ///
    /// Fails if the writer cannot hold [`DHCP_HDR_LEN`] bytes.
    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        (self.op as u8).write_to(w, BigEndian)?;
        self.htype.write_to(w, BigEndian)?;
        self.hlen.write_to(w, BigEndian)?;
        self.hops.write_to(w, BigEndian)?;

        self.xid.write_to(w, BigEndian)?;

        self.secs.write_to(w, BigEndian)?;
        self.flags.write_to(w, BigEndian)?;

        u32::from_be_bytes(self.ciaddr.octets()).write_to(w, BigEndian)?;
        u32::from_be_bytes(self.yiaddr.octets()).write_to(w, BigEndian)?;
        u32::from_be_bytes(self.siaddr.octets()).write_to(w, BigEndian)?;
        u32::from_be_bytes(self.giaddr.octets()).write_to(w, BigEndian)?;

        w.write_all(&self.chaddr)?;
        w.write_all(&[0; SNAME_LEN])?;
        w.write_all(&[0; FILE_LEN])?;

        DHCP_MAGIC.write_to(w, BigEndian)?;
        Ok(())
    }

    /// Reads a header, verifying the magic cookie.
    ///
    /// # Errors
    ///
    /// Fails on a truncated header, an unknown `op` code or a missing
    /// magic cookie.
    pub fn read_from(r: &mut impl Read) -> Result<DhcpHeader> {
        let op = u8::read_from(r, BigEndian)?;
        let op = BootpOp::from_raw(op)
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "unknown BOOTP op code"))?;

        let htype = u8::read_from(r, BigEndian)?;
        let hlen = u8::read_from(r, BigEndian)?;
        let hops = u8::read_from(r, BigEndian)?;

        let xid = u32::read_from(r, BigEndian)?;

        let secs = u16::read_from(r, BigEndian)?;
        let flags = u16::read_from(r, BigEndian)?;

        let ciaddr = Ipv4Addr::from(u32::read_from(r, BigEndian)?);
        let yiaddr = Ipv4Addr::from(u32::read_from(r, BigEndian)?);
        let siaddr = Ipv4Addr::from(u32::read_from(r, BigEndian)?);
        let giaddr = Ipv4Addr::from(u32::read_from(r, BigEndian)?);

        let mut chaddr = [0u8; CHADDR_LEN];
        r.read_exact(&mut chaddr)?;
        let mut skipped = [0u8; SNAME_LEN + FILE_LEN];
        r.read_exact(&mut skipped)?;

        let magic = u32::read_from(r, BigEndian)?;
        if magic != DHCP_MAGIC {
            return Err(Error::new(ErrorKind::InvalidData, "missing magic cookie"));
        }

        Ok(DhcpHeader {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
        })
    }
}
