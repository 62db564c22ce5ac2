//! Assembly of outbound DISCOVER and REQUEST packets.

use std::io::{Cursor, Error, ErrorKind, Result};

use netboot_types::dhcp::{
    BootpOp, DhcpHeader, DhcpMessageType, DhcpOptions, DhcpTag, BOOTP_FL_BROADCAST, CHADDR_LEN,
    DHCP_HDR_LEN,
};
use netboot_types::iface::ETH_MAX_MTU;

use crate::device::NetDevice;

use super::response::DhcpResponse;

pub const FEATURE_PXE_EXT: u8 = 0x10;
pub const FEATURE_ISCSI: u8 = 0x11;
pub const FEATURE_AOE: u8 = 0x12;
pub const FEATURE_HTTP: u8 = 0x13;
pub const FEATURE_TFTP: u8 = 0x15;

/// A protocol capability advertised to the boot server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub code: u8,
    pub version: u8,
}

/// Capabilities compiled into this client.
pub const DHCP_FEATURES: &[Feature] = &[
    Feature {
        code: FEATURE_PXE_EXT,
        version: 1,
    },
    Feature {
        code: FEATURE_HTTP,
        version: 1,
    },
    Feature {
        code: FEATURE_TFTP,
        version: 1,
    },
];

const VENDOR_CLASS: &[u8] = b"PXEClient:Arch:00000:UNDI:002001";

const PARAM_REQUEST: &[u8] = &[
    DhcpTag::SUBNET_MASK.0 as u8,
    DhcpTag::ROUTERS.0 as u8,
    DhcpTag::DNS_SERVERS.0 as u8,
    DhcpTag::LOG_SERVERS.0 as u8,
    DhcpTag::HOST_NAME.0 as u8,
    DhcpTag::DOMAIN_NAME.0 as u8,
    DhcpTag::ROOT_PATH.0 as u8,
    DhcpTag::VENDOR_ENCAP.0 as u8,
    DhcpTag::VENDOR_CLASS_ID.0 as u8,
    DhcpTag::TFTP_SERVER_NAME.0 as u8,
    DhcpTag::BOOTFILE_NAME.0 as u8,
    DhcpTag::EB_ENCAP.0 as u8,
    DhcpTag::ISCSI_INITIATOR_IQN.0 as u8,
];

/// Options attached to every request, regardless of message type.
fn base_request_options(limit: usize) -> Result<DhcpOptions> {
    let mut opts = DhcpOptions::new(limit);
    opts.store_u16(DhcpTag::MAX_MESSAGE_SIZE, ETH_MAX_MTU)?;
    opts.store(DhcpTag::VENDOR_CLASS_ID, VENDOR_CLASS)?;
    opts.store_u16(DhcpTag::CLIENT_ARCHITECTURE, 0)?;
    opts.store(DhcpTag::CLIENT_NDI, &[1, 2, 1])?;
    opts.store(DhcpTag::PARAMETER_REQUEST_LIST, PARAM_REQUEST)?;
    Ok(opts)
}

/// Builds a complete request packet into `buf`, returning its length.
///
/// Without a prior offer the packet is a DISCOVER; with one it is a
/// REQUEST referencing the offer's server and address.
///
/// # Errors
///
/// Fails with `WriteZero` if `buf` cannot hold the packet, and with
/// `InvalidInput` if `offer` lacks the server identifier or offered
/// address a REQUEST must echo.
pub fn create_request(
    netdev: &NetDevice,
    offer: Option<&DhcpResponse>,
    features: &[Feature],
    buf: &mut [u8],
) -> Result<usize> {
    if buf.len() < DHCP_HDR_LEN + 1 {
        return Err(Error::new(ErrorKind::WriteZero, "buffer below minimum"));
    }

    let msgtype = match offer {
        Some(_) => DhcpMessageType::Request,
        None => DhcpMessageType::Discover,
    };

    let mut opts = base_request_options(buf.len() - DHCP_HDR_LEN)?;
    opts.store_u8(DhcpTag::MESSAGE_TYPE, msgtype as u8)?;

    // A REQUEST echoes the chosen server and address back.
    if let Some(offer) = offer {
        let server_id = offer.server_identifier().ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput, "offer missing server identifier")
        })?;
        let requested = offer
            .fetch_ipv4(DhcpTag::EB_YIADDR)
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "offer missing offered address"))?;
        opts.store_ipv4(DhcpTag::SERVER_IDENTIFIER, server_id)?;
        opts.store_ipv4(DhcpTag::REQUESTED_ADDRESS, requested)?;
    }

    if !features.is_empty() {
        let mut list = Vec::with_capacity(features.len() * 3);
        for feature in features {
            list.extend_from_slice(&[feature.code, 1, feature.version]);
        }
        opts.store(DhcpTag::EB_ENCAP, &list)?;
    }

    let desc = netdev.desc;
    let mut bus_id = vec![desc.bus_type];
    bus_id.extend_from_slice(&desc.vendor.to_be_bytes());
    bus_id.extend_from_slice(&desc.device.to_be_bytes());
    opts.store(DhcpTag::EB_BUS_ID, &bus_id)?;

    // Required for Infiniband, harmless elsewhere.
    let mut client_id = vec![netdev.ll_proto as u8];
    client_id.extend_from_slice(netdev.ll_addr.as_slice());
    opts.store(DhcpTag::CLIENT_ID, &client_id)?;

    if let Some(uuid) = netdev.uuid {
        let mut client_uuid = vec![0u8];
        client_uuid.extend_from_slice(&uuid);
        opts.store(DhcpTag::CLIENT_UUID, &client_uuid)?;
    }

    let mut header = DhcpHeader::new(msgtype.bootp_op(), netdev.xid());
    debug_assert_eq!(header.op, BootpOp::Request);
    header.htype = netdev.ll_proto as u8;
    let hlen = netdev.ll_addr.len();
    if hlen > CHADDR_LEN {
        // The address cannot be echoed through the fixed chaddr field
        // (RFC 4390), so replies must be broadcast instead.
        header.hlen = 0;
        header.flags = BOOTP_FL_BROADCAST;
    } else {
        header.hlen = hlen as u8;
        header.chaddr[..hlen].copy_from_slice(netdev.ll_addr.as_slice());
    }

    let mut cursor = Cursor::new(buf);
    header.write_to(&mut cursor)?;
    opts.append_to(&mut cursor)?;
    Ok(cursor.position() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDescription, BUS_TYPE_PCI};
    use bytes::Bytes;
    use netboot_types::dhcp::DHCP_MIN_LEN;
    use netboot_types::iface::{LinkAddr, MacAddress, ARPHRD_INFINIBAND};
    use std::net::Ipv4Addr;

    fn device() -> NetDevice {
        NetDevice::ethernet(
            "eth0",
            "aa:bb:cc:dd:ee:ff".parse::<MacAddress>().unwrap(),
            DeviceDescription {
                bus_type: BUS_TYPE_PCI,
                vendor: 0x8086,
                device: 0x100e,
            },
        )
    }

    fn forge_offer(yiaddr: Ipv4Addr, server_id: Option<Ipv4Addr>) -> DhcpResponse {
        let mut header = DhcpHeader::new(BootpOp::Reply, 0xccdd_eeff);
        header.yiaddr = yiaddr;
        let mut opts = DhcpOptions::unbounded();
        opts.store_u8(DhcpTag::MESSAGE_TYPE, DhcpMessageType::Offer as u8)
            .unwrap();
        if let Some(server_id) = server_id {
            opts.store_ipv4(DhcpTag::SERVER_IDENTIFIER, server_id).unwrap();
        }
        let mut raw = Vec::new();
        header.write_to(&mut raw).unwrap();
        opts.append_to(&mut raw).unwrap();
        DhcpResponse::parse(Bytes::from(raw)).unwrap()
    }

    fn build(netdev: &NetDevice, offer: Option<&DhcpResponse>) -> (DhcpHeader, DhcpOptions) {
        let mut buf = vec![0u8; DHCP_MIN_LEN];
        let len = create_request(netdev, offer, DHCP_FEATURES, &mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(&buf[..len]);
        let header = DhcpHeader::read_from(&mut cursor).unwrap();
        let opts = DhcpOptions::parse(&buf[DHCP_HDR_LEN..len]).unwrap();
        (header, opts)
    }

    #[test]
    fn discover_contents() {
        let dev = device().with_uuid([7; 16]);
        let (header, opts) = build(&dev, None);

        assert_eq!(header.op, BootpOp::Request);
        assert_eq!(header.xid, 0xccdd_eeff);
        assert_eq!(header.htype, 1);
        assert_eq!(header.hlen, 6);
        assert_eq!(header.flags, 0);
        assert_eq!(&header.chaddr[..6], dev.ll_addr.as_slice());

        assert_eq!(
            opts.fetch_u8(DhcpTag::MESSAGE_TYPE),
            Some(DhcpMessageType::Discover as u8)
        );
        assert_eq!(opts.fetch(DhcpTag::VENDOR_CLASS_ID), Some(VENDOR_CLASS));
        assert_eq!(opts.fetch_u16(DhcpTag::MAX_MESSAGE_SIZE), Some(ETH_MAX_MTU));
        assert_eq!(opts.fetch(DhcpTag::PARAMETER_REQUEST_LIST), Some(PARAM_REQUEST));
        // no offer yet, nothing echoed
        assert_eq!(opts.fetch(DhcpTag::SERVER_IDENTIFIER), None);
        assert_eq!(opts.fetch(DhcpTag::REQUESTED_ADDRESS), None);

        let client_id = opts.fetch(DhcpTag::CLIENT_ID).unwrap();
        assert_eq!(client_id[0], 1);
        assert_eq!(&client_id[1..], dev.ll_addr.as_slice());

        let uuid = opts.fetch(DhcpTag::CLIENT_UUID).unwrap();
        assert_eq!(uuid.len(), 17);
        assert_eq!(uuid[0], 0);

        let bus_id = opts.fetch(DhcpTag::EB_BUS_ID).unwrap();
        assert_eq!(bus_id, &[BUS_TYPE_PCI, 0x80, 0x86, 0x10, 0x0e]);

        assert_eq!(opts.fetch(DhcpTag::encap(175, FEATURE_PXE_EXT)), Some(&[1u8][..]));
    }

    #[test]
    fn uuid_is_optional() {
        let (_, opts) = build(&device(), None);
        assert_eq!(opts.fetch(DhcpTag::CLIENT_UUID), None);
    }

    #[test]
    fn request_echoes_offer() {
        let offer = forge_offer(Ipv4Addr::new(10, 0, 0, 5), Some(Ipv4Addr::new(10, 0, 0, 1)));
        let (header, opts) = build(&device(), Some(&offer));

        assert_eq!(header.op, BootpOp::Request);
        assert_eq!(
            opts.fetch_u8(DhcpTag::MESSAGE_TYPE),
            Some(DhcpMessageType::Request as u8)
        );
        assert_eq!(
            opts.fetch_ipv4(DhcpTag::SERVER_IDENTIFIER),
            Some(Ipv4Addr::new(10, 0, 0, 1))
        );
        assert_eq!(
            opts.fetch_ipv4(DhcpTag::REQUESTED_ADDRESS),
            Some(Ipv4Addr::new(10, 0, 0, 5))
        );
    }

    #[test]
    fn malformed_offer_rejected() {
        let dev = device();
        let mut buf = vec![0u8; DHCP_MIN_LEN];

        let no_server = forge_offer(Ipv4Addr::new(10, 0, 0, 5), None);
        let err = create_request(&dev, Some(&no_server), DHCP_FEATURES, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let no_addr = forge_offer(Ipv4Addr::UNSPECIFIED, Some(Ipv4Addr::new(10, 0, 0, 1)));
        let err = create_request(&dev, Some(&no_addr), DHCP_FEATURES, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn oversized_hardware_address() {
        let mut dev = device();
        dev.ll_proto = ARPHRD_INFINIBAND;
        dev.ll_addr = LinkAddr::new(&[0x42; 20]);

        let (header, _) = build(&dev, None);
        assert_eq!(header.hlen, 0);
        assert_eq!(header.flags, BOOTP_FL_BROADCAST);
        assert_eq!(header.chaddr, [0u8; CHADDR_LEN]);
    }

    #[test]
    fn insufficient_space() {
        let mut tiny = [0u8; 64];
        let err = create_request(&device(), None, DHCP_FEATURES, &mut tiny).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);

        // header fits but the option template does not
        let mut short = [0u8; DHCP_HDR_LEN + 8];
        let err = create_request(&device(), None, DHCP_FEATURES, &mut short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }
}
