//! Read-only descriptions of the network devices under configuration.

use netboot_types::iface::{LinkAddr, MacAddress, ARPHRD_ETHER};

pub const BUS_TYPE_PCI: u8 = 1;
pub const BUS_TYPE_ISAPNP: u8 = 2;

/// Identifies the bus a network device is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceDescription {
    pub bus_type: u8,
    pub vendor: u16,
    pub device: u16,
}

/// A network device undergoing configuration.
///
/// The session layer only reads from this; ownership stays with the
/// caller, which typically shares one handle per device.
#[derive(Debug, Clone)]
pub struct NetDevice {
    /// Interface name, also the settings scope acquired configuration
    /// registers under.
    pub name: String,
    /// Link-layer protocol (ARP hardware type).
    pub ll_proto: u16,
    /// Link-layer address.
    pub ll_addr: LinkAddr,
    /// Bus description of the underlying hardware.
    pub desc: DeviceDescription,
    /// System UUID, if the platform exposes one.
    pub uuid: Option<[u8; 16]>,
}

impl NetDevice {
    #[must_use]
    pub fn ethernet(name: &str, mac: MacAddress, desc: DeviceDescription) -> NetDevice {
        NetDevice {
            name: name.to_string(),
            ll_proto: ARPHRD_ETHER,
            ll_addr: LinkAddr::from(mac),
            desc,
            uuid: None,
        }
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: [u8; 16]) -> NetDevice {
        self.uuid = Some(uuid);
        self
    }

    /// The transaction id this device's sessions run under.
    ///
    /// Derived from the trailing bytes of the hardware address instead
    /// of a random source, so the client can recognize its own replies
    /// without persisting state. Firmware runs at most one session per
    /// device, which keeps the derivation collision-free.
    #[must_use]
    pub fn xid(&self) -> u32 {
        self.ll_addr.trailing4()
    }

    /// Name of the settings scope owned by this device.
    #[must_use]
    pub fn settings_name(&self) -> &str {
        &self.name
    }
}
