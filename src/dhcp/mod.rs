//! The Dynamic-Host-Configuration Protocol (DHCP) boot client.

use std::time::Duration;

mod packet;
mod response;
mod session;

pub use packet::{create_request, Feature, DHCP_FEATURES};
pub use response::DhcpResponse;
pub use session::DhcpSession;

pub use packet::{FEATURE_AOE, FEATURE_HTTP, FEATURE_ISCSI, FEATURE_PXE_EXT, FEATURE_TFTP};

/// How long after the first usable offer the client keeps listening for
/// a ProxyDHCP reply sharing the transaction.
pub const PROXYDHCP_WAIT: Duration = Duration::from_secs(1);

/// Number of transmissions before a silent exchange is given up.
pub const DHCP_RETRIES: u32 = 7;

/// Scope name acquired standard configuration registers under.
pub const DHCP_SETTINGS_NAME: &str = "dhcp";
/// Scope name acquired ProxyDHCP configuration registers under.
pub const PROXYDHCP_SETTINGS_NAME: &str = "proxydhcp";
