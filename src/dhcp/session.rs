//! The retry-driven session state machine.

use bytes::Bytes;

use std::io::{Error, ErrorKind, Result};
use std::sync::Arc;
use std::time::Instant;

use netboot_types::dhcp::{DhcpMessageType, DHCP_MIN_LEN};

use crate::device::NetDevice;
use crate::settings::SettingsTree;
use crate::timer::RetryTimer;
use crate::transport::DatagramTransport;

use super::packet::{create_request, Feature, DHCP_FEATURES};
use super::response::DhcpResponse;
use super::{DHCP_RETRIES, DHCP_SETTINGS_NAME, PROXYDHCP_SETTINGS_NAME, PROXYDHCP_WAIT};

/// Progress of an acquisition session. Transitions are monotonic:
/// `Discover → Request → Closed`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Broadcasting DISCOVERs, collecting offers.
    Discover,
    /// An offer was selected, REQUESTs reference it.
    Request,
    /// Finished; no further event may mutate the session.
    Closed,
}

/// One DHCP acquisition on one network device.
///
/// The session never blocks and owns no event source: the surrounding
/// runtime feeds it elapsed time via [`DhcpSession::handle_timeout`] and
/// received datagrams via [`DhcpSession::handle_datagram`], never
/// concurrently. Progress between calls is expressed solely through the
/// armed retry deadline.
pub struct DhcpSession<T: DatagramTransport> {
    netdev: Arc<NetDevice>,
    transport: T,
    settings: SettingsTree,
    features: &'static [Feature],

    state: SessionState,
    /// Best address-bearing response so far (an OFFER, later the ACK).
    response: Option<Arc<DhcpResponse>>,
    /// Best ProxyDHCP response so far.
    proxy_response: Option<Arc<DhcpResponse>>,
    timer: RetryTimer,
    started: Instant,
    outcome: Option<Result<()>>,
}

impl<T: DatagramTransport> DhcpSession<T> {
    /// Begins configuring `netdev`. The first DISCOVER is transmitted on
    /// the first [`DhcpSession::handle_timeout`] poll, which is due
    /// immediately.
    pub fn start(
        netdev: Arc<NetDevice>,
        transport: T,
        settings: SettingsTree,
        now: Instant,
    ) -> DhcpSession<T> {
        let mut timer = RetryTimer::new(DHCP_RETRIES);
        timer.start_nodelay(now);
        tracing::trace!(
            "starting session on {} (xid {:08x})",
            netdev.name,
            netdev.xid()
        );
        DhcpSession {
            netdev,
            transport,
            settings,
            features: DHCP_FEATURES,
            state: SessionState::Discover,
            response: None,
            proxy_response: None,
            timer,
            started: now,
            outcome: None,
        }
    }

    /// The next instant [`DhcpSession::handle_timeout`] should be called
    /// at, or `None` once the session has finished.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The terminal result, once. `None` while the session is running or
    /// after the outcome was already taken.
    pub fn take_outcome(&mut self) -> Option<Result<()>> {
        self.outcome.take()
    }

    /// Reports the passage of time: retransmits on an elapsed deadline,
    /// fails the session once the retry budget is spent.
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.state == SessionState::Closed {
            return;
        }
        let Some(expiry) = self.timer.expire(now) else {
            return;
        };
        if expiry.exhausted {
            self.finish(Err(Error::new(
                ErrorKind::TimedOut,
                "no response from any server",
            )));
        } else {
            self.send_request(now);
        }
    }

    /// Hands one received datagram to the session. Anything that does
    /// not belong to this transaction in its current state is discarded
    /// without touching session state.
    pub fn handle_datagram(&mut self, now: Instant, data: &[u8]) {
        if self.state == SessionState::Closed {
            return;
        }

        let response = match DhcpResponse::parse(Bytes::copy_from_slice(data)) {
            Ok(response) => Arc::new(response),
            Err(e) => {
                tracing::trace!("discarding undecodable packet: {e}");
                return;
            }
        };

        if response.xid() != self.netdev.xid() {
            tracing::trace!(
                "discarding response for transaction {:08x} (ours is {:08x})",
                response.xid(),
                self.netdev.xid()
            );
            return;
        }

        let expected = match self.state {
            SessionState::Discover => DhcpMessageType::Offer,
            SessionState::Request => DhcpMessageType::Ack,
            SessionState::Closed => unreachable!("closed session received an event"),
        };
        if response.msg_type() != Some(expected) {
            tracing::trace!("discarding unexpected message while awaiting {expected}");
            return;
        }

        self.merge_response(response);

        // Nothing to act on until an address-bearing response exists.
        let Some(response) = self.response.clone() else {
            return;
        };
        let ignore_proxy = response.no_proxydhcp();

        match self.state {
            SessionState::Discover => {
                // Hold the transaction open long enough for a ProxyDHCP
                // server to answer, unless told not to bother.
                let elapsed = now.duration_since(self.started);
                if ignore_proxy || elapsed > PROXYDHCP_WAIT {
                    self.timer.stop();
                    self.state = SessionState::Request;
                    self.send_request(now);
                }
            }
            SessionState::Request => {
                if ignore_proxy && self.proxy_response.take().is_some() {
                    tracing::debug!("discarding ProxyDHCP response on server request");
                }
                let rc = self.register_settings();
                self.finish(rc);
            }
            SessionState::Closed => unreachable!("closed session received an event"),
        }
    }

    /// Aborts the session. Safe to call in any state; after the first
    /// call every further event is a no-op.
    pub fn cancel(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.finish(Err(Error::new(ErrorKind::Interrupted, "session canceled")));
    }

    /// Places `response` into the slot of its flavor, unless the slot
    /// already holds a higher-priority block. Ties favor the newcomer.
    fn merge_response(&mut self, response: Arc<DhcpResponse>) {
        let flavor = if response.is_proxy() { "proxy" } else { "standard" };
        let slot = if response.is_proxy() {
            &mut self.proxy_response
        } else {
            &mut self.response
        };
        let held = slot.as_ref().map_or(0, |stored| stored.priority());
        if response.priority() >= held {
            tracing::trace!(
                "keeping {flavor} response (priority {} >= {held})",
                response.priority()
            );
            *slot = Some(response);
        } else {
            tracing::trace!(
                "discarding {flavor} response (priority {} < {held})",
                response.priority()
            );
        }
    }

    /// Builds and transmits the packet the current state calls for. The
    /// timer is re-armed first, so a failed construction or send is
    /// simply retried next cycle.
    fn send_request(&mut self, now: Instant) {
        self.timer.start(now);

        let offer = match self.state {
            SessionState::Discover => None,
            SessionState::Request => Some(
                self.response
                    .as_deref()
                    .expect("requesting without an offer"),
            ),
            SessionState::Closed => unreachable!("closed session transmitting"),
        };

        let mut buf = vec![0u8; DHCP_MIN_LEN];
        match create_request(&self.netdev, offer, self.features, &mut buf) {
            Ok(len) => {
                tracing::trace!(
                    "{}: transmitting {} ({len} bytes, attempt {})",
                    self.netdev.name,
                    match self.state {
                        SessionState::Request => DhcpMessageType::Request,
                        _ => DhcpMessageType::Discover,
                    },
                    self.timer.attempts(),
                );
                if let Err(e) = self.transport.send(&buf[..len]) {
                    tracing::debug!("could not transmit packet: {e}");
                }
            }
            Err(e) => tracing::debug!("could not construct packet: {e}"),
        }
    }

    /// Publishes the accumulated responses into the settings tree.
    fn register_settings(&mut self) -> Result<()> {
        if let Some(proxy) = &self.proxy_response {
            self.settings
                .register(None, PROXYDHCP_SETTINGS_NAME, proxy.clone())?;
        }
        let response = self
            .response
            .clone()
            .expect("registering without a response");
        self.settings.register(
            Some(self.netdev.settings_name()),
            DHCP_SETTINGS_NAME,
            response,
        )?;
        Ok(())
    }

    /// Finishes the session exactly once. Entering `Closed` first blocks
    /// any racing timer or receive event; only then are the timer and
    /// transport released.
    fn finish(&mut self, rc: Result<()>) {
        self.state = SessionState::Closed;
        self.timer.stop();
        self.transport.close();
        match &rc {
            Ok(()) => tracing::debug!("{}: configuration complete", self.netdev.name),
            Err(e) => tracing::debug!("{}: session failed: {e}", self.netdev.name),
        }
        self.outcome = Some(rc);
    }
}
