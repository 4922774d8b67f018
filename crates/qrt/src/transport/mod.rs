// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction.
//!
//! The session consumes the network through this trait so a scripted
//! in-memory transport can stand in for real sockets under test. One
//! receive call multiplexes the primary stream (TCP, or the broadcast UDP
//! socket during discovery) and at most one auxiliary UDP data socket in a
//! single readiness wait.

pub mod net;
pub mod scripted;

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::Result;

pub use net::NetTransport;
pub use scripted::{ScriptedTransport, SharedScriptedTransport};

/// Outcome of one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// `len` bytes landed in the caller's buffer; `source` is set when the
    /// caller asked for the sending peer's address (UDP discovery).
    Data {
        len: usize,
        source: Option<SocketAddr>,
    },
    /// No data within the deadline.
    Timeout,
    /// Peer closed the connection.
    Disconnected,
}

/// Blocking network provider contract.
///
/// Failures carry a human-readable reason in the returned error; a failed
/// call is terminal for that operation but not for the session (the caller
/// decides whether to reconnect).
pub trait Transport {
    /// Establish the reliable stream. On failure the transport stays
    /// unusable until the next connect attempt.
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    /// Tear down every socket. Idempotent.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Full-write semantics: loops internally until all bytes are out or an
    /// error occurs; the caller never retries partial writes.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for data on any registered socket.
    ///
    /// - `header_only`: hint that the first 8 bytes suffice; stream
    ///   implementations may stop there, datagram implementations must
    ///   ignore it (a short datagram read truncates).
    /// - `timeout`: `None` blocks indefinitely, `Some(ZERO)` polls.
    /// - `want_source`: request the sending peer's address.
    fn receive(
        &mut self,
        buf: &mut [u8],
        header_only: bool,
        timeout: Option<Duration>,
        want_source: bool,
    ) -> Result<Recv>;

    /// Bind a UDP socket (`port_hint` 0 picks an ephemeral port) and return
    /// the bound port. With `broadcast` set, the socket is a distinct
    /// broadcast-capable one used for discovery sweeps.
    fn create_udp_socket(&mut self, port_hint: u16, broadcast: bool) -> Result<u16>;

    /// Broadcast `data` to `port` on every local interface whose address is
    /// not `filter`. True when delivered on at least one interface.
    fn send_udp_broadcast(&mut self, data: &[u8], port: u16, filter: Ipv4Addr) -> Result<bool>;

    /// True if `addr` matches a local interface address.
    fn is_local_address(&self, addr: Ipv4Addr) -> bool;
}
