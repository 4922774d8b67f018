// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RT session state machine.
//!
//! One [`Rt`] per client connection. The connect sequence is: open the
//! transport (port offset selects byte order on >=1.1), optionally bind a
//! UDP data socket, read the welcome message, negotiate the protocol
//! version, negotiate byte order explicitly for v1.0, and prime the cached
//! server state. Any failure tears the connection down and surfaces the
//! most specific error.
//!
//! The session owns the reusable receive buffer (inside the framer); the
//! packet views returned by [`Rt::receive`] borrow it, so the borrow
//! checker rejects using a view after the next receive overwrites it. The
//! type is deliberately not `Sync`: concurrent calls into one session were
//! undefined behavior in every RT client and are a compile error here.

pub mod commands;
pub mod discovery;

use std::time::Duration;

use crate::config::{BASE_PORT, BIG_ENDIAN_OFFSET, COMMAND_TIMEOUT, DEFAULT_VERSION, LITTLE_ENDIAN_OFFSET};
use crate::error::{Error, Result};
use crate::protocol::framer::Framer;
use crate::protocol::packet::{DiscoverResponse, Packet};
use crate::protocol::wire::ByteOrder;
use crate::protocol::{Event, PacketKind};
use crate::transport::{NetTransport, Transport};

pub use commands::{CaptureFormat, ComponentSpec, ParameterKind, StreamRate, UdpStreamDest};

/// Client-driven connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    VersionNegotiating,
    /// v1.0 only: explicit `ByteOrder` command round trip.
    ByteOrderNegotiating,
    Ready,
    Streaming,
    AwaitingCommandResponse,
}

/// Connect parameters. `Default` asks for protocol 1.19, little-endian,
/// TCP-only delivery.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Protocol version to negotiate, `(major, minor)`.
    pub version: (u32, u32),
    /// Wire byte order; chooses the port offset on >=1.1 connections.
    pub byte_order: ByteOrder,
    /// Bind a UDP socket for frame delivery; `Some(0)` picks an ephemeral
    /// port. The bound port is readable via [`Rt::udp_port`].
    pub udp_port: Option<u16>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            version: DEFAULT_VERSION,
            byte_order: ByteOrder::Little,
            udp_port: None,
        }
    }
}

/// Session-scoped mutable state, split out so the receive path can update
/// it while the framer and transport are separately borrowed.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) connection: ConnectionState,
    pub(crate) version: (u32, u32),
    pub(crate) master: bool,
    pub(crate) udp_port: Option<u16>,
    /// Most recent event seen, CameraSettingsChanged included.
    pub(crate) last_event: Option<Event>,
    /// Server overlay state, tracked from events independent of the
    /// client-driven states; CameraSettingsChanged never lands here.
    pub(crate) current: Option<Event>,
}

impl SessionState {
    fn new() -> Self {
        SessionState {
            connection: ConnectionState::Disconnected,
            version: DEFAULT_VERSION,
            master: false,
            udp_port: None,
            last_event: None,
            current: None,
        }
    }

    pub(crate) fn note_event(&mut self, event: Event) {
        self.last_event = Some(event);
        if event.is_state_change() {
            self.current = Some(event);
        }
    }
}

/// One RT protocol session.
pub struct Rt {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) framer: Framer,
    pub(crate) state: SessionState,
    pub(crate) servers: Vec<DiscoverResponse>,
}

impl Rt {
    /// Session over the real network transport.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(Box::new(NetTransport::new()?)))
    }

    /// Session over a caller-supplied transport (tests use a scripted one).
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Rt {
            transport,
            framer: Framer::new(),
            state: SessionState::new(),
            servers: Vec::new(),
        }
    }

    /// Connect to `host` with the default options (protocol 1.19,
    /// little-endian, default base port).
    pub fn connect(&mut self, host: &str) -> Result<()> {
        self.connect_on(host, BASE_PORT, &ConnectOptions::default())
    }

    /// Full connect sequence against `base_port` with explicit options.
    pub fn connect_on(&mut self, host: &str, base_port: u16, opts: &ConnectOptions) -> Result<()> {
        if self.state.connection != ConnectionState::Disconnected {
            self.disconnect();
        }
        match self.connect_inner(host, base_port, opts) {
            Ok(()) => {
                self.state.connection = ConnectionState::Ready;
                log::info!(
                    "[rt] connected to {} (protocol {}.{}, {:?} order)",
                    host,
                    opts.version.0,
                    opts.version.1,
                    self.framer.payload_order()
                );
                Ok(())
            }
            Err(err) => {
                self.disconnect();
                Err(err)
            }
        }
    }

    fn connect_inner(&mut self, host: &str, base_port: u16, opts: &ConnectOptions) -> Result<()> {
        let legacy = opts.version == (1, 0);
        let port = if legacy {
            base_port
        } else {
            base_port
                + match opts.byte_order {
                    ByteOrder::Little => LITTLE_ENDIAN_OFFSET,
                    ByteOrder::Big => BIG_ENDIAN_OFFSET,
                }
        };

        self.state.connection = ConnectionState::Connecting;
        self.framer.reset();
        if legacy {
            // v1.0 headers stay network order until the ByteOrder command.
            self.framer.set_order(ByteOrder::Big);
        } else {
            self.framer.set_order(opts.byte_order);
        }
        self.framer.set_version(opts.version);
        self.state.version = opts.version;

        self.transport.connect(host, port)?;
        if let Some(hint) = opts.udp_port {
            self.state.udp_port = Some(self.transport.create_udp_socket(hint, false)?);
        }

        // Step 3: exactly one welcome Command packet.
        let kind = self.next_kind(false, Some(COMMAND_TIMEOUT))?;
        if kind != PacketKind::Command {
            return Err(Error::Protocol(format!(
                "expected welcome message, got {:?} packet",
                kind
            )));
        }
        let greeting = self.framer.packet().command_str()?;
        if greeting != commands::WELCOME {
            return Err(Error::Protocol(format!(
                "unexpected welcome message: {:?}",
                greeting
            )));
        }

        // Step 4: version negotiation with exact echo.
        self.state.connection = ConnectionState::VersionNegotiating;
        let request = format!("Version {}.{}", opts.version.0, opts.version.1);
        let confirm = format!("Version set to {}.{}", opts.version.0, opts.version.1);
        let response = self.send_command_and_wait(&request, Some(COMMAND_TIMEOUT))?;
        if response != confirm {
            return Err(Error::Server(response));
        }

        // Step 5: v1.0 negotiates payload order explicitly.
        if legacy {
            self.state.connection = ConnectionState::ByteOrderNegotiating;
            let order_name = match opts.byte_order {
                ByteOrder::Little => "LittleEndian",
                ByteOrder::Big => "BigEndian",
            };
            self.send_command_and_wait(
                &format!("ByteOrder {}", order_name),
                Some(COMMAND_TIMEOUT),
            )?;
            self.framer.set_payload_order(opts.byte_order);
        } else {
            // Step 6: prime the cached server state.
            self.get_state(Some(COMMAND_TIMEOUT))?;
        }
        Ok(())
    }

    /// Tear down the session. Idempotent; cached state is reset.
    pub fn disconnect(&mut self) {
        if self.state.connection != ConnectionState::Disconnected {
            log::info!("[rt] disconnecting");
        }
        self.transport.disconnect();
        self.framer.reset();
        self.state = SessionState::new();
    }

    /// Receive the next packet, optionally skipping events.
    ///
    /// Every Event packet observed updates the cached last-event/state
    /// before the skip decision. `timeout: None` blocks indefinitely.
    ///
    /// The returned [`Packet`] is a view into the session's reusable
    /// receive buffer; the next receive call overwrites it. Holding a view
    /// across that call is rejected at compile time:
    ///
    /// ```compile_fail,E0499
    /// fn stale_view(rt: &mut qrt::Rt) -> qrt::Result<()> {
    ///     let first = rt.receive(true, None)?;
    ///     let second = rt.receive(true, None)?; // `first` still borrows rt
    ///     println!("{:?} {:?}", first.kind(), second.kind());
    ///     Ok(())
    /// }
    /// ```
    pub fn receive(&mut self, skip_events: bool, timeout: Option<Duration>) -> Result<Packet<'_>> {
        self.next_kind(skip_events, timeout)?;
        Ok(self.framer.packet())
    }

    /// Like [`Rt::receive`] but returns only the packet kind, leaving the
    /// buffered packet readable via the framer (internal plumbing).
    pub(crate) fn next_kind(
        &mut self,
        skip_events: bool,
        timeout: Option<Duration>,
    ) -> Result<PacketKind> {
        self.next_kind_sink(skip_events, timeout, None)
    }

    /// Receive with an optional file sink wired through to the framer.
    pub(crate) fn next_kind_sink(
        &mut self,
        skip_events: bool,
        timeout: Option<Duration>,
        file_sink: Option<&mut dyn std::io::Write>,
    ) -> Result<PacketKind> {
        let state = &mut self.state;
        self.framer.next_packet(
            self.transport.as_mut(),
            skip_events,
            timeout,
            file_sink,
            &mut |event| state.note_event(event),
        )
    }

    // ===== Introspection =====

    /// Negotiated protocol version.
    pub fn version(&self) -> (u32, u32) {
        self.state.version
    }

    /// Negotiated payload byte order.
    pub fn byte_order(&self) -> ByteOrder {
        self.framer.payload_order()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection
    }

    /// Server overlay state: the latest state-changing event.
    pub fn current_state(&self) -> Option<Event> {
        self.state.current
    }

    /// Most recent event of any kind, CameraSettingsChanged included.
    pub fn last_event(&self) -> Option<Event> {
        self.state.last_event
    }

    /// Whether this client holds the control token.
    pub fn is_master(&self) -> bool {
        self.state.master
    }

    /// Bound UDP data port, when one was requested at connect.
    pub fn udp_port(&self) -> Option<u16> {
        self.state.udp_port
    }

    /// Servers found by the last [`Rt::discover`] sweep.
    pub fn discovered_servers(&self) -> &[DiscoverResponse] {
        &self.servers
    }
}
