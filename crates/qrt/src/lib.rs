// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # QRT - QTM Real-Time Protocol Client
//!
//! A pure Rust client for the QTM RT protocol: version negotiation over
//! TCP, XML-described configuration, and binary frame streaming of
//! 2D/3D markers, 6DOF rigid bodies, skeletons, analog/force samples,
//! images, gaze data, timecodes and events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qrt::{ComponentSpec, Rt, StreamRate, Result};
//!
//! fn main() -> Result<()> {
//!     let mut rt = Rt::new()?;
//!     rt.connect("qtm-host")?;
//!     rt.stream_frames(StreamRate::AllFrames, None, &[ComponentSpec::Body6d])?;
//!     loop {
//!         let packet = rt.receive(true, None)?;
//!         let frame = packet.data()?;
//!         if let Some(bodies) = frame.bodies_6d()? {
//!             for i in 0..bodies.body_count() {
//!                 let body = bodies.body(i)?;
//!                 println!("body {}: {:?}", i, body.position);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                         Session Layer                              |
//! |   Rt: connect/negotiate | commands & responses | discovery sweep   |
//! +--------------------------------------------------------------------+
//! |                        Protocol Layer                              |
//! |   Framer (reassembly, file streaming) | Packet views | DataFrame   |
//! +--------------------------------------------------------------------+
//! |                        Transport Layer                             |
//! |   Transport trait | NetTransport (TCP + UDP, one readiness wait)   |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Rt`] | One protocol session: connect, command, stream, discover |
//! | [`Packet`] | Typed envelope over one received packet |
//! | [`DataFrame`] | Random-access component views into a Data packet |
//! | [`Transport`] | Network provider contract (swappable under test) |
//! | [`Error`] | Crate-wide error taxonomy, server text verbatim |
//!
//! ## Ownership rules
//!
//! The session owns a single reusable receive buffer. [`Packet`] and
//! [`DataFrame`] borrow it, so holding a view across the next receive
//! call is a compile error, not a silent read of recycled memory. The
//! session is single-threaded by design and not `Sync`.

/// Protocol constants: ports, deadlines, buffer limits.
pub mod config;
/// Crate-wide error taxonomy and `Result` alias.
pub mod error;
/// Wire protocol: header codec, packet kinds, framer, component decoding.
pub mod protocol;
/// Session state machine, command surface and discovery.
pub mod session;
/// Settings XML mapping (feature `settings`).
#[cfg(feature = "settings")]
pub mod settings;
/// Transport abstraction and implementations.
pub mod transport;

pub use error::{Error, Result};
pub use protocol::frame::{ComponentKind, DataFrame};
pub use protocol::packet::{DiscoverResponse, Packet};
pub use protocol::{ByteOrder, Event, PacketKind};
pub use session::{
    CaptureFormat, ComponentSpec, ConnectOptions, ConnectionState, ParameterKind, Rt, StreamRate,
    UdpStreamDest,
};
pub use transport::{NetTransport, Recv, Transport};
