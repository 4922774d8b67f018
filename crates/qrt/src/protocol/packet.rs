// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet envelope views and the discovery codec.
//!
//! A [`Packet`] borrows the session's receive buffer; it is valid until the
//! next receive call, which the borrow checker enforces (taking another
//! packet requires the `&mut` the view is holding alive).

use std::net::{Ipv4Addr, SocketAddr};

use super::frame::DataFrame;
use super::wire::ByteOrder;
use super::{Event, PacketKind, HEADER_SIZE};
use crate::error::{Error, Result};

/// One received packet: typed envelope plus a view of the body bytes.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    size: u32,
    kind: PacketKind,
    body: &'a [u8],
    order: ByteOrder,
    version: (u32, u32),
}

impl<'a> Packet<'a> {
    pub(crate) fn new(
        size: u32,
        kind: PacketKind,
        body: &'a [u8],
        order: ByteOrder,
        version: (u32, u32),
    ) -> Self {
        Packet {
            size,
            kind,
            body,
            order,
            version,
        }
    }

    /// Total packet size as declared on the wire, header included.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Raw body bytes (everything after the 8-byte header).
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Command response text (kind `Command`), NUL terminator stripped.
    pub fn command_str(&self) -> Result<&'a str> {
        self.expect_kind(PacketKind::Command)?;
        body_str(self.body)
    }

    /// Server error text (kind `Error`), NUL terminator stripped.
    pub fn error_str(&self) -> Result<&'a str> {
        self.expect_kind(PacketKind::Error)?;
        body_str(self.body)
    }

    /// XML document text (kind `Xml`), NUL terminator stripped.
    pub fn xml_str(&self) -> Result<&'a str> {
        self.expect_kind(PacketKind::Xml)?;
        body_str(self.body)
    }

    /// Event code (kind `Event`, one-byte body).
    pub fn event(&self) -> Result<Event> {
        self.expect_kind(PacketKind::Event)?;
        let code = *self
            .body
            .first()
            .ok_or_else(|| Error::Protocol("empty Event packet body".into()))?;
        Event::from_u8(code)
            .ok_or_else(|| Error::Protocol(format!("unknown event code {}", code)))
    }

    /// Decode the body as a component frame (kind `Data`).
    pub fn data(&self) -> Result<DataFrame<'a>> {
        self.expect_kind(PacketKind::Data)?;
        DataFrame::parse(self.body, self.order, self.version)
    }

    fn expect_kind(&self, want: PacketKind) -> Result<()> {
        if self.kind == want {
            Ok(())
        } else {
            Err(Error::Protocol(format!(
                "expected {:?} packet, got {:?}",
                want, self.kind
            )))
        }
    }
}

fn body_str(body: &[u8]) -> Result<&str> {
    let end = body
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(body.len());
    std::str::from_utf8(&body[..end])
        .map_err(|_| Error::Protocol("packet body is not valid UTF-8".into()))
}

// =======================================================================
// Discovery codec
//
// Discovery precedes any negotiation, so both directions use network byte
// order unconditionally.
// =======================================================================

/// Size of the client discovery request.
pub const DISCOVER_REQUEST_SIZE: usize = 10;

/// One server found during a UDP broadcast sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverResponse {
    /// Server address, taken from the UDP source of the response.
    pub addr: Ipv4Addr,
    /// Base TCP port the server accepts RT connections on.
    pub base_port: u16,
    /// Human-readable server info string (host name, QTM version).
    pub message: String,
}

/// Build the 10-byte discovery request: `u32 size`, `u32 kind`, and the UDP
/// port the server should reply to.
pub fn encode_discover_request(reply_port: u16) -> [u8; DISCOVER_REQUEST_SIZE] {
    let mut out = [0u8; DISCOVER_REQUEST_SIZE];
    out[..4].copy_from_slice(&(DISCOVER_REQUEST_SIZE as u32).to_be_bytes());
    out[4..8].copy_from_slice(&(PacketKind::Discover as u32).to_be_bytes());
    out[8..].copy_from_slice(&reply_port.to_be_bytes());
    out
}

/// Parse a discovery response body: NUL-terminated info string with the
/// server's base TCP port in the last two bytes.
pub fn parse_discover_response(body: &[u8], source: SocketAddr) -> Result<DiscoverResponse> {
    if body.len() < 3 {
        return Err(Error::Protocol(format!(
            "discovery response body too short ({} bytes)",
            body.len()
        )));
    }
    let addr = match source {
        SocketAddr::V4(v4) => *v4.ip(),
        SocketAddr::V6(_) => {
            return Err(Error::Protocol(
                "discovery response from non-IPv4 source".into(),
            ))
        }
    };
    let (text, port_tail) = body.split_at(body.len() - 2);
    let message = body_str(text)?.to_string();
    let base_port = u16::from_be_bytes([port_tail[0], port_tail[1]]);
    Ok(DiscoverResponse {
        addr,
        base_port,
        message,
    })
}

/// Extract the full wire packet for a discovery response datagram and hand
/// back its body. Responses arrive on the reply socket with the standard
/// 8-byte header in network order.
pub fn split_discover_datagram(datagram: &[u8]) -> Result<&[u8]> {
    if datagram.len() < HEADER_SIZE {
        return Err(Error::Protocol("discovery datagram shorter than header".into()));
    }
    let header: &[u8; HEADER_SIZE] = datagram[..HEADER_SIZE].try_into().expect("len checked");
    let (size, kind) = super::decode_header(header, ByteOrder::Big)?;
    if kind != PacketKind::Discover {
        return Err(Error::Protocol(format!(
            "expected Discover datagram, got {:?}",
            kind
        )));
    }
    let size = size as usize;
    if size > datagram.len() {
        return Err(Error::Protocol("discovery datagram truncated".into()));
    }
    Ok(&datagram[HEADER_SIZE..size])
}
