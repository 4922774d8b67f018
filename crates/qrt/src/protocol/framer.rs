// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet framer: turns a byte-oriented transport into exactly one packet
//! per call.
//!
//! The framer owns the session's single reusable receive buffer. It
//! tolerates arbitrary chunking (including a split inside the 8-byte
//! header), grows the buffer when a packet declares more than the current
//! capacity, carries overshoot bytes into the next packet, and streams
//! in-band capture files to a sink instead of buffering them whole.
//!
//! Outcome mapping:
//! - clean timeout before any byte of a frame arrived -> `Error::Timeout`
//! - timeout or peer close after a frame started -> `Error::Protocol`
//!   (truncation; never a partial success)
//! - peer close at a frame boundary -> `Error::Disconnected`

use std::cmp;
use std::io::Write;
use std::time::{Duration, Instant};

use super::packet::Packet;
use super::wire::ByteOrder;
use super::{decode_header, Event, PacketKind, HEADER_SIZE};
use crate::config::{FILE_CHUNK_SIZE, RECV_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::transport::{Recv, Transport};

/// Metadata of the packet currently held in the framer buffer.
#[derive(Debug, Clone, Copy)]
struct Held {
    size: u32,
    kind: PacketKind,
    body_len: usize,
}

/// Stream reassembly state. One per session.
pub struct Framer {
    buf: Vec<u8>,
    /// Valid bytes in `buf` (may overshoot the current packet).
    filled: usize,
    /// Bytes at the front of `buf` belonging to the previously returned
    /// packet, dropped at the start of the next fill.
    pending_shift: usize,
    held: Option<Held>,
    /// Order of the 8-byte packet header. Always network order for v1.0.
    header_order: ByteOrder,
    /// Order of packet payloads. Negotiated; equals `header_order` from
    /// protocol 1.1 on.
    payload_order: ByteOrder,
    version: (u32, u32),
}

impl Framer {
    pub fn new() -> Self {
        Framer {
            buf: vec![0u8; RECV_BUFFER_SIZE],
            filled: 0,
            pending_shift: 0,
            held: None,
            header_order: ByteOrder::Big,
            payload_order: ByteOrder::Big,
            version: (1, 0),
        }
    }

    /// Set the negotiated byte order for both header and payload (>=1.1
    /// connections, where the port offset decides the order up front).
    pub fn set_order(&mut self, order: ByteOrder) {
        self.header_order = order;
        self.payload_order = order;
    }

    /// Set the payload order alone. A v1.0 connection negotiates payload
    /// order with the `ByteOrder` command while headers stay network order.
    pub fn set_payload_order(&mut self, order: ByteOrder) {
        self.payload_order = order;
    }

    pub fn header_order(&self) -> ByteOrder {
        self.header_order
    }

    pub fn payload_order(&self) -> ByteOrder {
        self.payload_order
    }

    /// Set the negotiated protocol version consulted by component decoding.
    pub fn set_version(&mut self, version: (u32, u32)) {
        self.version = version;
    }

    /// Drop buffered bytes and held-packet state (reconnect path).
    pub fn reset(&mut self) {
        self.filled = 0;
        self.pending_shift = 0;
        self.held = None;
    }

    /// Assemble the next packet, optionally skipping events, optionally
    /// streaming file packets into `file_sink`.
    ///
    /// `on_event` fires for every Event packet observed, surfaced or not,
    /// so the session can keep its cached state current. Returns the kind
    /// of the surfaced packet; its bytes are available via [`Framer::packet`].
    pub fn next_packet(
        &mut self,
        transport: &mut dyn Transport,
        skip_events: bool,
        timeout: Option<Duration>,
        mut file_sink: Option<&mut (dyn Write + '_)>,
        on_event: &mut dyn FnMut(Event),
    ) -> Result<PacketKind> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let held = self.fill_one(transport, deadline, file_sink.as_deref_mut())?;
            if held.kind == PacketKind::Event {
                let body = &self.buf[HEADER_SIZE..HEADER_SIZE + held.body_len];
                let code = *body
                    .first()
                    .ok_or_else(|| Error::Protocol("empty Event packet body".into()))?;
                let event = Event::from_u8(code)
                    .ok_or_else(|| Error::Protocol(format!("unknown event code {}", code)))?;
                log::debug!("[framer] event {:?}", event);
                on_event(event);
                if skip_events {
                    continue;
                }
            }
            self.held = Some(held);
            return Ok(held.kind);
        }
    }

    /// View of the packet assembled by the last [`Framer::next_packet`] call.
    pub fn packet(&self) -> Packet<'_> {
        let held = self.held.expect("packet() before a successful next_packet()");
        Packet::new(
            held.size,
            held.kind,
            &self.buf[HEADER_SIZE..HEADER_SIZE + held.body_len],
            self.payload_order,
            self.version,
        )
    }

    /// Assemble exactly one packet into the buffer (or through `file_sink`).
    fn fill_one(
        &mut self,
        transport: &mut dyn Transport,
        deadline: Option<Instant>,
        file_sink: Option<&mut (dyn Write + '_)>,
    ) -> Result<Held> {
        // Discard the previous packet, keeping any overshoot bytes.
        if self.pending_shift > 0 {
            self.buf.copy_within(self.pending_shift..self.filled, 0);
            self.filled -= self.pending_shift;
            self.pending_shift = 0;
        }
        self.held = None;

        // Phase 1: the 8-byte header, possibly split across reads. The
        // transport is always offered the full buffer: the header_only hint
        // lets a stream impl stop at 8 bytes, but a datagram impl must take
        // the whole datagram or the kernel truncates it.
        while self.filled < HEADER_SIZE {
            let n = self.receive_some(transport, deadline, self.filled > 0)?;
            self.filled += n;
        }
        let header: &[u8; HEADER_SIZE] =
            self.buf[..HEADER_SIZE].try_into().expect("len checked");
        let (size, kind) = decode_header(header, self.header_order)?;
        let size_usize = size as usize;

        if kind.is_file() {
            if let Some(sink) = file_sink {
                return self.stream_file(transport, deadline, size, kind, sink);
            }
        }

        // Phase 2: the body. A declared size beyond the current capacity
        // grows the buffer; it is not a truncation error.
        if self.buf.len() < size_usize {
            self.buf.resize(size_usize, 0);
        }
        while self.filled < size_usize {
            let n = self.receive_some(transport, deadline, true)?;
            self.filled += n;
        }

        self.pending_shift = size_usize;
        Ok(Held {
            size,
            kind,
            body_len: size_usize - HEADER_SIZE,
        })
    }

    /// Streamed file mode: forward body bytes to the sink without growing
    /// the packet buffer to the file size. The 8 header bytes already
    /// consumed count toward the declared total.
    fn stream_file(
        &mut self,
        transport: &mut dyn Transport,
        deadline: Option<Instant>,
        size: u32,
        kind: PacketKind,
        sink: &mut dyn Write,
    ) -> Result<Held> {
        let total = size as usize;
        let in_buf = cmp::min(self.filled, total);
        sink.write_all(&self.buf[HEADER_SIZE..in_buf])?;
        let mut received = in_buf;

        // Keep any bytes past the file end for the next packet.
        if self.filled > total {
            self.buf.copy_within(total..self.filled, 0);
            self.filled -= total;
        } else {
            self.filled = 0;
        }

        while received < total {
            let want = cmp::min(FILE_CHUNK_SIZE, total - received);
            // Receives land past the carried tail; `filled` is zero here
            // whenever the loop is entered (overshoot implies completion).
            debug_assert_eq!(self.filled, 0);
            match transport.receive(&mut self.buf[..want], false, remaining(deadline), false)? {
                Recv::Data { len, .. } => {
                    sink.write_all(&self.buf[..len])?;
                    received += len;
                }
                Recv::Timeout | Recv::Disconnected => {
                    return Err(Error::Protocol(format!(
                        "file transfer truncated: {} of {} bytes",
                        received, total
                    )));
                }
            }
        }
        sink.flush()?;
        log::debug!("[framer] streamed {:?} file, {} bytes total", kind, total);

        self.pending_shift = 0;
        Ok(Held {
            size,
            kind,
            body_len: 0,
        })
    }

    /// One transport receive into the buffer at `filled`, mapping timeout
    /// and disconnect according to whether this frame already started.
    fn receive_some(
        &mut self,
        transport: &mut dyn Transport,
        deadline: Option<Instant>,
        frame_started: bool,
    ) -> Result<usize> {
        if self.buf.len() <= self.filled {
            self.buf.resize(self.filled + RECV_BUFFER_SIZE, 0);
        }
        let header_only = !frame_started && self.filled < HEADER_SIZE;
        let outcome = transport.receive(
            &mut self.buf[self.filled..],
            header_only,
            remaining(deadline),
            false,
        )?;
        match outcome {
            Recv::Data { len, .. } => Ok(len),
            Recv::Timeout => {
                if frame_started {
                    Err(Error::Protocol(format!(
                        "packet truncated: timeout after {} bytes",
                        self.filled
                    )))
                } else {
                    Err(Error::Timeout)
                }
            }
            Recv::Disconnected => {
                if frame_started {
                    Err(Error::Protocol(format!(
                        "packet truncated: peer closed after {} bytes",
                        self.filled
                    )))
                } else {
                    Err(Error::Disconnected)
                }
            }
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}
