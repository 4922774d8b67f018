// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RT wire protocol: packet kinds, header codec, event codes, version gates.
//!
//! Every packet starts with an 8-byte header: `u32 size` (total, including
//! the header itself) and `u32 kind`. The header's byte order is network
//! order for protocol 1.0 and the negotiated connection order for >=1.1.

pub mod frame;
pub mod framer;
pub mod packet;
pub mod wire;

use crate::error::{Error, Result};
pub use wire::{ByteOrder, Reader};

/// Size of the packet header (`u32 size` + `u32 kind`).
pub const HEADER_SIZE: usize = 8;

/// Packet kind discriminants.
///
/// The numeric values are a wire contract shared with every QTM server
/// release; they must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketKind {
    Error = 0,
    Command = 1,
    Xml = 2,
    Data = 3,
    NoMoreData = 4,
    C3dFile = 5,
    QtmFile = 6,
    Discover = 7,
    Event = 8,
    None = 9,
}

impl PacketKind {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PacketKind::Error),
            1 => Some(PacketKind::Command),
            2 => Some(PacketKind::Xml),
            3 => Some(PacketKind::Data),
            4 => Some(PacketKind::NoMoreData),
            5 => Some(PacketKind::C3dFile),
            6 => Some(PacketKind::QtmFile),
            7 => Some(PacketKind::Discover),
            8 => Some(PacketKind::Event),
            9 => Some(PacketKind::None),
            _ => None,
        }
    }

    /// In-band capture file transfers are streamed, not buffered whole.
    pub fn is_file(self) -> bool {
        matches!(self, PacketKind::C3dFile | PacketKind::QtmFile)
    }
}

/// Server-pushed event codes (body of an Event packet, one byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    Connected = 1,
    ConnectionClosed = 2,
    CaptureStarted = 3,
    CaptureStopped = 4,
    FetchingFinished = 5,
    CaptureSaved = 6,
    RtFromFileStarted = 7,
    RtFromFileStopped = 8,
    Trigger = 9,
    CalibrationStarted = 10,
    CalibrationStopped = 11,
    WaitingForTrigger = 12,
    CameraSettingsChanged = 13,
    QtmShuttingDown = 14,
    CaptureLoaded = 15,
}

impl Event {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Event::Connected),
            2 => Some(Event::ConnectionClosed),
            3 => Some(Event::CaptureStarted),
            4 => Some(Event::CaptureStopped),
            5 => Some(Event::FetchingFinished),
            6 => Some(Event::CaptureSaved),
            7 => Some(Event::RtFromFileStarted),
            8 => Some(Event::RtFromFileStopped),
            9 => Some(Event::Trigger),
            10 => Some(Event::CalibrationStarted),
            11 => Some(Event::CalibrationStopped),
            12 => Some(Event::WaitingForTrigger),
            13 => Some(Event::CameraSettingsChanged),
            14 => Some(Event::QtmShuttingDown),
            15 => Some(Event::CaptureLoaded),
            _ => None,
        }
    }

    /// CameraSettingsChanged is delivered to callers but never becomes the
    /// session's "current state".
    pub fn is_state_change(self) -> bool {
        !matches!(self, Event::CameraSettingsChanged)
    }
}

// =======================================================================
// Header codec
// =======================================================================

/// Encode an 8-byte packet header.
pub fn encode_header(size: u32, kind: PacketKind, order: ByteOrder) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[..4].copy_from_slice(&order.u32_bytes(size));
    out[4..].copy_from_slice(&order.u32_bytes(kind as u32));
    out
}

/// Decode and validate an 8-byte packet header.
///
/// # Errors
/// `Protocol` when the declared size is below the header size or the kind
/// discriminant is unknown.
pub fn decode_header(buf: &[u8; HEADER_SIZE], order: ByteOrder) -> Result<(u32, PacketKind)> {
    let size = order.u32_from([buf[0], buf[1], buf[2], buf[3]]);
    let raw_kind = order.u32_from([buf[4], buf[5], buf[6], buf[7]]);

    if (size as usize) < HEADER_SIZE {
        return Err(Error::Protocol(format!(
            "header declares size {} (minimum {})",
            size, HEADER_SIZE
        )));
    }
    let kind = PacketKind::from_u32(raw_kind)
        .ok_or_else(|| Error::Protocol(format!("unknown packet kind {}", raw_kind)))?;
    Ok((size, kind))
}

/// Frame a command string: header + ASCII body + NUL terminator.
pub fn encode_command(text: &str, order: ByteOrder) -> Vec<u8> {
    encode_string(text, PacketKind::Command, order)
}

/// Frame an XML document: header + UTF-8 body + NUL terminator.
pub fn encode_xml(text: &str, order: ByteOrder) -> Vec<u8> {
    encode_string(text, PacketKind::Xml, order)
}

fn encode_string(text: &str, kind: PacketKind, order: ByteOrder) -> Vec<u8> {
    let size = HEADER_SIZE + text.len() + 1;
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&encode_header(size as u32, kind, order));
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

// =======================================================================
// Version gates
//
// The protocol schema evolves monotonically by minor version. Each gated
// field names its minimum version here; both the binary decoder and the
// settings reader consult this table instead of repeating version
// arithmetic at call sites.
// =======================================================================

pub mod min_version {
    /// Per-camera status flag byte in 2D components.
    pub const CAMERA_STATUS_FLAGS_2D: (u32, u32) = (1, 8);
    /// Multi-sample analog blocks with sample numbering (v1.0 carries one
    /// unnumbered sample per channel).
    pub const ANALOG_SAMPLE_NUMBERING: (u32, u32) = (1, 1);
    /// `Event <label>` replaces `SetQTMEvent <label>`.
    pub const EVENT_COMMAND: (u32, u32) = (1, 14);
    /// External-trigger edge/software settings in the General XML.
    pub const TRIGGER_EDGE_SETTINGS: (u32, u32) = (1, 14);
    /// Skeleton component support.
    pub const SKELETON: (u32, u32) = (1, 19);
}

/// True when `version` satisfies `min` (major then minor).
pub fn at_least(version: (u32, u32), min: (u32, u32)) -> bool {
    version.0 > min.0 || (version.0 == min.0 && version.1 >= min.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_both_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let bytes = encode_header(24, PacketKind::Data, order);
            let (size, kind) = decode_header(&bytes, order).unwrap();
            assert_eq!(size, 24);
            assert_eq!(kind, PacketKind::Data);
        }
    }

    #[test]
    fn header_rejects_undersized() {
        let bytes = encode_header(24, PacketKind::Data, ByteOrder::Little);
        // Reading with the wrong order makes size land at 0x18000000; craft
        // a genuinely undersized header instead.
        let mut small = bytes;
        small[..4].copy_from_slice(&7u32.to_le_bytes());
        assert!(decode_header(&small, ByteOrder::Little).is_err());
    }

    #[test]
    fn header_rejects_unknown_kind() {
        let mut bytes = encode_header(8, PacketKind::None, ByteOrder::Little);
        bytes[4..].copy_from_slice(&99u32.to_le_bytes());
        assert!(decode_header(&bytes, ByteOrder::Little).is_err());
    }

    #[test]
    fn command_framing_counts_terminator() {
        let pkt = encode_command("Version 1.19", ByteOrder::Little);
        assert_eq!(pkt.len(), 8 + 12 + 1);
        let (size, kind) =
            decode_header(&pkt[..8].try_into().unwrap(), ByteOrder::Little).unwrap();
        assert_eq!(size as usize, pkt.len());
        assert_eq!(kind, PacketKind::Command);
        assert_eq!(&pkt[8..20], b"Version 1.19");
        assert_eq!(pkt[20], 0);
    }

    #[test]
    fn version_gate_ordering() {
        assert!(at_least((1, 8), min_version::CAMERA_STATUS_FLAGS_2D));
        assert!(at_least((2, 0), min_version::CAMERA_STATUS_FLAGS_2D));
        assert!(!at_least((1, 7), min_version::CAMERA_STATUS_FLAGS_2D));
    }

    #[test]
    fn camera_settings_changed_is_not_a_state() {
        assert!(!Event::CameraSettingsChanged.is_state_change());
        assert!(Event::CaptureStarted.is_state_change());
    }
}
