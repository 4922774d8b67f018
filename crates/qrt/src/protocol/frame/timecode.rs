// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timecode component view.

use crate::error::{Error, Result};
use crate::protocol::wire::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TimecodeKind {
    Smpte = 0,
    Irig = 1,
    CameraTime = 2,
}

impl TimecodeKind {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TimecodeKind::Smpte),
            1 => Some(TimecodeKind::Irig),
            2 => Some(TimecodeKind::CameraTime),
            _ => None,
        }
    }
}

/// One timecode entry; `hi`/`lo` pack the kind-specific bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub kind: TimecodeKind,
    pub hi: u32,
    pub lo: u32,
}

impl Timecode {
    /// Camera time as a single 64-bit tick counter.
    pub fn camera_time(&self) -> Option<u64> {
        (self.kind == TimecodeKind::CameraTime)
            .then(|| (u64::from(self.hi) << 32) | u64::from(self.lo))
    }
}

/// Timecode component.
pub struct TimecodeView {
    entries: Vec<Timecode>,
}

impl TimecodeView {
    pub(super) fn parse(mut r: Reader<'_>) -> Result<Self> {
        let count = r.u32()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw_kind = r.u32()?;
            let kind = TimecodeKind::from_u32(raw_kind)
                .ok_or_else(|| Error::Protocol(format!("unknown timecode kind {}", raw_kind)))?;
            let hi = r.u32()?;
            let lo = r.u32()?;
            entries.push(Timecode { kind, hi, lo });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in Timecode component",
                r.remaining()
            )));
        }
        Ok(TimecodeView { entries })
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn timecode(&self, index: usize) -> Result<Timecode> {
        self.entries.get(index).copied().ok_or_else(|| {
            Error::Contract(format!(
                "timecode index {} out of range ({} entries)",
                index,
                self.entries.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{block, frame_body};
    use super::super::{ComponentKind, DataFrame};
    use super::*;
    use crate::protocol::wire::ByteOrder;

    #[test]
    fn camera_time_combines_words() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(TimecodeKind::CameraTime as u32));
        comp.extend_from_slice(&order.u32_bytes(0x0000_0001));
        comp.extend_from_slice(&order.u32_bytes(0x8000_0000));
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Timecode, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.timecodes().unwrap().unwrap();
        let tc = view.timecode(0).unwrap();
        assert_eq!(tc.camera_time(), Some(0x1_8000_0000));
    }

    #[test]
    fn smpte_has_no_camera_time() {
        let order = ByteOrder::Big;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(TimecodeKind::Smpte as u32));
        comp.extend_from_slice(&order.u32_bytes(0));
        comp.extend_from_slice(&order.u32_bytes(0x00_17_12_05));
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Timecode, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let tc = frame.timecodes().unwrap().unwrap().timecode(0).unwrap();
        assert_eq!(tc.kind, TimecodeKind::Smpte);
        assert_eq!(tc.camera_time(), None);
    }
}
