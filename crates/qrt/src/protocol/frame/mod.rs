// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data-packet component decoding.
//!
//! A Data packet body is `u64 timestamp_us | u32 frame_number |
//! u32 component_count`, followed by component blocks, each prefixed by its
//! own `u32 size | u32 kind` sub-header. [`DataFrame::parse`] walks the
//! block sequence once and records a kind -> byte-range table; every typed
//! accessor is then an O(1) bounds-checked slice, no pointer arithmetic.
//!
//! Absence is a valid state: a frame with no component of kind X reports
//! `component_size(X) == 0` and `Ok(None)` from the typed accessor.

pub mod analog;
pub mod gaze;
pub mod image;
pub mod marker;
pub mod rigid;
pub mod skeleton;
pub mod timecode;

use std::ops::Range;

use super::wire::{ByteOrder, Reader};
use super::HEADER_SIZE;
use crate::error::{Error, Result};

pub use analog::{AnalogDevice, AnalogSingleView, AnalogView, ForcePlate, ForceSample, ForceSingleView, ForceView};
pub use gaze::{EyeTrackerView, GazeSample, GazeVectorView};
pub use image::{CameraImage, ImageFormat, ImageView};
pub use marker::{Marker2d, Marker2dView, Marker3dView, UnidentifiedMarker3dView};
pub use rigid::{Body6d, Body6dEuler, Body6dEulerView, Body6dView};
pub use skeleton::{SkeletonSegment, SkeletonView};
pub use timecode::{Timecode, TimecodeKind, TimecodeView};

/// Component kind discriminants (wire contract, never renumber).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentKind {
    Marker3d = 1,
    Marker3dNoLabels = 2,
    Analog = 3,
    Force = 4,
    Body6d = 5,
    Body6dEuler = 6,
    Marker2d = 7,
    Marker2dLin = 8,
    Marker3dRes = 9,
    Marker3dNoLabelsRes = 10,
    Body6dRes = 11,
    Body6dEulerRes = 12,
    AnalogSingle = 13,
    Image = 14,
    ForceSingle = 15,
    GazeVector = 16,
    Timecode = 17,
    Skeleton = 18,
    EyeTracker = 19,
}

impl ComponentKind {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ComponentKind::Marker3d),
            2 => Some(ComponentKind::Marker3dNoLabels),
            3 => Some(ComponentKind::Analog),
            4 => Some(ComponentKind::Force),
            5 => Some(ComponentKind::Body6d),
            6 => Some(ComponentKind::Body6dEuler),
            7 => Some(ComponentKind::Marker2d),
            8 => Some(ComponentKind::Marker2dLin),
            9 => Some(ComponentKind::Marker3dRes),
            10 => Some(ComponentKind::Marker3dNoLabelsRes),
            11 => Some(ComponentKind::Body6dRes),
            12 => Some(ComponentKind::Body6dEulerRes),
            13 => Some(ComponentKind::AnalogSingle),
            14 => Some(ComponentKind::Image),
            15 => Some(ComponentKind::ForceSingle),
            16 => Some(ComponentKind::GazeVector),
            17 => Some(ComponentKind::Timecode),
            18 => Some(ComponentKind::Skeleton),
            19 => Some(ComponentKind::EyeTracker),
            _ => None,
        }
    }
}

/// Typed, randomly-accessible view of one Data packet body.
///
/// Borrows the session's receive buffer; the borrow checker prevents use
/// after the next receive call overwrites that buffer.
#[derive(Debug)]
pub struct DataFrame<'a> {
    body: &'a [u8],
    order: ByteOrder,
    version: (u32, u32),
    timestamp_us: u64,
    frame_number: u32,
    component_count: u32,
    components: Vec<(ComponentKind, Range<usize>)>,
}

impl<'a> DataFrame<'a> {
    /// Walk the block sequence once, recording each component's body range.
    ///
    /// # Errors
    /// `Protocol` when a sub-header is malformed or the blocks do not cover
    /// exactly the declared body (the component sizes must sum to the Data
    /// packet's body size).
    pub fn parse(body: &'a [u8], order: ByteOrder, version: (u32, u32)) -> Result<Self> {
        let mut r = Reader::new(body, order);
        let timestamp_us = r.u64()?;
        let frame_number = r.u32()?;
        let component_count = r.u32()?;

        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let block_size = r.u32()? as usize;
            let raw_kind = r.u32()?;
            if block_size < HEADER_SIZE {
                return Err(Error::Protocol(format!(
                    "component block declares size {} (minimum {})",
                    block_size, HEADER_SIZE
                )));
            }
            let body_len = block_size - HEADER_SIZE;
            let start = r.position();
            r.skip(body_len)?;
            match ComponentKind::from_u32(raw_kind) {
                Some(kind) => components.push((kind, start..start + body_len)),
                // Newer servers may ship kinds this client predates; skip.
                None => log::warn!("[frame] skipping unknown component kind {}", raw_kind),
            }
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes after {} component blocks",
                r.remaining(),
                component_count
            )));
        }

        Ok(DataFrame {
            body,
            order,
            version,
            timestamp_us,
            frame_number,
            component_count,
            components,
        })
    }

    /// Capture timestamp, microseconds.
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    /// Wire size of the component block of `kind`, sub-header included;
    /// 0 when the component is absent from this frame.
    pub fn component_size(&self, kind: ComponentKind) -> usize {
        self.component(kind)
            .map(|b| b.len() + HEADER_SIZE)
            .unwrap_or(0)
    }

    fn component(&self, kind: ComponentKind) -> Option<&'a [u8]> {
        self.components
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, range)| &self.body[range.clone()])
    }

    fn reader(&self, kind: ComponentKind) -> Option<Reader<'a>> {
        self.component(kind).map(|b| Reader::new(b, self.order))
    }

    // ===== 2D =====

    pub fn markers_2d(&self) -> Result<Option<Marker2dView<'a>>> {
        self.view_2d(ComponentKind::Marker2d)
    }

    /// Linearized (lens-corrected) 2D markers; same layout as 2D.
    pub fn markers_2d_linearized(&self) -> Result<Option<Marker2dView<'a>>> {
        self.view_2d(ComponentKind::Marker2dLin)
    }

    fn view_2d(&self, kind: ComponentKind) -> Result<Option<Marker2dView<'a>>> {
        self.reader(kind)
            .map(|r| Marker2dView::parse(r, self.version))
            .transpose()
    }

    // ===== 3D =====

    pub fn markers_3d(&self) -> Result<Option<Marker3dView<'a>>> {
        self.reader(ComponentKind::Marker3d)
            .map(|r| Marker3dView::parse(r, false))
            .transpose()
    }

    pub fn markers_3d_residual(&self) -> Result<Option<Marker3dView<'a>>> {
        self.reader(ComponentKind::Marker3dRes)
            .map(|r| Marker3dView::parse(r, true))
            .transpose()
    }

    pub fn markers_3d_no_labels(&self) -> Result<Option<UnidentifiedMarker3dView<'a>>> {
        self.reader(ComponentKind::Marker3dNoLabels)
            .map(|r| UnidentifiedMarker3dView::parse(r, false))
            .transpose()
    }

    pub fn markers_3d_no_labels_residual(&self) -> Result<Option<UnidentifiedMarker3dView<'a>>> {
        self.reader(ComponentKind::Marker3dNoLabelsRes)
            .map(|r| UnidentifiedMarker3dView::parse(r, true))
            .transpose()
    }

    // ===== 6DOF =====

    pub fn bodies_6d(&self) -> Result<Option<Body6dView<'a>>> {
        self.reader(ComponentKind::Body6d)
            .map(|r| Body6dView::parse(r, false))
            .transpose()
    }

    pub fn bodies_6d_residual(&self) -> Result<Option<Body6dView<'a>>> {
        self.reader(ComponentKind::Body6dRes)
            .map(|r| Body6dView::parse(r, true))
            .transpose()
    }

    pub fn bodies_6d_euler(&self) -> Result<Option<Body6dEulerView<'a>>> {
        self.reader(ComponentKind::Body6dEuler)
            .map(|r| Body6dEulerView::parse(r, false))
            .transpose()
    }

    pub fn bodies_6d_euler_residual(&self) -> Result<Option<Body6dEulerView<'a>>> {
        self.reader(ComponentKind::Body6dEulerRes)
            .map(|r| Body6dEulerView::parse(r, true))
            .transpose()
    }

    // ===== Analog / Force =====

    pub fn analog(&self) -> Result<Option<AnalogView<'a>>> {
        self.reader(ComponentKind::Analog)
            .map(|r| AnalogView::parse(r, self.version))
            .transpose()
    }

    pub fn analog_single(&self) -> Result<Option<AnalogSingleView<'a>>> {
        self.reader(ComponentKind::AnalogSingle)
            .map(AnalogSingleView::parse)
            .transpose()
    }

    pub fn force(&self) -> Result<Option<ForceView<'a>>> {
        self.reader(ComponentKind::Force)
            .map(ForceView::parse)
            .transpose()
    }

    pub fn force_single(&self) -> Result<Option<ForceSingleView<'a>>> {
        self.reader(ComponentKind::ForceSingle)
            .map(ForceSingleView::parse)
            .transpose()
    }

    // ===== Gaze / Eye tracking =====

    pub fn gaze_vectors(&self) -> Result<Option<GazeVectorView<'a>>> {
        self.reader(ComponentKind::GazeVector)
            .map(GazeVectorView::parse)
            .transpose()
    }

    pub fn eye_trackers(&self) -> Result<Option<EyeTrackerView<'a>>> {
        self.reader(ComponentKind::EyeTracker)
            .map(EyeTrackerView::parse)
            .transpose()
    }

    // ===== Image / Timecode / Skeleton =====

    pub fn images(&self) -> Result<Option<ImageView<'a>>> {
        self.reader(ComponentKind::Image)
            .map(ImageView::parse)
            .transpose()
    }

    pub fn timecodes(&self) -> Result<Option<TimecodeView>> {
        self.reader(ComponentKind::Timecode)
            .map(TimecodeView::parse)
            .transpose()
    }

    pub fn skeletons(&self) -> Result<Option<SkeletonView<'a>>> {
        self.reader(ComponentKind::Skeleton)
            .map(SkeletonView::parse)
            .transpose()
    }
}
