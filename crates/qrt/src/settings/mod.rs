// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Settings XML layer (feature `settings`).
//!
//! Thin mapping between the server's parameter XML and plain value
//! aggregates: parse what the session caches, serialize the writable
//! subset for SetParameters. Field presence is version-gated through the
//! same declarative table as the binary decoder; a field missing because
//! the negotiated protocol predates it is a default, not an error.

mod parse;
mod write;

pub use write::{general_settings_xml, sync_out_xml};

/// One camera as listed in the General settings block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub id: u32,
    pub model: String,
    pub serial: u32,
}

/// General settings block (parsed subset).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralSettings {
    /// Capture frequency, Hz.
    pub capture_frequency: u32,
    /// Capture duration, seconds.
    pub capture_time: f32,
    pub start_on_external_trigger: bool,
    /// Trigger edge/software flags; `None` below protocol 1.14.
    pub start_on_trigger_no: Option<bool>,
    pub start_on_trigger_nc: Option<bool>,
    pub start_on_trigger_software: Option<bool>,
    pub cameras: Vec<CameraSettings>,
}

/// One marker label of the 3D settings block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label3d {
    pub name: String,
    /// Packed RGB color, when the server reports one.
    pub color: Option<u32>,
}

/// 3D settings block (parsed subset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings3d {
    /// Axis pointing upward in the lab coordinate system, e.g. `+Z`.
    pub axis_upwards: String,
    pub labels: Vec<Label3d>,
}

/// Sync-out signal modes for camera output ports 1 and 2. Port 3 emits a
/// fixed 100 Hz signal and accepts only [`SyncOutMode::Fixed100Hz`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutMode {
    ShutterOut,
    Multiplier,
    Divisor,
    IndependentFreq,
    MeasurementTime,
    Fixed100Hz,
}

impl SyncOutMode {
    pub(crate) fn token(self) -> &'static str {
        match self {
            SyncOutMode::ShutterOut => "Shutter out",
            SyncOutMode::Multiplier => "Multiplier",
            SyncOutMode::Divisor => "Divisor",
            SyncOutMode::IndependentFreq => "Camera independent",
            SyncOutMode::MeasurementTime => "Measurement time",
            SyncOutMode::Fixed100Hz => "Continuous 100Hz",
        }
    }
}

/// Writable sync-out configuration for one camera port. The mode is
/// mandatory: there is no implicit fallthrough for out-of-range ports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOutSettings {
    pub camera_id: u32,
    /// Output port, 1-3.
    pub port: u8,
    pub mode: SyncOutMode,
    /// Frequency multiplier/divisor or independent frequency, mode-specific.
    pub value: u32,
    /// Duty cycle percent, pulse-train modes only.
    pub duty_cycle: f32,
    /// True for negative signal polarity.
    pub negative_polarity: bool,
}
