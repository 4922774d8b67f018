// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Gaze-vector and eye-tracker component views.
//!
//! Both share the quirk that the per-device sample number is present on the
//! wire only when the sample count is nonzero.

use crate::error::{Error, Result};
use crate::protocol::wire::{ByteOrder, Reader};

/// One gaze sample: unit direction plus origin position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub direction: [f32; 3],
    pub position: [f32; 3],
}

const GAZE_SAMPLE_SIZE: usize = 24;
const EYE_SAMPLE_SIZE: usize = 8;

struct DeviceRun {
    sample_count: u32,
    sample_number: u32,
    data_start: usize,
}

fn parse_runs<'a>(
    data: &'a [u8],
    order: ByteOrder,
    sample_size: usize,
    label: &str,
) -> Result<Vec<DeviceRun>> {
    let mut r = Reader::new(data, order);
    let device_count = r.u32()?;
    let mut runs = Vec::with_capacity(device_count as usize);
    for _ in 0..device_count {
        let sample_count = r.u32()?;
        // Sample number rides along only when there are samples.
        let sample_number = if sample_count > 0 { r.u32()? } else { 0 };
        let data_start = r.position();
        r.skip(sample_count as usize * sample_size)?;
        runs.push(DeviceRun {
            sample_count,
            sample_number,
            data_start,
        });
    }
    if r.remaining() != 0 {
        return Err(Error::Protocol(format!(
            "{} trailing bytes in {} component",
            r.remaining(),
            label
        )));
    }
    Ok(runs)
}

/// GazeVector component.
pub struct GazeVectorView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    runs: Vec<DeviceRun>,
}

impl<'a> GazeVectorView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let order = r.order();
        let data = r.bytes(r.remaining())?;
        let runs = parse_runs(data, order, GAZE_SAMPLE_SIZE, "GazeVector")?;
        Ok(GazeVectorView { data, order, runs })
    }

    pub fn vector_count(&self) -> usize {
        self.runs.len()
    }

    pub fn sample_count(&self, vector: usize) -> Result<u32> {
        Ok(self.run(vector)?.sample_count)
    }

    pub fn sample_number(&self, vector: usize) -> Result<u32> {
        Ok(self.run(vector)?.sample_number)
    }

    pub fn sample(&self, vector: usize, sample: u32) -> Result<GazeSample> {
        let run = self.run(vector)?;
        if sample >= run.sample_count {
            return Err(Error::Contract(format!(
                "gaze sample {} out of range ({} samples)",
                sample, run.sample_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(run.data_start + sample as usize * GAZE_SAMPLE_SIZE)?;
        Ok(GazeSample {
            direction: r.f32_array::<3>()?,
            position: r.f32_array::<3>()?,
        })
    }

    fn run(&self, index: usize) -> Result<&DeviceRun> {
        self.runs.get(index).ok_or_else(|| {
            Error::Contract(format!(
                "gaze vector index {} out of range ({} vectors)",
                index,
                self.runs.len()
            ))
        })
    }
}

/// EyeTracker component: left/right pupil diameters per sample.
pub struct EyeTrackerView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    runs: Vec<DeviceRun>,
}

impl<'a> EyeTrackerView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let order = r.order();
        let data = r.bytes(r.remaining())?;
        let runs = parse_runs(data, order, EYE_SAMPLE_SIZE, "EyeTracker")?;
        Ok(EyeTrackerView { data, order, runs })
    }

    pub fn tracker_count(&self) -> usize {
        self.runs.len()
    }

    pub fn sample_count(&self, tracker: usize) -> Result<u32> {
        Ok(self.run(tracker)?.sample_count)
    }

    pub fn sample_number(&self, tracker: usize) -> Result<u32> {
        Ok(self.run(tracker)?.sample_number)
    }

    /// `(left, right)` pupil diameters.
    pub fn sample(&self, tracker: usize, sample: u32) -> Result<(f32, f32)> {
        let run = self.run(tracker)?;
        if sample >= run.sample_count {
            return Err(Error::Contract(format!(
                "eye-tracker sample {} out of range ({} samples)",
                sample, run.sample_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(run.data_start + sample as usize * EYE_SAMPLE_SIZE)?;
        Ok((r.f32()?, r.f32()?))
    }

    fn run(&self, index: usize) -> Result<&DeviceRun> {
        self.runs.get(index).ok_or_else(|| {
            Error::Contract(format!(
                "eye tracker index {} out of range ({} trackers)",
                index,
                self.runs.len()
            ))
        })
    }
}
