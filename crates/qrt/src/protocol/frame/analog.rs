// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Analog and force-plate component views.
//!
//! Regular analog/force blocks carry a frequency-scaled run of samples per
//! frame; the Single variants carry exactly one sample per device/plate.
//! Protocol 1.0 analog blocks predate sample numbering: one unnumbered
//! sample per channel.

use crate::error::{Error, Result};
use crate::protocol::wire::{ByteOrder, Reader};
use crate::protocol::{at_least, min_version};

/// Per-device entry of an Analog component.
#[derive(Debug, Clone, Copy)]
pub struct AnalogDevice {
    pub id: u32,
    pub channel_count: u32,
    pub sample_count: u32,
    /// Number of the first sample in this frame's run (0 for v1.0 blocks).
    pub sample_number: u32,
    data_start: usize,
}

/// Analog component: multi-sample voltage runs, channel-major.
pub struct AnalogView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    devices: Vec<AnalogDevice>,
}

impl<'a> AnalogView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, version: (u32, u32)) -> Result<Self> {
        let data = r.bytes(r.remaining())?;
        let mut r = Reader::new(data, r.order());
        let numbered = at_least(version, min_version::ANALOG_SAMPLE_NUMBERING);
        let device_count = r.u32()?;
        let mut devices = Vec::with_capacity(device_count as usize);
        for _ in 0..device_count {
            let id = r.u32()?;
            let channel_count = r.u32()?;
            let (sample_count, sample_number) = if numbered {
                (r.u32()?, r.u32()?)
            } else {
                (1, 0)
            };
            let data_start = r.position();
            r.skip(channel_count as usize * sample_count as usize * 4)?;
            devices.push(AnalogDevice {
                id,
                channel_count,
                sample_count,
                sample_number,
                data_start,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in Analog component",
                r.remaining()
            )));
        }
        Ok(AnalogView {
            data,
            order: r.order(),
            devices,
        })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, index: usize) -> Result<AnalogDevice> {
        self.devices.get(index).copied().ok_or_else(|| {
            Error::Contract(format!(
                "analog device index {} out of range ({} devices)",
                index,
                self.devices.len()
            ))
        })
    }

    /// Voltage of `channel` at `sample` within the device's run.
    pub fn sample(&self, device: usize, channel: u32, sample: u32) -> Result<f32> {
        let dev = self.device(device)?;
        if channel >= dev.channel_count || sample >= dev.sample_count {
            return Err(Error::Contract(format!(
                "sample ({}, {}) out of range ({} channels x {} samples)",
                channel, sample, dev.channel_count, dev.sample_count
            )));
        }
        let offset = dev.data_start
            + (channel as usize * dev.sample_count as usize + sample as usize) * 4;
        let mut r = Reader::new(self.data, self.order);
        r.skip(offset)?;
        r.f32()
    }
}

/// AnalogSingle component: one sample per channel per frame.
pub struct AnalogSingleView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    devices: Vec<AnalogDevice>,
}

impl<'a> AnalogSingleView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let data = r.bytes(r.remaining())?;
        let mut r = Reader::new(data, r.order());
        let device_count = r.u32()?;
        let mut devices = Vec::with_capacity(device_count as usize);
        for _ in 0..device_count {
            let id = r.u32()?;
            let channel_count = r.u32()?;
            let data_start = r.position();
            r.skip(channel_count as usize * 4)?;
            devices.push(AnalogDevice {
                id,
                channel_count,
                sample_count: 1,
                sample_number: 0,
                data_start,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in AnalogSingle component",
                r.remaining()
            )));
        }
        Ok(AnalogSingleView {
            data,
            order: r.order(),
            devices,
        })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, index: usize) -> Result<AnalogDevice> {
        self.devices.get(index).copied().ok_or_else(|| {
            Error::Contract(format!(
                "analog device index {} out of range ({} devices)",
                index,
                self.devices.len()
            ))
        })
    }

    pub fn sample(&self, device: usize, channel: u32) -> Result<f32> {
        let dev = self.device(device)?;
        if channel >= dev.channel_count {
            return Err(Error::Contract(format!(
                "channel {} out of range ({} channels)",
                channel, dev.channel_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(dev.data_start + channel as usize * 4)?;
        r.f32()
    }
}

/// One force-plate sample: force, moment, and center of pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSample {
    pub force: [f32; 3],
    pub moment: [f32; 3],
    pub application_point: [f32; 3],
}

const FORCE_SAMPLE_SIZE: usize = 36;

/// Per-plate entry of a Force component.
#[derive(Debug, Clone, Copy)]
pub struct ForcePlate {
    pub id: u32,
    pub sample_count: u32,
    /// Number of the first force sample in this frame's run.
    pub sample_number: u32,
    data_start: usize,
}

/// Force component: frequency-scaled force-plate sample runs.
pub struct ForceView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    plates: Vec<ForcePlate>,
}

impl<'a> ForceView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let data = r.bytes(r.remaining())?;
        let mut r = Reader::new(data, r.order());
        let plate_count = r.u32()?;
        let mut plates = Vec::with_capacity(plate_count as usize);
        for _ in 0..plate_count {
            let id = r.u32()?;
            let sample_count = r.u32()?;
            let sample_number = r.u32()?;
            let data_start = r.position();
            r.skip(sample_count as usize * FORCE_SAMPLE_SIZE)?;
            plates.push(ForcePlate {
                id,
                sample_count,
                sample_number,
                data_start,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in Force component",
                r.remaining()
            )));
        }
        Ok(ForceView {
            data,
            order: r.order(),
            plates,
        })
    }

    pub fn plate_count(&self) -> usize {
        self.plates.len()
    }

    pub fn plate(&self, index: usize) -> Result<ForcePlate> {
        self.plates.get(index).copied().ok_or_else(|| {
            Error::Contract(format!(
                "force plate index {} out of range ({} plates)",
                index,
                self.plates.len()
            ))
        })
    }

    pub fn sample(&self, plate: usize, sample: u32) -> Result<ForceSample> {
        let p = self.plate(plate)?;
        if sample >= p.sample_count {
            return Err(Error::Contract(format!(
                "force sample {} out of range ({} samples)",
                sample, p.sample_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(p.data_start + sample as usize * FORCE_SAMPLE_SIZE)?;
        read_force_sample(&mut r)
    }
}

/// ForceSingle component: exactly one sample per plate per frame.
pub struct ForceSingleView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    plate_count: u32,
}

impl<'a> ForceSingleView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let order = r.order();
        let plate_count = r.u32()?;
        let data = r.bytes(r.remaining())?;
        let expect = plate_count as usize * (4 + FORCE_SAMPLE_SIZE);
        if data.len() != expect {
            return Err(Error::Protocol(format!(
                "ForceSingle component holds {} bytes for {} plates",
                data.len(),
                plate_count
            )));
        }
        Ok(ForceSingleView {
            data,
            order,
            plate_count,
        })
    }

    pub fn plate_count(&self) -> usize {
        self.plate_count as usize
    }

    /// `(plate_id, sample)` for plate `index`.
    pub fn sample(&self, index: usize) -> Result<(u32, ForceSample)> {
        if index >= self.plate_count as usize {
            return Err(Error::Contract(format!(
                "force plate index {} out of range ({} plates)",
                index, self.plate_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(index * (4 + FORCE_SAMPLE_SIZE))?;
        let id = r.u32()?;
        Ok((id, read_force_sample(&mut r)?))
    }
}

fn read_force_sample(r: &mut Reader<'_>) -> Result<ForceSample> {
    Ok(ForceSample {
        force: r.f32_array::<3>()?,
        moment: r.f32_array::<3>()?,
        application_point: r.f32_array::<3>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{block, frame_body};
    use super::super::{ComponentKind, DataFrame};
    use super::*;

    fn encode_analog(order: ByteOrder, id: u32, channels: &[Vec<f32>], number: u32) -> Vec<u8> {
        let samples = channels.first().map(Vec::len).unwrap_or(0);
        let mut out = Vec::new();
        out.extend_from_slice(&order.u32_bytes(1));
        out.extend_from_slice(&order.u32_bytes(id));
        out.extend_from_slice(&order.u32_bytes(channels.len() as u32));
        out.extend_from_slice(&order.u32_bytes(samples as u32));
        out.extend_from_slice(&order.u32_bytes(number));
        for ch in channels {
            for v in ch {
                out.extend_from_slice(&order.f32_bytes(*v));
            }
        }
        out
    }

    #[test]
    fn analog_multi_sample_run() {
        let order = ByteOrder::Little;
        let comp = encode_analog(
            order,
            3,
            &[vec![0.1, 0.2, 0.3], vec![1.0, 2.0, 3.0]],
            900,
        );
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Analog, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.analog().unwrap().unwrap();
        assert_eq!(view.device_count(), 1);
        let dev = view.device(0).unwrap();
        assert_eq!((dev.id, dev.channel_count, dev.sample_count), (3, 2, 3));
        assert_eq!(dev.sample_number, 900);
        assert_eq!(view.sample(0, 0, 2).unwrap(), 0.3);
        assert_eq!(view.sample(0, 1, 0).unwrap(), 1.0);
        assert!(matches!(view.sample(0, 2, 0), Err(Error::Contract(_))));
    }

    #[test]
    fn analog_v10_is_one_unnumbered_sample_per_channel() {
        let order = ByteOrder::Big;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(7)); // id
        comp.extend_from_slice(&order.u32_bytes(2)); // channels
        comp.extend_from_slice(&order.f32_bytes(1.5));
        comp.extend_from_slice(&order.f32_bytes(-2.5));
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Analog, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 0)).unwrap();
        let view = frame.analog().unwrap().unwrap();
        let dev = view.device(0).unwrap();
        assert_eq!(dev.sample_count, 1);
        assert_eq!(view.sample(0, 1, 0).unwrap(), -2.5);
    }

    #[test]
    fn analog_single() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(2));
        for (id, values) in [(1u32, [0.5f32, 0.6]), (2, [7.0, 8.0])] {
            comp.extend_from_slice(&order.u32_bytes(id));
            comp.extend_from_slice(&order.u32_bytes(2));
            for v in values {
                comp.extend_from_slice(&order.f32_bytes(v));
            }
        }
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::AnalogSingle, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.analog_single().unwrap().unwrap();
        assert_eq!(view.device_count(), 2);
        assert_eq!(view.sample(1, 1).unwrap(), 8.0);
    }

    #[test]
    fn force_run_and_single() {
        let order = ByteOrder::Little;
        let s = ForceSample {
            force: [0.0, 0.0, 812.5],
            moment: [1.0, 2.0, 3.0],
            application_point: [120.0, 240.0, 0.0],
        };
        // Force: one plate, two identical samples.
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(4)); // plate id
        comp.extend_from_slice(&order.u32_bytes(2));
        comp.extend_from_slice(&order.u32_bytes(50));
        for _ in 0..2 {
            for v in s
                .force
                .iter()
                .chain(s.moment.iter())
                .chain(s.application_point.iter())
            {
                comp.extend_from_slice(&order.f32_bytes(*v));
            }
        }
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Force, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.force().unwrap().unwrap();
        let plate = view.plate(0).unwrap();
        assert_eq!((plate.id, plate.sample_count, plate.sample_number), (4, 2, 50));
        assert_eq!(view.sample(0, 1).unwrap(), s);

        // ForceSingle: same sample, one per plate.
        let mut single = Vec::new();
        single.extend_from_slice(&order.u32_bytes(1));
        single.extend_from_slice(&order.u32_bytes(4));
        for v in s
            .force
            .iter()
            .chain(s.moment.iter())
            .chain(s.application_point.iter())
        {
            single.extend_from_slice(&order.f32_bytes(*v));
        }
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::ForceSingle, &single)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.force_single().unwrap().unwrap();
        assert_eq!(view.plate_count(), 1);
        assert_eq!(view.sample(0).unwrap(), (4, s));
    }

    #[test]
    fn truncated_analog_rejected() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(4)); // 4 channels declared
        comp.extend_from_slice(&order.u32_bytes(2)); // 2 samples each
        comp.extend_from_slice(&order.u32_bytes(0));
        comp.extend_from_slice(&[0u8; 8]); // far short of 32 bytes
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Analog, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        assert!(frame.analog().is_err());
    }
}
