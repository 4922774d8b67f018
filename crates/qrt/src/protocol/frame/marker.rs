// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 2D and 3D marker component views.
//!
//! 2D coordinates are unsigned sub-pixel-scaled integers; 3D positions are
//! f32 in the working unit configured on the server (mm by default). The
//! per-camera status flag byte exists only from protocol 1.8.

use crate::error::{Error, Result};
use crate::protocol::wire::{ByteOrder, Reader};
use crate::protocol::{at_least, min_version};

/// One 2D marker record: sub-pixel coordinates plus ellipse diameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker2d {
    pub x: u32,
    pub y: u32,
    pub diameter_x: u16,
    pub diameter_y: u16,
}

const MARKER_2D_SIZE: usize = 12;

struct Camera2d {
    marker_count: u32,
    status_flags: Option<u8>,
    markers_start: usize,
}

/// 2D (or linearized 2D) component: markers grouped per camera.
pub struct Marker2dView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    drop_rate: u16,
    out_of_sync_rate: u16,
    cameras: Vec<Camera2d>,
}

impl<'a> Marker2dView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, version: (u32, u32)) -> Result<Self> {
        let data = r.bytes(r.remaining())?;
        let mut r = Reader::new(data, r.order());
        let camera_count = r.u32()?;
        let drop_rate = r.u16()?;
        let out_of_sync_rate = r.u16()?;
        let with_status = at_least(version, min_version::CAMERA_STATUS_FLAGS_2D);

        let mut cameras = Vec::with_capacity(camera_count as usize);
        for _ in 0..camera_count {
            let marker_count = r.u32()?;
            let status_flags = if with_status { Some(r.u8()?) } else { None };
            let markers_start = r.position();
            r.skip(marker_count as usize * MARKER_2D_SIZE)?;
            cameras.push(Camera2d {
                marker_count,
                status_flags,
                markers_start,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in 2D component",
                r.remaining()
            )));
        }
        Ok(Marker2dView {
            data,
            order: r.order(),
            drop_rate,
            out_of_sync_rate,
            cameras,
        })
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn drop_rate(&self) -> u16 {
        self.drop_rate
    }

    pub fn out_of_sync_rate(&self) -> u16 {
        self.out_of_sync_rate
    }

    pub fn marker_count(&self, camera: usize) -> Result<usize> {
        Ok(self.camera(camera)?.marker_count as usize)
    }

    /// Per-camera status flags; `None` below protocol 1.8.
    pub fn status_flags(&self, camera: usize) -> Result<Option<u8>> {
        Ok(self.camera(camera)?.status_flags)
    }

    pub fn marker(&self, camera: usize, marker: usize) -> Result<Marker2d> {
        let cam = self.camera(camera)?;
        if marker >= cam.marker_count as usize {
            return Err(Error::Contract(format!(
                "marker index {} out of range (camera has {})",
                marker, cam.marker_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(cam.markers_start + marker * MARKER_2D_SIZE)?;
        Ok(Marker2d {
            x: r.u32()?,
            y: r.u32()?,
            diameter_x: r.u16()?,
            diameter_y: r.u16()?,
        })
    }

    fn camera(&self, index: usize) -> Result<&Camera2d> {
        self.cameras.get(index).ok_or_else(|| {
            Error::Contract(format!(
                "camera index {} out of range (frame has {})",
                index,
                self.cameras.len()
            ))
        })
    }
}

/// Labeled 3D markers, with or without the residual suffix.
pub struct Marker3dView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    marker_count: u32,
    drop_rate: u16,
    out_of_sync_rate: u16,
    residual: bool,
}

impl<'a> Marker3dView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, residual: bool) -> Result<Self> {
        let order = r.order();
        let marker_count = r.u32()?;
        let drop_rate = r.u16()?;
        let out_of_sync_rate = r.u16()?;
        let stride = if residual { 16 } else { 12 };
        let data = r.bytes(r.remaining())?;
        if data.len() != marker_count as usize * stride {
            return Err(Error::Protocol(format!(
                "3D component holds {} bytes for {} markers (stride {})",
                data.len(),
                marker_count,
                stride
            )));
        }
        Ok(Marker3dView {
            data,
            order,
            marker_count,
            drop_rate,
            out_of_sync_rate,
            residual,
        })
    }

    pub fn marker_count(&self) -> usize {
        self.marker_count as usize
    }

    pub fn drop_rate(&self) -> u16 {
        self.drop_rate
    }

    pub fn out_of_sync_rate(&self) -> u16 {
        self.out_of_sync_rate
    }

    /// Position of marker `index`, identified by the label order of the
    /// server's 3D settings.
    pub fn position(&self, index: usize) -> Result<[f32; 3]> {
        let mut r = self.record(index)?;
        r.f32_array::<3>()
    }

    /// Fit residual; `None` for the non-residual component kinds.
    pub fn residual(&self, index: usize) -> Result<Option<f32>> {
        if !self.residual {
            return Ok(None);
        }
        let mut r = self.record(index)?;
        r.skip(12)?;
        Ok(Some(r.f32()?))
    }

    fn record(&self, index: usize) -> Result<Reader<'a>> {
        if index >= self.marker_count as usize {
            return Err(Error::Contract(format!(
                "marker index {} out of range ({} markers)",
                index, self.marker_count
            )));
        }
        let stride = if self.residual { 16 } else { 12 };
        let mut r = Reader::new(self.data, self.order);
        r.skip(index * stride)?;
        Ok(r)
    }
}

/// Unidentified 3D markers: each record carries an explicit integer id
/// instead of relying on label ordering.
pub struct UnidentifiedMarker3dView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    marker_count: u32,
    drop_rate: u16,
    out_of_sync_rate: u16,
    residual: bool,
}

impl<'a> UnidentifiedMarker3dView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, residual: bool) -> Result<Self> {
        let order = r.order();
        let marker_count = r.u32()?;
        let drop_rate = r.u16()?;
        let out_of_sync_rate = r.u16()?;
        let stride = if residual { 20 } else { 16 };
        let data = r.bytes(r.remaining())?;
        if data.len() != marker_count as usize * stride {
            return Err(Error::Protocol(format!(
                "3DNoLabels component holds {} bytes for {} markers (stride {})",
                data.len(),
                marker_count,
                stride
            )));
        }
        Ok(UnidentifiedMarker3dView {
            data,
            order,
            marker_count,
            drop_rate,
            out_of_sync_rate,
            residual,
        })
    }

    pub fn marker_count(&self) -> usize {
        self.marker_count as usize
    }

    pub fn drop_rate(&self) -> u16 {
        self.drop_rate
    }

    pub fn out_of_sync_rate(&self) -> u16 {
        self.out_of_sync_rate
    }

    /// `(id, position)` of marker `index`.
    pub fn marker(&self, index: usize) -> Result<(u32, [f32; 3])> {
        let mut r = self.record(index)?;
        let id = r.u32()?;
        let pos = r.f32_array::<3>()?;
        Ok((id, pos))
    }

    pub fn residual(&self, index: usize) -> Result<Option<f32>> {
        if !self.residual {
            return Ok(None);
        }
        let mut r = self.record(index)?;
        r.skip(16)?;
        Ok(Some(r.f32()?))
    }

    fn record(&self, index: usize) -> Result<Reader<'a>> {
        if index >= self.marker_count as usize {
            return Err(Error::Contract(format!(
                "marker index {} out of range ({} markers)",
                index, self.marker_count
            )));
        }
        let stride = if self.residual { 20 } else { 16 };
        let mut r = Reader::new(self.data, self.order);
        r.skip(index * stride)?;
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{block, frame_body};
    use super::super::{ComponentKind, DataFrame};
    use super::*;

    fn encode_2d(
        order: ByteOrder,
        version: (u32, u32),
        cameras: &[(Option<u8>, Vec<Marker2d>)],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&order.u32_bytes(cameras.len() as u32));
        body.extend_from_slice(&order.u16_bytes(0));
        body.extend_from_slice(&order.u16_bytes(0));
        let with_status = at_least(version, min_version::CAMERA_STATUS_FLAGS_2D);
        for (status, markers) in cameras {
            body.extend_from_slice(&order.u32_bytes(markers.len() as u32));
            if with_status {
                body.push(status.unwrap_or(0));
            }
            for m in markers {
                body.extend_from_slice(&order.u32_bytes(m.x));
                body.extend_from_slice(&order.u32_bytes(m.y));
                body.extend_from_slice(&order.u16_bytes(m.diameter_x));
                body.extend_from_slice(&order.u16_bytes(m.diameter_y));
            }
        }
        body
    }

    #[test]
    fn markers_2d_roundtrip() {
        let order = ByteOrder::Little;
        let m = Marker2d {
            x: 102_400,
            y: 76_800,
            diameter_x: 320,
            diameter_y: 300,
        };
        let comp = encode_2d(order, (1, 19), &[(Some(0x02), vec![m]), (None, vec![])]);
        let body = frame_body(order, 5, 9, &[block(order, ComponentKind::Marker2d, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.markers_2d().unwrap().unwrap();
        assert_eq!(view.camera_count(), 2);
        assert_eq!(view.marker_count(0).unwrap(), 1);
        assert_eq!(view.status_flags(0).unwrap(), Some(0x02));
        assert_eq!(view.marker(0, 0).unwrap(), m);
        assert_eq!(view.marker_count(1).unwrap(), 0);
    }

    #[test]
    fn markers_2d_pre_18_has_no_status_byte() {
        let order = ByteOrder::Big;
        let m = Marker2d {
            x: 1,
            y: 2,
            diameter_x: 3,
            diameter_y: 4,
        };
        let comp = encode_2d(order, (1, 7), &[(None, vec![m])]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker2d, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 7)).unwrap();
        let view = frame.markers_2d().unwrap().unwrap();
        assert_eq!(view.status_flags(0).unwrap(), None);
        assert_eq!(view.marker(0, 0).unwrap(), m);
    }

    #[test]
    fn decoding_a_17_frame_as_18_fails_loudly() {
        // Version gating must be deterministic: the same bytes decoded with
        // the wrong negotiated version do not silently shift fields.
        let order = ByteOrder::Little;
        let m = Marker2d {
            x: 10,
            y: 20,
            diameter_x: 1,
            diameter_y: 1,
        };
        let comp = encode_2d(order, (1, 7), &[(None, vec![m])]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker2d, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 8)).unwrap();
        assert!(frame.markers_2d().is_err());
    }

    #[test]
    fn out_of_range_indexes_are_contract_errors() {
        let order = ByteOrder::Little;
        let comp = encode_2d(order, (1, 19), &[(None, vec![])]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker2d, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.markers_2d().unwrap().unwrap();
        assert!(matches!(view.marker(5, 0), Err(Error::Contract(_))));
        assert!(matches!(view.marker(0, 0), Err(Error::Contract(_))));
    }

    fn encode_3d(order: ByteOrder, markers: &[([f32; 3], Option<f32>)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&order.u32_bytes(markers.len() as u32));
        body.extend_from_slice(&order.u16_bytes(2));
        body.extend_from_slice(&order.u16_bytes(1));
        for (pos, res) in markers {
            for v in pos {
                body.extend_from_slice(&order.f32_bytes(*v));
            }
            if let Some(res) = res {
                body.extend_from_slice(&order.f32_bytes(*res));
            }
        }
        body
    }

    #[test]
    fn markers_3d_roundtrip_both_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let comp = encode_3d(order, &[([1.0, -2.5, 300.25], None)]);
            let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker3d, &comp)]);
            let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
            let view = frame.markers_3d().unwrap().unwrap();
            assert_eq!(view.marker_count(), 1);
            assert_eq!(view.drop_rate(), 2);
            assert_eq!(view.out_of_sync_rate(), 1);
            assert_eq!(view.position(0).unwrap(), [1.0, -2.5, 300.25]);
            assert_eq!(view.residual(0).unwrap(), None);
        }
    }

    #[test]
    fn markers_3d_residual_variant() {
        let order = ByteOrder::Little;
        let comp = encode_3d(order, &[([0.5, 1.5, 2.5], Some(0.031))]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker3dRes, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.markers_3d_residual().unwrap().unwrap();
        assert_eq!(view.position(0).unwrap(), [0.5, 1.5, 2.5]);
        assert_eq!(view.residual(0).unwrap(), Some(0.031));
    }

    #[test]
    fn markers_3d_no_labels_carry_ids() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(2));
        comp.extend_from_slice(&order.u16_bytes(0));
        comp.extend_from_slice(&order.u16_bytes(0));
        for (id, pos) in [(17u32, [1.0f32, 2.0, 3.0]), (99, [4.0, 5.0, 6.0])] {
            comp.extend_from_slice(&order.u32_bytes(id));
            for v in pos {
                comp.extend_from_slice(&order.f32_bytes(v));
            }
        }
        let body = frame_body(
            order,
            0,
            0,
            &[block(order, ComponentKind::Marker3dNoLabels, &comp)],
        );
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.markers_3d_no_labels().unwrap().unwrap();
        assert_eq!(view.marker_count(), 2);
        assert_eq!(view.marker(0).unwrap(), (17, [1.0, 2.0, 3.0]));
        assert_eq!(view.marker(1).unwrap(), (99, [4.0, 5.0, 6.0]));
    }

    #[test]
    fn size_mismatch_is_protocol_error() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(2)); // declares 2 markers
        comp.extend_from_slice(&order.u16_bytes(0));
        comp.extend_from_slice(&order.u16_bytes(0));
        comp.extend_from_slice(&[0u8; 12]); // but carries only one
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Marker3d, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        assert!(matches!(frame.markers_3d(), Err(Error::Protocol(_))));
    }
}
