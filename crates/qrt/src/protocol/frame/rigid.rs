// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 6DOF rigid-body component views.
//!
//! A matrix-form body is 3 position floats plus a row-major 3x3 rotation
//! matrix; the Euler form replaces the matrix with 3 angles. Residual
//! variants append one extra float per record.

use crate::error::{Error, Result};
use crate::protocol::wire::{ByteOrder, Reader};

/// One rigid body pose in matrix form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body6d {
    pub position: [f32; 3],
    /// Row-major 3x3 rotation matrix.
    pub rotation: [f32; 9],
    pub residual: Option<f32>,
}

/// One rigid body pose in Euler form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body6dEuler {
    pub position: [f32; 3],
    /// Euler angles in the rotation convention configured on the server.
    pub angles: [f32; 3],
    pub residual: Option<f32>,
}

/// 6D / 6DRes component.
pub struct Body6dView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    body_count: u32,
    drop_rate: u16,
    out_of_sync_rate: u16,
    residual: bool,
}

impl<'a> Body6dView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, residual: bool) -> Result<Self> {
        let order = r.order();
        let body_count = r.u32()?;
        let drop_rate = r.u16()?;
        let out_of_sync_rate = r.u16()?;
        let stride = Self::stride(residual);
        let data = r.bytes(r.remaining())?;
        if data.len() != body_count as usize * stride {
            return Err(Error::Protocol(format!(
                "6D component holds {} bytes for {} bodies (stride {})",
                data.len(),
                body_count,
                stride
            )));
        }
        Ok(Body6dView {
            data,
            order,
            body_count,
            drop_rate,
            out_of_sync_rate,
            residual,
        })
    }

    fn stride(residual: bool) -> usize {
        // 12 floats pose, optional residual.
        if residual {
            52
        } else {
            48
        }
    }

    pub fn body_count(&self) -> usize {
        self.body_count as usize
    }

    pub fn drop_rate(&self) -> u16 {
        self.drop_rate
    }

    pub fn out_of_sync_rate(&self) -> u16 {
        self.out_of_sync_rate
    }

    /// Pose of body `index`, ordered as in the server's 6DOF settings.
    pub fn body(&self, index: usize) -> Result<Body6d> {
        if index >= self.body_count as usize {
            return Err(Error::Contract(format!(
                "body index {} out of range ({} bodies)",
                index, self.body_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(index * Self::stride(self.residual))?;
        let position = r.f32_array::<3>()?;
        let rotation = r.f32_array::<9>()?;
        let residual = if self.residual { Some(r.f32()?) } else { None };
        Ok(Body6d {
            position,
            rotation,
            residual,
        })
    }
}

/// 6DEuler / 6DEulerRes component.
pub struct Body6dEulerView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    body_count: u32,
    drop_rate: u16,
    out_of_sync_rate: u16,
    residual: bool,
}

impl<'a> Body6dEulerView<'a> {
    pub(super) fn parse(mut r: Reader<'a>, residual: bool) -> Result<Self> {
        let order = r.order();
        let body_count = r.u32()?;
        let drop_rate = r.u16()?;
        let out_of_sync_rate = r.u16()?;
        let stride = Self::stride(residual);
        let data = r.bytes(r.remaining())?;
        if data.len() != body_count as usize * stride {
            return Err(Error::Protocol(format!(
                "6DEuler component holds {} bytes for {} bodies (stride {})",
                data.len(),
                body_count,
                stride
            )));
        }
        Ok(Body6dEulerView {
            data,
            order,
            body_count,
            drop_rate,
            out_of_sync_rate,
            residual,
        })
    }

    fn stride(residual: bool) -> usize {
        if residual {
            28
        } else {
            24
        }
    }

    pub fn body_count(&self) -> usize {
        self.body_count as usize
    }

    pub fn drop_rate(&self) -> u16 {
        self.drop_rate
    }

    pub fn out_of_sync_rate(&self) -> u16 {
        self.out_of_sync_rate
    }

    pub fn body(&self, index: usize) -> Result<Body6dEuler> {
        if index >= self.body_count as usize {
            return Err(Error::Contract(format!(
                "body index {} out of range ({} bodies)",
                index, self.body_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(index * Self::stride(self.residual))?;
        let position = r.f32_array::<3>()?;
        let angles = r.f32_array::<3>()?;
        let residual = if self.residual { Some(r.f32()?) } else { None };
        Ok(Body6dEuler {
            position,
            angles,
            residual,
        })
    }
}
