// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Image component view: per-camera encoded frames with crop metadata.

use crate::error::{Error, Result};
use crate::protocol::wire::Reader;

/// Pixel encoding of a camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImageFormat {
    RawGrayscale = 0,
    RawBgr = 1,
    Jpg = 2,
    Png = 3,
}

impl ImageFormat {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ImageFormat::RawGrayscale),
            1 => Some(ImageFormat::RawBgr),
            2 => Some(ImageFormat::Jpg),
            3 => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// One camera's image and its metadata. The pixel data is a borrowed view.
#[derive(Debug, Clone, Copy)]
pub struct CameraImage<'a> {
    pub camera_id: u32,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Crop rectangle as fractions of the full sensor, left/top/right/bottom.
    pub crop: [f32; 4],
    pub data: &'a [u8],
}

/// Image component.
pub struct ImageView<'a> {
    images: Vec<CameraImage<'a>>,
}

impl<'a> ImageView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let camera_count = r.u32()?;
        let mut images = Vec::with_capacity(camera_count as usize);
        for _ in 0..camera_count {
            let camera_id = r.u32()?;
            let raw_format = r.u32()?;
            let format = ImageFormat::from_u32(raw_format).ok_or_else(|| {
                Error::Protocol(format!("unknown image format {}", raw_format))
            })?;
            let width = r.u32()?;
            let height = r.u32()?;
            let crop = r.f32_array::<4>()?;
            let image_size = r.u32()? as usize;
            let data = r.bytes(image_size)?;
            images.push(CameraImage {
                camera_id,
                format,
                width,
                height,
                crop,
                data,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in Image component",
                r.remaining()
            )));
        }
        Ok(ImageView { images })
    }

    pub fn camera_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, index: usize) -> Result<CameraImage<'a>> {
        self.images.get(index).copied().ok_or_else(|| {
            Error::Contract(format!(
                "image index {} out of range ({} cameras)",
                index,
                self.images.len()
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
    fn jpg_image_with_crop() {
        let order = ByteOrder::Little;
        let pixels = [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00];
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(6)); // camera id
        comp.extend_from_slice(&order.u32_bytes(ImageFormat::Jpg as u32));
        comp.extend_from_slice(&order.u32_bytes(1280));
        comp.extend_from_slice(&order.u32_bytes(1024));
        for v in [0.0f32, 0.0, 1.0, 0.5] {
            comp.extend_from_slice(&order.f32_bytes(v));
        }
        comp.extend_from_slice(&order.u32_bytes(pixels.len() as u32));
        comp.extend_from_slice(&pixels);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Image, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.images().unwrap().unwrap();
        let img = view.image(0).unwrap();
        assert_eq!(img.camera_id, 6);
        assert_eq!(img.format, ImageFormat::Jpg);
        assert_eq!((img.width, img.height), (1280, 1024));
        assert_eq!(img.crop, [0.0, 0.0, 1.0, 0.5]);
        assert_eq!(img.data, &pixels);
    }

    #[test]
    fn declared_size_beyond_block_rejected() {
        let order = ByteOrder::Little;
        let mut comp = Vec::new();
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(1));
        comp.extend_from_slice(&order.u32_bytes(0));
        comp.extend_from_slice(&order.u32_bytes(64));
        comp.extend_from_slice(&order.u32_bytes(64));
        for _ in 0..4 {
            comp.extend_from_slice(&order.f32_bytes(0.0));
        }
        comp.extend_from_slice(&order.u32_bytes(1000)); // more than present
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Image, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        assert!(frame.images().is_err());
    }
}
