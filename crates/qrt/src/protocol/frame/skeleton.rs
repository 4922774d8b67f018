// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Skeleton component view (protocol 1.19+).
//!
//! Each skeleton is a run of segments: id, position, and an xyzw rotation
//! quaternion. Coordinates are local to the parent segment unless the
//! stream was requested with `Skeleton:global`.

use crate::error::{Error, Result};
use crate::protocol::wire::{ByteOrder, Reader};

/// One skeleton segment pose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SkeletonSegment {
    pub id: u32,
    pub position: [f32; 3],
    /// Rotation quaternion, x/y/z/w.
    pub rotation: [f32; 4],
}

const SEGMENT_SIZE: usize = 32;

struct SkeletonRun {
    segment_count: u32,
    data_start: usize,
}

/// Skeleton component.
pub struct SkeletonView<'a> {
    data: &'a [u8],
    order: ByteOrder,
    skeletons: Vec<SkeletonRun>,
}

impl<'a> SkeletonView<'a> {
    pub(super) fn parse(mut r: Reader<'a>) -> Result<Self> {
        let data = r.bytes(r.remaining())?;
        let mut r = Reader::new(data, r.order());
        let skeleton_count = r.u32()?;
        let mut skeletons = Vec::with_capacity(skeleton_count as usize);
        for _ in 0..skeleton_count {
            let segment_count = r.u32()?;
            let data_start = r.position();
            r.skip(segment_count as usize * SEGMENT_SIZE)?;
            skeletons.push(SkeletonRun {
                segment_count,
                data_start,
            });
        }
        if r.remaining() != 0 {
            return Err(Error::Protocol(format!(
                "{} trailing bytes in Skeleton component",
                r.remaining()
            )));
        }
        Ok(SkeletonView {
            data,
            order: r.order(),
            skeletons,
        })
    }

    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    pub fn segment_count(&self, skeleton: usize) -> Result<usize> {
        Ok(self.run(skeleton)?.segment_count as usize)
    }

    pub fn segment(&self, skeleton: usize, segment: usize) -> Result<SkeletonSegment> {
        let run = self.run(skeleton)?;
        if segment >= run.segment_count as usize {
            return Err(Error::Contract(format!(
                "segment index {} out of range ({} segments)",
                segment, run.segment_count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(run.data_start + segment * SEGMENT_SIZE)?;
        read_segment(&mut r)
    }

    /// Decode all of skeleton `skeleton`'s segments into a caller-supplied
    /// scratch slice, returning how many were written.
    ///
    /// # Errors
    /// `Contract` when the packet's segment count exceeds `out.len()`; the
    /// slice is left untouched in that case rather than partially filled.
    pub fn read_segments_into(
        &self,
        skeleton: usize,
        out: &mut [SkeletonSegment],
    ) -> Result<usize> {
        let run = self.run(skeleton)?;
        let count = run.segment_count as usize;
        if count > out.len() {
            return Err(Error::Contract(format!(
                "scratch slice holds {} segments, packet carries {}",
                out.len(),
                count
            )));
        }
        let mut r = Reader::new(self.data, self.order);
        r.skip(run.data_start)?;
        for slot in out.iter_mut().take(count) {
            *slot = read_segment(&mut r)?;
        }
        Ok(count)
    }

    fn run(&self, index: usize) -> Result<&SkeletonRun> {
        self.skeletons.get(index).ok_or_else(|| {
            Error::Contract(format!(
                "skeleton index {} out of range ({} skeletons)",
                index,
                self.skeletons.len()
            ))
        })
    }
}

fn read_segment(r: &mut Reader<'_>) -> Result<SkeletonSegment> {
    Ok(SkeletonSegment {
        id: r.u32()?,
        position: r.f32_array::<3>()?,
        rotation: r.f32_array::<4>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{block, frame_body};
    use super::super::{ComponentKind, DataFrame};
    use super::*;

    fn encode_skeletons(order: ByteOrder, skeletons: &[Vec<SkeletonSegment>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&order.u32_bytes(skeletons.len() as u32));
        for segs in skeletons {
            out.extend_from_slice(&order.u32_bytes(segs.len() as u32));
            for s in segs {
                out.extend_from_slice(&order.u32_bytes(s.id));
                for v in s.position.iter().chain(s.rotation.iter()) {
                    out.extend_from_slice(&order.f32_bytes(*v));
                }
            }
        }
        out
    }

    fn sample_segments() -> Vec<SkeletonSegment> {
        vec![
            SkeletonSegment {
                id: 1,
                position: [0.0, 0.0, 1000.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
            },
            SkeletonSegment {
                id: 2,
                position: [0.0, 450.0, 0.0],
                rotation: [0.7071, 0.0, 0.0, 0.7071],
            },
        ]
    }

    #[test]
    fn segments_roundtrip() {
        let order = ByteOrder::Little;
        let segs = sample_segments();
        let comp = encode_skeletons(order, &[segs.clone()]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Skeleton, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.skeletons().unwrap().unwrap();
        assert_eq!(view.skeleton_count(), 1);
        assert_eq!(view.segment_count(0).unwrap(), 2);
        assert_eq!(view.segment(0, 0).unwrap(), segs[0]);
        assert_eq!(view.segment(0, 1).unwrap(), segs[1]);
    }

    #[test]
    fn scratch_slice_fill() {
        let order = ByteOrder::Big;
        let segs = sample_segments();
        let comp = encode_skeletons(order, &[segs.clone()]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Skeleton, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.skeletons().unwrap().unwrap();
        let mut scratch = [SkeletonSegment::default(); 8];
        let n = view.read_segments_into(0, &mut scratch).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&scratch[..2], &segs[..]);
    }

    #[test]
    fn undersized_scratch_fails_without_overflow() {
        let order = ByteOrder::Little;
        let comp = encode_skeletons(order, &[sample_segments()]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Skeleton, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.skeletons().unwrap().unwrap();
        let mut scratch = [SkeletonSegment::default(); 1];
        let err = view.read_segments_into(0, &mut scratch).unwrap_err();
        assert!(matches!(err, Error::Contract(_)));
        // Untouched on failure.
        assert_eq!(scratch[0], SkeletonSegment::default());
    }

    #[test]
    fn multiple_skeletons() {
        let order = ByteOrder::Little;
        let a = sample_segments();
        let b = vec![SkeletonSegment {
            id: 9,
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 1.0, 0.0, 0.0],
        }];
        let comp = encode_skeletons(order, &[a, b.clone()]);
        let body = frame_body(order, 0, 0, &[block(order, ComponentKind::Skeleton, &comp)]);
        let frame = DataFrame::parse(&body, order, (1, 19)).unwrap();
        let view = frame.skeletons().unwrap().unwrap();
        assert_eq!(view.skeleton_count(), 2);
        assert_eq!(view.segment(1, 0).unwrap(), b[0]);
    }
}
