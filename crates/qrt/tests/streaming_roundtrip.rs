// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Framing round trips and streaming scenarios: whole packets, arbitrary
//! chunk boundaries, truncation, and 6DOF decoding end to end.

use qrt::protocol::{encode_command, encode_header, HEADER_SIZE};
use qrt::transport::ScriptedTransport;
use qrt::{ByteOrder, ConnectOptions, ComponentSpec, Error, Event, PacketKind, Rt, StreamRate};

fn event_packet(event: Event, order: ByteOrder) -> Vec<u8> {
    let mut pkt = encode_header(9, PacketKind::Event, order).to_vec();
    pkt.push(event as u8);
    pkt
}

fn handshake(tr: &mut ScriptedTransport, order: ByteOrder) {
    tr.push_bytes(encode_command("QTM RT Interface connected", order));
    tr.push_bytes(encode_command("Version set to 1.19", order));
    tr.push_bytes(event_packet(Event::CaptureStopped, order));
}

fn connect(tr: ScriptedTransport, order: ByteOrder) -> Rt {
    let mut rt = Rt::with_transport(Box::new(tr));
    let opts = ConnectOptions {
        byte_order: order,
        ..ConnectOptions::default()
    };
    rt.connect_on("qtm-host", 22222, &opts).unwrap();
    rt
}

/// Data packet with one 6DOF component holding the given bodies
/// (position + row-major rotation matrix, no residual).
fn six_dof_packet(order: ByteOrder, bodies: &[([f32; 3], [f32; 9])]) -> Vec<u8> {
    let mut comp = Vec::new();
    comp.extend_from_slice(&order.u32_bytes(bodies.len() as u32));
    comp.extend_from_slice(&order.u16_bytes(0));
    comp.extend_from_slice(&order.u16_bytes(0));
    for (pos, rot) in bodies {
        for v in pos.iter().chain(rot.iter()) {
            comp.extend_from_slice(&order.f32_bytes(*v));
        }
    }
    let mut body = Vec::new();
    body.extend_from_slice(&order.u64_bytes(1_234_567)); // timestamp us
    body.extend_from_slice(&order.u32_bytes(77)); // frame number
    body.extend_from_slice(&order.u32_bytes(1)); // component count
    body.extend_from_slice(&order.u32_bytes((comp.len() + HEADER_SIZE) as u32));
    body.extend_from_slice(&order.u32_bytes(5)); // 6D component kind
    body.extend_from_slice(&comp);

    let mut pkt = encode_header(
        (body.len() + HEADER_SIZE) as u32,
        PacketKind::Data,
        order,
    )
    .to_vec();
    pkt.extend_from_slice(&body);
    pkt
}

#[test]
fn command_roundtrip_both_orders() {
    for order in [ByteOrder::Little, ByteOrder::Big] {
        let mut tr = ScriptedTransport::new();
        handshake(&mut tr, order);
        tr.push_bytes(encode_command("QTM 2023.2 (build 12000)", order));
        let mut rt = connect(tr, order);
        let pkt = rt.receive(true, None).unwrap();
        assert_eq!(pkt.kind(), PacketKind::Command);
        assert_eq!(pkt.command_str().unwrap(), "QTM 2023.2 (build 12000)");
    }
}

#[test]
fn streaming_6dof_two_bodies() {
    let order = ByteOrder::Little;
    let bodies = [
        (
            [12.5f32, -80.25, 1200.0],
            [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        ),
        (
            [0.125f32, 2048.5, -0.5],
            [0.0f32, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ),
    ];
    let mut tr = ScriptedTransport::new();
    handshake(&mut tr, order);
    tr.push_bytes(six_dof_packet(order, &bodies));
    let mut rt = connect(tr, order);
    rt.stream_frames(StreamRate::AllFrames, None, &[ComponentSpec::Body6d])
        .unwrap();

    let pkt = rt.receive(true, None).unwrap();
    let frame = pkt.data().unwrap();
    assert_eq!(frame.frame_number(), 77);
    assert_eq!(frame.timestamp_us(), 1_234_567);
    let view = frame.bodies_6d().unwrap().unwrap();
    assert_eq!(view.body_count(), 2);
    for (i, (pos, rot)) in bodies.iter().enumerate() {
        let body = view.body(i).unwrap();
        assert_eq!(body.position, *pos);
        assert_eq!(body.rotation, *rot);
        assert_eq!(body.residual, None);
    }
    // Components that were not streamed are absent, not errors.
    assert_eq!(frame.component_size(qrt::ComponentKind::Analog), 0);
    assert!(frame.analog().unwrap().is_none());
    assert!(frame.markers_3d().unwrap().is_none());
}

#[test]
fn chunked_delivery_decodes_identically() {
    let order = ByteOrder::Little;
    let bodies = [(
        [1.0f32, 2.0, 3.0],
        [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    )];
    let pkt = six_dof_packet(order, &bodies);

    // Whole, split inside the header, split at every third byte, and a
    // handful of random chunkings must all decode to the same frame.
    let mut chunkings: Vec<Vec<usize>> = vec![
        vec![pkt.len()],
        vec![3, pkt.len() - 3],
        vec![5, 2, pkt.len() - 7],
    ];
    fastrand::seed(0x51_71_2e_19);
    for _ in 0..16 {
        let mut cuts = Vec::new();
        let mut left = pkt.len();
        while left > 0 {
            let take = fastrand::usize(1..=left.min(17));
            cuts.push(take);
            left -= take;
        }
        chunkings.push(cuts);
    }

    for cuts in chunkings {
        let mut tr = ScriptedTransport::new();
        handshake(&mut tr, order);
        let mut offset = 0;
        for len in &cuts {
            tr.push_bytes(pkt[offset..offset + len].to_vec());
            offset += len;
        }
        assert_eq!(offset, pkt.len());
        let mut rt = connect(tr, order);
        let received = rt.receive(true, None).unwrap();
        let frame = received.data().unwrap();
        let view = frame.bodies_6d().unwrap().unwrap();
        assert_eq!(view.body_count(), 1, "chunking {:?}", cuts);
        assert_eq!(view.body(0).unwrap().position, [1.0, 2.0, 3.0]);
    }
}

#[test]
fn truncated_stream_is_an_error_not_partial_success() {
    let order = ByteOrder::Little;
    let pkt = six_dof_packet(
        order,
        &[([0.0; 3], [0.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
    );
    // Timeout mid-frame.
    let mut tr = ScriptedTransport::new();
    handshake(&mut tr, order);
    tr.push_bytes(pkt[..pkt.len() / 2].to_vec());
    tr.push_timeout();
    let mut rt = connect(tr, order);
    assert!(matches!(rt.receive(true, None), Err(Error::Protocol(_))));

    // Disconnect mid-frame.
    let mut tr = ScriptedTransport::new();
    handshake(&mut tr, order);
    tr.push_bytes(pkt[..10].to_vec());
    tr.push_disconnect();
    let mut rt = connect(tr, order);
    assert!(matches!(rt.receive(true, None), Err(Error::Protocol(_))));
}

#[test]
fn no_more_data_surfaces_cleanly() {
    let order = ByteOrder::Little;
    let mut tr = ScriptedTransport::new();
    handshake(&mut tr, order);
    tr.push_bytes(encode_header(8, PacketKind::NoMoreData, order).to_vec());
    let mut rt = connect(tr, order);
    let pkt = rt.receive(true, None).unwrap();
    assert_eq!(pkt.kind(), PacketKind::NoMoreData);
    assert!(pkt.body().is_empty());
}

#[test]
fn interleaved_events_update_state_during_stream() {
    let order = ByteOrder::Little;
    let bodies = [(
        [9.0f32, 8.0, 7.0],
        [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    )];
    let mut tr = ScriptedTransport::new();
    handshake(&mut tr, order);
    tr.push_bytes(event_packet(Event::CaptureStarted, order));
    tr.push_bytes(six_dof_packet(order, &bodies));
    let mut rt = connect(tr, order);
    // Skipping events still records them.
    let pkt = rt.receive(true, None).unwrap();
    assert_eq!(pkt.kind(), PacketKind::Data);
    assert_eq!(rt.current_state(), Some(Event::CaptureStarted));
}
