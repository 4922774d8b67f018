// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QRT Global Configuration - Single Source of Truth
//!
//! This module centralizes the QTM RT port map, operation deadlines and
//! buffer limits. **NEVER hardcode elsewhere!**

use std::time::Duration;

// =======================================================================
// QTM RT port map
//
// One TCP base port per server; the endianness of a >=1.1 connection is
// chosen by the port offset, v1.0 shares the base port and negotiates
// with an explicit ByteOrder command afterwards.
// =======================================================================

/// Default QTM RT base TCP port.
///
/// All other ports are computed from this value.
pub const BASE_PORT: u16 = 22222;

/// Port offset for a little-endian (non-legacy) connection.
pub const LITTLE_ENDIAN_OFFSET: u16 = 1;

/// Port offset for a big-endian (non-legacy) connection.
pub const BIG_ENDIAN_OFFSET: u16 = 2;

/// UDP port QTM servers listen on for discovery broadcasts.
pub const DISCOVER_PORT: u16 = 22226;

/// Protocol version requested when the caller does not pick one.
pub const DEFAULT_VERSION: (u32, u32) = (1, 19);

// =======================================================================
// Operation deadlines
//
// Configuration constants, not protocol requirements: a capture file
// transfer stalls for seconds while QTM flushes, a calibration wait can
// legitimately run for minutes.
// =======================================================================

/// Deadline for the welcome packet and ordinary command round trips.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline between receive calls during a capture file transfer.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a calibration result (QTM waits for the operator).
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Deadline for a `Save` command round trip.
pub const SAVE_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect deadline.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Quiet period that ends a discovery sweep.
pub const DISCOVER_TIMEOUT: Duration = Duration::from_millis(500);

// =======================================================================
// Buffer limits
// =======================================================================

/// Initial capacity of the session's reusable receive buffer.
///
/// Grown on demand when a packet declares a larger size; large Data/XML
/// packets are legitimate, not a truncation error.
pub const RECV_BUFFER_SIZE: usize = 65_536;

/// Per-receive cap while streaming an in-band capture file to a sink.
pub const FILE_CHUNK_SIZE: usize = 65_535;
