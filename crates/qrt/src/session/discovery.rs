// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server discovery: UDP broadcast sweep over the local interfaces.
//!
//! The client binds a broadcast-capable reply socket, broadcasts a 10-byte
//! discovery request carrying the reply port, then drains responses until
//! a quiet period elapses. Discovery traffic predates any negotiation and
//! is network byte order throughout.

use std::net::Ipv4Addr;

use super::Rt;
use crate::config::DISCOVER_TIMEOUT;
use crate::error::{Error, Result};
use crate::protocol::packet::{
    encode_discover_request, parse_discover_response, split_discover_datagram, DiscoverResponse,
};
use crate::transport::Recv;

impl Rt {
    /// Sweep the local network for RT servers listening on `port`.
    ///
    /// Clears and repopulates the session's server list (also readable via
    /// [`Rt::discovered_servers`]). Responses from this host's own
    /// addresses are kept; callers who want remote servers only can filter
    /// with the transport's locality check.
    pub fn discover(&mut self, port: u16) -> Result<&[DiscoverResponse]> {
        self.servers.clear();

        let reply_port = self.transport.create_udp_socket(0, true)?;
        let request = encode_discover_request(reply_port);
        let delivered =
            self.transport
                .send_udp_broadcast(&request, port, Ipv4Addr::UNSPECIFIED)?;
        if !delivered {
            return Err(Error::Protocol(
                "discovery broadcast not delivered on any interface".into(),
            ));
        }
        log::debug!("[discover] request sent, reply port {}", reply_port);

        let mut buf = vec![0u8; 1024];
        loop {
            match self
                .transport
                .receive(&mut buf, false, Some(DISCOVER_TIMEOUT), true)?
            {
                Recv::Data { len, source } => {
                    let Some(source) = source else { continue };
                    match split_discover_datagram(&buf[..len])
                        .and_then(|body| parse_discover_response(body, source))
                    {
                        Ok(response) => {
                            log::info!(
                                "[discover] {} port {} ({})",
                                response.addr,
                                response.base_port,
                                response.message
                            );
                            self.servers.push(response);
                        }
                        Err(err) => {
                            log::warn!("[discover] ignoring malformed response: {}", err);
                        }
                    }
                }
                Recv::Timeout | Recv::Disconnected => break,
            }
        }
        Ok(&self.servers)
    }
}
