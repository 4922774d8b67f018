// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Real network transport: blocking semantics over nonblocking sockets
//! with a single `mio::Poll` readiness wait.
//!
//! The sockets are registered once and read opportunistically before every
//! poll, so edge-triggered wakeups and leftover kernel-buffered data are
//! both handled by the same loop.

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::time::{Duration, Instant};

use mio::net::{TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use super::{Recv, Transport};
use crate::config::CONNECT_TIMEOUT;
use crate::error::{Error, Result};

const TCP: Token = Token(0);
const UDP: Token = Token(1);
const BROADCAST: Token = Token(2);

/// Bytes that satisfy a `header_only` receive on a stream socket.
const HEADER_HINT: usize = 8;

/// TCP + UDP transport backed by one readiness poll.
pub struct NetTransport {
    poll: Poll,
    events: Events,
    tcp: Option<TcpStream>,
    udp: Option<UdpSocket>,
    broadcast: Option<UdpSocket>,
}

impl NetTransport {
    pub fn new() -> Result<Self> {
        Ok(NetTransport {
            poll: Poll::new()?,
            events: Events::with_capacity(16),
            tcp: None,
            udp: None,
            broadcast: None,
        })
    }

    fn bind_udp(&mut self, port_hint: u16, broadcast: bool) -> Result<u16> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        if broadcast {
            socket.set_broadcast(true)?;
        }
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port_hint));
        socket.bind(&bind_addr.into())?;
        socket.set_nonblocking(true)?;
        let std_socket: std::net::UdpSocket = socket.into();
        let port = std_socket.local_addr()?.port();
        let mut socket = UdpSocket::from_std(std_socket);
        let token = if broadcast { BROADCAST } else { UDP };
        self.poll
            .registry()
            .register(&mut socket, token, Interest::READABLE)?;
        if broadcast {
            self.broadcast = Some(socket);
        } else {
            self.udp = Some(socket);
        }
        log::debug!(
            "[net] bound udp port {} (broadcast={})",
            port,
            broadcast
        );
        Ok(port)
    }

    /// Try every readable socket once; `Ok(None)` when all would block.
    fn try_receive(
        &mut self,
        buf: &mut [u8],
        header_only: bool,
        want_source: bool,
    ) -> Result<Option<Recv>> {
        if let Some(tcp) = self.tcp.as_mut() {
            let cap = if header_only {
                HEADER_HINT.min(buf.len())
            } else {
                buf.len()
            };
            match tcp.read(&mut buf[..cap]) {
                Ok(0) => return Ok(Some(Recv::Disconnected)),
                Ok(len) => return Ok(Some(Recv::Data { len, source: None })),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(err.into()),
            }
        }
        // Datagram reads always get the whole buffer: a capped recv would
        // truncate the datagram.
        for socket in [self.udp.as_mut(), self.broadcast.as_mut()]
            .into_iter()
            .flatten()
        {
            match socket.recv_from(buf) {
                Ok((len, source)) => {
                    return Ok(Some(Recv::Data {
                        len,
                        source: want_source.then_some(source),
                    }))
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    /// Wait until the TCP socket accepts more bytes (send path).
    fn wait_writable(&mut self) -> Result<()> {
        let tcp = self.tcp.as_mut().ok_or(Error::NotConnected)?;
        self.poll
            .registry()
            .reregister(tcp, TCP, Interest::READABLE | Interest::WRITABLE)?;
        self.poll.poll(&mut self.events, None)?;
        let tcp = self.tcp.as_mut().expect("checked above");
        self.poll
            .registry()
            .reregister(tcp, TCP, Interest::READABLE)?;
        Ok(())
    }
}

impl Transport for NetTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.disconnect();
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::ConnectFailed(format!("{}:{}: {}", host, port, e)))?
            .collect();
        let mut last_err = None;
        for addr in &addrs {
            match std::net::TcpStream::connect_timeout(addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_nonblocking(true)?;
                    let mut stream = TcpStream::from_std(stream);
                    self.poll
                        .registry()
                        .register(&mut stream, TCP, Interest::READABLE)?;
                    self.tcp = Some(stream);
                    log::info!("[net] connected to {}", addr);
                    return Ok(());
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(Error::ConnectFailed(match last_err {
            Some(err) => format!("{}:{}: {}", host, port, err),
            None => format!("{}:{}: address resolved to nothing", host, port),
        }))
    }

    fn disconnect(&mut self) {
        if let Some(mut tcp) = self.tcp.take() {
            let _ = self.poll.registry().deregister(&mut tcp);
        }
        if let Some(mut udp) = self.udp.take() {
            let _ = self.poll.registry().deregister(&mut udp);
        }
        if let Some(mut broadcast) = self.broadcast.take() {
            let _ = self.poll.registry().deregister(&mut broadcast);
        }
    }

    fn is_connected(&self) -> bool {
        self.tcp.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0;
        while offset < data.len() {
            let tcp = self.tcp.as_mut().ok_or(Error::NotConnected)?;
            match tcp.write(&data[offset..]) {
                Ok(0) => return Err(Error::Disconnected),
                Ok(n) => offset += n,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    self.wait_writable()?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        header_only: bool,
        timeout: Option<Duration>,
        want_source: bool,
    ) -> Result<Recv> {
        if self.tcp.is_none() && self.udp.is_none() && self.broadcast.is_none() {
            return Err(Error::NotConnected);
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(outcome) = self.try_receive(buf, header_only, want_source)? {
                return Ok(outcome);
            }
            let wait = match deadline {
                None => None,
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(Recv::Timeout);
                    }
                    Some(left)
                }
            };
            self.poll.poll(&mut self.events, wait)?;
            if self.events.is_empty() {
                return Ok(Recv::Timeout);
            }
        }
    }

    fn create_udp_socket(&mut self, port_hint: u16, broadcast: bool) -> Result<u16> {
        self.bind_udp(port_hint, broadcast)
    }

    fn send_udp_broadcast(&mut self, data: &[u8], port: u16, filter: Ipv4Addr) -> Result<bool> {
        let socket = self.broadcast.as_ref().ok_or_else(|| {
            Error::Contract("broadcast requires a broadcast UDP socket".into())
        })?;
        // local-ip-address exposes addresses but no netmasks; assume /24
        // for the directed broadcast of each interface.
        let mut targets: Vec<Ipv4Addr> = Vec::new();
        if let Ok(netifas) = local_ip_address::list_afinet_netifas() {
            for (_name, ip) in netifas {
                let IpAddr::V4(ip) = ip else { continue };
                if ip.is_loopback() || ip == filter {
                    continue;
                }
                let o = ip.octets();
                let directed = Ipv4Addr::new(o[0], o[1], o[2], 255);
                if directed != filter && !targets.contains(&directed) {
                    targets.push(directed);
                }
            }
        }
        if targets.is_empty() {
            targets.push(Ipv4Addr::BROADCAST);
        }
        let mut delivered = false;
        for target in targets {
            let dest = SocketAddr::V4(SocketAddrV4::new(target, port));
            match socket.send_to(data, dest) {
                Ok(_) => {
                    log::debug!("[net] discovery broadcast to {}", dest);
                    delivered = true;
                }
                Err(err) => log::debug!("[net] broadcast to {} failed: {}", dest, err),
            }
        }
        Ok(delivered)
    }

    fn is_local_address(&self, addr: Ipv4Addr) -> bool {
        local_ip_address::list_afinet_netifas()
            .map(|netifas| {
                netifas
                    .iter()
                    .any(|(_, ip)| matches!(ip, IpAddr::V4(v4) if *v4 == addr))
            })
            .unwrap_or(false)
    }
}
