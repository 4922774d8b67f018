// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scripted in-memory transport for the test harness.
//!
//! Serves receives from a queued script of byte chunks, timeouts and
//! disconnects, and records everything sent. A chunk larger than the
//! caller's buffer (or the configured chunk limit) is handed out
//! piecewise, which is exactly how partial-read assembly gets exercised.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::{Recv, Transport};
use crate::error::{Error, Result};

enum Step {
    Bytes {
        data: Vec<u8>,
        offset: usize,
        source: Option<SocketAddr>,
    },
    Timeout,
    Disconnect,
}

/// Scripted transport. Build a script with the `push_*` methods, then hand
/// it to a session or framer.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    /// Everything the code under test sent, one entry per send call.
    pub sent: Vec<Vec<u8>>,
    /// Broadcast sends: `(payload, port)` per call.
    pub broadcasts: Vec<(Vec<u8>, u16)>,
    connected: bool,
    chunk_limit: Option<usize>,
    udp_port: u16,
    local_addrs: Vec<Ipv4Addr>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        ScriptedTransport {
            script: VecDeque::new(),
            sent: Vec::new(),
            broadcasts: Vec::new(),
            connected: false,
            chunk_limit: None,
            udp_port: 4545,
            local_addrs: vec![Ipv4Addr::new(192, 168, 1, 10)],
        }
    }

    /// A transport that is already connected (skips the connect call in
    /// framer-level tests).
    pub fn connected() -> Self {
        let mut t = Self::new();
        t.connected = true;
        t
    }

    /// Cap how many bytes a single receive call may return.
    pub fn set_chunk_limit(&mut self, limit: usize) {
        self.chunk_limit = Some(limit);
    }

    /// Queue bytes to be served by subsequent receive calls.
    pub fn push_bytes(&mut self, data: Vec<u8>) {
        self.script.push_back(Step::Bytes {
            data,
            offset: 0,
            source: None,
        });
    }

    /// Queue a datagram with a source address (discovery responses).
    pub fn push_datagram(&mut self, data: Vec<u8>, source: SocketAddr) {
        self.script.push_back(Step::Bytes {
            data,
            offset: 0,
            source: Some(source),
        });
    }

    /// Queue one timeout outcome.
    pub fn push_timeout(&mut self) {
        self.script.push_back(Step::Timeout);
    }

    /// Queue a peer disconnect.
    pub fn push_disconnect(&mut self) {
        self.script.push_back(Step::Disconnect);
    }

    /// Concatenated payload of every send call.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.concat()
    }

    /// Wrap in a shared handle so a test can keep inspecting the script
    /// after handing the transport to a session.
    pub fn into_shared(self) -> SharedScriptedTransport {
        SharedScriptedTransport(std::rc::Rc::new(std::cell::RefCell::new(self)))
    }
}

/// Cloneable handle over a [`ScriptedTransport`]; both the session and the
/// test body see the same script and sent-bytes log.
#[derive(Clone)]
pub struct SharedScriptedTransport(std::rc::Rc<std::cell::RefCell<ScriptedTransport>>);

impl SharedScriptedTransport {
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, ScriptedTransport> {
        self.0.borrow_mut()
    }
}

impl Transport for SharedScriptedTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.0.borrow_mut().connect(host, port)
    }

    fn disconnect(&mut self) {
        self.0.borrow_mut().disconnect();
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().is_connected()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.0.borrow_mut().send(data)
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        header_only: bool,
        timeout: Option<Duration>,
        want_source: bool,
    ) -> Result<Recv> {
        self.0
            .borrow_mut()
            .receive(buf, header_only, timeout, want_source)
    }

    fn create_udp_socket(&mut self, port_hint: u16, broadcast: bool) -> Result<u16> {
        self.0.borrow_mut().create_udp_socket(port_hint, broadcast)
    }

    fn send_udp_broadcast(&mut self, data: &[u8], port: u16, filter: Ipv4Addr) -> Result<bool> {
        self.0.borrow_mut().send_udp_broadcast(data, port, filter)
    }

    fn is_local_address(&self, addr: Ipv4Addr) -> bool {
        self.0.borrow().is_local_address(addr)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        _header_only: bool,
        _timeout: Option<Duration>,
        want_source: bool,
    ) -> Result<Recv> {
        match self.script.front_mut() {
            None => Ok(Recv::Timeout),
            Some(Step::Timeout) => {
                self.script.pop_front();
                Ok(Recv::Timeout)
            }
            Some(Step::Disconnect) => {
                self.script.pop_front();
                self.connected = false;
                Ok(Recv::Disconnected)
            }
            Some(Step::Bytes {
                data,
                offset,
                source,
            }) => {
                let mut n = (data.len() - *offset).min(buf.len());
                if let Some(limit) = self.chunk_limit {
                    n = n.min(limit);
                }
                buf[..n].copy_from_slice(&data[*offset..*offset + n]);
                let source = if want_source { *source } else { None };
                *offset += n;
                if *offset == data.len() {
                    self.script.pop_front();
                }
                Ok(Recv::Data { len: n, source })
            }
        }
    }

    fn create_udp_socket(&mut self, port_hint: u16, _broadcast: bool) -> Result<u16> {
        if port_hint != 0 {
            self.udp_port = port_hint;
        }
        Ok(self.udp_port)
    }

    fn send_udp_broadcast(&mut self, data: &[u8], port: u16, _filter: Ipv4Addr) -> Result<bool> {
        self.broadcasts.push((data.to_vec(), port));
        Ok(true)
    }

    fn is_local_address(&self, addr: Ipv4Addr) -> bool {
        self.local_addrs.contains(&addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_limit_splits_reads() {
        let mut tr = ScriptedTransport::connected();
        tr.set_chunk_limit(3);
        tr.push_bytes(vec![1, 2, 3, 4, 5, 6, 7]);
        let mut buf = [0u8; 16];
        let mut got = Vec::new();
        loop {
            match tr.receive(&mut buf, false, None, false).unwrap() {
                Recv::Data { len, .. } => got.extend_from_slice(&buf[..len]),
                Recv::Timeout => break,
                Recv::Disconnected => panic!("unexpected disconnect"),
            }
        }
        assert_eq!(got, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn empty_script_times_out() {
        let mut tr = ScriptedTransport::connected();
        let mut buf = [0u8; 4];
        assert_eq!(
            tr.receive(&mut buf, false, None, false).unwrap(),
            Recv::Timeout
        );
    }

    #[test]
    fn source_only_when_requested() {
        let source: SocketAddr = "10.0.0.9:22226".parse().unwrap();
        let mut tr = ScriptedTransport::connected();
        tr.push_datagram(vec![1], source);
        tr.push_datagram(vec![2], source);
        let mut buf = [0u8; 4];
        match tr.receive(&mut buf, false, None, false).unwrap() {
            Recv::Data { source, .. } => assert!(source.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        match tr.receive(&mut buf, false, None, true).unwrap() {
            Recv::Data { source: got, .. } => assert_eq!(got, Some(source)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
