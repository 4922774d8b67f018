// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command/response layer and the session command surface.
//!
//! Request strings and the success phrases matched against responses are a
//! wire contract with the server's exact wording. The phrases live in the
//! tables below, not scattered through the call sites; if a server release
//! ever rewords a response, this is the one place to adjust.

use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

use super::{ConnectionState, Rt};
use crate::config::{
    CALIBRATION_TIMEOUT, CAPTURE_TIMEOUT, COMMAND_TIMEOUT, SAVE_TIMEOUT,
};
use crate::error::{Error, Result};
use crate::protocol::{at_least, encode_command, encode_xml, min_version, Event, PacketKind};

// =======================================================================
// Server phrase tables (wire contract, exact wording)
// =======================================================================

/// Greeting sent by the server immediately after accept.
pub(crate) const WELCOME: &str = "QTM RT Interface connected";

/// The only response that makes a SetParameters XML round trip a success.
const SET_PARAMETERS_OK: &str = "Setting parameters succeeded";

const TAKE_CONTROL_OK: [&str; 2] = ["You are now master", "You are already master"];
const RELEASE_CONTROL_OK: [&str; 2] =
    ["You are now a regular client", "You are already a regular client"];

/// Server wording that invites a password retry on `TakeControl`.
pub const WRONG_PASSWORD: &str = "Wrong or missing password";

const NEW_OK: [&str; 2] = ["Creating new connection", "Already connected"];
const CLOSE_OK: [&str; 4] = [
    "Closing connection",
    "Closing file",
    "File closed",
    "No connection to close",
];
const START_OK: [&str; 2] = ["Starting measurement", "Starting RT from file"];
const STOP_OK: [&str; 1] = ["Stopping measurement"];
const TRIG_OK: [&str; 1] = ["Trig ok"];
const EVENT_OK: [&str; 1] = ["Event set"];
const LOAD_OK: [&str; 1] = ["Measurement loaded"];
const SAVE_OK: [&str; 1] = ["Measurement saved"];
const LOAD_PROJECT_OK: [&str; 1] = ["Project loaded"];
const REPROCESS_OK: [&str; 1] = ["Reprocessing file"];
const CALIBRATE_OK: [&str; 1] = ["Starting calibration"];

// =======================================================================
// Command vocabulary types
// =======================================================================

/// Frame delivery rate for `StreamFrames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRate {
    AllFrames,
    /// Fixed frequency in Hz.
    Frequency(u32),
    /// Every Nth captured frame.
    FrequencyDivisor(u32),
}

impl StreamRate {
    fn token(self) -> String {
        match self {
            StreamRate::AllFrames => "AllFrames".to_string(),
            StreamRate::Frequency(hz) => format!("Frequency:{}", hz),
            StreamRate::FrequencyDivisor(n) => format!("FrequencyDivisor:{}", n),
        }
    }

    /// Parse a rate token, case-insensitive, options as strict prefixes.
    pub fn parse(text: &str) -> Result<Self> {
        let (head, arg) = match text.split_once(':') {
            Some((head, arg)) => (head, Some(arg)),
            None => (text, None),
        };
        match (head, arg) {
            (h, None) if h.eq_ignore_ascii_case("allframes") => Ok(StreamRate::AllFrames),
            (h, Some(n)) if h.eq_ignore_ascii_case("frequency") => Ok(StreamRate::Frequency(
                n.parse()
                    .map_err(|_| Error::Contract(format!("bad frequency {:?}", n)))?,
            )),
            (h, Some(n)) if h.eq_ignore_ascii_case("frequencydivisor") => {
                Ok(StreamRate::FrequencyDivisor(n.parse().map_err(|_| {
                    Error::Contract(format!("bad frequency divisor {:?}", n))
                })?))
            }
            _ => Err(Error::Contract(format!("unknown rate token {:?}", text))),
        }
    }
}

/// UDP destination clause of `StreamFrames`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpStreamDest {
    /// Target address; `None` streams back to this client's address.
    pub address: Option<String>,
    pub port: u16,
}

impl UdpStreamDest {
    fn token(&self) -> String {
        match &self.address {
            Some(addr) => format!("UDP:{}:{}", addr, self.port),
            None => format!("UDP:{}", self.port),
        }
    }
}

/// One entry of a component list, with its per-component options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSpec {
    Marker2d,
    Marker2dLin,
    Marker3d,
    Marker3dRes,
    Marker3dNoLabels,
    Marker3dNoLabelsRes,
    Body6d,
    Body6dRes,
    Body6dEuler,
    Body6dEulerRes,
    /// Optional channel selection, 1-based.
    Analog(Option<Vec<u32>>),
    AnalogSingle(Option<Vec<u32>>),
    Force,
    ForceSingle,
    GazeVector,
    EyeTracker,
    Image,
    Timecode,
    Skeleton {
        global: bool,
    },
}

impl ComponentSpec {
    pub fn token(&self) -> String {
        match self {
            ComponentSpec::Marker2d => "2D".to_string(),
            ComponentSpec::Marker2dLin => "2DLin".to_string(),
            ComponentSpec::Marker3d => "3D".to_string(),
            ComponentSpec::Marker3dRes => "3DRes".to_string(),
            ComponentSpec::Marker3dNoLabels => "3DNoLabels".to_string(),
            ComponentSpec::Marker3dNoLabelsRes => "3DNoLabelsRes".to_string(),
            ComponentSpec::Body6d => "6D".to_string(),
            ComponentSpec::Body6dRes => "6DRes".to_string(),
            ComponentSpec::Body6dEuler => "6DEuler".to_string(),
            ComponentSpec::Body6dEulerRes => "6DEulerRes".to_string(),
            ComponentSpec::Analog(channels) => with_channels("Analog", channels.as_deref()),
            ComponentSpec::AnalogSingle(channels) => {
                with_channels("AnalogSingle", channels.as_deref())
            }
            ComponentSpec::Force => "Force".to_string(),
            ComponentSpec::ForceSingle => "ForceSingle".to_string(),
            ComponentSpec::GazeVector => "GazeVector".to_string(),
            ComponentSpec::EyeTracker => "EyeTracker".to_string(),
            ComponentSpec::Image => "Image".to_string(),
            ComponentSpec::Timecode => "Timecode".to_string(),
            ComponentSpec::Skeleton { global: false } => "Skeleton".to_string(),
            ComponentSpec::Skeleton { global: true } => "Skeleton:global".to_string(),
        }
    }

    /// Parse one component token, case-insensitive. Options (`Analog:1,2`,
    /// `Skeleton:global`) are accepted only as strict `name:options`
    /// forms; a token merely containing the name elsewhere is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let (head, options) = match text.split_once(':') {
            Some((head, options)) => (head, Some(options)),
            None => (text, None),
        };
        let bare = |spec: ComponentSpec| match options {
            None => Ok(spec),
            Some(_) => Err(Error::Contract(format!(
                "component {:?} takes no options",
                head
            ))),
        };
        let h = head.to_ascii_lowercase();
        match h.as_str() {
            "2d" => bare(ComponentSpec::Marker2d),
            "2dlin" => bare(ComponentSpec::Marker2dLin),
            "3d" => bare(ComponentSpec::Marker3d),
            "3dres" => bare(ComponentSpec::Marker3dRes),
            "3dnolabels" => bare(ComponentSpec::Marker3dNoLabels),
            "3dnolabelsres" => bare(ComponentSpec::Marker3dNoLabelsRes),
            "6d" => bare(ComponentSpec::Body6d),
            "6dres" => bare(ComponentSpec::Body6dRes),
            "6deuler" => bare(ComponentSpec::Body6dEuler),
            "6deulerres" => bare(ComponentSpec::Body6dEulerRes),
            "analog" => Ok(ComponentSpec::Analog(parse_channels(options)?)),
            "analogsingle" => Ok(ComponentSpec::AnalogSingle(parse_channels(options)?)),
            "force" => bare(ComponentSpec::Force),
            "forcesingle" => bare(ComponentSpec::ForceSingle),
            "gazevector" => bare(ComponentSpec::GazeVector),
            "eyetracker" => bare(ComponentSpec::EyeTracker),
            "image" => bare(ComponentSpec::Image),
            "timecode" => bare(ComponentSpec::Timecode),
            "skeleton" => match options {
                None => Ok(ComponentSpec::Skeleton { global: false }),
                Some(o) if o.eq_ignore_ascii_case("global") => {
                    Ok(ComponentSpec::Skeleton { global: true })
                }
                Some(o) => Err(Error::Contract(format!("unknown skeleton option {:?}", o))),
            },
            _ => Err(Error::Contract(format!("unknown component token {:?}", text))),
        }
    }
}

fn with_channels(name: &str, channels: Option<&[u32]>) -> String {
    match channels {
        None => name.to_string(),
        Some(channels) => {
            let mut out = format!("{}:", name);
            for (i, ch) in channels.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", ch);
            }
            out
        }
    }
}

fn parse_channels(options: Option<&str>) -> Result<Option<Vec<u32>>> {
    match options {
        None => Ok(None),
        Some(list) => list
            .split(',')
            .map(|ch| {
                ch.parse()
                    .map_err(|_| Error::Contract(format!("bad channel {:?}", ch)))
            })
            .collect::<Result<Vec<u32>>>()
            .map(Some),
    }
}

fn component_list(components: &[ComponentSpec]) -> String {
    components
        .iter()
        .map(ComponentSpec::token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Settings blocks addressable by `GetParameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    All,
    General,
    Calibration,
    ThreeD,
    SixD,
    Analog,
    Force,
    Image,
    GazeVector,
    EyeTracker,
    Skeleton,
}

impl ParameterKind {
    fn token(self) -> &'static str {
        match self {
            ParameterKind::All => "All",
            ParameterKind::General => "General",
            ParameterKind::Calibration => "Calibration",
            ParameterKind::ThreeD => "3D",
            ParameterKind::SixD => "6D",
            ParameterKind::Analog => "Analog",
            ParameterKind::Force => "Force",
            ParameterKind::Image => "Image",
            ParameterKind::GazeVector => "GazeVector",
            ParameterKind::EyeTracker => "EyeTracker",
            ParameterKind::Skeleton => "Skeleton",
        }
    }
}

/// Capture file flavors retrievable in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    C3d,
    Qtm,
}

// =======================================================================
// Command surface
// =======================================================================

impl Rt {
    /// Frame and send a command without waiting for any response.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        log::debug!("[rt] send command {:?}", command);
        let pkt = encode_command(command, self.framer.header_order());
        self.transport.send(&pkt)
    }

    /// Send a command and block until the server answers with a Command or
    /// Error packet (events are skipped, data packets ignored).
    pub fn send_command_and_wait(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.send_command(command)?;
        let previous = self.state.connection;
        self.state.connection = ConnectionState::AwaitingCommandResponse;
        let result = self.wait_command_response(timeout);
        self.state.connection = previous;
        result
    }

    fn wait_command_response(&mut self, timeout: Option<Duration>) -> Result<String> {
        loop {
            match self.next_kind(true, timeout)? {
                PacketKind::Command => {
                    return Ok(self.framer.packet().command_str()?.to_string());
                }
                PacketKind::Error => {
                    return Err(Error::Server(self.framer.packet().error_str()?.to_string()));
                }
                other => {
                    log::debug!("[rt] ignoring {:?} packet while awaiting response", other);
                }
            }
        }
    }

    /// Send a command and require the response to start with one of the
    /// known success phrases; anything else is the error message verbatim.
    fn command_expecting(
        &mut self,
        command: &str,
        ok_phrases: &[&str],
        timeout: Duration,
    ) -> Result<String> {
        let response = self.send_command_and_wait(command, Some(timeout))?;
        if ok_phrases.iter().any(|p| response.starts_with(p)) {
            Ok(response)
        } else {
            Err(Error::Server(response))
        }
    }

    /// Send an XML document (SetParameters). Success is exactly the
    /// literal confirmation phrase; any other response text is the error.
    pub fn send_xml(&mut self, xml: &str) -> Result<()> {
        let pkt = encode_xml(xml, self.framer.header_order());
        self.transport.send(&pkt)?;
        let response = self.wait_command_response(Some(COMMAND_TIMEOUT))?;
        if response == SET_PARAMETERS_OK {
            Ok(())
        } else {
            Err(Error::Server(response))
        }
    }

    // ===== Control token =====

    /// Acquire the exclusive control token, optionally with a password.
    /// A `Server` error containing [`WRONG_PASSWORD`] invites a retry.
    pub fn take_control(&mut self, password: Option<&str>) -> Result<()> {
        let command = match password {
            Some(pw) => format!("TakeControl {}", pw),
            None => "TakeControl".to_string(),
        };
        let response = self.send_command_and_wait(&command, Some(COMMAND_TIMEOUT))?;
        if TAKE_CONTROL_OK.contains(&response.as_str()) {
            self.state.master = true;
            Ok(())
        } else {
            Err(Error::Server(response))
        }
    }

    pub fn release_control(&mut self) -> Result<()> {
        let response = self.send_command_and_wait("ReleaseControl", Some(COMMAND_TIMEOUT))?;
        if RELEASE_CONTROL_OK.contains(&response.as_str()) {
            self.state.master = false;
            Ok(())
        } else {
            Err(Error::Server(response))
        }
    }

    // ===== State queries =====

    /// Ask for the current state; the answer arrives as an Event packet.
    pub fn get_state(&mut self, timeout: Option<Duration>) -> Result<Event> {
        self.send_command("GetState")?;
        self.wait_event(timeout)
    }

    /// Ask for the most recent event.
    pub fn get_last_event(&mut self, timeout: Option<Duration>) -> Result<Event> {
        self.send_command("GetLastEvent")?;
        self.wait_event(timeout)
    }

    fn wait_event(&mut self, timeout: Option<Duration>) -> Result<Event> {
        loop {
            match self.next_kind(false, timeout)? {
                PacketKind::Event => return self.framer.packet().event(),
                PacketKind::Error => {
                    return Err(Error::Server(self.framer.packet().error_str()?.to_string()))
                }
                other => {
                    log::debug!("[rt] ignoring {:?} packet while awaiting event", other);
                }
            }
        }
    }

    /// Server application version string, verbatim.
    pub fn qtm_version(&mut self) -> Result<String> {
        self.send_command_and_wait("QTMVersion", Some(COMMAND_TIMEOUT))
    }

    /// Verify a license code; the server answers with an Error packet when
    /// the code does not check out.
    pub fn check_license(&mut self, code: &str) -> Result<()> {
        self.send_command_and_wait(&format!("CheckLicense {}", code), Some(COMMAND_TIMEOUT))?;
        Ok(())
    }

    // ===== Streaming =====

    /// Start streaming frames with the given rate, optional UDP delivery,
    /// and component list. Data packets then arrive via [`Rt::receive`].
    pub fn stream_frames(
        &mut self,
        rate: StreamRate,
        udp: Option<&UdpStreamDest>,
        components: &[ComponentSpec],
    ) -> Result<()> {
        if components.is_empty() {
            return Err(Error::Contract("empty component list".into()));
        }
        let mut command = format!("StreamFrames {}", rate.token());
        if let Some(dest) = udp {
            command.push(' ');
            command.push_str(&dest.token());
        }
        command.push(' ');
        command.push_str(&component_list(components));
        self.send_command(&command)?;
        self.state.connection = ConnectionState::Streaming;
        Ok(())
    }

    /// Stop a running stream.
    pub fn stream_frames_stop(&mut self) -> Result<()> {
        self.send_command("StreamFrames Stop")?;
        if self.state.connection == ConnectionState::Streaming {
            self.state.connection = ConnectionState::Ready;
        }
        Ok(())
    }

    /// Request a single frame; the Data packet arrives via [`Rt::receive`].
    pub fn get_current_frame(&mut self, components: &[ComponentSpec]) -> Result<()> {
        if components.is_empty() {
            return Err(Error::Contract("empty component list".into()));
        }
        self.send_command(&format!("GetCurrentFrame {}", component_list(components)))
    }

    // ===== Measurement control =====

    pub fn new_measurement(&mut self) -> Result<()> {
        self.command_expecting("New", &NEW_OK, COMMAND_TIMEOUT).map(drop)
    }

    pub fn close_measurement(&mut self) -> Result<()> {
        self.command_expecting("Close", &CLOSE_OK, COMMAND_TIMEOUT).map(drop)
    }

    /// Start a capture; `rt_from_file` replays the currently loaded file.
    pub fn start_capture(&mut self, rt_from_file: bool) -> Result<()> {
        let command = if rt_from_file { "Start rtfromfile" } else { "Start" };
        self.command_expecting(command, &START_OK, COMMAND_TIMEOUT).map(drop)
    }

    pub fn stop_capture(&mut self) -> Result<()> {
        self.command_expecting("Stop", &STOP_OK, COMMAND_TIMEOUT).map(drop)
    }

    /// Software trigger (for captures armed to start on trigger).
    pub fn trig(&mut self) -> Result<()> {
        self.command_expecting("Trig", &TRIG_OK, COMMAND_TIMEOUT).map(drop)
    }

    /// Label an event in the running capture. Protocol 1.14 renamed the
    /// command; the session picks the spelling for the negotiated version.
    pub fn set_event(&mut self, label: &str) -> Result<()> {
        let verb = if at_least(self.state.version, min_version::EVENT_COMMAND) {
            "Event"
        } else {
            "SetQTMEvent"
        };
        self.command_expecting(&format!("{} {}", verb, label), &EVENT_OK, COMMAND_TIMEOUT)
            .map(drop)
    }

    pub fn load_file(&mut self, file: &str) -> Result<()> {
        self.command_expecting(&format!("Load \"{}\"", file), &LOAD_OK, COMMAND_TIMEOUT)
            .map(drop)
    }

    pub fn save_file(&mut self, file: &str, overwrite: bool) -> Result<()> {
        let command = if overwrite {
            format!("Save {} Overwrite", file)
        } else {
            format!("Save {}", file)
        };
        self.command_expecting(&command, &SAVE_OK, SAVE_TIMEOUT).map(drop)
    }

    pub fn load_project(&mut self, path: &str) -> Result<()> {
        self.command_expecting(
            &format!("LoadProject {}", path),
            &LOAD_PROJECT_OK,
            COMMAND_TIMEOUT,
        )
        .map(drop)
    }

    pub fn reprocess(&mut self) -> Result<()> {
        self.command_expecting("Reprocess", &REPROCESS_OK, COMMAND_TIMEOUT).map(drop)
    }

    /// Run a calibration (optionally a refine pass) and return the result
    /// XML. QTM waits for the operator, hence the long deadline.
    pub fn calibrate(&mut self, refine: bool) -> Result<String> {
        let command = if refine { "calibrate refine" } else { "calibrate" };
        self.command_expecting(command, &CALIBRATE_OK, COMMAND_TIMEOUT)?;
        self.wait_xml(Some(CALIBRATION_TIMEOUT))
    }

    // ===== Capture file retrieval =====

    /// Fetch the current capture as an in-band file transfer, streaming it
    /// into `sink`. Returns the file size in bytes.
    pub fn get_capture(&mut self, format: CaptureFormat, sink: &mut dyn Write) -> Result<u64> {
        let command = match format {
            CaptureFormat::C3d => "GetCaptureC3D",
            CaptureFormat::Qtm => "GetCaptureQTM",
        };
        self.send_command(command)?;
        loop {
            let kind = self.next_kind_sink(true, Some(CAPTURE_TIMEOUT), Some(&mut *sink))?;
            match kind {
                PacketKind::C3dFile | PacketKind::QtmFile => {
                    let size = self.framer.packet().size();
                    return Ok(u64::from(size) - crate::protocol::HEADER_SIZE as u64);
                }
                PacketKind::Error => {
                    return Err(Error::Server(self.framer.packet().error_str()?.to_string()))
                }
                // Progress chatter ("Sending capture") and stray data.
                other => log::debug!("[rt] ignoring {:?} packet during capture fetch", other),
            }
        }
    }

    // ===== Parameters (XML) =====

    /// Fetch settings XML for the requested blocks.
    pub fn get_parameters(&mut self, kinds: &[ParameterKind]) -> Result<String> {
        if kinds.is_empty() {
            return Err(Error::Contract("empty parameter list".into()));
        }
        let tokens: Vec<&str> = kinds.iter().map(|k| k.token()).collect();
        self.send_command(&format!("GetParameters {}", tokens.join(" ")))?;
        self.wait_xml(Some(COMMAND_TIMEOUT))
    }

    fn wait_xml(&mut self, timeout: Option<Duration>) -> Result<String> {
        loop {
            match self.next_kind(true, timeout)? {
                PacketKind::Xml => return Ok(self.framer.packet().xml_str()?.to_string()),
                PacketKind::Error => {
                    return Err(Error::Server(self.framer.packet().error_str()?.to_string()))
                }
                PacketKind::Command => {
                    // A Command response instead of XML is the server's
                    // refusal; its text is the error.
                    return Err(Error::Server(self.framer.packet().command_str()?.to_string()));
                }
                other => {
                    log::debug!("[rt] ignoring {:?} packet while awaiting XML", other);
                }
            }
        }
    }

    /// Push settings XML (SetParameters round trip).
    pub fn set_parameters(&mut self, xml: &str) -> Result<()> {
        self.send_xml(xml)
    }
}

// ===== Settings convenience (feature-gated XML layer) =====

#[cfg(feature = "settings")]
impl Rt {
    /// Fetch and parse the General settings block.
    pub fn read_general_settings(&mut self) -> Result<crate::settings::GeneralSettings> {
        let xml = self.get_parameters(&[ParameterKind::General])?;
        crate::settings::GeneralSettings::parse(&xml, self.state.version)
    }

    /// Fetch and parse the 3D settings block.
    pub fn read_3d_settings(&mut self) -> Result<crate::settings::Settings3d> {
        let xml = self.get_parameters(&[ParameterKind::ThreeD])?;
        crate::settings::Settings3d::parse(&xml)
    }

    /// Serialize and push the writable General settings.
    pub fn write_general_settings(
        &mut self,
        settings: &crate::settings::GeneralSettings,
    ) -> Result<()> {
        let xml = crate::settings::general_settings_xml(settings)?;
        self.send_xml(&xml)
    }
}
