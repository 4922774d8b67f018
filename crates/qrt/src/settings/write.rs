// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parameter XML serialization for SetParameters round trips.
//!
//! roxmltree is read-only, so the writable subset is emitted by hand the
//! way the server expects it: a `<QTM_Settings>` root wrapping the block.

use std::fmt::Write;

use super::{GeneralSettings, SyncOutMode, SyncOutSettings};
use crate::error::{Error, Result};

fn bool_text(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}

/// Serialize the writable General settings.
pub fn general_settings_xml(settings: &GeneralSettings) -> Result<String> {
    let mut xml = String::new();
    xml.push_str("<QTM_Settings>\n  <General>\n");
    let _ = writeln!(
        xml,
        "    <Frequency>{}</Frequency>",
        settings.capture_frequency
    );
    let _ = writeln!(
        xml,
        "    <Capture_Time>{}</Capture_Time>",
        settings.capture_time
    );
    let _ = writeln!(
        xml,
        "    <Start_On_External_Trigger>{}</Start_On_External_Trigger>",
        bool_text(settings.start_on_external_trigger)
    );
    // Gated trigger flags are written only when the caller carries them
    // (i.e. the session negotiated 1.14+ when reading).
    for (name, value) in [
        ("Start_On_Trigger_NO", settings.start_on_trigger_no),
        ("Start_On_Trigger_NC", settings.start_on_trigger_nc),
        (
            "Start_On_Trigger_Software",
            settings.start_on_trigger_software,
        ),
    ] {
        if let Some(value) = value {
            let _ = writeln!(xml, "    <{0}>{1}</{0}>", name, bool_text(value));
        }
    }
    xml.push_str("  </General>\n</QTM_Settings>\n");
    Ok(xml)
}

/// Serialize a sync-out configuration for one camera port.
///
/// # Errors
/// `Contract` for a port outside 1-3, or a port-3 mode other than the
/// fixed 100 Hz signal that port emits.
pub fn sync_out_xml(settings: &SyncOutSettings) -> Result<String> {
    match settings.port {
        1 | 2 => {}
        3 => {
            if settings.mode != SyncOutMode::Fixed100Hz {
                return Err(Error::Contract(format!(
                    "sync-out port 3 only emits {:?}",
                    SyncOutMode::Fixed100Hz
                )));
            }
        }
        other => {
            return Err(Error::Contract(format!(
                "sync-out port {} out of range (1-3)",
                other
            )))
        }
    }

    let mut xml = String::new();
    xml.push_str("<QTM_Settings>\n  <General>\n");
    let _ = writeln!(xml, "    <Camera>");
    let _ = writeln!(xml, "      <ID>{}</ID>", settings.camera_id);
    let _ = writeln!(xml, "      <Sync_Out port=\"{}\">", settings.port);
    let _ = writeln!(xml, "        <Mode>{}</Mode>", settings.mode.token());
    if matches!(
        settings.mode,
        SyncOutMode::Multiplier | SyncOutMode::Divisor | SyncOutMode::IndependentFreq
    ) {
        let _ = writeln!(xml, "        <Value>{}</Value>", settings.value);
        let _ = writeln!(
            xml,
            "        <Duty_Cycle>{}</Duty_Cycle>",
            settings.duty_cycle
        );
    }
    let _ = writeln!(
        xml,
        "        <Signal_Polarity>{}</Signal_Polarity>",
        if settings.negative_polarity {
            "Negative"
        } else {
            "Positive"
        }
    );
    let _ = writeln!(xml, "      </Sync_Out>");
    let _ = writeln!(xml, "    </Camera>");
    xml.push_str("  </General>\n</QTM_Settings>\n");
    Ok(xml)
}
