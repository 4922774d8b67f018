// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parameter XML parsing via roxmltree.
//!
//! Required fields that are absent are a parse failure; fields gated
//! behind a newer minor version fall back to defaults when the negotiated
//! protocol predates them.

use roxmltree::{Document, Node};

use super::{CameraSettings, GeneralSettings, Label3d, Settings3d};
use crate::error::{Error, Result};
use crate::protocol::{at_least, min_version};

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn required_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    child_text(node, name)
        .ok_or_else(|| Error::Protocol(format!("settings XML missing <{}>", name)))
}

fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        other => Err(Error::Protocol(format!("bad boolean {:?}", other))),
    }
}

fn parse_num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::Protocol(format!("bad {} value {:?}", what, text)))
}

/// Locate the named settings block anywhere under the parameters root
/// (the root element name carries the protocol version, so match by
/// block name instead).
fn find_block<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Result<Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .ok_or_else(|| Error::Protocol(format!("settings XML missing <{}> block", name)))
}

impl GeneralSettings {
    /// Parse a General parameters document for the negotiated `version`.
    pub fn parse(xml: &str, version: (u32, u32)) -> Result<Self> {
        let doc = Document::parse(xml)
            .map_err(|e| Error::Protocol(format!("settings XML: {}", e)))?;
        let general = find_block(&doc, "General")?;

        let capture_frequency = parse_num(required_text(general, "Frequency")?, "frequency")?;
        let capture_time = parse_num(required_text(general, "Capture_Time")?, "capture time")?;
        let start_on_external_trigger =
            parse_bool(required_text(general, "Start_On_External_Trigger")?)?;

        // Edge/software trigger flags arrived in 1.14.
        let trigger_gated = at_least(version, min_version::TRIGGER_EDGE_SETTINGS);
        let gated_bool = |name: &str| -> Result<Option<bool>> {
            if !trigger_gated {
                return Ok(None);
            }
            Ok(Some(parse_bool(required_text(general, name)?)?))
        };
        let start_on_trigger_no = gated_bool("Start_On_Trigger_NO")?;
        let start_on_trigger_nc = gated_bool("Start_On_Trigger_NC")?;
        let start_on_trigger_software = gated_bool("Start_On_Trigger_Software")?;

        let mut cameras = Vec::new();
        for camera in general
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Camera")
        {
            cameras.push(CameraSettings {
                id: parse_num(required_text(camera, "ID")?, "camera id")?,
                model: required_text(camera, "Model")?.to_string(),
                serial: parse_num(required_text(camera, "Serial")?, "camera serial")?,
            });
        }

        Ok(GeneralSettings {
            capture_frequency,
            capture_time,
            start_on_external_trigger,
            start_on_trigger_no,
            start_on_trigger_nc,
            start_on_trigger_software,
            cameras,
        })
    }
}

impl Settings3d {
    /// Parse a 3D parameters document.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)
            .map_err(|e| Error::Protocol(format!("settings XML: {}", e)))?;
        let block = find_block(&doc, "The_3D")?;

        let axis_upwards = required_text(block, "AxisUpwards")?.to_string();
        let mut labels = Vec::new();
        for label in block
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Label")
        {
            let color = match child_text(label, "RGBColor") {
                Some(text) => Some(parse_num(text, "label color")?),
                None => None,
            };
            labels.push(Label3d {
                name: required_text(label, "Name")?.to_string(),
                color,
            });
        }
        Ok(Settings3d {
            axis_upwards,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERAL_119: &str = r#"
        <QTM_Parameters_Ver_1.19>
          <General>
            <Frequency>240</Frequency>
            <Capture_Time>10.5</Capture_Time>
            <Start_On_External_Trigger>true</Start_On_External_Trigger>
            <Start_On_Trigger_NO>false</Start_On_Trigger_NO>
            <Start_On_Trigger_NC>true</Start_On_Trigger_NC>
            <Start_On_Trigger_Software>false</Start_On_Trigger_Software>
            <Camera>
              <ID>1</ID>
              <Model>Oqus 700+</Model>
              <Serial>10342</Serial>
            </Camera>
            <Camera>
              <ID>2</ID>
              <Model>Miqus M3</Model>
              <Serial>20881</Serial>
            </Camera>
          </General>
        </QTM_Parameters_Ver_1.19>"#;

    #[test]
    fn general_full_parse() {
        let s = GeneralSettings::parse(GENERAL_119, (1, 19)).unwrap();
        assert_eq!(s.capture_frequency, 240);
        assert_eq!(s.capture_time, 10.5);
        assert!(s.start_on_external_trigger);
        assert_eq!(s.start_on_trigger_nc, Some(true));
        assert_eq!(s.cameras.len(), 2);
        assert_eq!(s.cameras[1].model, "Miqus M3");
        assert_eq!(s.cameras[1].serial, 20881);
    }

    #[test]
    fn general_pre_114_skips_gated_fields() {
        let xml = r#"
            <QTM_Parameters_Ver_1.13>
              <General>
                <Frequency>100</Frequency>
                <Capture_Time>5</Capture_Time>
                <Start_On_External_Trigger>false</Start_On_External_Trigger>
              </General>
            </QTM_Parameters_Ver_1.13>"#;
        let s = GeneralSettings::parse(xml, (1, 13)).unwrap();
        assert_eq!(s.start_on_trigger_no, None);
        assert_eq!(s.start_on_trigger_software, None);
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let xml = r#"
            <QTM_Parameters_Ver_1.19>
              <General>
                <Capture_Time>5</Capture_Time>
                <Start_On_External_Trigger>false</Start_On_External_Trigger>
              </General>
            </QTM_Parameters_Ver_1.19>"#;
        let err = GeneralSettings::parse(xml, (1, 19)).unwrap_err();
        assert!(err.to_string().contains("Frequency"));
    }

    #[test]
    fn missing_gated_field_at_gated_version_is_error() {
        // At 1.14+ the trigger flags are required, not optional.
        let xml = r#"
            <QTM_Parameters_Ver_1.19>
              <General>
                <Frequency>100</Frequency>
                <Capture_Time>5</Capture_Time>
                <Start_On_External_Trigger>false</Start_On_External_Trigger>
              </General>
            </QTM_Parameters_Ver_1.19>"#;
        assert!(GeneralSettings::parse(xml, (1, 19)).is_err());
    }

    #[test]
    fn three_d_labels() {
        let xml = r#"
            <QTM_Parameters_Ver_1.19>
              <The_3D>
                <AxisUpwards>+Z</AxisUpwards>
                <Label><Name>HeadTop</Name><RGBColor>65280</RGBColor></Label>
                <Label><Name>SpineC7</Name></Label>
              </The_3D>
            </QTM_Parameters_Ver_1.19>"#;
        let s = Settings3d::parse(xml).unwrap();
        assert_eq!(s.axis_upwards, "+Z");
        assert_eq!(s.labels.len(), 2);
        assert_eq!(s.labels[0].color, Some(65280));
        assert_eq!(s.labels[1].name, "SpineC7");
        assert_eq!(s.labels[1].color, None);
    }

    #[test]
    fn malformed_xml_is_protocol_error() {
        assert!(matches!(
            GeneralSettings::parse("<General><Frequency>", (1, 19)),
            Err(Error::Protocol(_))
        ));
    }
}
