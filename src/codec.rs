use serde::{Deserialize, Serialize};

use crate::types::{Credentials, RawReading};

/// Event name used for motion readings.
pub const DEFAULT_EVENT_ID: &str = "sensorData";
/// Username devices present when authenticating with a token.
pub const DEVICE_TOKEN_USERNAME: &str = "use-token-auth";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InboundPayload {
    Envelope { d: RawReading },
    Flat(RawReading),
}

/// Decode an inbound payload, either `{"ax": ..}` or the `{"d": {"ax": ..}}` event envelope.
pub fn decode_reading(payload: &[u8]) -> Result<RawReading, CodecError> {
    let payload_str = std::str::from_utf8(payload)?;

    let reading = match serde_json::from_str::<InboundPayload>(payload_str) {
        Ok(InboundPayload::Envelope { d }) => d,
        Ok(InboundPayload::Flat(reading)) => reading,
        // untagged 的错误信息不够具体，重新按扁平结构解析一次拿到原始错误
        Err(_) => serde_json::from_str::<RawReading>(payload_str)?,
    };
    Ok(reading)
}

/// A reading produced on the device side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceReading {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub oa: f64,
    pub ob: f64,
    pub og: f64,
}

#[derive(Serialize)]
struct FormattedReading {
    ax: String,
    ay: String,
    az: String,
    oa: String,
    ob: String,
    og: String,
}

#[derive(Serialize)]
struct OutboundEvent {
    d: FormattedReading,
}

fn two_decimals(value: f64) -> String {
    format!("{:.2}", value)
}

/// Encode a device reading as `{"d":{"ax":"0.00",...}}`.
pub fn encode_event(reading: &DeviceReading) -> Result<Vec<u8>, CodecError> {
    let event = OutboundEvent {
        d: FormattedReading {
            ax: two_decimals(reading.ax),
            ay: two_decimals(reading.ay),
            az: two_decimals(reading.az),
            oa: two_decimals(reading.oa),
            ob: two_decimals(reading.ob),
            og: two_decimals(reading.og),
        },
    };
    Ok(serde_json::to_vec(&event)?)
}

/// Topic a device publishes its own events on.
pub fn device_event_topic(event_id: &str) -> String {
    format!("iot-2/evt/{}/fmt/json", event_id)
}

/// Topic an application subscribes to for one device's events. `+` is a wildcard.
pub fn application_event_topic(device_type: &str, device_id: &str, event_id: &str) -> String {
    format!("iot-2/type/{}/id/{}/evt/{}/fmt/json", device_type, device_id, event_id)
}

pub fn device_client_id(creds: &Credentials) -> String {
    format!("d:{}:{}:{}", creds.org, creds.device_type, creds.device_id)
}

pub fn application_client_id(org: &str, app_id: &str) -> String {
    format!("a:{}:{}", org, app_id)
}

/// Broker host for an organization.
pub fn broker_host(org: &str, domain: &str) -> String {
    format!("{}.messaging.{}", org, domain)
}
