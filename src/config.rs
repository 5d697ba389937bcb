use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{InjectError, Result};

/// Protocol used when the document does not name one
pub const DEFAULT_PROTOCOL: &str = "mqtt";
/// The only protocol value that switches TLS on
pub const TLS_PROTOCOL: &str = "mqtts";
/// Broker port for plain MQTT
pub const DEFAULT_PORT: u16 = 1883;
/// Broker port for MQTT over TLS
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Parsed `mqtt_config.json`
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
}

/// Station credentials
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

/// Broker connection and last-will settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MqttConfig {
    /// `mqtt` or `mqtts`; anything else is passed through as plain MQTT
    pub protocol: Option<String>,
    pub port: Option<u16>,
    pub broker_domain: String,
    /// Only read when the protocol is `mqtts`
    pub broker_certificate: Option<String>,
    pub lwt_topic: String,
    pub lwt_msg: String,
    pub qos: QosLevel,
    pub retain_flag: RetainFlag,
}

impl MqttConfig {
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)
    }
}

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum QosLevel {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QosLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("qos must be 0, 1 or 2, got {other}")),
        }
    }
}

impl QosLevel {
    pub fn as_int(self) -> i64 {
        self as i64
    }
}

/// Retain flag as written in the document: `true`/`false` or a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RetainFlag {
    Bool(bool),
    Int(i64),
}

impl RetainFlag {
    /// Value handed to the preprocessor, booleans become 0/1
    pub fn as_int(self) -> i64 {
        match self {
            Self::Bool(flag) => i64::from(flag),
            Self::Int(value) => value,
        }
    }
}

impl ProjectConfig {
    /// Read and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_config(path)?;
        Self::from_slice(&bytes, path)
    }

    /// Parse a configuration document already read from `path`
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        let doc: Value =
            serde_json::from_slice(bytes).map_err(|source| InjectError::ConfigMalformed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_value(&doc)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes(), Path::new("<inline>"))
    }

    fn from_value(doc: &Value) -> Result<Self> {
        if !doc.is_object() {
            return Err(InjectError::ConfigInvalid(
                "top-level value must be an object".into(),
            ));
        }
        let config = Self {
            wifi: section(doc, "wifi", WIFI_REQUIRED)?,
            mqtt: section(doc, "mqtt", MQTT_REQUIRED)?,
        };
        debug!(
            "Parsed configuration: ssid '{}', broker '{}'",
            config.wifi.ssid, config.mqtt.broker_domain
        );
        Ok(config)
    }
}

/// Read the whole file before any parsing happens
pub fn read_config(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => InjectError::ConfigMissing {
            path: PathBuf::from(path),
        },
        _ => InjectError::filesystem(path, err),
    })
}

const WIFI_REQUIRED: &[&str] = &["ssid", "password"];
const MQTT_REQUIRED: &[&str] = &["broker_domain", "lwt_topic", "lwt_msg", "qos", "retain_flag"];

/// Deserialize `doc[key]` once every key in `required` is known to be present
fn section<T: DeserializeOwned>(doc: &Value, key: &str, required: &[&str]) -> Result<T> {
    let raw = doc
        .get(key)
        .ok_or_else(|| InjectError::ConfigFieldMissing(key.to_string()))?;
    let fields = raw
        .as_object()
        .ok_or_else(|| InjectError::ConfigInvalid(format!("{key} must be an object")))?;
    if let Some(field) = required.iter().find(|field| !fields.contains_key(**field)) {
        return Err(InjectError::ConfigFieldMissing(format!("{key}.{field}")));
    }
    T::deserialize(raw).map_err(|err| InjectError::ConfigInvalid(format!("{key}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{
        "wifi": {"ssid": "net", "password": "pw"},
        "mqtt": {"protocol": "mqtt", "lwt_topic": "t", "lwt_msg": "m",
                 "qos": 1, "retain_flag": 0, "broker_domain": "host"}
    }"#;

    #[test]
    fn parses_plain_document() {
        let config = ProjectConfig::from_json(PLAIN).unwrap();
        assert_eq!(config.wifi.ssid, "net");
        assert_eq!(config.wifi.password, "pw");
        assert_eq!(config.mqtt.protocol(), "mqtt");
        assert_eq!(config.mqtt.port, None);
        assert_eq!(config.mqtt.qos, QosLevel::AtLeastOnce);
        assert_eq!(config.mqtt.retain_flag, RetainFlag::Int(0));
        assert_eq!(config.mqtt.broker_certificate, None);
    }

    #[test]
    fn protocol_defaults_to_mqtt() {
        let config = ProjectConfig::from_json(
            r#"{"wifi": {"ssid": "a", "password": "b"},
                "mqtt": {"broker_domain": "h", "lwt_topic": "t", "lwt_msg": "m",
                         "qos": 0, "retain_flag": true}}"#,
        )
        .unwrap();
        assert_eq!(config.mqtt.protocol(), DEFAULT_PROTOCOL);
        assert_eq!(config.mqtt.retain_flag.as_int(), 1);
    }

    #[test]
    fn missing_sections_are_reported_by_name() {
        let err = ProjectConfig::from_json(r#"{"wifi": {"ssid": "a", "password": "b"}}"#)
            .unwrap_err();
        assert!(matches!(err, InjectError::ConfigFieldMissing(ref f) if f == "mqtt"));

        let err = ProjectConfig::from_json(r#"{"mqtt": {}}"#).unwrap_err();
        assert!(matches!(err, InjectError::ConfigFieldMissing(ref f) if f == "wifi"));
    }

    #[test]
    fn missing_nested_field_carries_dotted_path() {
        let err = ProjectConfig::from_json(
            r#"{"wifi": {"ssid": "a"}, "mqtt": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, InjectError::ConfigFieldMissing(ref f) if f == "wifi.password"));
    }

    #[test]
    fn every_required_mqtt_field_is_reported_when_absent() {
        for field in MQTT_REQUIRED {
            let mut doc: Value = serde_json::from_str(PLAIN).unwrap();
            doc["mqtt"].as_object_mut().unwrap().remove(*field);
            let err = ProjectConfig::from_value(&doc).unwrap_err();
            let expected = format!("mqtt.{field}");
            assert!(
                matches!(err, InjectError::ConfigFieldMissing(ref f) if *f == expected),
                "{field}: {err:?}"
            );
        }
    }

    #[test]
    fn null_or_mistyped_fields_are_invalid_not_missing() {
        let err = ProjectConfig::from_json(&PLAIN.replace("\"qos\": 1", "\"qos\": null"))
            .unwrap_err();
        assert!(matches!(err, InjectError::ConfigInvalid(ref m) if m.starts_with("mqtt:")));

        let err = ProjectConfig::from_json(r#"{"wifi": "net", "mqtt": {}}"#).unwrap_err();
        assert!(matches!(err, InjectError::ConfigInvalid(ref m) if m == "wifi must be an object"));
    }

    #[test]
    fn qos_out_of_range_is_rejected() {
        let json = PLAIN.replace("\"qos\": 1", "\"qos\": 3");
        let err = ProjectConfig::from_json(&json).unwrap_err();
        match err {
            InjectError::ConfigInvalid(msg) => assert!(msg.contains("qos"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn syntax_error_is_malformed() {
        let err = ProjectConfig::from_json("{\"wifi\": ").unwrap_err();
        assert!(matches!(err, InjectError::ConfigMalformed { .. }));
    }

    #[test]
    fn non_object_document_is_invalid() {
        let err = ProjectConfig::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, InjectError::ConfigInvalid(_)));
    }

    #[test]
    fn missing_file_is_config_missing() {
        let path = std::env::temp_dir().join("mqtt-config-inject-does-not-exist.json");
        let err = ProjectConfig::load(&path).unwrap_err();
        assert!(matches!(err, InjectError::ConfigMissing { .. }));
    }
}
