use log::{debug, info};

use crate::config::{ProjectConfig, DEFAULT_PORT, DEFAULT_TLS_PORT, TLS_PROTOCOL};
use crate::define::Define;
use crate::error::{InjectError, Result};

/// Marker telling the firmware headers that overrides were injected
pub const MARKER: &str = "PIO_ADVANCED_SCRIPTING";

pub const WIFI_SSID: &str = "WIFI_SSID_OVERRIDE";
pub const WIFI_PW: &str = "WIFI_PW_OVERRIDE";
pub const MQTT_LWT_TOPIC: &str = "MQTT_LWT_TOPIC_OVERRIDE";
pub const MQTT_LWT_MSG: &str = "MQTT_LWT_MSG_OVERRIDE";
pub const MQTT_QOS: &str = "MQTT_QOS_OVERRIDE";
pub const MQTT_RETAIN_FLAG: &str = "MQTT_RETAIN_FLAG_OVERRIDE";
pub const MQTT_BROKER_FULL_URI: &str = "MQTT_BROKER_FULL_URI_OVERRIDE";
pub const MQTT_USE_SSL: &str = "MQTT_USE_SSL_OVERRIDE";
pub const MQTT_BROKER_CERTIFICATE: &str = "MQTT_BROKER_CERTIFICATE_OVERRIDE";

/// Connection parameters derived from a [`ProjectConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub lwt_topic: String,
    pub lwt_msg: String,
    pub qos: i64,
    pub retain_flag: i64,
    pub protocol: String,
    pub port: u16,
    pub broker_uri: String,
    pub use_ssl: bool,
    /// Empty when TLS is off
    pub certificate: String,
}

/// Derive the connection parameters.
///
/// The port is resolved against the plain default first and only falls
/// back to the TLS default when the protocol is `mqtts`, so an explicit
/// port always wins.
pub fn resolve(config: &ProjectConfig) -> Result<ConnectionParams> {
    let mqtt = &config.mqtt;
    let protocol = mqtt.protocol();
    let mut port = mqtt.port.unwrap_or(DEFAULT_PORT);
    let mut certificate = String::new();

    let use_ssl = protocol == TLS_PROTOCOL;
    if use_ssl {
        port = mqtt.port.unwrap_or(DEFAULT_TLS_PORT);
        certificate = match mqtt.broker_certificate.as_deref() {
            Some(cert) if !cert.is_empty() => cert.to_string(),
            _ => {
                return Err(InjectError::ConfigFieldMissing(
                    "mqtt.broker_certificate".into(),
                ))
            }
        };
    }

    let broker_uri = format!("{}://{}:{}", protocol, mqtt.broker_domain, port);
    info!("Broker: {} (TLS {})", broker_uri, if use_ssl { "on" } else { "off" });

    Ok(ConnectionParams {
        wifi_ssid: config.wifi.ssid.clone(),
        wifi_password: config.wifi.password.clone(),
        lwt_topic: mqtt.lwt_topic.clone(),
        lwt_msg: mqtt.lwt_msg.clone(),
        qos: mqtt.qos.as_int(),
        retain_flag: mqtt.retain_flag.as_int(),
        protocol: protocol.to_string(),
        port,
        broker_uri,
        use_ssl,
        certificate,
    })
}

impl ConnectionParams {
    /// Preprocessor definitions in emission order, marker first
    pub fn to_defines(&self) -> Vec<Define> {
        let defines = vec![
            Define::flag(MARKER),
            Define::string(WIFI_SSID, self.wifi_ssid.as_str()),
            Define::string(WIFI_PW, self.wifi_password.as_str()),
            Define::string(MQTT_LWT_TOPIC, self.lwt_topic.as_str()),
            Define::string(MQTT_LWT_MSG, self.lwt_msg.as_str()),
            Define::int(MQTT_QOS, self.qos),
            Define::int(MQTT_RETAIN_FLAG, self.retain_flag),
            Define::string(MQTT_BROKER_FULL_URI, self.broker_uri.as_str()),
            Define::int(MQTT_USE_SSL, i64::from(self.use_ssl)),
            Define::string(MQTT_BROKER_CERTIFICATE, self.certificate.as_str()),
        ];
        debug!("Derived {} definitions", defines.len());
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define::DefineValue;

    fn plain() -> ProjectConfig {
        ProjectConfig::from_json(
            r#"{"wifi":{"ssid":"net","password":"pw"},"mqtt":{"protocol":"mqtt","lwt_topic":"t","lwt_msg":"m","qos":1,"retain_flag":0,"broker_domain":"host"}}"#,
        )
        .unwrap()
    }

    fn value_of<'a>(defines: &'a [Define], name: &str) -> &'a DefineValue {
        &defines
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("{name} not emitted"))
            .value
    }

    #[test]
    fn plain_mqtt_uses_default_port_and_no_certificate() {
        let params = resolve(&plain()).unwrap();
        assert!(!params.use_ssl);
        assert_eq!(params.port, 1883);
        assert_eq!(params.broker_uri, "mqtt://host:1883");
        assert_eq!(params.certificate, "");

        let defines = params.to_defines();
        assert_eq!(value_of(&defines, MQTT_USE_SSL), &DefineValue::Int(0));
        assert_eq!(
            value_of(&defines, MQTT_BROKER_CERTIFICATE),
            &DefineValue::Str(String::new())
        );
        assert_eq!(
            value_of(&defines, MQTT_BROKER_FULL_URI),
            &DefineValue::Str("mqtt://host:1883".into())
        );
    }

    #[test]
    fn tls_with_explicit_port_keeps_it() {
        let mut config = plain();
        config.mqtt.protocol = Some("mqtts".into());
        config.mqtt.broker_certificate = Some("CERTDATA".into());
        config.mqtt.port = Some(8884);

        let params = resolve(&config).unwrap();
        assert!(params.use_ssl);
        assert_eq!(params.broker_uri, "mqtts://host:8884");
        assert_eq!(params.certificate, "CERTDATA");

        let defines = params.to_defines();
        assert_eq!(value_of(&defines, MQTT_USE_SSL), &DefineValue::Int(1));
        assert_eq!(
            value_of(&defines, MQTT_BROKER_CERTIFICATE),
            &DefineValue::Str("CERTDATA".into())
        );
    }

    #[test]
    fn tls_without_port_defaults_to_8883() {
        let mut config = plain();
        config.mqtt.protocol = Some("mqtts".into());
        config.mqtt.broker_certificate = Some("CERT".into());

        let params = resolve(&config).unwrap();
        assert_eq!(params.port, 8883);
        assert_eq!(params.broker_uri, "mqtts://host:8883");
    }

    #[test]
    fn explicit_port_without_tls_is_respected() {
        let mut config = plain();
        config.mqtt.port = Some(1884);
        assert_eq!(resolve(&config).unwrap().broker_uri, "mqtt://host:1884");
    }

    #[test]
    fn certificate_is_ignored_without_tls() {
        let mut config = plain();
        config.mqtt.broker_certificate = Some("unused".into());
        assert_eq!(resolve(&config).unwrap().certificate, "");
    }

    #[test]
    fn tls_without_certificate_fails() {
        let mut config = plain();
        config.mqtt.protocol = Some("mqtts".into());
        let err = resolve(&config).unwrap_err();
        assert!(
            matches!(err, InjectError::ConfigFieldMissing(ref f) if f == "mqtt.broker_certificate")
        );

        config.mqtt.broker_certificate = Some(String::new());
        assert!(resolve(&config).is_err());
    }

    #[test]
    fn protocol_match_is_exact() {
        let mut config = plain();
        config.mqtt.protocol = Some("MQTTS".into());
        let params = resolve(&config).unwrap();
        assert!(!params.use_ssl);
        assert_eq!(params.broker_uri, "MQTTS://host:1883");
    }

    #[test]
    fn defines_are_emitted_in_fixed_order() {
        let names: Vec<_> = resolve(&plain())
            .unwrap()
            .to_defines()
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            [
                MARKER,
                WIFI_SSID,
                WIFI_PW,
                MQTT_LWT_TOPIC,
                MQTT_LWT_MSG,
                MQTT_QOS,
                MQTT_RETAIN_FLAG,
                MQTT_BROKER_FULL_URI,
                MQTT_USE_SSL,
                MQTT_BROKER_CERTIFICATE,
            ]
        );
    }

    #[test]
    fn retain_flag_bool_becomes_integer() {
        let mut config = plain();
        config.mqtt.retain_flag = crate::config::RetainFlag::Bool(true);
        let defines = resolve(&config).unwrap().to_defines();
        assert_eq!(value_of(&defines, MQTT_RETAIN_FLAG), &DefineValue::Int(1));
        assert_eq!(value_of(&defines, MQTT_QOS), &DefineValue::Int(1));
    }
}
