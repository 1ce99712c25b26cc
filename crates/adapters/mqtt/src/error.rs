//! MQTT adapter error types.

use megabridge_domain::error::{BridgeError, ConfigError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker URL could not be parsed.
    #[error("invalid broker url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into the workspace error: URL problems are configuration
    /// errors, everything else is connectivity.
    #[must_use]
    pub fn into_domain(self) -> BridgeError {
        match self {
            Self::InvalidUrl { url, reason } => ConfigError::InvalidBrokerUrl { url, reason }.into(),
            other => BridgeError::Connectivity(Box::new(other)),
        }
    }
}

impl From<MqttError> for BridgeError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_invalid_url() {
        let err = MqttError::InvalidUrl {
            url: "broker".to_string(),
            reason: "not a valid URL",
        };
        assert_eq!(err.to_string(), r#"invalid broker url "broker": not a valid URL"#);
    }

    #[test]
    fn should_convert_invalid_url_to_config_error() {
        let err: BridgeError = MqttError::InvalidUrl {
            url: "broker".to_string(),
            reason: "not a valid URL",
        }
        .into();
        assert!(matches!(
            err,
            BridgeError::Config(ConfigError::InvalidBrokerUrl { .. })
        ));
    }

    #[test]
    fn should_convert_client_error_to_connectivity() {
        let request = rumqttc::Request::Disconnect(rumqttc::Disconnect);
        let err: BridgeError = MqttError::Client(rumqttc::ClientError::Request(request)).into();
        assert!(matches!(err, BridgeError::Connectivity(_)));
    }
}
