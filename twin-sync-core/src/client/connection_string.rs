use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::{fmt, str::FromStr};
use twin_sync_error::conn::ConnectionStringError;

/// Parsed store connection string:
/// `HostName=…;SharedAccessKeyName=…;SharedAccessKey=…`.
///
/// Parsing is the only constructor, so a value of this type always carries a
/// complete triple with a base64-decodable key.
#[derive(Clone, PartialEq, Eq)]
pub struct HubConnectionString {
    host_name: String,
    shared_access_key_name: String,
    shared_access_key: String,
}

impl HubConnectionString {
    /// Store host, e.g. `my-hub.example.net`.
    #[inline]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Shared access policy name used for registry-scoped tokens.
    #[inline]
    pub fn key_name(&self) -> &str {
        &self.shared_access_key_name
    }

    /// Base64-encoded shared access key. Callers must not log the return
    /// value.
    #[inline]
    pub fn key(&self) -> &str {
        &self.shared_access_key
    }
}

impl FromStr for HubConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for segment in trimmed.split(';').filter(|segment| !segment.is_empty()) {
            let (field, value) =
                segment
                    .split_once('=')
                    .ok_or_else(|| ConnectionStringError::MalformedSegment {
                        segment: segment.to_string(),
                    })?;
            match field {
                "HostName" => host_name = Some(value.to_string()),
                "SharedAccessKeyName" => key_name = Some(value.to_string()),
                "SharedAccessKey" => key = Some(value.to_string()),
                // Other segments (gateway host etc.) are not ours to reject
                _ => {}
            }
        }

        let host_name = host_name
            .filter(|v| !v.is_empty())
            .ok_or(ConnectionStringError::MissingField("HostName"))?;
        let shared_access_key_name = key_name
            .filter(|v| !v.is_empty())
            .ok_or(ConnectionStringError::MissingField("SharedAccessKeyName"))?;
        let shared_access_key = key
            .filter(|v| !v.is_empty())
            .ok_or(ConnectionStringError::MissingField("SharedAccessKey"))?;

        if BASE64.decode(&shared_access_key).is_err() {
            return Err(ConnectionStringError::InvalidKey);
        }

        Ok(Self {
            host_name,
            shared_access_key_name,
            shared_access_key,
        })
    }
}

impl fmt::Debug for HubConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConnectionString")
            .field("host_name", &self.host_name)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str =
        "HostName=hub.example.net;SharedAccessKeyName=service;SharedAccessKey=c2VjcmV0LWtleQ==";

    #[test]
    fn parses_a_well_formed_string() {
        let parsed: HubConnectionString = WELL_FORMED.parse().unwrap();
        assert_eq!(parsed.host_name(), "hub.example.net");
        assert_eq!(parsed.key_name(), "service");
        assert_eq!(parsed.key(), "c2VjcmV0LWtleQ==");
    }

    #[test]
    fn tolerates_unknown_segments_and_trailing_separator() {
        let parsed: HubConnectionString =
            format!("{WELL_FORMED};GatewayHostName=edge.local;").parse().unwrap();
        assert_eq!(parsed.host_name(), "hub.example.net");
    }

    #[test]
    fn key_value_may_contain_equals_padding() {
        let parsed: HubConnectionString = WELL_FORMED.parse().unwrap();
        assert!(parsed.key().ends_with("=="));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            "   ".parse::<HubConnectionString>().unwrap_err(),
            ConnectionStringError::Empty
        );
    }

    #[test]
    fn missing_fields_are_named() {
        let err = "HostName=hub.example.net"
            .parse::<HubConnectionString>()
            .unwrap_err();
        assert_eq!(
            err,
            ConnectionStringError::MissingField("SharedAccessKeyName")
        );
    }

    #[test]
    fn malformed_segments_are_rejected() {
        let err = "HostName=hub;garbage"
            .parse::<HubConnectionString>()
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionStringError::MalformedSegment { segment } if segment == "garbage"
        ));
    }

    #[test]
    fn non_base64_keys_are_rejected() {
        let err = "HostName=hub;SharedAccessKeyName=service;SharedAccessKey=!!!"
            .parse::<HubConnectionString>()
            .unwrap_err();
        assert_eq!(err, ConnectionStringError::InvalidKey);
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let parsed: HubConnectionString = WELL_FORMED.parse().unwrap();
        let rendered = format!("{parsed:?}");
        assert!(!rendered.contains("c2VjcmV0"));
        assert!(rendered.contains("<redacted>"));
    }
}
