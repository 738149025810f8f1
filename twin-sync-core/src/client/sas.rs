use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::Sha256;
use twin_sync_error::{update::UpdateError, UpdateResult};

type HmacSha256 = Hmac<Sha256>;

#[inline]
pub fn encode_uri_component(component: &str) -> String {
    utf8_percent_encode(component, NON_ALPHANUMERIC).to_string()
}

/// Resource URI of a device's own update channel.
#[inline]
pub fn device_resource_uri(host: &str, device_id: &str) -> String {
    format!("{host}/devices/{device_id}")
}

/// Build a shared-access signature for `resource_uri`, valid until
/// `expiry_unix` (seconds since epoch).
///
/// The signature is HMAC-SHA256 over `{url-encoded resource}\n{expiry}` with
/// the base64-decoded key. Registry-scoped tokens carry the policy name via
/// `skn`; device-scoped tokens must not.
pub fn generate_sas_token(
    resource_uri: &str,
    key_base64: &str,
    policy_name: Option<&str>,
    expiry_unix: i64,
) -> UpdateResult<String> {
    let key = BASE64
        .decode(key_base64)
        .map_err(|_| UpdateError::Credential {
            reason: "shared access key is not valid base64".to_string(),
        })?;

    let encoded_resource = encode_uri_component(resource_uri);
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|e| UpdateError::Credential {
        reason: e.to_string(),
    })?;
    mac.update(format!("{encoded_resource}\n{expiry_unix}").as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let mut token = format!(
        "SharedAccessSignature sr={encoded_resource}&sig={}&se={expiry_unix}",
        encode_uri_component(&signature)
    );
    if let Some(policy) = policy_name {
        token.push_str("&skn=");
        token.push_str(policy);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "c2VjcmV0LWtleQ==";
    const EXPIRY: i64 = 1_700_000_000;

    #[test]
    fn token_layout() {
        let token =
            generate_sas_token("hub.example.net/devices/dev-1", KEY, None, EXPIRY).unwrap();
        assert!(token.starts_with("SharedAccessSignature sr=hub%2Eexample%2Enet%2Fdevices%2Fdev%2D1&sig="));
        assert!(token.contains(&format!("&se={EXPIRY}")));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_sas_token("hub.example.net", KEY, Some("service"), EXPIRY).unwrap();
        let b = generate_sas_token("hub.example.net", KEY, Some("service"), EXPIRY).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn registry_tokens_carry_the_policy_name() {
        let registry = generate_sas_token("hub.example.net", KEY, Some("service"), EXPIRY).unwrap();
        assert!(registry.ends_with("&skn=service"));

        let device =
            generate_sas_token("hub.example.net/devices/dev-1", KEY, None, EXPIRY).unwrap();
        assert!(!device.contains("skn="));
    }

    #[test]
    fn different_keys_sign_differently() {
        let a = generate_sas_token("hub.example.net", KEY, None, EXPIRY).unwrap();
        let b = generate_sas_token("hub.example.net", "b3RoZXIta2V5", None, EXPIRY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(matches!(
            generate_sas_token("hub.example.net", "not base64 !!!", None, EXPIRY),
            Err(UpdateError::Credential { .. })
        ));
    }
}
