
use std::time::{Duration, SystemTime};

use sha2::Sha256;
use hmac::{Hmac, Mac};

use lambda_http::Request;
use anyhow::{Context, Result, bail};
use cores::error::SwishError;
use tracing::warn;

use crate::runtime_context::SlashCommandConfig;
use crate::slack_requests::SlashCommandPayload;

type HmacSha256 = Hmac<Sha256>;

const MAX_REQUEST_AGE: Duration = Duration::from_secs(5 * 60);

/// Checks the verification token Slack sends with every slash command and,
/// when a signing secret is configured, the request signature as well.
pub fn verify_slack_request(
    request: &Request,
    payload: Option<&SlashCommandPayload>,
    config: &SlashCommandConfig,
) -> Result<(), SwishError> {
    verify_token(payload, &config.slack_token)?;
    if let Some(signing_secret) = &config.signing_secret {
        verify_slack_signature(request, signing_secret, SystemTime::now()).map_err(|error| {
            warn!("slack signature verification failed {:?}", error);
            SwishError::Authentication
        })?;
    }
    Ok(())
}

fn verify_token(payload: Option<&SlashCommandPayload>, expected: &str) -> Result<(), SwishError> {
    let token = payload.and_then(|payload| payload.token.as_deref());
    match token {
        Some(token) if token == expected => Ok(()),
        _ => Err(SwishError::Authentication),
    }
}

// https://api.slack.com/authentication/verifying-requests-from-slack
fn verify_slack_signature(request: &Request, signing_secret: &str, now: SystemTime) -> Result<()> {
    let headers = request.headers();
    let body: &[u8] = request.body().as_ref();
    let slack_signature = headers.get("X-Slack-Signature")
        .context("X-Slack-Signature is empty")?
        .to_str()?;
    let slack_timestamp = headers.get("X-Slack-Request-Timestamp")
        .context("X-Slack-Request-Timestamp is empty")?
        .to_str()?;
    let slack_timestamp_secs: u64 = slack_timestamp.parse()?;
    let now = now.duration_since(SystemTime::UNIX_EPOCH)?;
    if now.as_secs().abs_diff(slack_timestamp_secs) > MAX_REQUEST_AGE.as_secs() {
        bail!("The request timestamp is more than five minutes from local time");
    }
    if verify_signature(signing_secret, slack_timestamp, body, slack_signature)? {
        Ok(())
    } else {
        bail!("verification failed")
    }
}

// https://api.slack.com/authentication/verifying-requests-from-slack#making__validating-a-request
fn verify_signature(signing_secret: &str, timestamp: &str, body: &[u8], signature_actual: &str) -> Result<bool> {
    let Some(signature_hex) = signature_actual.strip_prefix("v0=") else {
        return Ok(false);
    };
    let Ok(signature_actual) = hex::decode(signature_hex) else {
        return Ok(false);
    };
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_secret.as_bytes())?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac.verify_slice(&signature_actual).is_ok())
}

#[cfg(test)]
pub(crate) fn sign(signing_secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_secret.as_bytes()).unwrap();
    mac.update(["v0", timestamp, body].join(":").as_bytes());
    ["v0=", hex::encode(mac.finalize().into_bytes()).as_str()].join("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cores::token::CipherKey;
    use lambda_http::Body;

    const BODY: &str = "token=secret&text=0701234567+50+coffee";

    fn config(signing_secret: Option<&str>) -> SlashCommandConfig {
        SlashCommandConfig {
            slack_token: "secret".into(),
            signing_secret: signing_secret.map(String::from),
            cipher_key: CipherKey::from_bytes([7; 32]),
            image_function_url: "https://img.example".into(),
        }
    }

    fn payload(token: Option<&str>) -> SlashCommandPayload {
        SlashCommandPayload {
            token: token.map(String::from),
            ..Default::default()
        }
    }

    fn signed_request(timestamp: &str, signature: &str) -> Request {
        lambda_http::http::Request::builder()
            .method("POST")
            .header("X-Slack-Request-Timestamp", timestamp)
            .header("X-Slack-Signature", signature)
            .body(Body::from(BODY))
            .unwrap()
    }

    fn unix(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn accepts_matching_token() {
        let request = Request::default();
        let result = verify_slack_request(&request, Some(&payload(Some("secret"))), &config(None));
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong_token() {
        let request = Request::default();
        for payload in [None, Some(payload(None)), Some(payload(Some("guess"))), Some(payload(Some("")))] {
            let result = verify_slack_request(&request, payload.as_ref(), &config(None));
            assert!(matches!(result, Err(SwishError::Authentication)));
        }
    }

    #[test]
    fn accepts_valid_signature() {
        let signature = sign("signing", "1700000000", BODY);
        let request = signed_request("1700000000", &signature);
        assert!(verify_slack_signature(&request, "signing", unix(1_700_000_100)).is_ok());
    }

    #[test]
    fn rejects_bad_signature() {
        let signature = sign("other secret", "1700000000", BODY);
        let request = signed_request("1700000000", &signature);
        assert!(verify_slack_signature(&request, "signing", unix(1_700_000_100)).is_err());

        let request = signed_request("1700000000", "v0=zz");
        assert!(verify_slack_signature(&request, "signing", unix(1_700_000_100)).is_err());
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let signature = sign("signing", "1700000000", BODY);
        let request = signed_request("1700000000", &signature);
        assert!(verify_slack_signature(&request, "signing", unix(1_700_000_301)).is_err());
        assert!(verify_slack_signature(&request, "signing", unix(1_699_999_600)).is_err());
    }

    #[test]
    fn rejects_missing_headers() {
        let request = Request::new(Body::from(BODY));
        assert!(verify_slack_signature(&request, "signing", unix(1_700_000_000)).is_err());
    }

    #[test]
    fn signing_secret_is_enforced_when_configured() {
        let request = Request::new(Body::from(BODY));
        let result = verify_slack_request(&request, Some(&payload(Some("secret"))), &config(Some("signing")));
        assert!(matches!(result, Err(SwishError::Authentication)));
    }
}
