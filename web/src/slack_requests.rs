
use std::sync::Arc;

use lambda_http::http::Method;
use lambda_http::Error;
use lambda_http::{Body, Request, RequestPayloadExt, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use cores::error::SwishError;
use cores::payment_request::PaymentRequest;
use cores::slack_messages::SlackMessage;

use crate::runtime_context::RuntimeContext;
use crate::slack_verification::verify_slack_request;

// https://api.slack.com/interactivity/slash-commands#app_command_handling
#[derive(Deserialize, Debug, Default)]
pub struct SlashCommandPayload {
    pub token: Option<String>,
    pub command: Option<String>,
    pub text: Option<String>,
}

pub struct SlackRequestHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl SlackRequestHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self {
            runtime_context,
        };
        Arc::new(handler)
    }

    pub async fn handle_slack_request(&self, event: Request) -> Result<Response<Body>, Error> {
        match self.process_command(&event) {
            Ok(message) => self.json_response(&message),
            Err(error) => self.error_response(error),
        }
    }

    fn process_command(&self, event: &Request) -> Result<SlackMessage, SwishError> {
        if event.method() != Method::POST {
            return Err(SwishError::MethodNotAllowed(event.method().to_string()));
        }
        let payload = self.payload(event);
        verify_slack_request(event, payload.as_ref(), self.runtime_context.config())?;
        let payload = payload.unwrap_or_default();

        let text = payload.text.as_deref().unwrap_or_default();
        let request = match PaymentRequest::parse(text) {
            Ok(request) => request,
            Err(error) => {
                info!("unrecognized command text: {}", error);
                return Ok(SlackMessage::usage(payload.command.as_deref()));
            }
        };

        let token = self.runtime_context.token_codec()
            .encode(&request)
            .map_err(|error| SwishError::Internal(format!("failed to encode token: {}", error)))?;
        let image_url = self.runtime_context.image_url(&token);
        info!("issued payment request for {} kr", request.amount);
        Ok(SlackMessage::payment(&request, image_url))
    }

    fn payload(&self, event: &Request) -> Option<SlashCommandPayload> {
        match event.payload::<SlashCommandPayload>() {
            Ok(payload) => payload,
            Err(error) => {
                warn!("malformed slash command payload {:?}", error);
                None
            }
        }
    }

    fn json_response<T: Serialize>(&self, message: &T) -> Result<Response<Body>, Error> {
        let body = serde_json::to_string(message)?;
        let response = Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .body(body.into())
            .map_err(Box::new)?;
        Ok(response)
    }

    fn error_response(&self, swish_error: SwishError) -> Result<Response<Body>, Error> {
        if swish_error.is_client_error() {
            warn!("slash command rejected {:?}", swish_error);
        } else {
            error!("slash command failed {:?}", swish_error);
        }
        let response = Response::builder()
            .status(swish_error.status_code())
            .header("content-type", "text/plain")
            .body(swish_error.public_message().into())
            .map_err(Box::new)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cores::token::CipherKey;
    use lambda_http::http;
    use serde_json::Value;

    use crate::runtime_context::SlashCommandConfig;
    use crate::slack_verification::sign;

    const IMAGE_BASE: &str = "https://img.example/swish-image";

    fn context(signing_secret: Option<&str>) -> Arc<RuntimeContext> {
        let config = SlashCommandConfig {
            slack_token: "secret".into(),
            signing_secret: signing_secret.map(String::from),
            cipher_key: CipherKey::from_bytes([7; 32]),
            image_function_url: format!("{}/", IMAGE_BASE),
        };
        RuntimeContext::new(config).unwrap()
    }

    fn form_request(method: &str, body: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn body_text(response: &Response<Body>) -> String {
        let bytes: &[u8] = response.body().as_ref();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn body_json(response: &Response<Body>) -> Value {
        serde_json::from_str(&body_text(response)).unwrap()
    }

    async fn handle(context: &Arc<RuntimeContext>, request: Request) -> Response<Body> {
        SlackRequestHandler::new(context)
            .handle_slack_request(request)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn valid_command_posts_in_channel() {
        let context = context(None);
        let request = form_request("POST", "token=secret&command=%2Fswish&text=0701234567+50+coffee");
        let response = handle(&context, request).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "application/json");

        let body = body_json(&response);
        assert_eq!(body["response_type"], "in_channel");
        let attachment = &body["attachments"][0];
        assert_eq!(attachment["fallback"], "Swish 50 kr to 0701234567");
        assert_eq!(attachment["text"], "Swish 50 kr to 0701234567");

        let image_url = attachment["image_url"].as_str().unwrap();
        let token = image_url
            .strip_prefix(&format!("{}/", IMAGE_BASE))
            .and_then(|rest| rest.strip_suffix(".png"))
            .unwrap();
        let request = context.token_codec().decode(token).unwrap();
        assert_eq!(request, PaymentRequest::parse("0701234567 50 coffee").unwrap());
    }

    #[tokio::test]
    async fn unparsable_text_gets_ephemeral_usage() {
        let context = context(None);
        let request = form_request("POST", "token=secret&command=%2Fpay&text=abc+100+lunch");
        let response = handle(&context, request).await;
        assert_eq!(response.status(), 200);
        let body = body_json(&response);
        assert_eq!(body["response_type"], "ephemeral");
        assert_eq!(
            body["text"],
            "Sorry, I didn't get that :confused: Please use `/pay number amount message`"
        );
    }

    #[tokio::test]
    async fn missing_text_gets_ephemeral_usage() {
        let response = handle(&context(None), form_request("POST", "token=secret")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["response_type"], "ephemeral");
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let context = context(None);
        for body in ["token=guess&text=0701234567+50+coffee", "text=0701234567+50+coffee", ""] {
            let response = handle(&context, form_request("POST", body)).await;
            assert_eq!(response.status(), 401);
            assert_eq!(body_text(&response), "invalid credentials");
        }
    }

    #[tokio::test]
    async fn non_post_is_rejected() {
        let response = handle(&context(None), form_request("GET", "token=secret")).await;
        assert_eq!(response.status(), 405);
        assert_eq!(body_text(&response), "method GET is not allowed");
    }

    #[tokio::test]
    async fn json_payload_is_accepted() {
        let request = http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"token":"secret","text":"+46701234567 100 lunch"}"#))
            .unwrap();
        let response = handle(&context(None), request).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["attachments"][0]["text"], "Swish 100 kr to +46701234567");
    }

    #[tokio::test]
    async fn signed_request_is_accepted() {
        let body = "token=secret&text=0701234567+50+coffee";
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string();
        let request = http::Request::builder()
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("X-Slack-Request-Timestamp", timestamp.as_str())
            .header("X-Slack-Signature", sign("signing", &timestamp, body))
            .body(Body::from(body))
            .unwrap();
        let response = handle(&context(Some("signing")), request).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["response_type"], "in_channel");
    }

    #[tokio::test]
    async fn unsigned_request_is_rejected_when_signing_secret_configured() {
        let request = form_request("POST", "token=secret&text=0701234567+50+coffee");
        let response = handle(&context(Some("signing")), request).await;
        assert_eq!(response.status(), 401);
    }
}
