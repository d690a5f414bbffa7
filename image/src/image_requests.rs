
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{future, StreamExt, TryStreamExt};
use http_body_util::StreamBody;
use lambda_http::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use lambda_http::http::Method;
use http_body::Frame;
use lambda_http::{Error, Request, RequestExt, Response};
use regex::Regex;
use tracing::{error, info, warn};

use cores::error::SwishError;

use crate::runtime_context::RuntimeContext;

pub type ImageStream = BoxStream<'static, Result<Frame<Bytes>, Error>>;
pub type ImageBody = StreamBody<ImageStream>;

// the token is the last path segment, so a stage or route prefix is fine
fn path_format() -> &'static Regex {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    FORMAT.get_or_init(|| Regex::new(r"^(?:.*/)?([^/]+)\.png$").expect("path format is valid"))
}

/// Extracts the token from a `/<token>.png` path.
pub fn extract_token(path: &str) -> Result<&str, SwishError> {
    let captures = path_format()
        .captures(path)
        .ok_or_else(|| SwishError::Format("Invalid URL format".into()))?;
    captures
        .get(1)
        .map(|token| token.as_str())
        .ok_or_else(|| SwishError::Format("Invalid URL format".into()))
}

pub struct ImageRequestHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl ImageRequestHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self {
            runtime_context,
        };
        Arc::new(handler)
    }

    pub async fn handle_image_request(&self, event: Request) -> Result<Response<ImageBody>, Error> {
        match self.proxy_image(&event).await {
            Ok(response) => Ok(response),
            Err(error) => self.error_response(error),
        }
    }

    async fn proxy_image(&self, event: &Request) -> Result<Response<ImageBody>, SwishError> {
        if event.method() != Method::GET {
            return Err(SwishError::MethodNotAllowed(event.method().to_string()));
        }
        let path = match event.raw_http_path() {
            "" => event.uri().path(),
            path => path,
        };
        let token = extract_token(path)?;
        let request = self.runtime_context.token_codec().decode(token)?;

        let upstream = self.runtime_context.qr_client().prefilled(&request).await?;
        let mut builder = Response::builder().status(200);
        // relayed only when the upstream sent them
        for name in [CONTENT_TYPE, CONTENT_LENGTH] {
            if let Some(value) = upstream.headers().get(&name) {
                builder = builder.header(name, value.clone());
            }
        }
        info!("relaying qr image for {} kr", request.amount);
        let body = upstream_body(upstream);
        builder
            .body(body)
            .map_err(|error| SwishError::Internal(error.to_string()))
    }

    fn error_response(&self, swish_error: SwishError) -> Result<Response<ImageBody>, Error> {
        if swish_error.is_client_error() {
            warn!("image request rejected {:?}", swish_error);
        } else {
            error!("image request failed {:?}", swish_error);
        }
        let response = Response::builder()
            .status(swish_error.status_code())
            .header(CONTENT_TYPE, "text/plain")
            .body(text_body(swish_error.public_message()))
            .map_err(Box::new)?;
        Ok(response)
    }
}

// https://docs.rs/reqwest/latest/reqwest/struct.Response.html#method.bytes_stream
fn upstream_body(response: reqwest::Response) -> ImageBody {
    let stream = response.bytes_stream()
        .map_ok(Frame::data)
        .map_err(|error| -> Error { Box::new(error) })
        .boxed();
    StreamBody::new(stream)
}

fn text_body(text: String) -> ImageBody {
    let frame = Frame::data(Bytes::from(text));
    let stream = stream::once(future::ready(Ok(frame))).boxed();
    StreamBody::new(stream)
}
