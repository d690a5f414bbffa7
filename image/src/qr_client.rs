
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cores::error::SwishError;
use cores::payment_request::PaymentRequest;
use reqwest::{self, Client, Response, StatusCode};
use serde::Serialize;
use tracing::{error, info};

const IMAGE_FORMAT: &str = "png";
const IMAGE_SIZE: u32 = 512;

// the renderer lets the payer adjust editable fields in the Swish app
#[derive(Serialize, Debug)]
struct EditableField<T> {
    value: T,
    editable: bool,
}

#[derive(Serialize, Debug)]
struct PrefilledRequestBody<'a> {
    format: &'static str,
    size: u32,
    message: EditableField<&'a str>,
    amount: EditableField<u64>,
    payee: EditableField<&'a str>,
}

impl<'a> PrefilledRequestBody<'a> {
    fn new(request: &'a PaymentRequest) -> Self {
        Self {
            format: IMAGE_FORMAT,
            size: IMAGE_SIZE,
            message: EditableField { value: request.message.as_str(), editable: true },
            amount: EditableField { value: request.amount, editable: false },
            payee: EditableField { value: request.payee.as_str(), editable: false },
        }
    }
}

pub struct SwishQrClient {
    client: Client,
    endpoint: String,
}

impl SwishQrClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Arc<Self>> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        let this = Self {
            client,
            endpoint,
        };
        let this = Arc::new(this);
        Ok(this)
    }

    /// Requests a pre-filled QR code. The returned response has status 200 and
    /// its body has not been read yet.
    // https://developer.swish.nu/api/qr-codes/v1#pre-filled-qr-code
    pub async fn prefilled(&self, request: &PaymentRequest) -> Result<Response, SwishError> {
        let request_body = PrefilledRequestBody::new(request);
        let response = self.client.post(&self.endpoint)
            .header("Content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|error| {
                error!("swish qr request failed {:?}", error);
                SwishError::Upstream("Image API request failed".into())
            })?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SwishError::Upstream(format!("Unexpected HTTP status {}", status.as_u16())));
        }
        info!("swish qr response {:?} {:?}", status, response.content_length());
        Ok(response)
    }
}
