use std::sync::Arc;

use lambda_http::{run_with_streaming_response, service_fn, Error, Request, Response};

mod image_requests;
mod qr_client;
mod runtime_context;

use image_requests::{ImageBody, ImageRequestHandler};
use runtime_context::{ImageProxyConfig, RuntimeContext};

async fn function_handler(event: Request, context: &Arc<RuntimeContext>) -> Result<Response<ImageBody>, Error> {
    let request_handler = ImageRequestHandler::new(context);
    request_handler.handle_image_request(event).await
}

// the image is piped through a streaming response instead of being buffered
// https://docs.aws.amazon.com/lambda/latest/dg/configuration-response-streaming.html
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
    let config = ImageProxyConfig::from_env()?;
    let runtime_context = RuntimeContext::new(config)?;
    let func = |event| async {
        function_handler(event, &runtime_context).await
    };
    run_with_streaming_response(service_fn(func)).await
}
