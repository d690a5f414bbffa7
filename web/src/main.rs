use std::sync::Arc;

use lambda_http::{run, service_fn, Body, Error, Request, Response};

mod runtime_context;
mod slack_requests;
mod slack_verification;

use runtime_context::{RuntimeContext, SlashCommandConfig};
use slack_requests::SlackRequestHandler;

// https://github.com/awslabs/aws-lambda-rust-runtime/tree/main/examples
async fn function_handler(event: Request, context: &Arc<RuntimeContext>) -> Result<Response<Body>, Error> {
    let request_handler = SlackRequestHandler::new(context);
    request_handler.handle_slack_request(event).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
    let config = SlashCommandConfig::from_env()?;
    let runtime_context = RuntimeContext::new(config)?;
    let func = |event| async {
        function_handler(event, &runtime_context).await
    };
    run(service_fn(func)).await
}
