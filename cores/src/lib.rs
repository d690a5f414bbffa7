pub mod config;
pub mod error;
pub mod payment_request;
pub mod slack_messages;
pub mod token;
