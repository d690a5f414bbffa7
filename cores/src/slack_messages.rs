
use serde::Serialize;

use crate::payment_request::PaymentRequest;

pub const DEFAULT_COMMAND: &str = "/swish";

// https://api.slack.com/interactivity/slash-commands#responding_to_commands
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

#[derive(Serialize, Debug)]
pub struct SlackMessage {
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
}

// https://api.slack.com/reference/messaging/attachments
#[derive(Serialize, Debug)]
pub struct SlackAttachment {
    pub fallback: String,
    pub text: String,
    pub image_url: String,
}

impl SlackMessage {
    /// Message posted in the channel showing the QR code for the request.
    pub fn payment(request: &PaymentRequest, image_url: String) -> Self {
        let summary = request.summary();
        Self {
            response_type: ResponseType::InChannel,
            text: None,
            attachments: vec![SlackAttachment {
                fallback: summary.clone(),
                text: summary,
                image_url,
            }],
        }
    }

    /// Reply only the invoking user sees when the command text is not understood.
    pub fn usage(command: Option<&str>) -> Self {
        let command = command.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_COMMAND);
        let text = format!(
            "Sorry, I didn't get that :confused: Please use `{} number amount message`",
            command
        );
        Self {
            response_type: ResponseType::Ephemeral,
            text: Some(text),
            attachments: Vec::new(),
        }
    }
}
