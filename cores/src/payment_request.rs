
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SwishError;

/// Swish allows at most 50 characters in the message.
pub const MESSAGE_MAX_CHARS: usize = 50;

// payee: optional `+`, then digit groups separated by single whitespace
fn message_format() -> &'static Regex {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    FORMAT.get_or_init(|| {
        Regex::new(r"^(\+?\s?[0-9]+(?:\s?[0-9]+)*)\s+([1-9][0-9]*)\s+(.*)$")
            .expect("message format is valid")
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub payee: String,
    pub amount: u64,
    pub message: String,
}

impl PaymentRequest {
    /// Parses the text the user typed after the slash command,
    /// e.g. `+46701234567 100 lunch`.
    pub fn parse(text: &str) -> Result<Self, SwishError> {
        let captures = message_format()
            .captures(text.trim())
            .ok_or_else(|| SwishError::Format("Invalid format".into()))?;
        let payee = captures[1].to_string();
        let amount: u64 = captures[2]
            .parse()
            .map_err(|_| SwishError::Format("Invalid amount".into()))?;
        let message = truncate_message(&captures[3]);
        Ok(Self {
            payee,
            amount,
            message,
        })
    }

    pub fn is_valid(&self) -> bool {
        !self.payee.is_empty()
            && self.amount > 0
            && self.message.chars().count() <= MESSAGE_MAX_CHARS
    }

    pub fn summary(&self) -> String {
        format!("Swish {} kr to {}", self.amount, self.payee)
    }
}

fn truncate_message(message: &str) -> String {
    message.chars().take(MESSAGE_MAX_CHARS).collect()
}
