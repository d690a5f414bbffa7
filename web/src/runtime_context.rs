
use std::sync::Arc;

use anyhow::{Context, Result};
use cores::config::{cipher_key, optional_var, required_var};
use cores::token::{CipherKey, TokenCodec};

pub struct SlashCommandConfig {
    pub slack_token: String,
    pub signing_secret: Option<String>,
    pub cipher_key: CipherKey,
    pub image_function_url: String,
}

impl SlashCommandConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            slack_token: required_var("SLACK_TOKEN")?,
            signing_secret: optional_var("SLACK_SIGNING_SECRET"),
            cipher_key: cipher_key("TOKEN_CIPHER_KEY")?,
            image_function_url: required_var("IMAGE_FUNCTION_URL")?,
        };
        Ok(config)
    }
}

pub struct RuntimeContext {
    config: SlashCommandConfig,
    token_codec: TokenCodec,
}

impl RuntimeContext {
    pub fn new(config: SlashCommandConfig) -> Result<Arc<Self>> {
        let token_codec = TokenCodec::new(&config.cipher_key)
            .context("failed to initialize token codec")?;
        let context = Self {
            config,
            token_codec,
        };
        Ok(Arc::new(context))
    }

    pub fn config(&self) -> &SlashCommandConfig {
        &self.config
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.token_codec
    }

    pub fn image_url(&self, token: &str) -> String {
        let base = self.config.image_function_url.trim_end_matches('/');
        format!("{}/{}.png", base, token)
    }
}
