
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cores::config::{cipher_key, optional_var, parse_var};
use cores::token::{CipherKey, TokenCodec};

use crate::qr_client::SwishQrClient;

// https://developer.swish.nu/api/qr-codes/v1#pre-filled-qr-code
pub const DEFAULT_SWISH_QR_URL: &str = "https://mpc.getswish.net/qrg-swish/api/v1/prefilled";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct ImageProxyConfig {
    pub cipher_key: CipherKey,
    pub swish_qr_url: String,
    pub upstream_timeout: Duration,
}

impl ImageProxyConfig {
    pub fn from_env() -> Result<Self> {
        let swish_qr_url = optional_var("SWISH_QR_URL")
            .unwrap_or_else(|| DEFAULT_SWISH_QR_URL.to_string());
        let timeout_secs = parse_var("SWISH_QR_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let config = Self {
            cipher_key: cipher_key("TOKEN_CIPHER_KEY")?,
            swish_qr_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
        };
        Ok(config)
    }
}

pub struct RuntimeContext {
    token_codec: TokenCodec,
    qr_client: Arc<SwishQrClient>,
}

impl RuntimeContext {
    pub fn new(config: ImageProxyConfig) -> Result<Arc<Self>> {
        let token_codec = TokenCodec::new(&config.cipher_key)
            .context("failed to initialize token codec")?;
        let qr_client = SwishQrClient::new(config.swish_qr_url, config.upstream_timeout)?;
        let context = Self {
            token_codec,
            qr_client,
        };
        Ok(Arc::new(context))
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.token_codec
    }

    pub fn qr_client(&self) -> &Arc<SwishQrClient> {
        &self.qr_client
    }
}
