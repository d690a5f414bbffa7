
use std::env;

use anyhow::{Context, Result};

use crate::token::CipherKey;

pub fn required_var(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{} is not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is empty", name);
    }
    Ok(value)
}

pub fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn cipher_key(name: &str) -> Result<CipherKey> {
    let raw = required_var(name)?;
    let key = CipherKey::parse(&raw).with_context(|| format!("{} is invalid", name))?;
    Ok(key)
}

pub fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(value) => value.trim().parse().with_context(|| format!("{} is invalid", name)),
        None => Ok(default),
    }
}
