use thiserror::Error;

mod colors;
mod domain_types;

pub use colors::*;
pub use domain_types::*;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid theme: {0} (expected 'light' or 'dark')")]
    InvalidTheme(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid store key: {reason}")]
    InvalidStoreKey { reason: String },

    #[error("Invalid symbol: {symbol} - {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("Invalid date: {input} - {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Unknown card: {0}")]
    UnknownCard(String),
}
