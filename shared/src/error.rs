use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Invalid configuration")]
    Config,
    #[error("Wallet unavailable")]
    WalletUnavailable,
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Contract not found")]
    ContractNotFound,
    #[error("Remote call failed")]
    RemoteCall,
    #[error("Transaction failed")]
    Transaction,
    #[error("No winner yet")]
    WinnerUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// The configured contract address could not be used.
    pub fn config(err: ValidationError) -> Self {
        Self::with_details(ErrorCode::Config, "Invalid or missing contract address", err.to_string())
    }

    pub fn not_connected() -> Self {
        Self::new(ErrorCode::NotConnected, "Connect a wallet first")
    }

    /// `WinnerUnavailable` only means nobody has voted yet.
    pub fn is_benign(&self) -> bool {
        self.code == ErrorCode::WinnerUnavailable
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorCode::InvalidInput, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
