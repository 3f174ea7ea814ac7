use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {message}")]
    Configuration { message: String },

    #[error("验证失败: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("槽位索引超出范围: {slot} (有效范围 [0, {max}])")]
    OutOfRange { slot: usize, max: usize },

    #[error("求解器错误: {message}")]
    Solver { message: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::config", %message, "configuration error");
        AppError::Configuration { message }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn out_of_range(slot: usize, max: usize) -> Self {
        warn!(target: "app::grid", slot, max, "slot index out of range");
        AppError::OutOfRange { slot, max }
    }

    pub fn solver(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::solver", %message, "solver error");
        AppError::Solver { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}
