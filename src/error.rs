//! Flare Social Core 错误工具模块
//!
//! - 统一的错误码与错误类型
//! - 为基础设施层提供便捷的错误构建工具

use std::fmt;

use thiserror::Error;

/// 错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 依赖服务不可用
    ServiceUnavailable,
    /// 数据库（Redis/Mongo）操作失败
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 统一错误类型
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}{}", details_suffix(.details))]
pub struct FlareError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

fn details_suffix(details: &Option<String>) -> String {
    details
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl FlareError {
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

pub type Result<T> = std::result::Result<T, FlareError>;

/// 错误构建器
///
/// ```rust,ignore
/// ErrorBuilder::new(ErrorCode::DatabaseError, "failed to store marker")
///     .details(err.to_string())
///     .build_error()
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    code: ErrorCode,
    message: String,
    details: Option<String>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn build_error(self) -> FlareError {
        FlareError {
            code: self.code,
            message: self.message,
            details: self.details,
        }
    }
}

/// 将基础设施错误映射为指定错误码
pub fn map_infra_error<E: fmt::Display>(err: E, code: ErrorCode, message: &str) -> FlareError {
    ErrorBuilder::new(code, message)
        .details(err.to_string())
        .build_error()
}

/// 基础设施结果扩展
pub trait InfraResultExt<T> {
    fn into_flare(self, code: ErrorCode, message: &str) -> Result<T>;
}

impl<T, E: fmt::Display> InfraResultExt<T> for std::result::Result<T, E> {
    fn into_flare(self, code: ErrorCode, message: &str) -> Result<T> {
        self.map_err(|err| map_infra_error(err, code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_details() {
        let err = ErrorBuilder::new(ErrorCode::DatabaseError, "failed to read marker")
            .details("connection reset")
            .build_error();
        assert_eq!(
            err.to_string(),
            "[DATABASE_ERROR] failed to read marker: connection reset"
        );
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_error_display_without_details() {
        let err = ErrorBuilder::new(ErrorCode::ServiceUnavailable, "redis unreachable").build_error();
        assert_eq!(err.to_string(), "[SERVICE_UNAVAILABLE] redis unreachable");
    }

    #[test]
    fn test_into_flare() {
        let raw: std::result::Result<(), &str> = Err("timeout");
        let err = raw
            .into_flare(ErrorCode::ServiceUnavailable, "redis unavailable")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert_eq!(err.details.as_deref(), Some("timeout"));
    }
}
