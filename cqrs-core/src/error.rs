//! 分发核心的错误定义
//!
//! - `Failure`：单次请求的结构化失败，经由 `AppResult` 通道返回给调用方；
//! - `RegistryError`：启动期的配置错误（重复注册、缺失处理器），应在对外服务前暴露。
//!
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// 失败类别
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 请求未通过校验，`details` 中携带字段级原因
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    /// 调用方取消了本次分发
    Cancelled,
    /// 请求类型没有注册处理器（配置错误）
    HandlerNotFound,
    /// 处理器内部的意外故障
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Cancelled => "cancelled",
            Self::HandlerNotFound => "handler_not_found",
            Self::Internal => "internal",
        }
    }

    /// 是否为配置类错误（缺失注册等），这类错误不应按单次请求重试
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::HandlerNotFound)
    }

    /// 是否由调用方的输入或身份导致
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation
                | Self::NotFound
                | Self::Conflict
                | Self::Unauthorized
                | Self::Cancelled
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化失败
///
/// 处理器与行为之间只通过 `Err(Failure)` 传递失败，分发器不会让故障以 panic 的形式穿透给调用方。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    /// 字段名 -> 违规原因（校验失败时填充）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    details: BTreeMap<String, String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn validation(details: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            kind: FailureKind::Validation,
            message: "validation failed".to_string(),
            details: details.into_iter().collect(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, msg)
    }

    pub fn cancelled(request: &str) -> Self {
        Self::new(FailureKind::Cancelled, format!("dispatch cancelled: {request}"))
    }

    pub fn handler_not_found(request: &str) -> Self {
        Self::new(
            FailureKind::HandlerNotFound,
            format!("handler not found: {request}"),
        )
    }

    /// 追加一条字段级明细（同名字段保留首个原因）
    pub fn with_detail(mut self, field: impl Into<String>, reason: impl Into<String>) -> Self {
        self.details.entry(field.into()).or_insert_with(|| reason.into());
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    pub fn detail(&self, field: &str) -> Option<&str> {
        self.details.get(field).map(String::as_str)
    }

    /// 转换为 HTTP 状态码，供传输层使用
    pub fn status_code(&self) -> u16 {
        match self.kind {
            FailureKind::Validation => 400,
            FailureKind::NotFound => 404,
            FailureKind::Conflict => 409,
            FailureKind::Unauthorized => 401,
            FailureKind::Cancelled => 499,
            FailureKind::HandlerNotFound => 500,
            FailureKind::Internal => 500,
        }
    }
}

/// 统一 Result 类型别名
pub type AppResult<T> = Result<T, Failure>;

/// 启动期注册错误
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler already registered: request={request}, existing={existing}")]
    DuplicateRegistration {
        request: &'static str,
        existing: &'static str,
    },

    #[error("handler not found: {request}")]
    HandlerNotFound { request: &'static str },

    #[error("missing handlers for expected requests: {}", requests.join(", "))]
    MissingHandlers { requests: Vec<&'static str> },
}
