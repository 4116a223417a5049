use std::fmt;

use serde::{Deserialize, Serialize};

// =========================================================
// 错误状态枚举
// =========================================================

/// 错误状态枚举
/// 包含错误对应的语义，决定界面如何提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppErrorStatus {
    /// 网络请求失败（连接、超时、浏览器 fetch 异常）
    Network,
    /// 401/403: 未登录或令牌失效
    Unauthorized,
    /// 登录时邮箱尚未验证
    EmailNotConfirmed,
    /// 404: 资源未找到
    NotFound,
    /// 400: 输入校验失败
    InvalidInput,
    /// JSON 解析或序列化错误（包括 AI 返回的非 JSON 文本）
    Serialization,
    /// 远端服务返回的其他错误
    Backend,
    /// LLM 网关返回错误
    Gateway,
    /// 缺少必要配置（如 API Key）
    Configuration,
}

impl AppErrorStatus {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppErrorStatus::Network => "NETWORK_ERROR",
            AppErrorStatus::Unauthorized => "UNAUTHORIZED",
            AppErrorStatus::EmailNotConfirmed => "EMAIL_NOT_CONFIRMED",
            AppErrorStatus::NotFound => "RESOURCE_NOT_FOUND",
            AppErrorStatus::InvalidInput => "INVALID_INPUT",
            AppErrorStatus::Serialization => "JSON_PARSE_ERROR",
            AppErrorStatus::Backend => "BACKEND_ERROR",
            AppErrorStatus::Gateway => "GATEWAY_ERROR",
            AppErrorStatus::Configuration => "MISSING_CONFIGURATION",
        }
    }

    /// 根据 HTTP 状态码和错误消息推断错误状态
    pub fn from_http(status: u16, message: &str) -> Self {
        if message.contains("Email not confirmed") {
            return AppErrorStatus::EmailNotConfirmed;
        }
        match status {
            401 | 403 => AppErrorStatus::Unauthorized,
            404 | 406 => AppErrorStatus::NotFound,
            400 | 422 => AppErrorStatus::InvalidInput,
            _ => AppErrorStatus::Backend,
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
/// 记录错误发生时的操作和相关细节
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSpan {
    /// 操作名称，如 "auth.sign_in", "rest.select"
    pub operation: String,
    /// 额外的细节信息，如表名、存储路径等
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 应用错误
///
/// - status: 错误类型/语义
/// - message: 错误消息（通常来自远端）
/// - source: 原始错误（可选，用于错误链）
/// - spans: 结构化的调用追踪栈
#[derive(Debug)]
pub struct AppError {
    pub status: AppErrorStatus,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl AppError {
    pub fn new(status: AppErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Network, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::InvalidInput, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Serialization, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Backend, message)
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Gateway, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorStatus::Configuration, message)
    }

    /// 由远端 HTTP 错误响应构造
    pub fn from_http(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(AppErrorStatus::from_http(status, &message), message)
    }

    // --- Context builders (Builder Pattern) ---

    /// 添加操作追踪（无额外细节）
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    /// 设置原始错误源
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == AppErrorStatus::Unauthorized
    }

    /// 弹窗展示给用户的文本
    pub fn user_message(&self) -> String {
        match self.status {
            AppErrorStatus::EmailNotConfirmed => "Please verify your email address before logging in. Check your inbox (and spam folder) for the confirmation link.".to_string(),
            _ if self.message.is_empty() => "Something went wrong. Please try again.".to_string(),
            _ => self.message.clone(),
        }
    }
}

// =========================================================
// Display & Error trait 实现
// =========================================================

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

// =========================================================
// 类型转换实现
// =========================================================

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::serialization(e.to_string()).with_source(e)
    }
}
