//! Robtor 健康助手核心库
//!
//! - `session`: 会话与视图控制器，决定当前显示哪个页面
//! - `supabase`: BaaS 客户端（认证、表查询、对象存储）
//! - `services`: 基于 BaaS 的业务服务（档案、健康指标、聊天、报告）
//! - `gateway`: LLM 网关（对话、报告图片分析、症状评估）
//!
//! 所有网络访问都经过 [`request::HttpClient`]，浏览器端由前端提供实现，
//! 测试中使用 `MockHttpClient`。

pub mod config;
pub mod error;
pub mod gateway;
pub mod request;
pub mod services;
pub mod session;
pub mod supabase;

pub use robtor_shared as shared;

pub use config::{AppConfig, AssistantConfig, BackendConfig};
pub use error::{AppError, AppErrorStatus, AppResult};
pub use gateway::{Assistant, AssistantGateway};
pub use request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use session::{ProfileLoad, SessionController, SessionEvent};
pub use supabase::SupabaseClient;
pub use supabase::auth::{
    AuthChange, AuthEvent, AuthSubscription, AuthUser, MemorySessionStore, Session,
    SessionStore, SignUpOutcome,
};
pub use supabase::storage::FileUpload;
