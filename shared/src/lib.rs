//! Robtor 共享领域模型
//!
//! 前端与服务层共用的数据结构：
//! - `view`: 视图枚举与导航栏定义
//! - `profile`: 患者档案（远端记录与内存投影）
//! - `health`: 健康指标
//! - `chat`: 聊天记录
//! - `report`: 报告与 AI 分析结果
//! - `date`: 日期工具

pub mod chat;
pub mod date;
pub mod health;
pub mod profile;
pub mod report;
pub mod view;

pub use chrono;

pub use chat::{ChatMessage, ChatRow, NewChatRow, Sender};
pub use health::{HealthMetric, HealthMetricPatch, NewHealthMetric};
pub use profile::{
    ContactBook, ContactField, EmergencyContact, LoginActivity, NotificationPrefs,
    PatientProfile, PrivacyPrefs, ProfileRecord, ProfileUpdate, SubscriptionStatus,
    SubscriptionTier,
};
pub use report::{
    DietPlan, Exercise, FitnessPlan, NewReport, Recommendation, Report, ReportAnalysis,
    SymptomAssessment, TestResult,
};
pub use view::{DashboardVariant, NAV_ITEMS, NavItem, View};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const TABLE_PROFILES: &str = "profiles";
pub const TABLE_HEALTH_METRICS: &str = "health_metrics";
pub const TABLE_REPORTS: &str = "reports";
pub const TABLE_CHAT_HISTORY: &str = "chat_history";
pub const TABLE_LOGIN_ACTIVITY: &str = "login_activity";

pub const BUCKET_REPORTS: &str = "reports";
pub const BUCKET_AVATARS: &str = "avatars";
