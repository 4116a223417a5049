//! 运行时配置
//!
//! 从变量表中读取配置，读不到时使用默认值。前端在构建期通过
//! `option_env!` 注入，测试中直接传入查找函数。

// =========================================================
// 变量名与默认值
// =========================================================

pub const VAR_SUPABASE_URL: &str = "ROBTOR_SUPABASE_URL";
pub const VAR_SUPABASE_ANON_KEY: &str = "ROBTOR_SUPABASE_ANON_KEY";
pub const VAR_OPENROUTER_API_KEY: &str = "ROBTOR_OPENROUTER_API_KEY";
pub const VAR_MODEL: &str = "ROBTOR_MODEL";
pub const VAR_APP_TITLE: &str = "ROBTOR_APP_TITLE";
pub const VAR_APP_ORIGIN: &str = "ROBTOR_APP_ORIGIN";

const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";
const DEFAULT_APP_TITLE: &str = "Robtor Health Assistant";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// `.env` 模板中的占位值，视为未配置
const PLACEHOLDER_API_KEY: &str = "your_openrouter_key_here";

// =========================================================
// 配置结构体
// =========================================================

/// BaaS 连接配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

/// LLM 网关配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    api_key: Option<String>,
    pub model: String,
    pub app_title: String,
    /// 作为 HTTP-Referer 发送的站点来源
    pub referer: String,
    pub completions_url: String,
}

impl AssistantConfig {
    /// 有效的 API Key（空串与模板占位值视为缺失）
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty() && *k != PLACEHOLDER_API_KEY)
    }

    pub fn with_referer(mut self, origin: impl Into<String>) -> Self {
        self.referer = origin.into();
        self
    }

    pub fn with_completions_url(mut self, url: impl Into<String>) -> Self {
        self.completions_url = url.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub assistant: AssistantConfig,
}

impl AppConfig {
    /// 从任意变量来源构建配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            backend: BackendConfig {
                url: var(VAR_SUPABASE_URL, DEFAULT_SUPABASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                anon_key: var(VAR_SUPABASE_ANON_KEY, ""),
            },
            assistant: AssistantConfig {
                api_key: lookup(VAR_OPENROUTER_API_KEY),
                model: var(VAR_MODEL, DEFAULT_MODEL),
                app_title: var(VAR_APP_TITLE, DEFAULT_APP_TITLE),
                referer: var(VAR_APP_ORIGIN, DEFAULT_APP_ORIGIN),
                completions_url: DEFAULT_COMPLETIONS_URL.to_string(),
            },
        }
    }

    /// 构建期注入的配置
    pub fn from_build_env() -> Self {
        Self::from_lookup(|key| {
            let value = match key {
                VAR_SUPABASE_URL => option_env!("ROBTOR_SUPABASE_URL"),
                VAR_SUPABASE_ANON_KEY => option_env!("ROBTOR_SUPABASE_ANON_KEY"),
                VAR_OPENROUTER_API_KEY => option_env!("ROBTOR_OPENROUTER_API_KEY"),
                VAR_MODEL => option_env!("ROBTOR_MODEL"),
                VAR_APP_TITLE => option_env!("ROBTOR_APP_TITLE"),
                VAR_APP_ORIGIN => option_env!("ROBTOR_APP_ORIGIN"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }
}
