//! BaaS 客户端
//!
//! 封装 Supabase 兼容的 REST 接口：
//! - `auth`: GoTrue 认证与会话
//! - `query`: PostgREST 查询构建
//! - `storage`: 对象存储
//!
//! 所有请求都经过注入的 `HttpClient`，从而解耦了具体的 HTTP 实现。

pub mod auth;
pub mod query;
pub mod storage;

#[cfg(test)]
pub(crate) mod tests;

use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use auth::{AuthService, AuthState, SessionStore};
use query::TableQuery;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use storage::StorageService;
use tracing::{debug, warn};

// =========================================================
// 客户端
// =========================================================

struct ClientInner<C> {
    http: C,
    config: BackendConfig,
    auth: Rc<AuthState>,
}

/// 共享的 BaaS 客户端
///
/// 内部使用 `Rc`，克隆开销很小，可以直接移入异步任务。
pub struct SupabaseClient<C: HttpClient> {
    inner: Rc<ClientInner<C>>,
}

impl<C: HttpClient> Clone for SupabaseClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C: HttpClient> SupabaseClient<C> {
    pub fn new(http: C, config: BackendConfig, store: Rc<dyn SessionStore>) -> Self {
        Self {
            inner: Rc::new(ClientInner {
                http,
                config,
                auth: AuthState::new(store),
            }),
        }
    }

    pub fn http(&self) -> &C {
        &self.inner.http
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    pub fn auth(&self) -> AuthService<'_, C> {
        AuthService::new(self)
    }

    pub fn storage(&self) -> StorageService<'_, C> {
        StorageService::new(self)
    }

    pub(crate) fn auth_state(&self) -> &AuthState {
        &self.inner.auth
    }

    pub(crate) fn auth_state_rc(&self) -> Rc<AuthState> {
        Rc::clone(&self.inner.auth)
    }

    /// 当前会话对应的用户 id
    pub fn current_user_id(&self) -> Option<String> {
        self.auth_state().session().map(|s| s.user.id)
    }

    /// 需要登录的操作使用：无会话时返回 Unauthorized
    pub(crate) fn require_user_id(&self, operation: &str) -> AppResult<String> {
        self.current_user_id()
            .ok_or_else(|| AppError::unauthorized("User not authenticated").in_op(operation))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.inner.config.url, path)
        } else {
            format!("{}/{}", self.inner.config.url, path)
        }
    }

    /// 附带 apikey 与 Bearer 令牌的请求
    ///
    /// 有会话时使用用户令牌（行级权限），否则使用匿名 key。
    pub(crate) fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let token = self
            .auth_state()
            .session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.inner.config.anon_key.clone());

        HttpRequest::new(&self.url(path), method)
            .with_header("apikey", &self.inner.config.anon_key)
            .with_header("Authorization", &format!("Bearer {}", token))
    }

    /// 发送请求并把非 2xx 响应转换为 `AppError`
    pub(crate) async fn execute(&self, req: HttpRequest, operation: &str) -> AppResult<HttpResponse> {
        let url = req.url.clone();
        let resp = self
            .inner
            .http
            .send(req)
            .await
            .map_err(|e| e.in_op_with(operation.to_string(), url.clone()))?;

        if resp.ok() {
            debug!(operation, status = resp.status, "backend call succeeded");
            return Ok(resp);
        }

        let message = error_message(&resp.body);
        warn!(operation, status = resp.status, %message, "backend call failed");
        Err(AppError::from_http(resp.status, message).in_op_with(operation.to_string(), url))
    }

    // =========================================================
    // PostgREST 表操作
    // =========================================================

    pub async fn select<T: DeserializeOwned>(&self, query: &TableQuery) -> AppResult<Vec<T>> {
        let req = self.request(HttpMethod::Get, &query.path());
        let resp = self.execute(req, "rest.select").await?;
        resp.json()
            .map_err(|e| e.in_op_with("rest.select", query.table().to_string()))
    }

    /// 查询至多一行（对应 `maybeSingle`）
    pub async fn select_one<T: DeserializeOwned>(&self, query: &TableQuery) -> AppResult<Option<T>> {
        let rows: Vec<T> = self.select(query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<B, T>(&self, table: &str, body: &B) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let path = TableQuery::new(table).path();
        let req = self
            .request(HttpMethod::Post, &path)
            .with_header("Prefer", "return=representation")
            .with_body(serde_json::to_value(body)?);
        let resp = self.execute(req, "rest.insert").await?;
        resp.json()
            .map_err(|e| e.in_op_with("rest.insert", table.to_string()))
    }

    pub async fn update<B: Serialize + ?Sized>(&self, query: &TableQuery, body: &B) -> AppResult<()> {
        let req = self
            .request(HttpMethod::Patch, &query.path())
            .with_header("Prefer", "return=minimal")
            .with_body(serde_json::to_value(body)?);
        self.execute(req, "rest.update").await?;
        Ok(())
    }

    pub async fn update_returning<B, T>(&self, query: &TableQuery, body: &B) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .request(HttpMethod::Patch, &query.path())
            .with_header("Prefer", "return=representation")
            .with_body(serde_json::to_value(body)?);
        let resp = self.execute(req, "rest.update").await?;
        resp.json()
            .map_err(|e| e.in_op_with("rest.update", query.table().to_string()))
    }

    /// 冲突时合并（`on_conflict` 为唯一约束列）
    pub async fn upsert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> AppResult<()> {
        let path = TableQuery::new(table).on_conflict(on_conflict).path();
        let req = self
            .request(HttpMethod::Post, &path)
            .with_header("Prefer", "resolution=merge-duplicates,return=minimal")
            .with_body(serde_json::to_value(body)?);
        self.execute(req, "rest.upsert").await?;
        Ok(())
    }

    pub async fn delete(&self, query: &TableQuery) -> AppResult<()> {
        let req = self.request(HttpMethod::Delete, &query.path());
        self.execute(req, "rest.delete").await?;
        Ok(())
    }
}

/// 从错误响应体中提取可读消息
///
/// GoTrue 使用 `msg` / `error_description`，PostgREST 与 Storage 使用 `message`。
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "Request failed".to_string()
        } else {
            trimmed.to_string()
        }
    })
}
