//! 认证与会话
//!
//! 会话保存在内存中并同步到 `SessionStore`（浏览器中为 localStorage），
//! 每次会话变化都会通知所有订阅者。

use super::SupabaseClient;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpMethod};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{info, warn};

/// 会话在持久化存储中的键名
pub const SESSION_STORAGE_KEY: &str = "robtor.auth.session";

/// 新密码最少长度
pub const MIN_PASSWORD_LEN: usize = 6;

/// 距离过期不足该秒数时主动刷新令牌
pub const REFRESH_MARGIN_SECS: i64 = 300;

// =========================================================
// 数据结构
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// 注册时写入的 full_name
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// 令牌是否会在 `margin_secs` 秒内过期；没有过期时间时视为不过期
    pub fn expires_within(&self, now_secs: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at - now_secs <= margin_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// 启动时从存储恢复
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    /// 其他标签页修改了会话
    External,
}

/// 推送给订阅者的会话变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub has_session: bool,
}

/// 注册结果：后端开启邮箱验证时不会立即返回会话
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    Active(Session),
    PendingConfirmation { email: String },
}

// =========================================================
// 会话持久化
// =========================================================

pub trait SessionStore {
    fn load(&self) -> Option<String>;
    fn save(&self, raw: &str);
    fn clear(&self);
}

/// 内存实现，用于测试与非浏览器环境
#[derive(Default)]
pub struct MemorySessionStore {
    value: RefCell<Option<String>>,
}

impl MemorySessionStore {
    pub fn with_value(raw: &str) -> Self {
        Self {
            value: RefCell::new(Some(raw.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    fn save(&self, raw: &str) {
        *self.value.borrow_mut() = Some(raw.to_string());
    }

    fn clear(&self) {
        *self.value.borrow_mut() = None;
    }
}

// =========================================================
// 会话状态与订阅
// =========================================================

type Listener = Rc<dyn Fn(&AuthChange)>;

pub(crate) struct AuthState {
    session: RefCell<Option<Session>>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
    store: Rc<dyn SessionStore>,
}

impl AuthState {
    pub(crate) fn new(store: Rc<dyn SessionStore>) -> Rc<Self> {
        Rc::new(Self {
            session: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            store,
        })
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// 替换会话并通知订阅者
    ///
    /// `persist` 为 false 时不写回存储（存储本身就是来源）。
    fn replace(&self, session: Option<Session>, event: AuthEvent, persist: bool) {
        if persist {
            match &session {
                Some(s) => match serde_json::to_string(s) {
                    Ok(raw) => self.store.save(&raw),
                    Err(e) => warn!(error = %e, "failed to persist session"),
                },
                None => self.store.clear(),
            }
        }

        let has_session = session.is_some();
        *self.session.borrow_mut() = session;
        self.notify(AuthChange { event, has_session });
    }

    fn notify(&self, change: AuthChange) {
        // 先复制一份，回调中可以安全地订阅/退订
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(&change);
        }
    }

    fn subscribe(&self, listener: Listener) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// 订阅句柄，析构时自动退订
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct AuthSubscription {
    state: Weak<AuthState>,
    id: u64,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.unsubscribe(self.id);
        }
    }
}

// =========================================================
// 认证服务
// =========================================================

pub struct AuthService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> AuthService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    fn state(&self) -> &AuthState {
        self.client.auth_state()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state().session()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state().session.borrow().is_some()
    }

    pub fn subscribe<F>(&self, listener: F) -> AuthSubscription
    where
        F: Fn(&AuthChange) + 'static,
    {
        let state = self.client.auth_state_rc();
        let id = state.subscribe(Rc::new(listener));
        AuthSubscription {
            state: Rc::downgrade(&state),
            id,
        }
    }

    /// 从存储恢复会话并发出 `InitialSession`
    ///
    /// 存储内容无法解析时会被清除。
    pub fn restore(&self) -> Option<Session> {
        let session = self.parse_stored(self.state().store.load());
        if session.is_none() {
            self.state().store.clear();
        }
        self.state()
            .replace(session.clone(), AuthEvent::InitialSession, false);
        session
    }

    /// 另一个标签页写入了新的会话（或清除了会话）
    pub fn adopt_external(&self, raw: Option<&str>) {
        let session = self.parse_stored(raw.map(str::to_string));
        info!(has_session = session.is_some(), "session changed in another tab");
        self.state().replace(session, AuthEvent::External, false);
    }

    fn parse_stored(&self, raw: Option<String>) -> Option<Session> {
        let raw = raw?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                None
            }
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::invalid_input("Please enter your email and password")
                .in_op("auth.sign_in"));
        }

        let req = self
            .client
            .request(HttpMethod::Post, "/auth/v1/token?grant_type=password")
            .with_body(serde_json::json!({ "email": email, "password": password }));
        let resp = self.client.execute(req, "auth.sign_in").await?;
        let session: Session = resp.json().map_err(|e| e.in_op("auth.sign_in"))?;

        info!(user_id = %session.user.id, "signed in");
        self.state()
            .replace(Some(session.clone()), AuthEvent::SignedIn, true);
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<SignUpOutcome> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::invalid_input("Please enter your email and password")
                .in_op("auth.sign_up"));
        }
        validate_new_password(password, password).map_err(|e| e.in_op("auth.sign_up"))?;

        let req = self
            .client
            .request(HttpMethod::Post, "/auth/v1/signup")
            .with_body(serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name.trim() },
            }));
        let resp = self.client.execute(req, "auth.sign_up").await?;
        let body: serde_json::Value = resp.json().map_err(|e| e.in_op("auth.sign_up"))?;

        if body.get("access_token").is_some() {
            let session: Session =
                serde_json::from_value(body).map_err(|e| AppError::from(e).in_op("auth.sign_up"))?;
            info!(user_id = %session.user.id, "signed up with active session");
            self.state()
                .replace(Some(session.clone()), AuthEvent::SignedIn, true);
            Ok(SignUpOutcome::Active(session))
        } else {
            info!("signed up, waiting for email confirmation");
            Ok(SignUpOutcome::PendingConfirmation {
                email: email.to_string(),
            })
        }
    }

    /// 登出：远端失败时只记日志，本地会话总会被清除
    pub async fn sign_out(&self) {
        if self.is_signed_in() {
            let req = self.client.request(HttpMethod::Post, "/auth/v1/logout");
            if let Err(e) = self.client.execute(req, "auth.sign_out").await {
                warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }
        info!("signed out");
        self.state().replace(None, AuthEvent::SignedOut, true);
    }

    /// 使用 refresh_token 换取新会话；失败时清除会话
    pub async fn refresh_session(&self) -> AppResult<Session> {
        let refresh_token = self
            .current_session()
            .map(|s| s.refresh_token)
            .ok_or_else(|| AppError::unauthorized("No session to refresh").in_op("auth.refresh"))?;

        let req = self
            .client
            .request(HttpMethod::Post, "/auth/v1/token?grant_type=refresh_token")
            .with_body(serde_json::json!({ "refresh_token": refresh_token }));

        let refreshed = match self.client.execute(req, "auth.refresh").await {
            Ok(resp) => resp.json::<Session>().map_err(|e| e.in_op("auth.refresh")),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(session) => {
                self.state()
                    .replace(Some(session.clone()), AuthEvent::TokenRefreshed, true);
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                self.state().replace(None, AuthEvent::SignedOut, true);
                Err(e)
            }
        }
    }

    pub async fn get_user(&self) -> AppResult<AuthUser> {
        let req = self.client.request(HttpMethod::Get, "/auth/v1/user");
        let resp = self.client.execute(req, "auth.get_user").await?;
        resp.json().map_err(|e| e.in_op("auth.get_user"))
    }

    pub async fn update_password(&self, new_password: &str, confirm: &str) -> AppResult<()> {
        validate_new_password(new_password, confirm).map_err(|e| e.in_op("auth.update_password"))?;
        if !self.is_signed_in() {
            return Err(AppError::unauthorized("User not authenticated").in_op("auth.update_password"));
        }

        let req = self
            .client
            .request(HttpMethod::Put, "/auth/v1/user")
            .with_body(serde_json::json!({ "password": new_password }));
        let resp = self.client.execute(req, "auth.update_password").await?;

        if let (Ok(user), Some(mut session)) = (resp.json::<AuthUser>(), self.current_session()) {
            session.user = user;
            self.state()
                .replace(Some(session), AuthEvent::UserUpdated, true);
        }
        info!("password updated");
        Ok(())
    }
}

/// 修改密码表单校验
pub fn validate_new_password(new_password: &str, confirm: &str) -> AppResult<()> {
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_input(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if new_password != confirm {
        return Err(AppError::invalid_input("Passwords do not match"));
    }
    Ok(())
}
