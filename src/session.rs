//! 会话与视图控制器
//!
//! 持有认证状态、当前视图和患者档案，响应三类输入：
//! 启动画面结束、用户导航、后端推送的会话变化。
//!
//! 控制器本身不做 I/O。认证状态由假变真时返回一个 [`ProfileLoad`] 票据，
//! 调用方据此拉取档案，再通过 [`SessionController::complete_profile_load`] 回填。
//! 每次认证状态翻转都会推进代数，过期票据的结果会被丢弃（最新者胜出）。

#[cfg(test)]
mod tests;

use crate::error::AppResult;
use robtor_shared::{DashboardVariant, PatientProfile, View};
use tracing::{debug, info, warn};

/// 档案拉取票据
#[must_use = "fetch the profile and hand the result to complete_profile_load"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLoad {
    generation: u64,
}

impl ProfileLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// 控制器输入
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SplashFinished,
    LoginSucceeded,
    SignupSucceeded,
    OnboardingCompleted(PatientProfile),
    ExternalSessionChange { has_session: bool },
    /// 令牌已刷新，会话保持
    SessionRefreshed,
    NavigateTo(View),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionController {
    view: View,
    authenticated: bool,
    profile: Option<PatientProfile>,
    generation: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================
    // 查询
    // =========================================================

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn profile(&self) -> Option<&PatientProfile> {
        self.profile.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn show_navbar(&self) -> bool {
        self.view.navbar_visible(self.authenticated)
    }

    pub fn dashboard_variant(&self) -> DashboardVariant {
        DashboardVariant::for_profile(self.profile.as_ref())
    }

    /// 传给各页面的称呼，无档案时为 "User"
    pub fn patient_name(&self) -> String {
        self.profile
            .as_ref()
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| "User".to_string())
    }

    // =========================================================
    // 状态转换
    // =========================================================

    pub fn dispatch(&mut self, event: SessionEvent) -> Option<ProfileLoad> {
        match event {
            SessionEvent::SplashFinished => {
                self.on_splash_finished();
                None
            }
            SessionEvent::LoginSucceeded => self.on_login_succeeded(),
            SessionEvent::SignupSucceeded => {
                self.on_signup_succeeded();
                None
            }
            SessionEvent::OnboardingCompleted(data) => self.on_onboarding_completed(data),
            SessionEvent::ExternalSessionChange { has_session } => {
                self.on_external_session_change(has_session)
            }
            SessionEvent::SessionRefreshed => self.on_session_refreshed(),
            SessionEvent::NavigateTo(view) => {
                self.navigate_to(view);
                None
            }
        }
    }

    pub fn on_splash_finished(&mut self) {
        let next = if self.authenticated {
            View::Dashboard
        } else {
            View::Login
        };
        self.set_view(next);
    }

    pub fn on_login_succeeded(&mut self) -> Option<ProfileLoad> {
        let ticket = self.set_authenticated(true);
        self.set_view(View::Dashboard);
        ticket
    }

    /// 注册后进入引导流程；此时可能还没有会话（等待邮箱验证）
    pub fn on_signup_succeeded(&mut self) {
        self.set_view(View::Onboarding);
    }

    pub fn on_onboarding_completed(&mut self, data: PatientProfile) -> Option<ProfileLoad> {
        self.profile = Some(data);
        let ticket = self.set_authenticated(true);
        self.set_view(View::Dashboard);
        ticket
    }

    /// 后端推送的会话变化（初次检查、跨标签页登录、刷新失败、其他地方登出）
    ///
    /// 会话消失时视图保持不变。
    pub fn on_external_session_change(&mut self, has_session: bool) -> Option<ProfileLoad> {
        let ticket = self.set_authenticated(has_session);
        if has_session && self.view.yields_to_session() {
            self.set_view(View::Dashboard);
        }
        ticket
    }

    /// 令牌刷新后若档案仍未加载（例如首次拉取带着过期令牌失败），重新发出票据
    pub fn on_session_refreshed(&mut self) -> Option<ProfileLoad> {
        if !self.authenticated || self.profile.is_some() {
            return None;
        }
        self.generation += 1;
        info!(generation = self.generation, "profile missing after token refresh, reloading");
        Some(ProfileLoad {
            generation: self.generation,
        })
    }

    pub fn navigate_to(&mut self, view: View) {
        self.set_view(view);
    }

    /// 回填档案拉取结果，返回档案是否被替换
    ///
    /// 票据过期、会话已失效、记录不存在或拉取失败时档案保持不变。
    pub fn complete_profile_load(
        &mut self,
        ticket: ProfileLoad,
        result: AppResult<Option<PatientProfile>>,
    ) -> bool {
        if ticket.generation != self.generation || !self.authenticated {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale profile load"
            );
            return false;
        }

        match result {
            Ok(Some(profile)) => {
                info!(wearable = profile.has_wearable, "profile loaded");
                self.profile = Some(profile);
                true
            }
            Ok(None) => {
                info!("no profile record for current user");
                false
            }
            Err(e) => {
                warn!(error = %e, "profile load failed, keeping previous profile");
                false
            }
        }
    }

    fn set_authenticated(&mut self, value: bool) -> Option<ProfileLoad> {
        let was = self.authenticated;
        self.authenticated = value;

        match (was, value) {
            (false, true) => {
                self.generation += 1;
                info!(generation = self.generation, "session established");
                Some(ProfileLoad {
                    generation: self.generation,
                })
            }
            (true, false) => {
                self.generation += 1;
                info!(generation = self.generation, "session cleared");
                None
            }
            _ => None,
        }
    }

    fn set_view(&mut self, view: View) {
        if self.view != view {
            debug!(from = %self.view, to = %view, "view changed");
            self.view = view;
        }
    }
}
