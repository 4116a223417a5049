//! Robtor 前端应用
//!
//! 单页应用，由 `SessionController` 决定当前视图：
//! - `session`: 会话上下文（控制器、BaaS 客户端、AI 网关）
//! - `components`: 各页面与导航栏
//! - `web`: 浏览器 API 封装

mod session;
mod components {
    pub mod chat;
    pub mod dashboard;
    pub mod emergency;
    mod icons;
    pub mod login;
    pub mod navbar;
    pub mod onboarding;
    pub mod report;
    pub mod settings;
    pub mod signup;
    pub mod splash;
    pub mod symptom;
}

// 原生 Web API 封装模块
pub(crate) mod web;

use crate::components::chat::ChatPage;
use crate::components::dashboard::DashboardPage;
use crate::components::emergency::EmergencyPage;
use crate::components::login::LoginPage;
use crate::components::navbar::Navbar;
use crate::components::onboarding::OnboardingPage;
use crate::components::report::ReportPage;
use crate::components::settings::SettingsPage;
use crate::components::signup::SignupPage;
use crate::components::splash::SplashScreen;
use crate::components::symptom::SymptomPage;
use crate::session::{SessionContext, init_session};

use leptos::prelude::*;
use robtor::AppConfig;
use robtor::shared::View;

/// 视图匹配函数
fn view_matcher(view: View) -> AnyView {
    match view {
        View::Splash => view! { <SplashScreen /> }.into_any(),
        View::Login => view! { <LoginPage /> }.into_any(),
        View::Signup => view! { <SignupPage /> }.into_any(),
        View::Onboarding => view! { <OnboardingPage /> }.into_any(),
        View::Dashboard => view! { <DashboardPage /> }.into_any(),
        View::Chat => view! { <ChatPage /> }.into_any(),
        View::Report => view! { <ReportPage /> }.into_any(),
        View::Symptom => view! { <SymptomPage /> }.into_any(),
        View::Settings => view! { <SettingsPage /> }.into_any(),
        View::Emergency => view! { <EmergencyPage /> }.into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建会话上下文
    let ctx = SessionContext::new(AppConfig::from_build_env());
    provide_context(ctx);

    // 2. 接入认证服务，恢复存储中的会话
    init_session(ctx);

    // 3. 只在视图真正变化时重建页面
    let current = Memo::new(move |_| ctx.view());

    view! {
        <div class="min-h-screen bg-gray-50">
            {move || view_matcher(current.get())}
            <Navbar />
        </div>
    }
}
