//! 视图定义模块 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖于 DOM。
//! 定义了应用的所有顶层视图及其属性。

use crate::profile::PatientProfile;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 应用视图枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// 启动画面 (默认视图)
    #[default]
    Splash,
    Login,
    Signup,
    Onboarding,
    Dashboard,
    Chat,
    Report,
    Symptom,
    Settings,
    Emergency,
}

impl View {
    pub const ALL: [View; 10] = [
        View::Splash,
        View::Login,
        View::Signup,
        View::Onboarding,
        View::Dashboard,
        View::Chat,
        View::Report,
        View::Symptom,
        View::Settings,
        View::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Splash => "splash",
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Onboarding => "onboarding",
            Self::Dashboard => "dashboard",
            Self::Chat => "chat",
            Self::Report => "report",
            Self::Symptom => "symptom",
            Self::Settings => "settings",
            Self::Emergency => "emergency",
        }
    }

    /// 是否属于进入流程（启动、登录、注册、引导）
    pub fn is_entry_flow(&self) -> bool {
        matches!(
            self,
            Self::Splash | Self::Login | Self::Signup | Self::Onboarding
        )
    }

    /// 会话建立时是否应该离开此视图
    ///
    /// 注意 onboarding 不在其中：注册后的引导流程必须走完。
    pub fn yields_to_session(&self) -> bool {
        matches!(self, Self::Splash | Self::Login | Self::Signup)
    }

    /// **导航栏守卫：** 已认证且不在进入流程中
    pub fn navbar_visible(&self, authenticated: bool) -> bool {
        authenticated && !self.is_entry_flow()
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 仪表盘变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardVariant {
    /// 有可穿戴设备：展示设备同步的指标
    Wearable,
    /// 无可穿戴设备：手动记录的简化面板
    Simple,
}

impl DashboardVariant {
    pub fn for_profile(profile: Option<&PatientProfile>) -> Self {
        match profile {
            Some(p) if p.has_wearable => Self::Wearable,
            _ => Self::Simple,
        }
    }
}

/// 导航栏条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub view: View,
    pub label: &'static str,
    /// 紧急入口使用警示配色
    pub accent: bool,
}

pub const NAV_ITEMS: [NavItem; 6] = [
    NavItem {
        view: View::Dashboard,
        label: "Home",
        accent: false,
    },
    NavItem {
        view: View::Report,
        label: "Reports",
        accent: false,
    },
    NavItem {
        view: View::Chat,
        label: "Chat",
        accent: false,
    },
    NavItem {
        view: View::Symptom,
        label: "Symptoms",
        accent: false,
    },
    NavItem {
        view: View::Emergency,
        label: "Emergency",
        accent: true,
    },
    NavItem {
        view: View::Settings,
        label: "Settings",
        accent: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navbar_hidden_for_entry_flow_regardless_of_auth() {
        for view in [View::Splash, View::Login, View::Signup, View::Onboarding] {
            assert!(!view.navbar_visible(true), "{view} should hide navbar");
            assert!(!view.navbar_visible(false), "{view} should hide navbar");
        }
    }

    #[test]
    fn test_navbar_follows_auth_for_app_views() {
        for view in View::ALL.iter().filter(|v| !v.is_entry_flow()) {
            assert!(view.navbar_visible(true));
            assert!(!view.navbar_visible(false));
        }
    }

    #[test]
    fn test_onboarding_does_not_yield_to_session() {
        assert!(View::Login.yields_to_session());
        assert!(View::Splash.yields_to_session());
        assert!(!View::Onboarding.yields_to_session());
        assert!(!View::Chat.yields_to_session());
    }

    #[test]
    fn test_dashboard_variant_follows_wearable_flag() {
        let mut profile = PatientProfile::default();
        assert_eq!(
            DashboardVariant::for_profile(Some(&profile)),
            DashboardVariant::Simple
        );
        profile.has_wearable = true;
        assert_eq!(
            DashboardVariant::for_profile(Some(&profile)),
            DashboardVariant::Wearable
        );
        assert_eq!(DashboardVariant::for_profile(None), DashboardVariant::Simple);
    }

    #[test]
    fn test_view_serializes_lowercase() {
        let json = serde_json::to_string(&View::Emergency).unwrap();
        assert_eq!(json, "\"emergency\"");
    }
}
