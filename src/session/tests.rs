use super::*;
use crate::error::AppError;
use crate::request::HttpMethod;
use crate::supabase::auth::{AuthEvent, REFRESH_MARGIN_SECS};
use crate::supabase::tests::{anonymous_client, expired_client, rest_url, session_json};
use robtor_shared::EmergencyContact;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

// =========================================================
// 辅助函数
// =========================================================

fn controller_at(view: View, authenticated: bool) -> SessionController {
    let mut c = SessionController::new();
    if authenticated {
        let _ = c.on_external_session_change(true);
    }
    c.navigate_to(view);
    c
}

fn profile_named(name: &str, wearable: bool) -> PatientProfile {
    PatientProfile {
        full_name: name.to_string(),
        has_wearable: wearable,
        ..Default::default()
    }
}

// =========================================================
// 基本转换
// =========================================================

#[test]
fn test_initial_state() {
    let c = SessionController::new();
    assert_eq!(c.view(), View::Splash);
    assert!(!c.is_authenticated());
    assert!(c.profile().is_none());
    assert_eq!(c.patient_name(), "User");
}

#[test]
fn test_splash_finished_without_session_goes_to_login() {
    let mut c = SessionController::new();
    c.on_splash_finished();
    assert_eq!(c.view(), View::Login);
}

#[test]
fn test_splash_finished_with_session_goes_to_dashboard() {
    let mut c = controller_at(View::Splash, true);
    c.on_splash_finished();
    assert_eq!(c.view(), View::Dashboard);
}

#[test]
fn test_external_session_on_login_goes_to_dashboard() {
    let mut c = controller_at(View::Login, false);
    let ticket = c.on_external_session_change(true);

    assert!(c.is_authenticated());
    assert_eq!(c.view(), View::Dashboard);
    assert!(ticket.is_some());
}

#[test]
fn test_external_session_redirects_only_entry_views() {
    for view in [View::Splash, View::Login, View::Signup] {
        let mut c = controller_at(view, false);
        let _ = c.on_external_session_change(true);
        assert_eq!(c.view(), View::Dashboard, "from {}", view);
    }

    // 引导流程必须走完
    let mut c = controller_at(View::Onboarding, false);
    let _ = c.on_external_session_change(true);
    assert_eq!(c.view(), View::Onboarding);

    let mut c = controller_at(View::Chat, false);
    let _ = c.on_external_session_change(true);
    assert_eq!(c.view(), View::Chat);
}

#[test]
fn test_session_loss_keeps_view() {
    let mut c = controller_at(View::Dashboard, true);
    let ticket = c.on_external_session_change(false);

    assert!(ticket.is_none());
    assert!(!c.is_authenticated());
    assert_eq!(c.view(), View::Dashboard);
}

#[test]
fn test_onboarding_completed_from_any_state() {
    for view in View::ALL {
        for authenticated in [false, true] {
            let mut c = controller_at(view, authenticated);
            let ticket = c.on_onboarding_completed(profile_named("Ann", true));

            assert!(c.is_authenticated());
            assert_eq!(c.view(), View::Dashboard);
            assert_eq!(c.patient_name(), "Ann");
            assert_eq!(ticket.is_some(), !authenticated);
        }
    }
}

#[test]
fn test_signup_does_not_authenticate() {
    let mut c = controller_at(View::Signup, false);
    c.on_signup_succeeded();
    assert_eq!(c.view(), View::Onboarding);
    assert!(!c.is_authenticated());
}

#[test]
fn test_login_ticket_only_on_transition() {
    let mut c = controller_at(View::Login, false);
    assert!(c.on_login_succeeded().is_some());
    assert_eq!(c.view(), View::Dashboard);

    // 已认证时的重复事件不再触发拉取
    assert!(c.on_login_succeeded().is_none());
    assert!(c.on_external_session_change(true).is_none());
}

#[test]
fn test_navbar_visibility() {
    for view in View::ALL {
        for authenticated in [false, true] {
            let c = controller_at(view, authenticated);
            let expected = authenticated && !view.is_entry_flow();
            assert_eq!(c.show_navbar(), expected, "{} / {}", view, authenticated);
        }
    }
}

#[test]
fn test_dispatch_routes_events() {
    let mut c = SessionController::new();
    assert!(c.dispatch(SessionEvent::SplashFinished).is_none());
    assert_eq!(c.view(), View::Login);

    assert!(c.dispatch(SessionEvent::NavigateTo(View::Signup)).is_none());
    assert!(c.dispatch(SessionEvent::SignupSucceeded).is_none());
    assert_eq!(c.view(), View::Onboarding);

    let ticket = c.dispatch(SessionEvent::OnboardingCompleted(profile_named("Bo", false)));
    assert!(ticket.is_some());
    assert_eq!(c.dashboard_variant(), DashboardVariant::Simple);

    assert!(
        c.dispatch(SessionEvent::ExternalSessionChange { has_session: false })
            .is_none()
    );
    assert_eq!(c.view(), View::Dashboard);
}

// =========================================================
// 档案拉取（最新者胜出）
// =========================================================

#[test]
fn test_profile_load_applies_current_ticket() {
    let mut c = controller_at(View::Login, false);
    let ticket = c.on_login_succeeded().unwrap();

    assert!(c.complete_profile_load(ticket, Ok(Some(profile_named("Jane", true)))));
    assert_eq!(c.patient_name(), "Jane");
    assert_eq!(c.dashboard_variant(), DashboardVariant::Wearable);
}

#[test]
fn test_stale_ticket_cannot_overwrite() {
    let mut c = controller_at(View::Login, false);
    let first = c.on_login_succeeded().unwrap();
    let _ = c.on_external_session_change(false);
    let second = c.on_external_session_change(true).unwrap();

    assert!(c.complete_profile_load(second, Ok(Some(profile_named("New", false)))));
    assert!(!c.complete_profile_load(first, Ok(Some(profile_named("Old", true)))));
    assert_eq!(c.patient_name(), "New");
}

#[test]
fn test_load_after_sign_out_is_discarded() {
    let mut c = controller_at(View::Login, false);
    let ticket = c.on_login_succeeded().unwrap();
    let _ = c.on_external_session_change(false);

    assert!(!c.complete_profile_load(ticket, Ok(Some(profile_named("Ghost", true)))));
    assert!(c.profile().is_none());
}

#[test]
fn test_failed_load_keeps_previous_profile() {
    let mut c = controller_at(View::Onboarding, false);
    let ticket = c
        .on_onboarding_completed(profile_named("Kept", true))
        .unwrap();

    assert!(!c.complete_profile_load(ticket, Err(AppError::network("offline"))));
    assert_eq!(c.patient_name(), "Kept");

    assert!(!c.complete_profile_load(ticket, Ok(None)));
    assert_eq!(c.patient_name(), "Kept");
}

#[test]
fn test_refresh_reissues_ticket_when_profile_missing() {
    let mut c = controller_at(View::Dashboard, false);
    let first = c.on_external_session_change(true).unwrap();

    // 首次加载失败，档案仍为空
    assert!(!c.complete_profile_load(first, Err(AppError::unauthorized("JWT expired"))));
    assert!(c.profile().is_none());

    let second = c.dispatch(SessionEvent::SessionRefreshed).unwrap();
    assert_ne!(first, second);
    assert!(!c.complete_profile_load(first, Ok(Some(profile_named("Stale", false)))));
    assert!(c.complete_profile_load(second, Ok(Some(profile_named("Jane", false)))));
    assert_eq!(c.patient_name(), "Jane");
}

#[test]
fn test_refresh_without_need_issues_nothing() {
    let mut c = SessionController::new();
    assert!(c.on_session_refreshed().is_none());

    let mut c = controller_at(View::Dashboard, false);
    let ticket = c.on_external_session_change(true).unwrap();
    assert!(c.complete_profile_load(ticket, Ok(Some(profile_named("Jane", true)))));
    assert!(c.dispatch(SessionEvent::SessionRefreshed).is_none());
    assert_eq!(c.patient_name(), "Jane");
}

#[test]
fn test_empty_name_falls_back_to_user() {
    let mut c = controller_at(View::Login, false);
    let ticket = c.on_login_succeeded().unwrap();
    assert!(c.complete_profile_load(ticket, Ok(Some(profile_named("", false)))));
    assert_eq!(c.patient_name(), "User");
}

// =========================================================
// 与认证服务联动
// =========================================================

#[tokio::test]
async fn test_sign_in_drives_controller_and_profile_load() {
    let client = anonymous_client();
    let controller = Rc::new(RefCell::new(SessionController::new()));
    let tickets: Rc<RefCell<Vec<ProfileLoad>>> = Rc::new(RefCell::new(Vec::new()));

    let _sub = {
        let controller = Rc::clone(&controller);
        let tickets = Rc::clone(&tickets);
        client.auth().subscribe(move |change| {
            let ticket = controller
                .borrow_mut()
                .on_external_session_change(change.has_session);
            tickets.borrow_mut().extend(ticket);
        })
    };

    // 启动：存储中没有会话
    client.auth().restore();
    controller.borrow_mut().on_splash_finished();
    assert_eq!(controller.borrow().view(), View::Login);

    // 登录
    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/token?grant_type=password"),
        200,
        session_json("u1"),
    );
    client
        .auth()
        .sign_in_with_password("u1@example.com", "secret1")
        .await
        .unwrap();
    assert!(controller.borrow_mut().on_login_succeeded().is_none());
    assert_eq!(controller.borrow().view(), View::Dashboard);

    // 订阅回调发出了唯一一张票据
    let ticket = tickets.borrow_mut().pop().unwrap();
    assert!(tickets.borrow().is_empty());

    client.http().mock_response(
        HttpMethod::Get,
        &rest_url("/rest/v1/profiles?select=*&id=eq.u1"),
        200,
        json!([{
            "id": "u1",
            "full_name": "Jane",
            "has_wearable": true,
            "emergency_contact": {"name": "Bob", "phone": "555", "relation": "Brother"}
        }]),
    );
    let loaded = client.profiles().load_patient_profile().await;
    assert!(controller.borrow_mut().complete_profile_load(ticket, loaded));

    let c = controller.borrow();
    assert_eq!(c.patient_name(), "Jane");
    assert_eq!(c.dashboard_variant(), DashboardVariant::Wearable);
    assert_eq!(
        c.profile().unwrap().emergency_contact,
        EmergencyContact::new("Bob", "555", "Brother")
    );
    assert!(c.show_navbar());
}

#[tokio::test]
async fn test_sign_out_elsewhere_leaves_view() {
    let client = anonymous_client();
    let controller = Rc::new(RefCell::new(controller_at(View::Settings, true)));

    let _sub = {
        let controller = Rc::clone(&controller);
        client.auth().subscribe(move |change| {
            let _ = controller
                .borrow_mut()
                .on_external_session_change(change.has_session);
        })
    };

    client.auth().adopt_external(None);

    let c = controller.borrow();
    assert!(!c.is_authenticated());
    assert_eq!(c.view(), View::Settings);
    assert!(!c.show_navbar());
}

#[tokio::test]
async fn test_expired_stored_session_loads_profile_after_refresh() {
    let client = expired_client("u1");
    let controller = Rc::new(RefCell::new(SessionController::new()));
    let tickets: Rc<RefCell<Vec<ProfileLoad>>> = Rc::new(RefCell::new(Vec::new()));

    let _sub = {
        let controller = Rc::clone(&controller);
        let tickets = Rc::clone(&tickets);
        client.auth().subscribe(move |change| {
            let mut c = controller.borrow_mut();
            let mut ticket = c.dispatch(SessionEvent::ExternalSessionChange {
                has_session: change.has_session,
            });
            if change.event == AuthEvent::TokenRefreshed {
                ticket = ticket.or_else(|| c.dispatch(SessionEvent::SessionRefreshed));
            }
            tickets.borrow_mut().extend(ticket);
        })
    };

    client.auth().restore();
    let first = tickets.borrow_mut().pop().unwrap();
    assert!(client
        .auth()
        .current_session()
        .unwrap()
        .expires_within(2000, REFRESH_MARGIN_SECS));

    // 过期令牌：首次拉取被拒
    let profile_url = rest_url("/rest/v1/profiles?select=*&id=eq.u1");
    client.http().mock_response(
        HttpMethod::Get,
        &profile_url,
        401,
        json!({"message": "JWT expired"}),
    );
    client.http().mock_response(
        HttpMethod::Get,
        &profile_url,
        200,
        json!([{"id": "u1", "full_name": "Jane", "has_wearable": false}]),
    );
    let loaded = client.profiles().load_patient_profile().await;
    assert!(loaded.is_err());
    assert!(!controller.borrow_mut().complete_profile_load(first, loaded));
    assert!(controller.borrow().profile().is_none());

    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/token?grant_type=refresh_token"),
        200,
        session_json("u1"),
    );
    client.auth().refresh_session().await.unwrap();

    // 刷新后重新发出票据
    let second = tickets.borrow_mut().pop().unwrap();
    assert!(tickets.borrow().is_empty());
    assert_ne!(first, second);

    let loaded = client.profiles().load_patient_profile().await;
    assert!(controller.borrow_mut().complete_profile_load(second, loaded));
    assert_eq!(controller.borrow().patient_name(), "Jane");
    assert!(controller.borrow().is_authenticated());
}
