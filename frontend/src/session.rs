//! 会话上下文
//!
//! 包装核心库的 `SessionController`，通过 Context 在组件间共享。
//! 认证服务的会话变化、跨标签页同步与令牌刷新都在 [`init_session`] 中接入。

use crate::web::{BrowserSessionStore, FetchHttpClient, Interval, StorageListener};
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::shared::chrono::Utc;
use robtor::shared::{DashboardVariant, View};
use robtor::supabase::auth::{AuthEvent, REFRESH_MARGIN_SECS, SESSION_STORAGE_KEY};
use robtor::{AppConfig, AssistantGateway, ProfileLoad, SessionController, SessionEvent, SupabaseClient};
use std::rc::Rc;
use tracing::{info, warn};

pub type Client = SupabaseClient<FetchHttpClient>;
pub type Gateway = AssistantGateway<FetchHttpClient>;

/// 令牌过期检查间隔
const REFRESH_CHECK_MS: u32 = 60_000;

#[derive(Clone, Copy)]
pub struct SessionContext {
    controller: RwSignal<SessionController>,
    client: StoredValue<Client, LocalStorage>,
    assistant: StoredValue<Rc<Gateway>, LocalStorage>,
}

impl SessionContext {
    pub fn new(config: AppConfig) -> Self {
        if config.assistant.api_key().is_none() {
            warn!("OpenRouter API key not configured, assistant replies will be a notice");
        }
        let client = SupabaseClient::new(
            FetchHttpClient,
            config.backend,
            Rc::new(BrowserSessionStore),
        );
        let assistant = Rc::new(AssistantGateway::new(FetchHttpClient, config.assistant));

        Self {
            controller: RwSignal::new(SessionController::new()),
            client: StoredValue::new_local(client),
            assistant: StoredValue::new_local(assistant),
        }
    }

    pub fn client(&self) -> Client {
        self.client.get_value()
    }

    pub fn assistant(&self) -> Rc<Gateway> {
        self.assistant.get_value()
    }

    // =========================================================
    // 响应式查询
    // =========================================================

    pub fn view(&self) -> View {
        self.controller.with(|c| c.view())
    }

    pub fn show_navbar(&self) -> bool {
        self.controller.with(|c| c.show_navbar())
    }

    pub fn dashboard_variant(&self) -> DashboardVariant {
        self.controller.with(|c| c.dashboard_variant())
    }

    pub fn patient_name(&self) -> String {
        self.controller.with(|c| c.patient_name())
    }

    // =========================================================
    // 状态转换
    // =========================================================

    pub fn dispatch(&self, event: SessionEvent) {
        let ticket = self.controller.try_update(|c| c.dispatch(event)).flatten();
        if let Some(ticket) = ticket {
            self.load_profile(ticket);
        }
    }

    pub fn navigate(&self, view: View) {
        self.dispatch(SessionEvent::NavigateTo(view));
    }

    fn load_profile(&self, ticket: ProfileLoad) {
        let client = self.client();
        let controller = self.controller;
        spawn_local(async move {
            let result = client.profiles().load_patient_profile().await;
            controller.update(|c| {
                c.complete_profile_load(ticket, result);
            });
        });
    }

    /// 登出后重新加载页面，回到启动画面
    pub async fn sign_out_and_reload(&self) {
        self.client().auth().sign_out().await;
        crate::web::dialog::reload();
    }
}

/// 从 Context 获取会话上下文
pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}

/// 接入认证服务并恢复存储中的会话
///
/// 订阅、存储监听与刷新定时器的生命周期绑定到当前 Owner。
pub fn init_session(ctx: SessionContext) {
    let client = ctx.client();

    let subscription = client.auth().subscribe(move |change| {
        info!(event = ?change.event, has_session = change.has_session, "auth state changed");
        ctx.dispatch(SessionEvent::ExternalSessionChange {
            has_session: change.has_session,
        });
        if change.event == AuthEvent::TokenRefreshed {
            ctx.dispatch(SessionEvent::SessionRefreshed);
        }
    });

    let listener = StorageListener::new(SESSION_STORAGE_KEY, {
        let client = client.clone();
        move |raw| client.auth().adopt_external(raw.as_deref())
    });
    if listener.is_none() {
        warn!("cross-tab session sync unavailable");
    }

    let refresher = Interval::new(REFRESH_CHECK_MS, {
        let client = client.clone();
        move || refresh_if_due(&client)
    });

    let _guards = StoredValue::new_local((subscription, listener, refresher));

    client.auth().restore();
    // 存储中的会话可能已过期，不等第一次定时检查
    refresh_if_due(&client);
}

/// 会话临近过期时在后台刷新
fn refresh_if_due(client: &Client) {
    let due = client
        .auth()
        .current_session()
        .is_some_and(|s| s.expires_within(Utc::now().timestamp(), REFRESH_MARGIN_SECS));
    if !due {
        return;
    }
    let client = client.clone();
    spawn_local(async move {
        if let Err(e) = client.auth().refresh_session().await {
            warn!(error = %e, "token refresh failed");
        }
    });
}
