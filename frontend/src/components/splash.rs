use crate::components::icons::{self, Icon};
use crate::session::use_session;
use leptos::prelude::*;
use robtor::SessionEvent;
use std::time::Duration;

const DISPLAY_MS: u64 = 2000;
const FADE_MS: u64 = 500;

/// 启动画面：展示 2 秒，淡出 0.5 秒后通知控制器
#[component]
pub fn SplashScreen() -> impl IntoView {
    let ctx = use_session();
    let (fade_out, set_fade_out) = signal(false);
    let fade_handle = StoredValue::new(None::<TimeoutHandle>);

    let display_handle = set_timeout_with_handle(
        move || {
            set_fade_out.set(true);
            let handle = set_timeout_with_handle(
                move || ctx.dispatch(SessionEvent::SplashFinished),
                Duration::from_millis(FADE_MS),
            )
            .ok();
            fade_handle.set_value(handle);
        },
        Duration::from_millis(DISPLAY_MS),
    )
    .ok();

    on_cleanup(move || {
        if let Some(h) = display_handle {
            h.clear();
        }
        if let Some(h) = fade_handle.try_get_value().flatten() {
            h.clear();
        }
    });

    view! {
        <div class=move || {
            format!(
                "fixed inset-0 z-50 flex items-center justify-center bg-gradient-to-br from-green-500 via-emerald-500 to-green-600 transition-opacity duration-500 {}",
                if fade_out.get() { "opacity-0" } else { "opacity-100" },
            )
        }>
            <div class="text-center">
                <div class="flex justify-center mb-6">
                    <Icon path=icons::HEART class="w-24 h-24 text-white animate-pulse" />
                </div>
                <h1 class="text-5xl font-bold text-white mb-4 tracking-wide">"ROBTOR"</h1>
                <div class="h-1 w-32 bg-white mx-auto mb-6 rounded-full"></div>
                <p class="text-2xl text-white font-light tracking-wider">"Your Health Matters"</p>
                <div class="mt-8 flex justify-center space-x-2">
                    <div class="w-2 h-2 bg-white rounded-full animate-bounce"></div>
                    <div class="w-2 h-2 bg-white rounded-full animate-bounce [animation-delay:150ms]"></div>
                    <div class="w-2 h-2 bg-white rounded-full animate-bounce [animation-delay:300ms]"></div>
                </div>
            </div>
        </div>
    }
}
