use crate::components::icons::{self, Icon};
use crate::session::use_session;
use leptos::prelude::*;
use robtor::shared::{NAV_ITEMS, NavItem, View};

fn icon_for(view: View) -> &'static str {
    match view {
        View::Report => icons::DOCUMENT,
        View::Chat => icons::CHAT,
        View::Symptom => icons::CLIPBOARD,
        View::Emergency => icons::PHONE,
        View::Settings => icons::COG,
        _ => icons::HOME,
    }
}

/// 底部导航栏，仅在已认证且不在进入流程时显示
#[component]
pub fn Navbar() -> impl IntoView {
    let ctx = use_session();
    let visible = Memo::new(move |_| ctx.show_navbar());

    view! {
        <Show when=move || visible.get()>
            <nav
                role="navigation"
                aria-label="Main"
                class="fixed bottom-0 left-0 right-0 bg-white border-t border-gray-200 shadow-lg z-[100]"
            >
                <div class="max-w-screen-xl mx-auto px-2">
                    <div class="flex items-center justify-between gap-1 py-2">
                        {NAV_ITEMS.iter().map(|item| nav_button(*item)).collect_view()}
                    </div>
                </div>
            </nav>
        </Show>
    }
}

fn nav_button(item: NavItem) -> impl IntoView {
    let ctx = use_session();
    let is_active = move || ctx.view() == item.view;
    let class = move || {
        let tone = match (is_active(), item.accent) {
            (true, true) => "text-red-600 bg-red-50",
            (true, false) => "text-green-600 bg-green-50",
            (false, _) => "text-gray-600 hover:text-green-600",
        };
        format!(
            "flex flex-col items-center justify-center space-y-1 px-4 py-2 min-w-[56px] rounded-lg transition-colors active:scale-95 {}",
            tone
        )
    };

    view! {
        <button
            on:click=move |_| ctx.navigate(item.view)
            aria-label=item.label
            aria-current=move || is_active().then_some("page")
            class=class
        >
            <Icon path=icon_for(item.view) />
            <span class="text-[11px] font-semibold md:block hidden">{item.label}</span>
        </button>
    }
}
