use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::dialog;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::shared::chrono::Utc;
use robtor::shared::{ChatMessage, Sender};
use tracing::warn;

#[component]
pub fn ChatPage() -> impl IntoView {
    let ctx = use_session();
    let messages = RwSignal::new(Vec::<ChatMessage>::new());
    let (input, set_input) = signal(String::new());
    let (typing, set_typing) = signal(false);

    // 首次加载：无记录时显示欢迎语
    let client = ctx.client();
    let name = ctx.patient_name();
    spawn_local(async move {
        let history = client.chat().history().await.unwrap_or_else(|e| {
            warn!(error = %e, "loading chat history failed");
            Vec::new()
        });
        if history.is_empty() {
            messages.set(vec![ChatMessage::welcome(&name)]);
        } else {
            messages.set(history);
        }
    });

    let send = move || {
        let text = input.get_untracked().trim().to_string();
        if text.is_empty() || typing.get_untracked() {
            return;
        }
        set_input.set(String::new());
        set_typing.set(true);

        // 乐观显示，负数 id 与服务端记录区分
        let temp_id = -Utc::now().timestamp_millis();
        messages.update(|m| m.push(ChatMessage::new(temp_id, text.clone(), Sender::User)));

        let client = ctx.client();
        let assistant = ctx.assistant();
        spawn_local(async move {
            match client.chat().exchange(&text, &*assistant).await {
                Ok(turn) => messages.update(|m| {
                    if let Some(slot) = m.iter_mut().find(|msg| msg.id == temp_id) {
                        *slot = turn.user;
                    }
                    m.extend(turn.reply);
                }),
                Err(e) => {
                    warn!(error = %e, "sending chat message failed");
                    messages.update(|m| m.retain(|msg| msg.id != temp_id));
                    dialog::alert(&e.user_message());
                }
            }
            set_typing.set(false);
        });
    };

    let on_clear = move |_| {
        if !dialog::confirm("Clear all chat history?") {
            return;
        }
        let client = ctx.client();
        let name = ctx.patient_name();
        spawn_local(async move {
            match client.chat().clear_history().await {
                Ok(()) => messages.set(vec![ChatMessage::welcome(&name)]),
                Err(e) => {
                    warn!(error = %e, "clearing chat history failed");
                    dialog::alert(&e.user_message());
                }
            }
        });
    };

    view! {
        <div class="min-h-screen flex flex-col bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 pb-24">
            <header class="bg-gradient-to-r from-green-500 to-emerald-600 text-white p-6 flex items-center justify-between">
                <div>
                    <h1 class="text-2xl font-bold">"Robtor AI"</h1>
                    <p class="text-green-100 text-sm">"Your health assistant"</p>
                </div>
                <button class="p-2 rounded-full hover:bg-white/20" title="Clear history" on:click=on_clear>
                    <Icon path=icons::TRASH class="w-5 h-5" />
                </button>
            </header>

            <div class="flex-1 overflow-y-auto p-4 space-y-3">
                <For
                    each=move || messages.get()
                    key=|msg| (msg.id, msg.text.clone())
                    children=|msg| {
                        let row = if msg.is_bot() { "flex justify-start" } else { "flex justify-end" };
                        let bubble = if msg.is_bot() {
                            "max-w-[80%] rounded-2xl px-4 py-3 bg-white shadow text-gray-800"
                        } else {
                            "max-w-[80%] rounded-2xl px-4 py-3 bg-green-600 text-white"
                        };
                        view! {
                            <div class=row>
                                <div class=bubble>
                                    <p class="whitespace-pre-wrap">{msg.text}</p>
                                    <p class="text-xs opacity-60 mt-1">{msg.timestamp.format("%H:%M").to_string()}</p>
                                </div>
                            </div>
                        }
                    }
                />
                <Show when=move || typing.get()>
                    <div class="flex justify-start">
                        <div class="rounded-2xl px-4 py-3 bg-white shadow text-gray-500">"Robtor is typing..."</div>
                    </div>
                </Show>
            </div>

            <form
                class="p-4 bg-white border-t flex gap-2"
                on:submit=move |ev: leptos::web_sys::SubmitEvent| {
                    ev.prevent_default();
                    send();
                }
            >
                <input
                    type="text"
                    class="flex-1 px-4 py-3 border-2 rounded-xl"
                    placeholder="Ask me anything about your health..."
                    prop:value=input
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                />
                <button
                    class="px-4 rounded-xl bg-green-600 text-white disabled:opacity-50"
                    disabled=move || typing.get() || input.get().trim().is_empty()
                >
                    <Icon path=icons::SEND class="w-5 h-5" />
                </button>
            </form>
        </div>
    }
}
