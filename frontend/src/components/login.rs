use crate::components::icons::{self, Icon};
use crate::session::use_session;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::SessionEvent;
use robtor::shared::View;
use tracing::warn;

#[component]
pub fn LoginPage() -> impl IntoView {
    let ctx = use_session();

    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (show_password, set_show_password) = signal(false);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let email = email.get_untracked().trim().to_string();
        let password = password.get_untracked().trim().to_string();
        if email.is_empty() || password.is_empty() {
            set_error_msg.set(Some("Please enter both fields".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        let client = ctx.client();
        spawn_local(async move {
            match client.auth().sign_in_with_password(&email, &password).await {
                Ok(_) => ctx.dispatch(SessionEvent::LoginSucceeded),
                Err(e) => {
                    warn!(error = %e, "sign in failed");
                    set_error_msg.set(Some(e.user_message()));
                    set_is_submitting.set(false);
                }
            }
        });
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 flex items-center justify-center p-6">
            <div class="relative w-full max-w-md">
                <div class="text-center mb-8">
                    <div class="flex justify-center mb-4">
                        <div class="bg-gradient-to-br from-green-500 to-emerald-600 p-4 rounded-3xl">
                            <Icon path=icons::HEART class="w-16 h-16 text-white" />
                        </div>
                    </div>
                    <h1 class="text-4xl font-bold">"ROBTOR"</h1>
                    <p class="text-gray-600">"Your Personal AI Health Assistant"</p>
                </div>

                <div class="bg-white rounded-3xl p-8 shadow-2xl">
                    <h2 class="text-2xl font-bold mb-2">"Welcome Back!"</h2>
                    <p class="text-gray-600 mb-6">"Sign in to continue"</p>

                    <form on:submit=on_submit class="space-y-4">
                        <Show when=move || error_msg.get().is_some()>
                            <div role="alert" class="rounded-xl bg-red-50 border border-red-200 text-red-700 text-sm p-3">
                                {move || error_msg.get().unwrap_or_default()}
                            </div>
                        </Show>

                        <div>
                            <label class="block text-sm font-semibold mb-2" for="email">"Email Address"</label>
                            <input
                                id="email"
                                type="email"
                                class="w-full px-4 py-3 border-2 rounded-xl"
                                placeholder="your.email@example.com"
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                                prop:value=email
                            />
                        </div>
                        <div>
                            <label class="block text-sm font-semibold mb-2" for="password">"Password"</label>
                            <div class="relative">
                                <input
                                    id="password"
                                    type=move || if show_password.get() { "text" } else { "password" }
                                    class="w-full px-4 pr-16 py-3 border-2 rounded-xl"
                                    placeholder="Enter your password"
                                    on:input=move |ev| set_password.set(event_target_value(&ev))
                                    prop:value=password
                                />
                                <button
                                    type="button"
                                    class="absolute right-4 top-3 text-sm text-gray-500"
                                    on:click=move |_| set_show_password.update(|v| *v = !*v)
                                >
                                    {move || if show_password.get() { "Hide" } else { "Show" }}
                                </button>
                            </div>
                        </div>

                        <button
                            class="w-full bg-green-600 text-white py-3 rounded-xl disabled:opacity-60"
                            disabled=move || is_submitting.get()
                        >
                            {move || if is_submitting.get() { "Signing in..." } else { "Sign In" }}
                        </button>
                    </form>

                    <div class="mt-6 text-center">
                        <p>
                            "Don't have an account? "
                            <button
                                class="text-green-600 font-semibold"
                                on:click=move |_| ctx.navigate(View::Signup)
                            >
                                "Create Account"
                            </button>
                        </p>
                    </div>
                </div>
            </div>
        </div>
    }
}
