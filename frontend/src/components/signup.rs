use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::dialog;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::shared::View;
use robtor::{SessionEvent, SignUpOutcome};
use tracing::{info, warn};

#[component]
pub fn SignupPage() -> impl IntoView {
    let ctx = use_session();

    let (full_name, set_full_name) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let (name, mail, pass) = (
            full_name.get_untracked(),
            email.get_untracked(),
            password.get_untracked(),
        );
        let client = ctx.client();
        spawn_local(async move {
            match client.auth().sign_up(&name, &mail, &pass).await {
                Ok(outcome) => {
                    if let SignUpOutcome::PendingConfirmation { email } = &outcome {
                        info!("sign up awaiting email confirmation");
                        dialog::alert(&format!(
                            "Account created! We sent a confirmation link to {}.",
                            email
                        ));
                    }
                    ctx.dispatch(SessionEvent::SignupSucceeded);
                }
                Err(e) => {
                    warn!(error = %e, "sign up failed");
                    set_error_msg.set(Some(e.user_message()));
                    set_is_submitting.set(false);
                }
            }
        });
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 flex items-center justify-center p-6">
            <div class="w-full max-w-md">
                <div class="text-center mb-8">
                    <div class="flex justify-center mb-4">
                        <div class="bg-gradient-to-br from-green-500 to-emerald-600 p-4 rounded-3xl">
                            <Icon path=icons::HEART class="w-16 h-16 text-white" />
                        </div>
                    </div>
                    <h1 class="text-4xl font-bold">"Create Account"</h1>
                    <p class="text-gray-600">"Start your health journey with Robtor"</p>
                </div>

                <div class="bg-white rounded-3xl p-8 shadow-2xl">
                    <form on:submit=on_submit class="space-y-4">
                        <Show when=move || error_msg.get().is_some()>
                            <div role="alert" class="rounded-xl bg-red-50 border border-red-200 text-red-700 text-sm p-3">
                                {move || error_msg.get().unwrap_or_default()}
                            </div>
                        </Show>

                        <div>
                            <label class="block text-sm font-semibold mb-2" for="full-name">"Full Name"</label>
                            <input
                                id="full-name"
                                type="text"
                                class="w-full px-4 py-3 border-2 rounded-xl"
                                placeholder="Jane Doe"
                                on:input=move |ev| set_full_name.set(event_target_value(&ev))
                                prop:value=full_name
                            />
                        </div>
                        <div>
                            <label class="block text-sm font-semibold mb-2" for="signup-email">"Email Address"</label>
                            <input
                                id="signup-email"
                                type="email"
                                class="w-full px-4 py-3 border-2 rounded-xl"
                                placeholder="your.email@example.com"
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                                prop:value=email
                            />
                        </div>
                        <div>
                            <label class="block text-sm font-semibold mb-2" for="signup-password">"Password"</label>
                            <input
                                id="signup-password"
                                type="password"
                                class="w-full px-4 py-3 border-2 rounded-xl"
                                placeholder="At least 6 characters"
                                on:input=move |ev| set_password.set(event_target_value(&ev))
                                prop:value=password
                            />
                        </div>

                        <button
                            class="w-full bg-green-600 text-white py-3 rounded-xl disabled:opacity-60"
                            disabled=move || is_submitting.get()
                        >
                            {move || if is_submitting.get() { "Creating account..." } else { "Create Account" }}
                        </button>
                    </form>

                    <div class="mt-6 text-center">
                        <p>
                            "Already have an account? "
                            <button
                                class="text-green-600 font-semibold"
                                on:click=move |_| ctx.navigate(View::Login)
                            >
                                "Sign In"
                            </button>
                        </p>
                    </div>
                </div>
            </div>
        </div>
    }
}
