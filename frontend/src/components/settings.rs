//! 设置：个人资料、通知、隐私与安全、订阅、数据管理

use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::{dialog, file};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::HtmlInputElement;
use robtor::shared::date::now_rfc3339;
use robtor::shared::{
    LoginActivity, NotificationPrefs, PrivacyPrefs, ProfileRecord, ProfileUpdate, SubscriptionTier,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Profile,
    Notifications,
    Security,
    Subscription,
    Data,
}

impl Section {
    const ALL: [Section; 5] = [
        Section::Profile,
        Section::Notifications,
        Section::Security,
        Section::Subscription,
        Section::Data,
    ];

    fn label(self) -> &'static str {
        match self {
            Section::Profile => "Profile",
            Section::Notifications => "Notifications",
            Section::Security => "Privacy & Security",
            Section::Subscription => "Subscription",
            Section::Data => "Data",
        }
    }
}

/// 个人资料表单，数值字段以字符串编辑
#[derive(Debug, Clone, Default, PartialEq)]
struct ProfileForm {
    full_name: String,
    age: String,
    gender: String,
    height: String,
    weight: String,
    blood_type: String,
}

impl ProfileForm {
    fn from_record(record: &ProfileRecord) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        Self {
            full_name: text(&record.full_name),
            age: record.age.map(|a| a.to_string()).unwrap_or_default(),
            gender: text(&record.gender),
            height: number(record.height),
            weight: number(record.weight),
            blood_type: text(&record.blood_type),
        }
    }

    fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate::basic_info(
            &self.full_name,
            &self.age,
            &self.gender,
            &self.height,
            &self.weight,
            &self.blood_type,
        )
        .with_updated_at(now_rfc3339())
    }
}

#[component]
pub fn SettingsPage() -> impl IntoView {
    let ctx = use_session();
    let (section, set_section) = signal(Section::Profile);
    let record = RwSignal::new(ProfileRecord::default());
    let (email, set_email) = signal(String::new());

    let client = ctx.client();
    spawn_local(async move {
        match client.profiles().get_profile().await {
            Ok(Some(row)) => record.set(row),
            Ok(None) => info!("no profile row yet, showing defaults"),
            Err(e) => warn!(error = %e, "loading settings profile failed"),
        }
        match client.auth().get_user().await {
            Ok(user) => set_email.set(user.email.unwrap_or_default()),
            Err(e) => warn!(error = %e, "loading auth user failed"),
        }
    });

    let on_sign_out = move |_| {
        spawn_local(async move { ctx.sign_out_and_reload().await });
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 p-6 pb-24">
            <h1 class="text-3xl font-bold mb-6">"Settings"</h1>

            <div class="flex gap-2 overflow-x-auto mb-6">
                {Section::ALL
                    .iter()
                    .map(|s| {
                        let s = *s;
                        view! {
                            <button
                                class=move || {
                                    if section.get() == s {
                                        "px-4 py-2 rounded-xl whitespace-nowrap bg-green-600 text-white"
                                    } else {
                                        "px-4 py-2 rounded-xl whitespace-nowrap bg-white text-gray-700 shadow"
                                    }
                                }
                                on:click=move |_| set_section.set(s)
                            >
                                {s.label()}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>

            <div class="bg-white rounded-3xl p-6 shadow">
                {move || match section.get() {
                    Section::Profile => profile_section(record, email).into_any(),
                    Section::Notifications => notifications_section(record).into_any(),
                    Section::Security => security_section(record).into_any(),
                    Section::Subscription => subscription_section(record).into_any(),
                    Section::Data => data_section().into_any(),
                }}
            </div>

            <button class="mt-6 w-full py-3 rounded-xl bg-red-50 text-red-600 font-semibold" on:click=on_sign_out>
                "Sign Out"
            </button>
        </div>
    }
}

// =========================================================
// 个人资料
// =========================================================

fn profile_section(record: RwSignal<ProfileRecord>, email: ReadSignal<String>) -> impl IntoView {
    let ctx = use_session();
    let form = RwSignal::new(record.with_untracked(ProfileForm::from_record));
    let (saving, set_saving) = signal(false);
    let (uploading, set_uploading) = signal(false);

    // 档案异步到达时同步到表单；头像等其他字段变化不影响编辑中的内容
    let loaded = Memo::new(move |_| record.with(ProfileForm::from_record));
    Effect::new(move |_| form.set(loaded.get()));

    let on_save = move |_| {
        set_saving.set(true);
        let update = form.with_untracked(ProfileForm::to_update);
        let client = ctx.client();
        spawn_local(async move {
            match client.profiles().save_basic_info(update).await {
                Ok(()) => dialog::alert("Profile updated successfully!"),
                Err(e) => {
                    warn!(error = %e, "saving profile failed");
                    dialog::alert(&e.user_message());
                }
            }
            set_saving.set(false);
        });
    };

    let on_avatar = move |ev: leptos::web_sys::Event| {
        let input = event_target::<HtmlInputElement>(&ev);
        let client = ctx.client();
        spawn_local(async move {
            let upload = match file::read_selected(&input).await {
                Ok(Some(upload)) => upload,
                Ok(None) => return,
                Err(e) => {
                    dialog::alert(&e.user_message());
                    return;
                }
            };
            set_uploading.set(true);
            match client.profiles().upload_avatar(&upload).await {
                Ok(url) => record.update(|r| r.avatar_url = Some(url)),
                Err(e) => {
                    warn!(error = %e, "avatar upload failed");
                    dialog::alert(&e.user_message());
                }
            }
            set_uploading.set(false);
        });
    };

    let field = move |label: &'static str,
                      kind: &'static str,
                      get: fn(&ProfileForm) -> &String,
                      set: fn(&mut ProfileForm, String)| {
        view! {
            <div>
                <label class="block text-sm font-semibold mb-1">{label}</label>
                <input
                    type=kind
                    class="w-full px-4 py-2 border-2 rounded-xl"
                    prop:value=move || form.with(|f| get(f).clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        form.update(|f| set(f, value));
                    }
                />
            </div>
        }
    };

    view! {
        <div class="flex items-center gap-4 mb-6">
            {move || match record.with(|r| r.avatar_url.clone()) {
                Some(url) => view! { <img src=url class="w-20 h-20 rounded-full object-cover" alt="Avatar" /> }.into_any(),
                None => view! {
                    <div class="w-20 h-20 rounded-full bg-green-100 flex items-center justify-center">
                        <Icon path=icons::HEART class="w-8 h-8 text-green-600" />
                    </div>
                }
                .into_any(),
            }}
            <div>
                <p class="font-bold">{move || form.with(|f| f.full_name.clone())}</p>
                <p class="text-sm text-gray-500">{move || email.get()}</p>
                <label class="text-sm text-green-600 font-semibold cursor-pointer">
                    {move || if uploading.get() { "Uploading..." } else { "Change photo" }}
                    <input type="file" accept="image/*" class="hidden" on:change=on_avatar />
                </label>
            </div>
        </div>

        <div class="grid grid-cols-2 gap-4">
            {field("Full Name", "text", |f| &f.full_name, |f, v| f.full_name = v)}
            {field("Age", "number", |f| &f.age, |f, v| f.age = v)}
            {field("Gender", "text", |f| &f.gender, |f, v| f.gender = v)}
            {field("Blood Type", "text", |f| &f.blood_type, |f, v| f.blood_type = v)}
            {field("Height (cm)", "number", |f| &f.height, |f, v| f.height = v)}
            {field("Weight (kg)", "number", |f| &f.weight, |f, v| f.weight = v)}
        </div>

        <button
            class="mt-6 w-full py-3 rounded-xl bg-green-600 text-white disabled:opacity-60"
            disabled=move || saving.get()
            on:click=on_save
        >
            {move || if saving.get() { "Saving..." } else { "Save Changes" }}
        </button>
    }
}

// =========================================================
// 通知
// =========================================================

fn toggle_row(label: &'static str, checked: Signal<bool>, on_toggle: impl Fn() + 'static) -> impl IntoView {
    view! {
        <label class="flex items-center justify-between py-3 border-b last:border-0">
            <span>{label}</span>
            <input
                type="checkbox"
                class="w-5 h-5 accent-green-600"
                prop:checked=move || checked.get()
                on:change=move |_| on_toggle()
            />
        </label>
    }
}

fn notifications_section(record: RwSignal<ProfileRecord>) -> impl IntoView {
    let ctx = use_session();
    let prefs = RwSignal::new(record.with_untracked(|r| r.notifications.unwrap_or_default()));

    let toggle = move |label: &'static str, field: fn(&mut NotificationPrefs) -> &mut bool| {
        let checked = Signal::derive(move || prefs.with(|p| {
            let mut copy = *p;
            *field(&mut copy)
        }));
        toggle_row(label, checked, move || prefs.update(|p| {
            let value = field(p);
            *value = !*value;
        }))
    };

    let on_save = move |_| {
        let current = prefs.get_untracked();
        let client = ctx.client();
        spawn_local(async move {
            match client.profiles().save_notifications(&current).await {
                Ok(()) => {
                    record.update(|r| r.notifications = Some(current));
                    dialog::alert("Notification preferences saved!");
                }
                Err(e) => {
                    warn!(error = %e, "saving notifications failed");
                    dialog::alert(&e.user_message());
                }
            }
        });
    };

    view! {
        <h2 class="text-xl font-bold mb-4">"Notifications"</h2>
        {toggle("Health alerts", |p| &mut p.health_alerts)}
        {toggle("Medication reminders", |p| &mut p.medication_reminders)}
        {toggle("Appointment reminders", |p| &mut p.appointment_reminders)}
        {toggle("Weekly health reports", |p| &mut p.weekly_reports)}
        {toggle("Marketing emails", |p| &mut p.marketing_emails)}
        <button class="mt-6 w-full py-3 rounded-xl bg-green-600 text-white" on:click=on_save>
            "Save Preferences"
        </button>
    }
}

// =========================================================
// 隐私与安全
// =========================================================

fn security_section(record: RwSignal<ProfileRecord>) -> impl IntoView {
    let ctx = use_session();
    let prefs = RwSignal::new(record.with_untracked(|r| r.privacy.unwrap_or_default()));
    let (new_password, set_new_password) = signal(String::new());
    let (confirm_password, set_confirm_password) = signal(String::new());
    let activity = RwSignal::new(Vec::<LoginActivity>::new());

    let client = ctx.client();
    spawn_local(async move {
        match client.profiles().login_activity().await {
            Ok(rows) => activity.set(rows),
            Err(e) => warn!(error = %e, "loading login activity failed"),
        }
    });

    let toggle = move |label: &'static str, field: fn(&mut PrivacyPrefs) -> &mut bool| {
        let checked = Signal::derive(move || prefs.with(|p| {
            let mut copy = *p;
            *field(&mut copy)
        }));
        toggle_row(label, checked, move || prefs.update(|p| {
            let value = field(p);
            *value = !*value;
        }))
    };

    let on_save_privacy = move |_| {
        let current = prefs.get_untracked();
        let client = ctx.client();
        spawn_local(async move {
            match client.profiles().save_privacy(&current).await {
                Ok(()) => {
                    record.update(|r| r.privacy = Some(current));
                    dialog::alert("Privacy settings saved!");
                }
                Err(e) => {
                    warn!(error = %e, "saving privacy settings failed");
                    dialog::alert(&e.user_message());
                }
            }
        });
    };

    let on_change_password = move |_| {
        let new = new_password.get_untracked();
        let confirm = confirm_password.get_untracked();
        let client = ctx.client();
        spawn_local(async move {
            match client.auth().update_password(&new, &confirm).await {
                Ok(()) => {
                    set_new_password.set(String::new());
                    set_confirm_password.set(String::new());
                    dialog::alert("Password updated successfully!");
                }
                Err(e) => dialog::alert(&e.user_message()),
            }
        });
    };

    view! {
        <h2 class="text-xl font-bold mb-4">"Privacy"</h2>
        {toggle("Share health data with doctors", |p| &mut p.share_health_data)}
        {toggle("Analytics tracking", |p| &mut p.analytics_tracking)}
        {toggle("Location services", |p| &mut p.location_services)}
        {toggle("Two-step verification", |p| &mut p.two_step_enabled)}
        <button class="mt-4 w-full py-3 rounded-xl bg-green-600 text-white" on:click=on_save_privacy>
            "Save Privacy Settings"
        </button>

        <h2 class="text-xl font-bold mt-8 mb-4">"Change Password"</h2>
        <input
            type="password"
            class="w-full px-4 py-2 border-2 rounded-xl mb-3"
            placeholder="New password"
            prop:value=new_password
            on:input=move |ev| set_new_password.set(event_target_value(&ev))
        />
        <input
            type="password"
            class="w-full px-4 py-2 border-2 rounded-xl mb-3"
            placeholder="Confirm new password"
            prop:value=confirm_password
            on:input=move |ev| set_confirm_password.set(event_target_value(&ev))
        />
        <button class="w-full py-3 rounded-xl bg-gray-800 text-white" on:click=on_change_password>
            "Update Password"
        </button>

        <h2 class="text-xl font-bold mt-8 mb-4">"Recent Login Activity"</h2>
        <Show
            when=move || activity.with(|a| !a.is_empty())
            fallback=|| view! { <p class="text-gray-500">"No recent activity"</p> }
        >
            <ul class="space-y-2">
                {move || {
                    activity
                        .get()
                        .into_iter()
                        .map(|row| {
                            let device = if row.is_mobile() { "Mobile" } else { "Desktop" };
                            view! {
                                <li class="flex justify-between border rounded-xl p-3">
                                    <div>
                                        <p class="font-semibold">{row.describe()}</p>
                                        <p class="text-xs text-gray-500">{row.ip_address.clone().unwrap_or_default()}</p>
                                    </div>
                                    <div class="text-right text-xs text-gray-500">
                                        <p>{device}</p>
                                        <p>{row.created_at.clone().unwrap_or_default()}</p>
                                    </div>
                                </li>
                            }
                        })
                        .collect_view()
                }}
            </ul>
        </Show>
    }
}

// =========================================================
// 订阅
// =========================================================

fn subscription_section(record: RwSignal<ProfileRecord>) -> impl IntoView {
    let ctx = use_session();
    let current = move || record.with(|r| r.subscription_tier.unwrap_or_default());

    let plan = move |tier: SubscriptionTier, price: &'static str, perks: &'static str| {
        let on_upgrade = move |_| {
            let client = ctx.client();
            spawn_local(async move {
                match client.profiles().upgrade_subscription(tier).await {
                    Ok(()) => {
                        record.update(|r| r.subscription_tier = Some(tier));
                        dialog::alert(&format!(
                            "Successfully upgraded to {}!",
                            tier.as_str().to_uppercase()
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "subscription upgrade failed");
                        dialog::alert(&e.user_message());
                    }
                }
            });
        };

        view! {
            <div class="border-2 rounded-2xl p-4 mb-4">
                <div class="flex justify-between items-center">
                    <h3 class="text-lg font-bold">{tier.as_str().to_uppercase()}</h3>
                    <span class="text-green-600 font-bold">{price}</span>
                </div>
                <p class="text-sm text-gray-600 my-2">{perks}</p>
                <button
                    class="w-full py-2 rounded-xl bg-green-600 text-white disabled:bg-gray-300"
                    disabled=move || current() == tier
                    on:click=on_upgrade
                >
                    {move || if current() == tier { "Current Plan" } else { "Upgrade" }}
                </button>
            </div>
        }
    };

    view! {
        <h2 class="text-xl font-bold mb-1">"Subscription"</h2>
        <p class="text-gray-600 mb-4">
            {move || format!("Current plan: {}", current().as_str().to_uppercase())}
        </p>
        {plan(SubscriptionTier::Pro, "$9.99/mo", "Unlimited AI chat and report analysis")}
        {plan(SubscriptionTier::Elite, "$19.99/mo", "Everything in Pro plus priority doctor review")}
    }
}

// =========================================================
// 数据管理
// =========================================================

fn data_section() -> impl IntoView {
    let ctx = use_session();
    let (busy, set_busy) = signal(false);

    let on_export = move |_| {
        set_busy.set(true);
        let client = ctx.client();
        spawn_local(async move {
            let result = client
                .profiles()
                .export_data()
                .await
                .and_then(|export| Ok((export.file_name(), export.to_pretty_json()?)));
            match result {
                Ok((name, json)) => match file::download_text(&name, &json, "application/json") {
                    Ok(()) => dialog::alert("Your data has been exported and download should start shortly."),
                    Err(e) => {
                        warn!(error = ?e, "starting download failed");
                        dialog::alert("Failed to export data. Please try again.");
                    }
                },
                Err(e) => {
                    warn!(error = %e, "exporting data failed");
                    dialog::alert(&e.user_message());
                }
            }
            set_busy.set(false);
        });
    };

    let on_delete = move |_| {
        if !dialog::confirm(
            "ARE YOU SURE? This will permanently delete your health records and profile. This action cannot be undone.",
        ) {
            return;
        }
        set_busy.set(true);
        let client = ctx.client();
        spawn_local(async move {
            match client.profiles().delete_profile_data().await {
                Ok(failed) if failed.is_empty() => {
                    dialog::alert("Your account data has been deleted.");
                    ctx.sign_out_and_reload().await;
                }
                Ok(failed) => {
                    warn!(?failed, "some tables could not be cleared");
                    dialog::alert("Some data could not be deleted. Please try again.");
                    set_busy.set(false);
                }
                Err(e) => {
                    dialog::alert(&e.user_message());
                    set_busy.set(false);
                }
            }
        });
    };

    view! {
        <h2 class="text-xl font-bold mb-4">"Your Data"</h2>
        <button
            class="w-full py-3 rounded-xl bg-green-600 text-white mb-4 disabled:opacity-60"
            disabled=move || busy.get()
            on:click=on_export
        >
            "Export My Data"
        </button>
        <div class="border-2 border-red-200 rounded-2xl p-4">
            <div class="flex items-center gap-2 mb-2">
                <Icon path=icons::ALERT class="w-5 h-5 text-red-600" />
                <h3 class="font-bold text-red-700">"Danger Zone"</h3>
            </div>
            <p class="text-sm text-gray-600 mb-3">"Deleting your account removes all health records, reports and chat history."</p>
            <button
                class="w-full py-3 rounded-xl bg-red-600 text-white disabled:opacity-60"
                disabled=move || busy.get()
                on:click=on_delete
            >
                "Delete Account"
            </button>
        </div>
    }
}
