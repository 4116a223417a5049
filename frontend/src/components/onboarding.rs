//! 引导流程：基本信息、可穿戴设备、病史、紧急联系人

use crate::session::use_session;
use crate::web::dialog;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::SessionEvent;
use robtor::shared::PatientProfile;
use tracing::error;

const TOTAL_STEPS: u8 = 4;

const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
const DEVICES: [&str; 6] = [
    "Apple Watch",
    "Fitbit",
    "Samsung Galaxy",
    "Garmin",
    "Xiaomi Mi Band",
    "Other",
];
const COMMON_CONDITIONS: [&str; 8] = [
    "Diabetes",
    "Hypertension",
    "Asthma",
    "Heart Disease",
    "Arthritis",
    "Thyroid Disorder",
    "High Cholesterol",
    "Migraine",
];

/// 逗号分隔的自由输入拆成列表
fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn choice_class(selected: bool) -> &'static str {
    if selected {
        "px-4 py-3 rounded-xl font-semibold bg-gradient-to-r from-green-500 to-emerald-600 text-white shadow-lg"
    } else {
        "px-4 py-3 rounded-xl font-semibold bg-gray-100 text-gray-700 hover:bg-gray-200"
    }
}

#[component]
pub fn OnboardingPage() -> impl IntoView {
    let ctx = use_session();
    let (step, set_step) = signal(1u8);
    let data = RwSignal::new(PatientProfile::default());
    let (loading, set_loading) = signal(false);

    let on_next = move |_| {
        if step.get_untracked() < TOTAL_STEPS {
            set_step.update(|s| *s += 1);
            return;
        }

        set_loading.set(true);
        let profile = data.get_untracked();
        let client = ctx.client();
        spawn_local(async move {
            match client.profiles().save_onboarding(&profile).await {
                Ok(()) => {
                    dialog::alert("Profile completed successfully!");
                    ctx.dispatch(SessionEvent::OnboardingCompleted(profile));
                }
                Err(e) => {
                    error!(error = %e, "saving onboarding data failed");
                    dialog::alert(&e.user_message());
                    set_loading.set(false);
                }
            }
        });
    };

    let on_back = move |_| {
        if step.get_untracked() > 1 {
            set_step.update(|s| *s -= 1);
        }
    };

    let on_reset = move |_| {
        spawn_local(async move { ctx.sign_out_and_reload().await });
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 p-6">
            <div class="max-w-2xl mx-auto">
                <div class="flex items-center justify-between mb-6">
                    <div>
                        <h1 class="text-3xl font-bold">"Complete Your Profile"</h1>
                        <p class="text-gray-600">{move || format!("Step {} of {}", step.get(), TOTAL_STEPS)}</p>
                    </div>
                    <button class="text-sm text-red-600 font-semibold" on:click=on_reset>
                        "Sign Out / Reset"
                    </button>
                </div>

                <div class="w-full h-2 bg-gray-200 rounded-full mb-8">
                    <div
                        class="h-2 bg-gradient-to-r from-green-500 to-emerald-600 rounded-full transition-all"
                        style=move || format!("width: {}%", u32::from(step.get()) * 100 / u32::from(TOTAL_STEPS))
                    ></div>
                </div>

                <div class="bg-white rounded-3xl p-8 shadow-xl">
                    {move || match step.get() {
                        1 => basic_info_step(data).into_any(),
                        2 => wearable_step(data).into_any(),
                        3 => medical_step(data).into_any(),
                        _ => contact_step(data).into_any(),
                    }}

                    <div class="flex justify-between mt-8">
                        <button
                            class="px-6 py-3 rounded-xl bg-gray-100 disabled:opacity-40"
                            disabled=move || step.get() == 1
                            on:click=on_back
                        >
                            "Back"
                        </button>
                        <button
                            class="px-6 py-3 rounded-xl bg-green-600 text-white disabled:opacity-60"
                            disabled=move || loading.get()
                            on:click=on_next
                        >
                            {move || match (step.get() == TOTAL_STEPS, loading.get()) {
                                (_, true) => "Saving...",
                                (true, false) => "Complete",
                                (false, false) => "Next",
                            }}
                        </button>
                    </div>
                </div>
            </div>
        </div>
    }
}

// =========================================================
// 各步骤
// =========================================================

fn text_field(
    data: RwSignal<PatientProfile>,
    label: &'static str,
    placeholder: &'static str,
    get: fn(&PatientProfile) -> &String,
    set: fn(&mut PatientProfile, String),
) -> impl IntoView {
    view! {
        <div>
            <label class="block text-sm font-semibold mb-2">{label}</label>
            <input
                type="number"
                class="w-full px-4 py-3 border-2 rounded-xl"
                placeholder=placeholder
                prop:value=move || data.with(|d| get(d).clone())
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    data.update(|d| set(d, value));
                }
            />
        </div>
    }
}

fn basic_info_step(data: RwSignal<PatientProfile>) -> impl IntoView {
    view! {
        <h2 class="text-2xl font-bold mb-6">"Basic Information"</h2>
        <div class="grid grid-cols-2 gap-4">
            {text_field(data, "Age", "25", |d| &d.age, |d, v| d.age = v)}
            <div>
                <label class="block text-sm font-semibold mb-2">"Gender"</label>
                <select
                    class="w-full px-4 py-3 border-2 rounded-xl"
                    prop:value=move || data.with(|d| d.gender.clone())
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        data.update(|d| d.gender = value);
                    }
                >
                    <option value="">"Select"</option>
                    <option value="male">"Male"</option>
                    <option value="female">"Female"</option>
                    <option value="other">"Other"</option>
                </select>
            </div>
            {text_field(data, "Height (cm)", "170", |d| &d.height, |d, v| d.height = v)}
            {text_field(data, "Weight (kg)", "70", |d| &d.weight, |d, v| d.weight = v)}
        </div>
        <label class="block text-sm font-semibold mt-6 mb-2">"Blood Type"</label>
        <div class="grid grid-cols-4 gap-2">
            {BLOOD_TYPES
                .iter()
                .map(|blood| {
                    let blood = *blood;
                    view! {
                        <button
                            type="button"
                            class=move || choice_class(data.with(|d| d.blood_type == blood))
                            on:click=move |_| data.update(|d| d.blood_type = blood.to_string())
                        >
                            {blood}
                        </button>
                    }
                })
                .collect_view()}
        </div>
    }
}

fn wearable_step(data: RwSignal<PatientProfile>) -> impl IntoView {
    let has_wearable = move || data.with(|d| d.has_wearable);

    view! {
        <h2 class="text-2xl font-bold mb-2">"Wearable Devices"</h2>
        <p class="text-gray-600 mb-6">
            "Connecting wearable devices helps us provide more accurate health insights and real-time monitoring."
        </p>
        <p class="font-semibold mb-3">"Do you have a smartwatch or fitness tracker?"</p>
        <div class="grid grid-cols-2 gap-4">
            <button
                type="button"
                class=move || choice_class(has_wearable())
                on:click=move |_| data.update(|d| d.has_wearable = true)
            >
                "Yes, I have one"
            </button>
            <button
                type="button"
                class=move || choice_class(!has_wearable())
                on:click=move |_| {
                    data.update(|d| {
                        d.has_wearable = false;
                        d.wearable_type.clear();
                    })
                }
            >
                "No, I don't"
            </button>
        </div>
        <Show when=has_wearable>
            <p class="font-semibold mt-6 mb-3">"Select your device"</p>
            <div class="grid grid-cols-2 gap-3">
                {DEVICES
                    .iter()
                    .map(|device| {
                        let device = *device;
                        view! {
                            <button
                                type="button"
                                class=move || choice_class(data.with(|d| d.wearable_type == device))
                                on:click=move |_| data.update(|d| d.wearable_type = device.to_string())
                            >
                                {device}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>
        </Show>
    }
}

fn medical_step(data: RwSignal<PatientProfile>) -> impl IntoView {
    let list_input = move |label: &'static str,
                           get: fn(&PatientProfile) -> &Vec<String>,
                           set: fn(&mut PatientProfile, Vec<String>)| {
        view! {
            <div class="mt-4">
                <label class="block text-sm font-semibold mb-2">{label}</label>
                <input
                    type="text"
                    class="w-full px-4 py-3 border-2 rounded-xl"
                    placeholder="Separate with commas"
                    prop:value=move || data.with(|d| get(d).join(", "))
                    on:change=move |ev| {
                        let items = split_list(&event_target_value(&ev));
                        data.update(|d| set(d, items));
                    }
                />
            </div>
        }
    };

    view! {
        <h2 class="text-2xl font-bold mb-6">"Medical History"</h2>
        <p class="font-semibold mb-3">"Do you have any of these chronic conditions?"</p>
        <div class="grid grid-cols-2 gap-3">
            {COMMON_CONDITIONS
                .iter()
                .map(|condition| {
                    let condition = *condition;
                    let selected = move || data.with(|d| d.chronic_conditions.iter().any(|c| c == condition));
                    view! {
                        <button
                            type="button"
                            class=move || {
                                if selected() {
                                    "px-4 py-3 rounded-xl font-semibold bg-gradient-to-r from-red-500 to-pink-600 text-white shadow-lg"
                                } else {
                                    "px-4 py-3 rounded-xl font-semibold bg-gray-100 text-gray-700 hover:bg-gray-200"
                                }
                            }
                            on:click=move |_| data.update(|d| d.toggle_condition(condition))
                        >
                            {condition}
                        </button>
                    }
                })
                .collect_view()}
        </div>
        {list_input("Past medical history", |d| &d.medical_history, |d, v| d.medical_history = v)}
        {list_input("Current medications", |d| &d.medications, |d, v| d.medications = v)}
        {list_input("Allergies", |d| &d.allergies, |d, v| d.allergies = v)}
    }
}

fn contact_step(data: RwSignal<PatientProfile>) -> impl IntoView {
    let field = move |label: &'static str,
                      kind: &'static str,
                      get: fn(&PatientProfile) -> &String,
                      set: fn(&mut PatientProfile, String)| {
        view! {
            <div class="mt-4">
                <label class="block text-sm font-semibold mb-2">{label}</label>
                <input
                    type=kind
                    class="w-full px-4 py-3 border-2 rounded-xl"
                    prop:value=move || data.with(|d| get(d).clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        data.update(|d| set(d, value));
                    }
                />
            </div>
        }
    };

    view! {
        <h2 class="text-2xl font-bold mb-2">"Emergency Contact"</h2>
        <p class="text-gray-600">"Who should we reach in case of an emergency?"</p>
        {field("Name", "text", |d| &d.emergency_contact.name, |d, v| d.emergency_contact.name = v)}
        {field("Phone", "tel", |d| &d.emergency_contact.phone, |d, v| d.emergency_contact.phone = v)}
        {field("Relation", "text", |d| &d.emergency_contact.relation, |d, v| d.emergency_contact.relation = v)}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" Metformin, ,Aspirin ,"),
            vec!["Metformin".to_string(), "Aspirin".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
