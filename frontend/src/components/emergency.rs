//! 紧急呼叫：公共急救号码与个人紧急联系人

use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::dialog;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::shared::chrono::Utc;
use robtor::shared::{ContactBook, EmergencyContact};
use tracing::{info, warn};

const GOVERNMENT_NUMBERS: [(&str, &str); 4] = [
    ("Emergency Services", "911"),
    ("Police", "100"),
    ("Fire Department", "101"),
    ("Medical Emergency", "102"),
];

const RELATIONS: [&str; 6] = ["Spouse", "Parent", "Sibling", "Child", "Friend", "Other"];

/// 表单状态：新增或编辑某个 id
#[derive(Debug, Clone, PartialEq)]
enum FormMode {
    Hidden,
    Adding,
    Editing(String),
}

#[component]
pub fn EmergencyPage() -> impl IntoView {
    let ctx = use_session();
    let book = RwSignal::new(ContactBook::default());
    let mode = RwSignal::new(FormMode::Hidden);
    let draft = RwSignal::new(EmergencyContact::default());

    let client = ctx.client();
    spawn_local(async move {
        match client.profiles().get_profile().await {
            Ok(record) => {
                let contacts = record.map(|r| r.emergency_contacts()).unwrap_or_default();
                info!(count = contacts.len(), "emergency contacts loaded");
                book.set(ContactBook::new(contacts));
            }
            Err(e) => warn!(error = %e, "loading emergency contacts failed"),
        }
    });

    let persist = move || {
        let contacts = book.with_untracked(|b| b.contacts().to_vec());
        let client = ctx.client();
        spawn_local(async move {
            if let Err(e) = client.profiles().save_emergency_contacts(&contacts).await {
                warn!(error = %e, "saving emergency contacts failed");
                dialog::alert("Failed to save contacts. Please try again.");
            }
        });
    };

    let open_form = move |next: FormMode| {
        let initial = match &next {
            FormMode::Editing(id) => book.with_untracked(|b| b.find(id).cloned()).unwrap_or_default(),
            _ => EmergencyContact::default(),
        };
        draft.set(initial);
        mode.set(next);
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let contact = draft.get_untracked();
        let changed = match mode.get_untracked() {
            FormMode::Adding => {
                let id = Utc::now().timestamp_millis().to_string();
                book.try_update(|b| b.add(id, &contact)).unwrap_or(false)
            }
            FormMode::Editing(id) => book.try_update(|b| b.update(&id, &contact)).unwrap_or(false),
            FormMode::Hidden => false,
        };
        if !changed {
            dialog::alert("Please fill in all fields.");
            return;
        }
        mode.set(FormMode::Hidden);
        persist();
    };

    let on_delete = move |id: String| {
        if !dialog::confirm("Are you sure you want to delete this contact?") {
            return;
        }
        if book.try_update(|b| b.remove(&id)).unwrap_or(false) {
            persist();
        }
    };

    let draft_input = move |label: &'static str,
                            kind: &'static str,
                            get: fn(&EmergencyContact) -> &String,
                            set: fn(&mut EmergencyContact, String)| {
        view! {
            <div>
                <label class="block text-sm font-semibold mb-1">{label}</label>
                <input
                    type=kind
                    class="w-full px-4 py-2 border-2 rounded-xl"
                    prop:value=move || draft.with(|d| get(d).clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        draft.update(|d| set(d, value));
                    }
                />
            </div>
        }
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-red-50 via-pink-50 to-rose-50 p-6 pb-24">
            <h1 class="text-3xl font-bold text-red-700 mb-2">"Emergency"</h1>
            <p class="text-gray-600 mb-6">"Get help fast. Tap a number to call."</p>

            <div class="grid grid-cols-2 gap-4 mb-8">
                {GOVERNMENT_NUMBERS
                    .iter()
                    .map(|(label, number)| {
                        let (label, number) = (*label, *number);
                        view! {
                            <button
                                class="bg-gradient-to-br from-red-500 to-pink-600 text-white rounded-2xl p-4 shadow-lg text-left"
                                on:click=move |_| dialog::dial(number)
                            >
                                <Icon path=icons::PHONE class="w-6 h-6 mb-2" />
                                <p class="font-semibold">{label}</p>
                                <p class="text-2xl font-bold">{number}</p>
                            </button>
                        }
                    })
                    .collect_view()}
            </div>

            <div class="flex items-center justify-between mb-4">
                <h2 class="text-xl font-bold">"Personal Contacts"</h2>
                <button
                    class="px-4 py-2 rounded-xl bg-red-600 text-white"
                    on:click=move |_| open_form(FormMode::Adding)
                >
                    "+ Add"
                </button>
            </div>

            <Show when=move || mode.with(|m| *m != FormMode::Hidden)>
                <form class="bg-white rounded-2xl p-4 shadow mb-4 space-y-3" on:submit=on_submit>
                    {draft_input("Name", "text", |d| &d.name, |d, v| d.name = v)}
                    {draft_input("Phone", "tel", |d| &d.phone, |d, v| d.phone = v)}
                    <div>
                        <label class="block text-sm font-semibold mb-1">"Relation"</label>
                        <select
                            class="w-full px-4 py-2 border-2 rounded-xl"
                            prop:value=move || draft.with(|d| d.relation.clone())
                            on:change=move |ev| {
                                let value = event_target_value(&ev);
                                draft.update(|d| d.relation = value);
                            }
                        >
                            <option value="">"Select relation"</option>
                            {RELATIONS.iter().map(|r| view! { <option value=*r>{*r}</option> }).collect_view()}
                        </select>
                    </div>
                    <div class="flex gap-2">
                        <button type="submit" class="flex-1 py-2 rounded-xl bg-green-600 text-white">
                            {move || if matches!(mode.get(), FormMode::Editing(_)) { "Update" } else { "Save" }}
                        </button>
                        <button
                            type="button"
                            class="flex-1 py-2 rounded-xl bg-gray-100"
                            on:click=move |_| mode.set(FormMode::Hidden)
                        >
                            "Cancel"
                        </button>
                    </div>
                </form>
            </Show>

            <Show
                when=move || book.with(|b| !b.contacts().is_empty())
                fallback=|| view! { <p class="text-gray-500">"No personal contacts yet."</p> }
            >
                <div class="space-y-3">
                    {move || {
                        book.with(|b| b.contacts().to_vec())
                            .into_iter()
                            .map(|contact| {
                                let id = contact.id.clone().unwrap_or_default();
                                let edit_id = id.clone();
                                let phone = contact.phone.clone();
                                view! {
                                    <div class="bg-white rounded-2xl p-4 shadow flex items-center justify-between">
                                        <div>
                                            <p class="font-semibold">{contact.name}</p>
                                            <p class="text-sm text-gray-500">{format!("{} · {}", contact.relation, contact.phone)}</p>
                                        </div>
                                        <div class="flex gap-2">
                                            <button class="p-2 rounded-full bg-green-100 text-green-700" on:click=move |_| dialog::dial(&phone)>
                                                <Icon path=icons::PHONE class="w-5 h-5" />
                                            </button>
                                            <button
                                                class="p-2 rounded-full bg-gray-100"
                                                on:click=move |_| open_form(FormMode::Editing(edit_id.clone()))
                                            >
                                                <Icon path=icons::PENCIL class="w-5 h-5" />
                                            </button>
                                            <button class="p-2 rounded-full bg-red-100 text-red-600" on:click=move |_| on_delete(id.clone())>
                                                <Icon path=icons::TRASH class="w-5 h-5" />
                                            </button>
                                        </div>
                                    </div>
                                }
                            })
                            .collect_view()
                    }}
                </div>
            </Show>

            <p class="text-xs text-gray-500 mt-8">
                "Emergency numbers connect you to real responders. Use them only for genuine emergencies."
            </p>
        </div>
    }
}
