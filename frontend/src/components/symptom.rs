use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::dialog;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::Assistant;
use robtor::shared::SymptomAssessment;
use tracing::warn;

const SYMPTOMS: [&str; 8] = [
    "Headache",
    "Fever",
    "Cough",
    "Fatigue",
    "Body Aches",
    "Sore Throat",
    "Nausea",
    "Dizziness",
];

fn matches_search(symptom: &str, search: &str) -> bool {
    symptom
        .to_lowercase()
        .contains(&search.trim().to_lowercase())
}

#[component]
pub fn SymptomPage() -> impl IntoView {
    let ctx = use_session();
    let selected = RwSignal::new(Vec::<String>::new());
    let (search, set_search) = signal(String::new());
    let (analyzing, set_analyzing) = signal(false);
    let assessment = RwSignal::new(Option::<SymptomAssessment>::None);

    let toggle = move |symptom: &'static str| {
        selected.update(|list| {
            if let Some(pos) = list.iter().position(|s| s == symptom) {
                list.remove(pos);
            } else {
                list.push(symptom.to_string());
            }
        });
    };

    let on_analyze = move |_| {
        let symptoms = selected.get_untracked();
        if symptoms.is_empty() {
            return;
        }
        set_analyzing.set(true);
        let assistant = ctx.assistant();
        spawn_local(async move {
            match assistant.analyze_symptoms(&symptoms).await {
                Ok(result) => assessment.set(Some(result)),
                Err(e) => {
                    warn!(error = %e, "symptom analysis failed");
                    dialog::alert("Failed to analyze symptoms. Please try again.");
                }
            }
            set_analyzing.set(false);
        });
    };

    let on_restart = move |_| {
        assessment.set(None);
        selected.set(Vec::new());
        set_search.set(String::new());
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 p-6 pb-24">
            <h1 class="text-3xl font-bold mb-2">"Symptom Checker"</h1>
            <p class="text-gray-600 mb-6">"Select what you're feeling and get an AI assessment"</p>

            {move || match assessment.get() {
                Some(result) => view! {
                    {assessment_view(result)}
                    <button class="mt-6 w-full py-3 rounded-xl bg-green-600 text-white" on:click=on_restart>
                        "Start New Check"
                    </button>
                }
                .into_any(),
                None => view! {
                    <input
                        type="search"
                        class="w-full px-4 py-3 border-2 rounded-xl mb-4"
                        placeholder="Search symptoms..."
                        prop:value=search
                        on:input=move |ev| set_search.set(event_target_value(&ev))
                    />
                    <div class="grid grid-cols-2 gap-3">
                        {SYMPTOMS
                            .iter()
                            .map(|symptom| {
                                let symptom = *symptom;
                                let is_selected = move || selected.with(|l| l.iter().any(|s| s == symptom));
                                view! {
                                    <Show when=move || matches_search(symptom, &search.get())>
                                        <button
                                            type="button"
                                            class=move || {
                                                if is_selected() {
                                                    "px-4 py-3 rounded-xl font-semibold bg-gradient-to-r from-green-500 to-emerald-600 text-white shadow-lg"
                                                } else {
                                                    "px-4 py-3 rounded-xl font-semibold bg-white text-gray-700 shadow"
                                                }
                                            }
                                            on:click=move |_| toggle(symptom)
                                        >
                                            {symptom}
                                        </button>
                                    </Show>
                                }
                            })
                            .collect_view()}
                    </div>
                    <p class="text-sm text-gray-600 mt-4">
                        {move || format!("{} symptom(s) selected", selected.with(Vec::len))}
                    </p>
                    <button
                        class="mt-4 w-full py-3 rounded-xl bg-green-600 text-white disabled:opacity-50"
                        disabled=move || analyzing.get() || selected.with(Vec::is_empty)
                        on:click=on_analyze
                    >
                        {move || if analyzing.get() { "Analyzing..." } else { "Analyze Symptoms" }}
                    </button>
                }
                .into_any(),
            }}
        </div>
    }
}

fn assessment_view(result: SymptomAssessment) -> impl IntoView {
    view! {
        <div class="space-y-6">
            <div class="bg-white rounded-2xl p-6 shadow">
                <p class="text-sm text-gray-500">"Possible Condition"</p>
                <h2 class="text-2xl font-bold">{result.possible_condition}</h2>
                <p class="text-green-600 font-semibold">{format!("{:.0}% confidence", result.confidence_score)}</p>
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-2">"What This Means"</h3>
                <p class="text-gray-700">{result.explanation}</p>
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-3">"Recommended Actions"</h3>
                <div class="space-y-3">
                    {result
                        .recommendations
                        .into_iter()
                        .map(|rec| view! {
                            <div class="border rounded-xl p-3">
                                <p class="font-semibold">{rec.title}</p>
                                <p class="text-sm text-gray-600">{rec.description}</p>
                                <span class="text-xs uppercase text-green-700">{rec.kind}</span>
                            </div>
                        })
                        .collect_view()}
                </div>
            </div>

            <div class="bg-red-50 border border-red-200 rounded-2xl p-6">
                <div class="flex items-center gap-2 mb-2">
                    <Icon path=icons::ALERT class="w-5 h-5 text-red-600" />
                    <h3 class="font-bold text-red-700">"Seek Immediate Care If"</h3>
                </div>
                <ul class="list-disc ml-5 text-red-700">
                    {result.urgent_signs.into_iter().map(|s| view! { <li>{s}</li> }).collect_view()}
                </ul>
            </div>

            <p class="text-xs text-gray-500">
                <b>"IMPORTANT: "</b>
                {result.disclaimer}
            </p>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_case_insensitive() {
        assert!(matches_search("Sore Throat", "throat"));
        assert!(matches_search("Fever", "  FEV "));
        assert!(matches_search("Cough", ""));
        assert!(!matches_search("Nausea", "head"));
    }
}
