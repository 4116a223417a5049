//! 报告上传与 AI 分析

use crate::components::icons::{self, Icon};
use crate::session::use_session;
use crate::web::{dialog, file};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::HtmlInputElement;
use robtor::shared::{ReportAnalysis, TestResult};
use tracing::{info, warn};

fn status_class(result: &TestResult) -> &'static str {
    match result.status.to_ascii_lowercase().as_str() {
        "normal" => "bg-green-100 text-green-700",
        "high" | "low" | "abnormal" => "bg-red-100 text-red-700",
        _ => "bg-yellow-100 text-yellow-700",
    }
}

#[component]
pub fn ReportPage() -> impl IntoView {
    let ctx = use_session();
    let analysis = RwSignal::new(Option::<ReportAnalysis>::None);
    let (analyzing, set_analyzing) = signal(false);
    let (file_name, set_file_name) = signal(Option::<String>::None);

    let on_select = move |ev: leptos::web_sys::Event| {
        let input = event_target::<HtmlInputElement>(&ev);
        let client = ctx.client();
        let assistant = ctx.assistant();

        spawn_local(async move {
            let upload = match file::read_selected(&input).await {
                Ok(Some(upload)) => upload,
                Ok(None) => return,
                Err(e) => {
                    dialog::alert(&format!("Failed to analyze report: {}", e.user_message()));
                    return;
                }
            };

            set_file_name.set(Some(upload.name.clone()));
            set_analyzing.set(true);
            match client.reports().analyze_and_store(&upload, &*assistant).await {
                Ok(result) => {
                    info!(score = result.health_score, "report analyzed");
                    analysis.set(Some(result));
                }
                Err(e) => {
                    warn!(error = %e, "report analysis failed");
                    dialog::alert(&format!("Failed to analyze report: {}", e.user_message()));
                }
            }
            set_analyzing.set(false);
            input.set_value("");
        });
    };

    let on_reset = move |_| {
        analysis.set(None);
        set_file_name.set(None);
    };

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 p-6 pb-24">
            <h1 class="text-3xl font-bold mb-2">"Medical Reports"</h1>
            <p class="text-gray-600 mb-6">"Upload a lab report and get an instant AI analysis"</p>

            {move || match analysis.get() {
                None => view! {
                    <label class="block bg-white rounded-3xl p-10 shadow border-2 border-dashed border-green-300 text-center cursor-pointer">
                        <div class="flex justify-center mb-4">
                            <Icon path=icons::UPLOAD class="w-12 h-12 text-green-600" />
                        </div>
                        <p class="font-semibold">
                            {move || {
                                if analyzing.get() {
                                    format!("Analyzing {}...", file_name.get().unwrap_or_default())
                                } else {
                                    "Tap to upload a report".to_string()
                                }
                            }}
                        </p>
                        <p class="text-sm text-gray-500">"PDF, JPG or PNG"</p>
                        <input
                            type="file"
                            class="hidden"
                            accept=".pdf,.jpg,.jpeg,.png"
                            disabled=move || analyzing.get()
                            on:change=on_select
                        />
                    </label>
                }
                .into_any(),
                Some(result) => analysis_view(result).into_any(),
            }}

            <Show when=move || analysis.with(Option::is_some)>
                <button class="mt-6 w-full py-3 rounded-xl bg-green-600 text-white" on:click=on_reset>
                    "Analyze Another Report"
                </button>
            </Show>
        </div>
    }
}

fn analysis_view(result: ReportAnalysis) -> impl IntoView {
    if !result.is_valid_report() {
        return view! {
            <div class="bg-yellow-50 border border-yellow-200 rounded-2xl p-6 flex gap-3">
                <Icon path=icons::ALERT class="w-6 h-6 text-yellow-600" />
                <p>{result.summary}</p>
            </div>
        }
        .into_any();
    }

    let abnormal = result.abnormal_results().count();
    let ReportAnalysis {
        health_score,
        summary,
        results,
        recommendations,
        diet_plan,
        fitness_plan,
    } = result;

    view! {
        <div class="space-y-6">
            <div class="bg-gradient-to-r from-green-500 to-emerald-600 text-white rounded-3xl p-6 shadow-lg">
                <p class="text-sm opacity-80">"Health Score"</p>
                <p class="text-5xl font-bold">{format!("{:.0}", health_score)}</p>
                <p class="mt-2">{summary}</p>
                <p class="text-sm mt-2 opacity-80">{format!("{} result(s) need attention", abnormal)}</p>
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-4">"Test Results"</h3>
                <div class="space-y-3">
                    {results
                        .into_iter()
                        .map(|r| {
                            let badge = format!("px-2 py-1 rounded-full text-xs font-semibold {}", status_class(&r));
                            view! {
                                <div class="border rounded-xl p-4">
                                    <div class="flex justify-between items-center">
                                        <p class="font-semibold">{r.test_name}</p>
                                        <span class=badge>{r.status}</span>
                                    </div>
                                    <p class="text-lg">{r.value}</p>
                                    <p class="text-xs text-gray-500">{format!("Normal range: {}", r.normal_range)}</p>
                                    <p class="text-sm text-gray-600 mt-1">{r.interpretation}</p>
                                </div>
                            }
                        })
                        .collect_view()}
                </div>
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-3">"Recommendations"</h3>
                <ul class="space-y-2">
                    {recommendations
                        .into_iter()
                        .map(|rec| view! { <li class="flex gap-2"><Icon path=icons::CHECK class="w-5 h-5 text-green-600" />{rec}</li> })
                        .collect_view()}
                </ul>
            </div>

            {diet_plan.map(|diet| view! {
                <div class="bg-white rounded-2xl p-6 shadow">
                    <h3 class="font-bold mb-3">"Diet Plan"</h3>
                    <p><b>"Breakfast: "</b>{diet.breakfast}</p>
                    <p><b>"Lunch: "</b>{diet.lunch}</p>
                    <p><b>"Dinner: "</b>{diet.dinner}</p>
                    <p class="mt-3 font-semibold">"Snacks"</p>
                    <ul class="list-disc ml-5">{diet.snacks.into_iter().map(|s| view! { <li>{s}</li> }).collect_view()}</ul>
                    <p class="mt-3 font-semibold text-red-600">"Avoid"</p>
                    <ul class="list-disc ml-5">{diet.avoid.into_iter().map(|s| view! { <li>{s}</li> }).collect_view()}</ul>
                </div>
            })}

            {fitness_plan.map(|plan| view! {
                <div class="bg-white rounded-2xl p-6 shadow">
                    <h3 class="font-bold">{plan.routine_name}</h3>
                    <p class="text-sm text-gray-500 mb-3">{plan.weekly_goal}</p>
                    <div class="space-y-2">
                        {plan
                            .exercises
                            .into_iter()
                            .map(|ex| view! {
                                <div class="border rounded-xl p-3">
                                    <p class="font-semibold">{ex.name}</p>
                                    <p class="text-sm text-gray-600">{format!("{} · {}", ex.duration, ex.intensity)}</p>
                                    <p class="text-sm">{ex.benefit}</p>
                                </div>
                            })
                            .collect_view()}
                    </div>
                </div>
            })}
        </div>
    }
    .into_any()
}
