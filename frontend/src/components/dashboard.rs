//! 仪表盘
//!
//! 有可穿戴设备的用户看到指标与周步数图表，其余用户看到饮水、饮食与运动计划。

use crate::components::icons::{self, Icon};
use crate::session::use_session;
use leptos::prelude::*;
use leptos::task::spawn_local;
use robtor::shared::{DashboardVariant, HealthMetric, Report, ReportAnalysis, View};
use tracing::{info, warn};

const WATER_GOAL: u32 = 8;
const WATER_START: u32 = 6;

#[component]
pub fn DashboardPage() -> impl IntoView {
    let ctx = use_session();
    let variant = Memo::new(move |_| ctx.dashboard_variant());
    let name = Memo::new(move |_| ctx.patient_name());

    view! {
        <div class="min-h-screen bg-gradient-to-br from-green-50 via-emerald-50 to-teal-50 pb-24">
            <header class="bg-gradient-to-r from-green-500 to-emerald-600 text-white p-6 rounded-b-3xl shadow-lg">
                <h1 class="text-2xl font-bold">{move || format!("Welcome back, {}!", name.get())}</h1>
                <p class="text-green-100">"Here's your health overview for today"</p>
            </header>
            {move || match variant.get() {
                DashboardVariant::Wearable => view! { <WearableDashboard /> }.into_any(),
                DashboardVariant::Simple => view! { <SimpleDashboard /> }.into_any(),
            }}
        </div>
    }
}

/// 最新报告的分析结果；没有或拉取失败时为 `None`
async fn latest_analysis(client: &crate::session::Client) -> Option<ReportAnalysis> {
    match client.reports().latest_report().await {
        Ok(report) => report.and_then(|r: Report| r.analysis_result),
        Err(e) => {
            warn!(error = %e, "loading latest report failed");
            None
        }
    }
}

// =========================================================
// 可穿戴设备版
// =========================================================

#[derive(Debug, Clone, Default)]
struct WearableData {
    weekly: Vec<HealthMetric>,
    today: Option<HealthMetric>,
    report: Option<ReportAnalysis>,
}

async fn load_wearable_data(client: crate::session::Client) -> WearableData {
    let health = client.health();

    let mut weekly = match health.weekly_metrics().await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "loading weekly metrics failed");
            Vec::new()
        }
    };

    // 新用户没有数据时写入一周演示数据
    if weekly.is_empty() {
        match health.seed_demo_data().await {
            Ok(()) => {
                info!("seeded demo metrics for empty dashboard");
                weekly = health.weekly_metrics().await.unwrap_or_default();
            }
            Err(e) => warn!(error = %e, "seeding demo metrics failed"),
        }
    }

    let today = health.today_metric().await.unwrap_or_else(|e| {
        warn!(error = %e, "loading today's metric failed");
        None
    });

    WearableData {
        weekly,
        today,
        report: latest_analysis(&client).await,
    }
}

#[component]
fn WearableDashboard() -> impl IntoView {
    let ctx = use_session();
    let data = RwSignal::new(WearableData::default());
    let (loading, set_loading) = signal(true);

    let reload = move || {
        set_loading.set(true);
        let client = ctx.client();
        spawn_local(async move {
            let loaded = load_wearable_data(client).await;
            data.set(loaded);
            set_loading.set(false);
        });
    };
    reload();

    let stat = |label: &'static str, value: Signal<String>, unit: &'static str, tone: &'static str| {
        view! {
            <div class=format!("rounded-2xl p-4 text-white shadow {}", tone)>
                <p class="text-sm opacity-80">{label}</p>
                <p class="text-2xl font-bold">{move || value.get()}<span class="text-sm ml-1">{unit}</span></p>
            </div>
        }
    };

    let today_field = move |f: fn(&HealthMetric) -> String| {
        Signal::derive(move || {
            data.with(|d| d.today.as_ref().map(f).unwrap_or_else(|| "--".to_string()))
        })
    };

    view! {
        <div class="p-6 space-y-6">
            <div class="flex items-center justify-between">
                <h2 class="text-xl font-bold">"Today's Vitals"</h2>
                <button
                    class="flex items-center gap-1 text-green-600 font-semibold disabled:opacity-50"
                    disabled=move || loading.get()
                    on:click=move |_| reload()
                >
                    <Icon path=icons::REFRESH class="w-5 h-5" />
                    {move || if loading.get() { "Syncing..." } else { "Refresh" }}
                </button>
            </div>

            <div class="grid grid-cols-2 gap-4">
                {stat("Steps", today_field(|m| m.steps.to_string()), "", "bg-gradient-to-br from-green-500 to-emerald-600")}
                {stat("Heart Rate", today_field(|m| m.heart_rate.to_string()), "bpm", "bg-gradient-to-br from-red-500 to-pink-600")}
                {stat("Sleep", today_field(|m| format!("{:.1}", m.sleep_hours)), "hrs", "bg-gradient-to-br from-indigo-500 to-purple-600")}
                {stat("Blood Oxygen", today_field(|m| m.blood_oxygen.to_string()), "%", "bg-gradient-to-br from-sky-500 to-blue-600")}
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-4">"Weekly Steps"</h3>
                <div class="flex items-end justify-between h-40 gap-2">
                    {move || {
                        data.with(|d| {
                            let max = d.weekly.iter().map(|m| m.steps).max().unwrap_or(0).max(1);
                            d.weekly
                                .iter()
                                .map(|m| {
                                    let height = m.steps * 100 / max;
                                    let label = m.weekday_label();
                                    let steps = m.steps;
                                    view! {
                                        <div class="flex-1 flex flex-col items-center justify-end h-full">
                                            <div
                                                class="w-full bg-gradient-to-t from-green-500 to-emerald-400 rounded-t-lg"
                                                style=format!("height: {}%", height)
                                                title=steps.to_string()
                                            ></div>
                                            <span class="text-xs text-gray-500 mt-1">{label}</span>
                                        </div>
                                    }
                                })
                                .collect_view()
                        })
                    }}
                </div>
            </div>

            <ReportSummary report=Signal::derive(move || data.with(|d| d.report.clone())) />
        </div>
    }
}

// =========================================================
// 简易版
// =========================================================

#[component]
fn SimpleDashboard() -> impl IntoView {
    let ctx = use_session();
    let (water, set_water) = signal(WATER_START);
    let report = RwSignal::new(Option::<ReportAnalysis>::None);

    let client = ctx.client();
    spawn_local(async move {
        report.set(latest_analysis(&client).await);
    });

    let diet = move || {
        let plan = report.with(|r| r.as_ref().and_then(|a| a.diet_plan.clone()));
        match plan {
            Some(p) => vec![p.breakfast, p.lunch, p.dinner],
            None => vec![
                "High-protein breakfast with oats".to_string(),
                "Grilled chicken with vegetables".to_string(),
                "Light dinner with salmon".to_string(),
            ],
        }
    };

    let exercises = move || {
        let plan = report.with(|r| r.as_ref().and_then(|a| a.fitness_plan.clone()));
        match plan {
            Some(p) if !p.exercises.is_empty() => p
                .exercises
                .into_iter()
                .map(|e| format!("{} ({})", e.name, e.duration))
                .collect(),
            _ => vec![
                "30 min cardio workout".to_string(),
                "Upper body strength training".to_string(),
            ],
        }
    };

    view! {
        <div class="p-6 space-y-6">
            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-2">"Water Intake"</h3>
                <p class="text-3xl font-bold text-sky-600">{move || format!("{} / {} glasses", water.get(), WATER_GOAL)}</p>
                <div class="flex gap-1 my-3">
                    {(1..=WATER_GOAL)
                        .map(|i| {
                            view! {
                                <div class=move || {
                                    if i <= water.get() { "flex-1 h-3 rounded bg-sky-500" } else { "flex-1 h-3 rounded bg-gray-200" }
                                }></div>
                            }
                        })
                        .collect_view()}
                </div>
                <button
                    class="px-4 py-2 rounded-xl bg-sky-500 text-white disabled:opacity-50"
                    disabled=move || water.get() >= WATER_GOAL
                    on:click=move |_| set_water.update(|w| *w = (*w + 1).min(WATER_GOAL))
                >
                    "+ Add Glass"
                </button>
            </div>

            <ReportSummary report=report.into() />

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-3">"Today's Diet Plan"</h3>
                <ul class="space-y-2">
                    {move || diet().into_iter().map(|meal| view! { <li class="flex gap-2"><Icon path=icons::CHECK class="w-5 h-5 text-green-600" />{meal}</li> }).collect_view()}
                </ul>
            </div>

            <div class="bg-white rounded-2xl p-6 shadow">
                <h3 class="font-bold mb-3">"Fitness Plan"</h3>
                <ul class="space-y-2">
                    {move || exercises().into_iter().map(|ex| view! { <li class="flex gap-2"><Icon path=icons::CHECK class="w-5 h-5 text-emerald-600" />{ex}</li> }).collect_view()}
                </ul>
            </div>
        </div>
    }
}

/// 最新报告摘要卡片；没有报告时引导上传
#[component]
fn ReportSummary(report: Signal<Option<ReportAnalysis>>) -> impl IntoView {
    let ctx = use_session();

    view! {
        <div class="bg-white rounded-2xl p-6 shadow">
            <div class="flex items-center gap-2 mb-2">
                <Icon path=icons::DOCUMENT class="w-5 h-5 text-green-600" />
                <h3 class="font-bold">"Latest Report"</h3>
            </div>
            {move || match report.get() {
                Some(analysis) => view! {
                    <p class="text-3xl font-bold text-green-600">{format!("{:.0}/100", analysis.health_score)}</p>
                    <p class="text-gray-600 mt-1">{analysis.summary}</p>
                }
                .into_any(),
                None => view! {
                    <p class="text-gray-600">"No reports analyzed yet."</p>
                    <button class="mt-2 text-green-600 font-semibold" on:click=move |_| ctx.navigate(View::Report)>
                        "Upload a report"
                    </button>
                }
                .into_any(),
            }}
        </div>
    }
}
