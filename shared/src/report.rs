//! 报告与 AI 分析结果
//!
//! 分析结果来自 LLM 的 JSON 文本，所有字段都允许缺失。

use serde::{Deserialize, Serialize};

// =========================================================
// 报告图片分析
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestResult {
    pub test_name: String,
    pub value: String,
    /// Normal | Borderline | High | Low
    pub status: String,
    pub normal_range: String,
    pub interpretation: String,
}

impl TestResult {
    pub fn is_normal(&self) -> bool {
        self.status.eq_ignore_ascii_case("normal")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DietPlan {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exercise {
    pub name: String,
    pub duration: String,
    pub intensity: String,
    pub benefit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessPlan {
    pub routine_name: String,
    pub exercises: Vec<Exercise>,
    pub weekly_goal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportAnalysis {
    /// 0-100
    pub health_score: f64,
    pub summary: String,
    pub results: Vec<TestResult>,
    pub recommendations: Vec<String>,
    pub diet_plan: Option<DietPlan>,
    pub fitness_plan: Option<FitnessPlan>,
}

impl ReportAnalysis {
    /// 模型判定图片不是医疗报告时返回 0 分
    pub fn is_valid_report(&self) -> bool {
        self.health_score > 0.0
    }

    pub fn abnormal_results(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.is_normal())
    }
}

// =========================================================
// 报告记录
// =========================================================

/// `reports` 表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub user_id: String,
    pub file_name: String,
    pub file_url: String,
    #[serde(default)]
    pub analysis_result: Option<ReportAnalysis>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 插入请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReport {
    pub user_id: String,
    pub file_name: String,
    pub file_url: String,
    pub analysis_result: ReportAnalysis,
}

// =========================================================
// 症状评估
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    /// lifestyle | medication | monitoring
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomAssessment {
    pub possible_condition: String,
    pub confidence_score: f64,
    pub explanation: String,
    pub recommendations: Vec<Recommendation>,
    pub urgent_signs: Vec<String>,
    pub disclaimer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_analysis_fills_defaults() {
        let a: ReportAnalysis = serde_json::from_str(
            r#"{"health_score": 0, "summary": "This does not appear to be a valid medical report."}"#,
        )
        .unwrap();
        assert!(!a.is_valid_report());
        assert!(a.results.is_empty());
        assert!(a.diet_plan.is_none());
    }

    #[test]
    fn test_abnormal_results_skip_normal() {
        let a = ReportAnalysis {
            health_score: 80.0,
            results: vec![
                TestResult {
                    test_name: "HbA1c".into(),
                    status: "High".into(),
                    ..Default::default()
                },
                TestResult {
                    test_name: "LDL".into(),
                    status: "normal".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let names: Vec<_> = a.abnormal_results().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["HbA1c"]);
    }

    #[test]
    fn test_recommendation_type_field() {
        let r: Recommendation =
            serde_json::from_str(r#"{"title":"Rest","description":"Sleep","type":"lifestyle"}"#)
                .unwrap();
        assert_eq!(r.kind, "lifestyle");
    }
}
