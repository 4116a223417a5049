use serde::{Deserialize, Serialize};

/// `health_metrics` 表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub steps: i64,
    #[serde(default)]
    pub heart_rate: i64,
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub blood_oxygen: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl HealthMetric {
    /// 图表横轴用的星期缩写，日期无法解析时原样返回
    pub fn weekday_label(&self) -> String {
        crate::date::weekday_short(&self.date).unwrap_or_else(|| self.date.clone())
    }
}

/// 新建指标（插入请求体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHealthMetric {
    pub user_id: String,
    pub date: String,
    pub steps: i64,
    pub heart_rate: i64,
    pub sleep_hours: f64,
    pub blood_oxygen: i64,
}

impl NewHealthMetric {
    /// 首次记录当天指标时的默认值
    pub fn with_defaults(user_id: &str, date: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: date.to_string(),
            steps: 0,
            heart_rate: 70,
            sleep_hours: 0.0,
            blood_oxygen: 98,
        }
    }

    pub fn apply(mut self, patch: &HealthMetricPatch) -> Self {
        if let Some(v) = patch.steps {
            self.steps = v;
        }
        if let Some(v) = patch.heart_rate {
            self.heart_rate = v;
        }
        if let Some(v) = patch.sleep_hours {
            self.sleep_hours = v;
        }
        if let Some(v) = patch.blood_oxygen {
            self.blood_oxygen = v;
        }
        self
    }
}

/// 指标的部分更新，仅序列化已设置的字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetricPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_oxygen: Option<i64>,
}
