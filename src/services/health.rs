use super::seeded_rng;
use crate::error::{AppError, AppResult};
use crate::request::HttpClient;
use crate::supabase::SupabaseClient;
use crate::supabase::query::{Order, TableQuery};
use rand::Rng;
use robtor_shared::chrono::NaiveDate;
use robtor_shared::date::{format_date, today, trailing_days};
use robtor_shared::{HealthMetric, HealthMetricPatch, NewHealthMetric, TABLE_HEALTH_METRICS};
use tracing::{debug, info};

/// 演示数据覆盖的天数（含今天）
pub const DEMO_DAYS: u64 = 7;

pub struct HealthService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> HealthService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    fn table(&self) -> TableQuery {
        TableQuery::new(TABLE_HEALTH_METRICS).select("*")
    }

    /// 全部指标，按日期倒序
    pub async fn metrics(&self) -> AppResult<Vec<HealthMetric>> {
        let query = self.table().order("date", Order::Desc);
        self.client
            .select(&query)
            .await
            .map_err(|e| e.in_op("health.metrics"))
    }

    /// 图表用的 7 条指标，按日期升序
    pub async fn weekly_metrics(&self) -> AppResult<Vec<HealthMetric>> {
        let query = self.table().order("date", Order::Asc).limit(7);
        self.client
            .select(&query)
            .await
            .map_err(|e| e.in_op("health.weekly_metrics"))
    }

    pub async fn today_metric(&self) -> AppResult<Option<HealthMetric>> {
        self.metric_on(today()).await
    }

    pub async fn metric_on(&self, date: NaiveDate) -> AppResult<Option<HealthMetric>> {
        let query = self.table().eq("date", &format_date(date));
        self.client
            .select_one(&query)
            .await
            .map_err(|e| e.in_op("health.metric_on"))
    }

    /// 更新今天的指标；不存在时以默认值新建
    pub async fn upsert_today(&self, patch: &HealthMetricPatch) -> AppResult<HealthMetric> {
        self.upsert_on(today(), patch).await
    }

    pub async fn upsert_on(&self, date: NaiveDate, patch: &HealthMetricPatch) -> AppResult<HealthMetric> {
        let user_id = self.client.require_user_id("health.upsert")?;

        let rows: Vec<HealthMetric> = match self.metric_on(date).await? {
            Some(existing) => {
                debug!(id = existing.id, "updating existing metric");
                let query = TableQuery::new(TABLE_HEALTH_METRICS).eq("id", &existing.id.to_string());
                self.client.update_returning(&query, patch).await?
            }
            None => {
                let row = NewHealthMetric::with_defaults(&user_id, &format_date(date)).apply(patch);
                self.client.insert(TABLE_HEALTH_METRICS, &row).await?
            }
        };

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Metric was not returned").in_op("health.upsert"))
    }

    /// 写入最近 7 天的随机演示数据（按 user_id,date 合并）
    pub async fn seed_demo_data(&self) -> AppResult<()> {
        self.seed_demo_data_with(&mut seeded_rng(), today()).await
    }

    pub async fn seed_demo_data_with<R: Rng>(&self, rng: &mut R, end: NaiveDate) -> AppResult<()> {
        let user_id = self.client.require_user_id("health.seed")?;
        let rows = demo_rows(rng, &user_id, end);

        self.client
            .upsert(TABLE_HEALTH_METRICS, "user_id,date", &rows)
            .await
            .map_err(|e| e.in_op("health.seed"))?;

        info!(days = rows.len(), "demo health data seeded");
        Ok(())
    }
}

fn demo_rows<R: Rng>(rng: &mut R, user_id: &str, end: NaiveDate) -> Vec<NewHealthMetric> {
    trailing_days(end, DEMO_DAYS)
        .into_iter()
        .map(|day| NewHealthMetric {
            user_id: user_id.to_string(),
            date: format_date(day),
            steps: rng.gen_range(5000..10000),
            heart_rate: rng.gen_range(60..80),
            sleep_hours: rng.gen_range(5..9) as f64,
            blood_oxygen: rng.gen_range(95..100),
        })
        .collect()
}
