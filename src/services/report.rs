use super::{nonce, seeded_rng};
use crate::error::AppResult;
use crate::gateway::Assistant;
use crate::request::HttpClient;
use crate::supabase::SupabaseClient;
use crate::supabase::query::{Order, TableQuery};
use crate::supabase::storage::{file_name_with_extension, FileUpload};
use rand::Rng;
use robtor_shared::chrono::Utc;
use robtor_shared::{BUCKET_REPORTS, NewReport, Report, ReportAnalysis, TABLE_REPORTS};
use tracing::info;

pub struct ReportService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> ReportService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    /// 最新一份报告；未登录时为 `None`
    pub async fn latest_report(&self) -> AppResult<Option<Report>> {
        let Some(user_id) = self.client.current_user_id() else {
            return Ok(None);
        };
        let query = TableQuery::new(TABLE_REPORTS)
            .select("*")
            .eq("user_id", &user_id)
            .order("created_at", Order::Desc)
            .limit(1);
        self.client
            .select_one(&query)
            .await
            .map_err(|e| e.in_op("report.latest"))
    }

    /// 上传报告图片，交给 AI 分析，保存分析结果
    pub async fn analyze_and_store<A: Assistant + ?Sized>(
        &self,
        file: &FileUpload,
        assistant: &A,
    ) -> AppResult<ReportAnalysis> {
        let millis = Utc::now().timestamp_millis();
        self.analyze_and_store_at(file, assistant, &mut seeded_rng(), millis)
            .await
    }

    /// 可注入随机源与时间戳的版本
    pub async fn analyze_and_store_at<A, R>(
        &self,
        file: &FileUpload,
        assistant: &A,
        rng: &mut R,
        millis: i64,
    ) -> AppResult<ReportAnalysis>
    where
        A: Assistant + ?Sized,
        R: Rng,
    {
        let user_id = self.client.require_user_id("report.analyze")?;
        let path = object_path(&user_id, millis, &nonce(rng, 9), file.extension());

        self.client
            .storage()
            .upload(BUCKET_REPORTS, &path, file)
            .await
            .map_err(|e| e.in_op("report.analyze"))?;

        info!(%path, "report uploaded, starting analysis");
        let analysis = assistant
            .analyze_image(file)
            .await
            .map_err(|e| e.in_op("report.analyze"))?;

        let row = NewReport {
            user_id,
            file_name: file.name.clone(),
            file_url: path,
            analysis_result: analysis.clone(),
        };
        let _: Vec<Report> = self
            .client
            .insert(TABLE_REPORTS, &row)
            .await
            .map_err(|e| e.in_op("report.analyze"))?;

        info!(score = analysis.health_score, "report analysis stored");
        Ok(analysis)
    }
}

/// `<user_id>/<millis>_<nonce>.<ext>`
fn object_path(user_id: &str, millis: i64, nonce: &str, extension: &str) -> String {
    file_name_with_extension(&format!("{}/{}_{}", user_id, millis, nonce), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppErrorStatus;
    use crate::gateway::MockAssistant;
    use crate::request::HttpMethod;
    use crate::supabase::tests::{rest_url, signed_in_client};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use serde_json::json;

    fn lab_file() -> FileUpload {
        FileUpload::new("blood-test.png", "image/png", vec![1, 2, 3])
    }

    fn analysis() -> ReportAnalysis {
        ReportAnalysis {
            health_score: 76.0,
            summary: "Slightly elevated cholesterol".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_object_path_layout() {
        assert_eq!(
            object_path("u1", 1714550400000, "abc123xyz", "png"),
            "u1/1714550400000_abc123xyz.png"
        );
        assert_eq!(
            object_path("u1", 1714550400000, "abc123xyz", ""),
            "u1/1714550400000_abc123xyz"
        );
    }

    #[tokio::test]
    async fn test_latest_report_query() {
        let client = signed_in_client("u1");
        let url = rest_url(
            "/rest/v1/reports?select=*&user_id=eq.u1&order=created_at.desc&limit=1",
        );
        client.http().mock_response(
            HttpMethod::Get,
            &url,
            200,
            json!([{
                "id": 3,
                "user_id": "u1",
                "file_name": "lab.png",
                "file_url": "u1/1_abc.png",
                "analysis_result": {"health_score": 90, "summary": "Good"}
            }]),
        );

        let report = client.reports().latest_report().await.unwrap().unwrap();
        assert_eq!(report.analysis_result.unwrap().summary, "Good");
    }

    fn upload_url(millis: i64, seed: u64) -> String {
        let name = nonce(&mut SmallRng::seed_from_u64(seed), 9);
        rest_url(&format!("/storage/v1/object/reports/u1/{}_{}.png", millis, name))
    }

    #[tokio::test]
    async fn test_analyze_and_store_flow() {
        let client = signed_in_client("u1");
        let upload = upload_url(1714550400000, 1);
        client
            .http()
            .mock_response(HttpMethod::Post, &upload, 200, json!({"Key": "reports/u1/x.png"}));
        let insert = rest_url("/rest/v1/reports");
        client.http().mock_response(
            HttpMethod::Post,
            &insert,
            201,
            json!([{"id": 5, "user_id": "u1", "file_name": "blood-test.png", "file_url": "x"}]),
        );
        let assistant = MockAssistant::replying("").with_analysis(analysis());

        let result = client
            .reports()
            .analyze_and_store_at(&lab_file(), &assistant, &mut SmallRng::seed_from_u64(1), 1714550400000)
            .await
            .unwrap();

        assert_eq!(result, analysis());
        assert_eq!(client.http().requests_to(HttpMethod::Post, &upload).len(), 1);

        let inserts = client.http().requests_to(HttpMethod::Post, &insert);
        let body: serde_json::Value = serde_json::from_str(inserts[0].3.as_deref().unwrap()).unwrap();
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["file_name"], "blood-test.png");
        assert!(body["file_url"].as_str().unwrap().starts_with("u1/1714550400000_"));
        assert_eq!(body["analysis_result"]["health_score"], 76.0);
    }

    #[tokio::test]
    async fn test_analysis_failure_stores_nothing() {
        let client = signed_in_client("u1");
        let upload = upload_url(1, 2);
        client
            .http()
            .mock_response(HttpMethod::Post, &upload, 200, json!({"Key": "x"}));
        let assistant = MockAssistant::replying("");

        let err = client
            .reports()
            .analyze_and_store_at(&lab_file(), &assistant, &mut SmallRng::seed_from_u64(2), 1)
            .await
            .unwrap_err();

        assert_eq!(err.status, AppErrorStatus::Gateway);
        assert!(
            client
                .http()
                .requests_to(HttpMethod::Post, &rest_url("/rest/v1/reports"))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_upload_failure_skips_analysis() {
        let client = signed_in_client("u1");
        let assistant = MockAssistant::replying("").with_analysis(analysis());

        let err = client
            .reports()
            .analyze_and_store_at(&lab_file(), &assistant, &mut SmallRng::seed_from_u64(3), 1)
            .await
            .unwrap_err();

        assert_eq!(err.status, AppErrorStatus::NotFound);
        assert!(assistant.prompts.borrow().is_empty());
    }
}
