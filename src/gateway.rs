//! LLM 网关
//!
//! 通过 OpenRouter 的 chat completions 接口调用多模态模型：
//! - 聊天回复（失败时返回固定提示，不向上抛错）
//! - 报告图片分析与症状评估（返回结构化 JSON）

use crate::config::AssistantConfig;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpMethod, HttpRequest};
use crate::supabase::storage::FileUpload;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use robtor_shared::{ReportAnalysis, SymptomAssessment};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, warn};

// =========================================================
// 固定文案与提示词
// =========================================================

pub const MISSING_KEY_NOTICE: &str = "Error: OpenRouter API Key not configured. Please add ROBTOR_OPENROUTER_API_KEY to your build environment.";

pub const CONNECTION_FALLBACK: &str =
    "I'm having trouble connecting to my AI brain right now. Please try again later.";

const PERSONA_PROMPT: &str = "You are Robtor, a helpful and empathetic personal AI health assistant. Provide helpful, concise, and safe responses. If the user asks for medical advice, kindly remind them that you are an AI and they should consult a doctor for serious concerns. Keep the tone professional yet warm. Do not make up facts.";

const REPORT_PROMPT: &str = r#"You are an expert medical AI assistant. Analyze this medical report image.

Extract the following information and return it in valid JSON format ONLY (no markdown formatting, just the raw JSON object):
{
    "health_score": <number between 0-100 based on overall results>,
    "summary": "<brief 1-sentence summary of the user's health status>",
    "results": [
        {
            "test_name": "<name of the test, e.g. HbA1c>",
            "value": "<the value found, e.g. 5.4%>",
            "status": "<Normal|Borderline|High|Low>",
            "normal_range": "<the reference range, e.g. 4.0-5.6%>",
            "interpretation": "<brief explanation of what this means>"
        }
    ],
    "recommendations": [
        "<specific actionable recommendation 1>",
        "<specific actionable recommendation 2>",
        "<specific actionable recommendation 3>"
    ],
    "diet_plan": {
        "breakfast": "<personalized breakfast recommendation>",
        "lunch": "<personalized lunch recommendation>",
        "dinner": "<personalized dinner recommendation>",
        "snacks": ["<snack 1>", "<snack 2>"],
        "avoid": ["<food to avoid 1>", "<food to avoid 2>"]
    },
    "fitness_plan": {
        "routine_name": "<name for this routine, e.g. Heart-Healthy Walk>",
        "exercises": [
            {
                "name": "<exercise name>",
                "duration": "<duration, e.g. 20 mins>",
                "intensity": "<Low|Moderate|High>",
                "benefit": "<why this is recommended based on report>"
            }
        ],
        "weekly_goal": "<summary goal for the week>"
    }
}

If the image is not a medical report, return a JSON with health_score: 0 and summary: "This does not appear to be a valid medical report.""#;

fn symptom_prompt(symptoms: &[String]) -> String {
    format!(
        r#"You are an expert medical AI. Analyze the following symptoms: {}.

Provide a health assessment in valid JSON format ONLY:
{{
    "possible_condition": "<most likely condition>",
    "confidence_score": <number between 0-100>,
    "explanation": "<brief explanation of what this means>",
    "recommendations": [
        {{
            "title": "<recommendation title>",
            "description": "<long description>",
            "type": "<lifestyle|medication|monitoring>"
        }}
    ],
    "urgent_signs": ["<sign 1>", "<sign 2>"],
    "disclaimer": "This is not a medical diagnosis. Always consult a professional."
}}"#,
        symptoms.join(", ")
    )
}

// =========================================================
// 抽象
// =========================================================

/// AI 助手能力
#[async_trait::async_trait(?Send)]
pub trait Assistant {
    /// 聊天回复，永不失败
    async fn generate_response(&self, message: &str) -> String;
    async fn analyze_image(&self, file: &FileUpload) -> AppResult<ReportAnalysis>;
    async fn analyze_symptoms(&self, symptoms: &[String]) -> AppResult<SymptomAssessment>;
}

// =========================================================
// OpenRouter 实现
// =========================================================

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<GatewayErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct AssistantGateway<C: HttpClient> {
    http: C,
    config: AssistantConfig,
}

impl<C: HttpClient> AssistantGateway<C> {
    pub fn new(http: C, config: AssistantConfig) -> Self {
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key().is_some()
    }

    /// 发送一次补全请求，返回第一条回复文本
    async fn complete(&self, messages: serde_json::Value, operation: &str) -> AppResult<String> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| AppError::configuration("OpenRouter API Key missing").in_op(operation))?;

        let req = HttpRequest::new(&self.config.completions_url, HttpMethod::Post)
            .with_header("Authorization", &format!("Bearer {}", api_key))
            .with_header("HTTP-Referer", &self.config.referer)
            .with_header("X-Title", &self.config.app_title)
            .with_body(json!({
                "model": self.config.model,
                "messages": messages,
            }));

        let resp = self
            .http
            .send(req)
            .await
            .map_err(|e| e.in_op(operation.to_string()))?;

        let parsed: CompletionResponse = match serde_json::from_str(&resp.body) {
            Ok(p) => p,
            Err(e) if resp.ok() => return Err(AppError::from(e).in_op(operation.to_string())),
            Err(_) => {
                return Err(AppError::gateway(format!("OpenRouter returned HTTP {}", resp.status))
                    .in_op(operation.to_string()));
            }
        };

        if let Some(err) = parsed.error {
            let message = err
                .message
                .unwrap_or_else(|| "OpenRouter API Error".to_string());
            return Err(AppError::gateway(message).in_op(operation.to_string()));
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::gateway("OpenRouter returned no choices").in_op(operation.to_string()))?;

        debug!(operation, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait::async_trait(?Send)]
impl<C: HttpClient> Assistant for AssistantGateway<C> {
    async fn generate_response(&self, message: &str) -> String {
        if !self.is_configured() {
            warn!("assistant key missing, returning configuration notice");
            return MISSING_KEY_NOTICE.to_string();
        }

        let messages = json!([
            { "role": "system", "content": PERSONA_PROMPT },
            { "role": "user", "content": message },
        ]);

        match self.complete(messages, "gateway.chat").await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "assistant reply failed");
                CONNECTION_FALLBACK.to_string()
            }
        }
    }

    async fn analyze_image(&self, file: &FileUpload) -> AppResult<ReportAnalysis> {
        let data_url = format!(
            "data:{};base64,{}",
            file.content_type,
            STANDARD.encode(&file.bytes)
        );
        let messages = json!([{
            "role": "user",
            "content": [
                { "type": "text", "text": REPORT_PROMPT },
                { "type": "image_url", "image_url": { "url": data_url } },
            ],
        }]);

        let text = self.complete(messages, "gateway.analyze_image").await?;
        parse_json(&text).map_err(|e| {
            error!(error = %e, "report analysis was not valid JSON");
            e.in_op("gateway.analyze_image")
        })
    }

    async fn analyze_symptoms(&self, symptoms: &[String]) -> AppResult<SymptomAssessment> {
        if symptoms.is_empty() {
            return Err(AppError::invalid_input("Please select at least one symptom")
                .in_op("gateway.analyze_symptoms"));
        }

        let messages = json!([{ "role": "user", "content": symptom_prompt(symptoms) }]);
        let text = self.complete(messages, "gateway.analyze_symptoms").await?;
        parse_json(&text).map_err(|e| {
            error!(error = %e, "symptom assessment was not valid JSON");
            e.in_op("gateway.analyze_symptoms")
        })
    }
}

/// 去掉模型输出中的 markdown 代码块标记
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_json<T: DeserializeOwned>(text: &str) -> AppResult<T> {
    serde_json::from_str(&strip_code_fences(text)).map_err(AppError::from)
}

// =========================================================
// 测试工具: MockAssistant
// =========================================================

#[cfg(test)]
pub struct MockAssistant {
    pub reply: String,
    pub analysis: Option<ReportAnalysis>,
    pub assessment: Option<SymptomAssessment>,
    pub prompts: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl MockAssistant {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            analysis: None,
            assessment: None,
            prompts: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn with_analysis(mut self, analysis: ReportAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl Assistant for MockAssistant {
    async fn generate_response(&self, message: &str) -> String {
        self.prompts.borrow_mut().push(message.to_string());
        self.reply.clone()
    }

    async fn analyze_image(&self, file: &FileUpload) -> AppResult<ReportAnalysis> {
        self.prompts.borrow_mut().push(file.name.clone());
        self.analysis
            .clone()
            .ok_or_else(|| AppError::gateway("model unavailable"))
    }

    async fn analyze_symptoms(&self, symptoms: &[String]) -> AppResult<SymptomAssessment> {
        self.prompts.borrow_mut().push(symptoms.join(", "));
        self.assessment
            .clone()
            .ok_or_else(|| AppError::gateway("model unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, VAR_OPENROUTER_API_KEY};
    use crate::error::AppErrorStatus;
    use crate::request::MockHttpClient;

    const URL: &str = "https://llm.test/v1/chat/completions";

    fn gateway(key: Option<&str>) -> AssistantGateway<MockHttpClient> {
        let key = key.map(str::to_string);
        let config = AppConfig::from_lookup(|k| {
            if k == VAR_OPENROUTER_API_KEY {
                key.clone()
            } else {
                None
            }
        });
        AssistantGateway::new(
            MockHttpClient::new(),
            config.assistant.with_completions_url(URL),
        )
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_missing_key_returns_notice_without_request() {
        let gw = gateway(None);
        assert_eq!(gw.generate_response("hi").await, MISSING_KEY_NOTICE);
        assert!(gw.http.requests.borrow().is_empty());

        let placeholder = gateway(Some("your_openrouter_key_here"));
        assert_eq!(placeholder.generate_response("hi").await, MISSING_KEY_NOTICE);
    }

    #[tokio::test]
    async fn test_chat_sends_headers_and_persona() {
        let gw = gateway(Some("sk-or-1"));
        gw.http
            .mock_response(HttpMethod::Post, URL, 200, completion("Drink water."));

        assert_eq!(gw.generate_response("I feel tired").await, "Drink water.");

        let sent = gw.http.requests_to(HttpMethod::Post, URL);
        let headers = &sent[0].2;
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer sk-or-1");
        assert_eq!(headers.get("X-Title").unwrap(), "Robtor Health Assistant");
        assert_eq!(headers.get("HTTP-Referer").unwrap(), "http://localhost:8080");

        let body: serde_json::Value = serde_json::from_str(sent[0].3.as_deref().unwrap()).unwrap();
        assert_eq!(body["model"], "google/gemini-2.0-flash-001");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "I feel tired");
    }

    #[tokio::test]
    async fn test_chat_failure_returns_fallback() {
        let gw = gateway(Some("sk-or-1"));
        gw.http.mock_response(
            HttpMethod::Post,
            URL,
            402,
            json!({ "error": { "message": "Insufficient credits" } }),
        );

        assert_eq!(gw.generate_response("hi").await, CONNECTION_FALLBACK);
    }

    #[tokio::test]
    async fn test_analyze_image_parses_fenced_json() {
        let gw = gateway(Some("sk-or-1"));
        gw.http.mock_response(
            HttpMethod::Post,
            URL,
            200,
            completion("```json\n{\"health_score\": 82, \"summary\": \"Mostly fine\", \"results\": [{\"test_name\": \"LDL\", \"status\": \"High\"}]}\n```"),
        );

        let file = FileUpload::new("lab.png", "image/png", vec![0xde, 0xad, 0xbe, 0xef]);
        let analysis = gw.analyze_image(&file).await.unwrap();

        assert_eq!(analysis.health_score, 82.0);
        assert_eq!(analysis.abnormal_results().count(), 1);

        let sent = gw.http.requests_to(HttpMethod::Post, URL);
        let body: serde_json::Value = serde_json::from_str(sent[0].3.as_deref().unwrap()).unwrap();
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,3q2+7w=="
        );
    }

    #[tokio::test]
    async fn test_analyze_image_gateway_error() {
        let gw = gateway(Some("sk-or-1"));
        gw.http.mock_response(
            HttpMethod::Post,
            URL,
            200,
            json!({ "error": { "message": "Model overloaded" } }),
        );

        let file = FileUpload::new("lab.png", "image/png", vec![1]);
        let err = gw.analyze_image(&file).await.unwrap_err();
        assert_eq!(err.status, AppErrorStatus::Gateway);
        assert_eq!(err.message(), "Model overloaded");
    }

    #[tokio::test]
    async fn test_analyze_symptoms_non_json_is_serialization_error() {
        let gw = gateway(Some("sk-or-1"));
        gw.http.mock_response(
            HttpMethod::Post,
            URL,
            200,
            completion("Sorry, I cannot help with that."),
        );

        let err = gw
            .analyze_symptoms(&["Headache".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.status, AppErrorStatus::Serialization);
    }

    #[tokio::test]
    async fn test_analyze_symptoms_prompt_lists_symptoms() {
        let gw = gateway(Some("sk-or-1"));
        gw.http.mock_response(
            HttpMethod::Post,
            URL,
            200,
            completion(r#"{"possible_condition":"Common cold","confidence_score":70,"recommendations":[{"title":"Rest","description":"Sleep more","type":"lifestyle"}]}"#),
        );

        let symptoms = vec!["Cough".to_string(), "Fever".to_string()];
        let assessment = gw.analyze_symptoms(&symptoms).await.unwrap();
        assert_eq!(assessment.possible_condition, "Common cold");
        assert_eq!(assessment.recommendations[0].kind, "lifestyle");

        let sent = gw.http.requests_to(HttpMethod::Post, URL);
        assert!(sent[0].3.as_deref().unwrap().contains("Cough, Fever"));
    }

    #[tokio::test]
    async fn test_analysis_without_key_is_configuration_error() {
        let gw = gateway(None);
        let err = gw
            .analyze_symptoms(&["Cough".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.status, AppErrorStatus::Configuration);
    }
}
