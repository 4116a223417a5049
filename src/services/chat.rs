use crate::error::{AppError, AppResult};
use crate::gateway::Assistant;
use crate::request::HttpClient;
use crate::supabase::SupabaseClient;
use crate::supabase::query::{Order, TableQuery};
use robtor_shared::{ChatMessage, ChatRow, NewChatRow, TABLE_CHAT_HISTORY};
use tracing::{error, info};

/// 一次问答：已保存的用户消息，以及（若成功）已保存的回复
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub user: ChatMessage,
    pub reply: Option<ChatMessage>,
}

pub struct ChatService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> ChatService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    /// 按时间升序的聊天记录；未登录时为空
    pub async fn history(&self) -> AppResult<Vec<ChatMessage>> {
        if self.client.current_user_id().is_none() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new(TABLE_CHAT_HISTORY)
            .select("*")
            .order("created_at", Order::Asc);
        let rows: Vec<ChatRow> = self
            .client
            .select(&query)
            .await
            .map_err(|e| e.in_op("chat.history"))?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    pub async fn send_message(&self, text: &str, is_bot: bool) -> AppResult<ChatMessage> {
        let user_id = self.client.require_user_id("chat.send")?;
        let row = NewChatRow {
            user_id,
            message: text.to_string(),
            is_bot,
        };

        let saved: Vec<ChatRow> = self
            .client
            .insert(TABLE_CHAT_HISTORY, &row)
            .await
            .map_err(|e| e.in_op("chat.send"))?;

        saved
            .into_iter()
            .next()
            .map(ChatMessage::from)
            .ok_or_else(|| AppError::not_found("Message was not returned").in_op("chat.send"))
    }

    pub async fn clear_history(&self) -> AppResult<()> {
        let Some(user_id) = self.client.current_user_id() else {
            return Ok(());
        };
        let query = TableQuery::new(TABLE_CHAT_HISTORY).eq("user_id", &user_id);
        self.client
            .delete(&query)
            .await
            .map_err(|e| e.in_op("chat.clear"))?;
        info!("chat history cleared");
        Ok(())
    }

    /// 保存用户消息，请求 AI 回复并保存
    ///
    /// 用户消息保存失败时返回错误；回复阶段的失败只记日志，用户消息保持已保存。
    pub async fn exchange<A: Assistant + ?Sized>(&self, text: &str, assistant: &A) -> AppResult<ChatTurn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid_input("Message is empty").in_op("chat.exchange"));
        }

        let user = self.send_message(text, false).await?;

        let answer = assistant.generate_response(text).await;
        let reply = match self.send_message(&answer, true).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                error!(error = %e, "failed to save assistant reply");
                None
            }
        };

        Ok(ChatTurn { user, reply })
    }
}
