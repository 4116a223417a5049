use crate::date::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// `chat_history` 表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRow {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 插入请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatRow {
    pub user_id: String,
    pub message: String,
    pub is_bot: bool,
}

/// 界面使用的聊天消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: i64, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// 历史为空时展示的欢迎语
    pub fn welcome(patient_name: &str) -> Self {
        Self::new(
            0,
            format!(
                "Hello {}! I'm Robtor, your AI health assistant. How can I help you today?",
                patient_name
            ),
            Sender::Bot,
        )
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

impl From<ChatRow> for ChatMessage {
    fn from(row: ChatRow) -> Self {
        let timestamp = row
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Self {
            id: row.id,
            text: row.message,
            sender: if row.is_bot { Sender::Bot } else { Sender::User },
            timestamp,
        }
    }
}
