use super::{nonce, seeded_rng};
use crate::error::{AppError, AppResult};
use crate::request::HttpClient;
use crate::supabase::SupabaseClient;
use crate::supabase::query::{Order, TableQuery};
use crate::supabase::storage::{file_name_with_extension, FileUpload};
use robtor_shared::date::now_rfc3339;
use robtor_shared::{
    BUCKET_AVATARS, ChatRow, EmergencyContact, HealthMetric, LoginActivity, NotificationPrefs,
    PatientProfile, PrivacyPrefs, ProfileRecord, ProfileUpdate, Report, SubscriptionStatus,
    SubscriptionTier, TABLE_CHAT_HISTORY, TABLE_HEALTH_METRICS, TABLE_LOGIN_ACTIVITY,
    TABLE_PROFILES, TABLE_REPORTS,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// 删除账户数据时的顺序，`profiles` 最后删除
const DELETION_ORDER: [&str; 4] = [
    TABLE_CHAT_HISTORY,
    TABLE_REPORTS,
    TABLE_HEALTH_METRICS,
    TABLE_PROFILES,
];

/// 导出的全部用户数据
#[derive(Debug, Clone, Serialize)]
pub struct DataExport {
    pub export_date: String,
    pub user_id: String,
    pub profile: Option<ProfileRecord>,
    pub health_metrics: Vec<HealthMetric>,
    pub reports: Vec<Report>,
    pub chat_history: Vec<ChatRow>,
}

impl DataExport {
    pub fn to_pretty_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self).map_err(AppError::from)
    }

    /// 下载文件名，如 `robtor-health-data-2024-05-01.json`
    pub fn file_name(&self) -> String {
        let date = self.export_date.get(..10).unwrap_or(&self.export_date);
        format!("robtor-health-data-{}.json", date)
    }
}

pub struct ProfileService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> ProfileService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    fn own_row(&self, user_id: &str) -> TableQuery {
        TableQuery::new(TABLE_PROFILES).eq("id", user_id)
    }

    /// 当前用户的档案记录；未登录时返回 `None`
    pub async fn get_profile(&self) -> AppResult<Option<ProfileRecord>> {
        let Some(user_id) = self.client.current_user_id() else {
            return Ok(None);
        };
        let query = TableQuery::new(TABLE_PROFILES)
            .select("*")
            .eq("id", &user_id);
        self.client
            .select_one(&query)
            .await
            .map_err(|e| e.in_op("profile.get"))
    }

    /// 读取并映射为会话内的严格结构
    pub async fn load_patient_profile(&self) -> AppResult<Option<PatientProfile>> {
        Ok(self.get_profile().await?.map(PatientProfile::from))
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> AppResult<()> {
        let user_id = self.client.require_user_id("profile.update")?;
        self.client
            .update(&self.own_row(&user_id), &update)
            .await
            .map_err(|e| e.in_op("profile.update"))
    }

    /// 引导流程完成：数值解析后写回，联系人保存为单元素数组
    pub async fn save_onboarding(&self, profile: &PatientProfile) -> AppResult<()> {
        self.update_profile(ProfileUpdate::from_onboarding(profile))
            .await?;
        info!("onboarding profile saved");
        Ok(())
    }

    pub async fn save_basic_info(&self, update: ProfileUpdate) -> AppResult<()> {
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await
    }

    pub async fn save_emergency_contacts(&self, contacts: &[EmergencyContact]) -> AppResult<()> {
        let update = ProfileUpdate {
            emergency_contact: Some(contacts.to_vec()),
            ..Default::default()
        };
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await
    }

    pub async fn save_notifications(&self, prefs: &NotificationPrefs) -> AppResult<()> {
        let update = ProfileUpdate {
            notifications: Some(*prefs),
            ..Default::default()
        };
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await
    }

    /// 隐私设置（包括两步验证开关）
    pub async fn save_privacy(&self, prefs: &PrivacyPrefs) -> AppResult<()> {
        let update = ProfileUpdate {
            privacy: Some(*prefs),
            ..Default::default()
        };
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await
    }

    /// 只写入套餐字段，不涉及支付
    pub async fn upgrade_subscription(&self, tier: SubscriptionTier) -> AppResult<()> {
        let update = ProfileUpdate {
            subscription_tier: Some(tier),
            subscription_status: Some(SubscriptionStatus::Active),
            ..Default::default()
        };
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await?;
        info!(tier = tier.as_str(), "subscription upgraded");
        Ok(())
    }

    pub async fn set_avatar_url(&self, url: &str) -> AppResult<()> {
        let update = ProfileUpdate {
            avatar_url: Some(url.to_string()),
            ..Default::default()
        };
        self.update_profile(update.with_updated_at(now_rfc3339()))
            .await
    }

    /// 上传头像到公开存储桶并写回地址
    pub async fn upload_avatar(&self, file: &FileUpload) -> AppResult<String> {
        if !file.is_image() {
            return Err(AppError::invalid_input("You must select an image to upload.")
                .in_op("profile.upload_avatar"));
        }

        let path = file_name_with_extension(&nonce(&mut seeded_rng(), 16), file.extension());
        self.client
            .storage()
            .upload(BUCKET_AVATARS, &path, file)
            .await?;

        let url = self.client.storage().public_url(BUCKET_AVATARS, &path);
        self.set_avatar_url(&url).await?;
        Ok(url)
    }

    /// 导出当前用户的所有数据
    ///
    /// 单张表读取失败时以空列表代替。
    pub async fn export_data(&self) -> AppResult<DataExport> {
        let user_id = self.client.require_user_id("profile.export")?;

        let (profile, health_metrics, reports, chat_history) = futures::join!(
            self.get_profile(),
            self.rows_of(TABLE_HEALTH_METRICS, &user_id),
            self.rows_of(TABLE_REPORTS, &user_id),
            self.rows_of(TABLE_CHAT_HISTORY, &user_id),
        );

        let profile = profile.unwrap_or_else(|e| {
            warn!(error = %e, "export: profile unavailable");
            None
        });

        info!(%user_id, "user data exported");
        Ok(DataExport {
            export_date: now_rfc3339(),
            user_id,
            profile,
            health_metrics,
            reports,
            chat_history,
        })
    }

    async fn rows_of<T: DeserializeOwned>(&self, table: &str, user_id: &str) -> Vec<T> {
        let query = TableQuery::new(table).select("*").eq("user_id", user_id);
        self.client.select(&query).await.unwrap_or_else(|e| {
            warn!(table, error = %e, "export: table unavailable");
            Vec::new()
        })
    }

    /// 删除当前用户在各表中的数据
    ///
    /// 某张表删除失败时记录日志并继续，返回失败的表名。
    pub async fn delete_profile_data(&self) -> AppResult<Vec<&'static str>> {
        let user_id = self.client.require_user_id("profile.delete")?;
        let mut failed = Vec::new();

        for table in DELETION_ORDER {
            let column = if table == TABLE_PROFILES { "id" } else { "user_id" };
            let query = TableQuery::new(table).eq(column, &user_id);
            if let Err(e) = self.client.delete(&query).await {
                warn!(table, error = %e, "failed to delete user rows, continuing");
                failed.push(table);
            }
        }

        info!(%user_id, failed = failed.len(), "account data deleted");
        Ok(failed)
    }

    /// 最近 5 次登录记录；未登录时为空
    pub async fn login_activity(&self) -> AppResult<Vec<LoginActivity>> {
        let Some(user_id) = self.client.current_user_id() else {
            return Ok(Vec::new());
        };
        let query = TableQuery::new(TABLE_LOGIN_ACTIVITY)
            .select("*")
            .eq("user_id", &user_id)
            .order("created_at", Order::Desc)
            .limit(5);
        self.client
            .select(&query)
            .await
            .map_err(|e| e.in_op("profile.login_activity"))
    }
}
