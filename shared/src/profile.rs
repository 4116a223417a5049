//! 患者档案模块
//!
//! - `ProfileRecord`: 远端 `profiles` 表中的原始记录（字段均可缺失）
//! - `PatientProfile`: 会话内持有的严格投影
//! - `ProfileUpdate`: 部分更新请求体

use serde::{Deserialize, Deserializer, Serialize};

// =========================================================
// 紧急联系人
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub relation: String,
}

/// 远端 JSON 中的 `null` 视同空字符串
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl EmergencyContact {
    pub fn new(name: &str, phone: &str, relation: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            phone: phone.to_string(),
            relation: relation.to_string(),
        }
    }

    /// 三个字段均已填写
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.phone.is_empty() && !self.relation.is_empty()
    }
}

/// `emergency_contact` 列历史上既存过单个对象也存过数组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactField {
    Many(Vec<EmergencyContact>),
    One(EmergencyContact),
}

impl ContactField {
    /// 主联系人：数组取第一个，对象原样使用
    pub fn primary(&self) -> EmergencyContact {
        match self {
            ContactField::Many(list) => list.first().cloned().unwrap_or_default(),
            ContactField::One(contact) => contact.clone(),
        }
    }

    /// 联系人列表，缺少 id 的条目按位置补齐
    pub fn into_list(self) -> Vec<EmergencyContact> {
        let list = match self {
            ContactField::Many(list) => list,
            ContactField::One(contact) if !contact.name.is_empty() => vec![contact],
            ContactField::One(_) => Vec::new(),
        };

        list.into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                if c.id.is_none() {
                    c.id = Some((i + 1).to_string());
                }
                c
            })
            .collect()
    }
}

/// 紧急联系人列表的增删改
///
/// 三个字段都填写才会写入；`id` 由调用方生成（前端使用时间戳）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactBook {
    contacts: Vec<EmergencyContact>,
}

impl ContactBook {
    pub fn new(contacts: Vec<EmergencyContact>) -> Self {
        Self { contacts }
    }

    pub fn contacts(&self) -> &[EmergencyContact] {
        &self.contacts
    }

    pub fn find(&self, id: &str) -> Option<&EmergencyContact> {
        self.contacts.iter().find(|c| c.id.as_deref() == Some(id))
    }

    pub fn add(&mut self, id: String, draft: &EmergencyContact) -> bool {
        if !draft.is_complete() {
            return false;
        }
        self.contacts.push(EmergencyContact {
            id: Some(id),
            ..draft.clone()
        });
        true
    }

    pub fn update(&mut self, id: &str, draft: &EmergencyContact) -> bool {
        if !draft.is_complete() {
            return false;
        }
        match self.contacts.iter_mut().find(|c| c.id.as_deref() == Some(id)) {
            Some(contact) => {
                contact.name = draft.name.clone();
                contact.phone = draft.phone.clone();
                contact.relation = draft.relation.clone();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.id.as_deref() != Some(id));
        self.contacts.len() != before
    }
}

// =========================================================
// 偏好设置
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub health_alerts: bool,
    pub medication_reminders: bool,
    pub appointment_reminders: bool,
    pub weekly_reports: bool,
    pub marketing_emails: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            health_alerts: true,
            medication_reminders: true,
            appointment_reminders: true,
            weekly_reports: true,
            marketing_emails: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPrefs {
    pub share_health_data: bool,
    pub analytics_tracking: bool,
    pub location_services: bool,
    pub two_step_enabled: bool,
}

impl Default for PrivacyPrefs {
    fn default() -> Self {
        Self {
            share_health_data: false,
            analytics_tracking: true,
            location_services: false,
            two_step_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Elite,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Elite => "elite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    Trialing,
}

// =========================================================
// 远端记录
// =========================================================

/// `profiles` 表的一行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub id: String,
    pub full_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub blood_type: Option<String>,
    pub has_wearable: Option<bool>,
    pub wearable_type: Option<String>,
    pub medical_history: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub emergency_contact: Option<ContactField>,
    pub notifications: Option<NotificationPrefs>,
    pub privacy: Option<PrivacyPrefs>,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub subscription_status: Option<SubscriptionStatus>,
}

impl ProfileRecord {
    pub fn emergency_contacts(&self) -> Vec<EmergencyContact> {
        self.emergency_contact
            .clone()
            .map(ContactField::into_list)
            .unwrap_or_default()
    }
}

// =========================================================
// 内存投影
// =========================================================

/// 会话内持有的患者档案
///
/// 数值字段保留为字符串，与表单输入一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub full_name: String,
    pub age: String,
    pub gender: String,
    pub height: String,
    pub weight: String,
    pub blood_type: String,
    pub has_wearable: bool,
    pub wearable_type: String,
    pub medical_history: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub emergency_contact: EmergencyContact,
}

impl PatientProfile {
    /// 展示用名字，缺省为 "User"
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            "User"
        } else {
            &self.full_name
        }
    }

    /// 切换慢性病选项
    pub fn toggle_condition(&mut self, condition: &str) {
        if let Some(pos) = self.chronic_conditions.iter().position(|c| c == condition) {
            self.chronic_conditions.remove(pos);
        } else {
            self.chronic_conditions.push(condition.to_string());
        }
    }
}

impl From<ProfileRecord> for PatientProfile {
    fn from(record: ProfileRecord) -> Self {
        let emergency_contact = record
            .emergency_contact
            .as_ref()
            .map(ContactField::primary)
            .unwrap_or_default();

        Self {
            full_name: record.full_name.unwrap_or_default(),
            age: record.age.map(|v| v.to_string()).unwrap_or_default(),
            gender: record.gender.unwrap_or_default(),
            height: record.height.map(|v| v.to_string()).unwrap_or_default(),
            weight: record.weight.map(|v| v.to_string()).unwrap_or_default(),
            blood_type: record.blood_type.unwrap_or_default(),
            has_wearable: record.has_wearable.unwrap_or(false),
            wearable_type: record.wearable_type.unwrap_or_default(),
            medical_history: record.medical_history.unwrap_or_default(),
            chronic_conditions: record.chronic_conditions.unwrap_or_default(),
            medications: record.medications.unwrap_or_default(),
            allergies: record.allergies.unwrap_or_default(),
            emergency_contact,
        }
    }
}

// =========================================================
// 部分更新
// =========================================================

/// `profiles` 的部分更新请求体
///
/// 外层 `None` 表示不修改该列；`Some(None)` 写入 null。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wearable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wearable_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_conditions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<Vec<EmergencyContact>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationPrefs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<PrivacyPrefs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<SubscriptionTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ProfileUpdate {
    /// 引导流程完成时写回的字段
    ///
    /// 无法解析或为 0 的数值写入 null；联系人以单元素数组保存。
    pub fn from_onboarding(profile: &PatientProfile) -> Self {
        Self {
            age: Some(parse_leading_int(&profile.age).filter(|v| *v != 0)),
            gender: Some(profile.gender.clone()),
            height: Some(parse_leading_float(&profile.height).filter(|v| *v != 0.0)),
            weight: Some(parse_leading_float(&profile.weight).filter(|v| *v != 0.0)),
            blood_type: Some(profile.blood_type.clone()),
            has_wearable: Some(profile.has_wearable),
            wearable_type: Some(profile.wearable_type.clone()),
            medical_history: Some(profile.medical_history.clone()),
            chronic_conditions: Some(profile.chronic_conditions.clone()),
            medications: Some(profile.medications.clone()),
            allergies: Some(profile.allergies.clone()),
            emergency_contact: Some(vec![profile.emergency_contact.clone()]),
            ..Default::default()
        }
    }

    /// 设置页「个人资料」保存的字段
    pub fn basic_info(
        full_name: &str,
        age: &str,
        gender: &str,
        height: &str,
        weight: &str,
        blood_type: &str,
    ) -> Self {
        Self {
            full_name: Some(full_name.to_string()),
            age: Some(parse_leading_int(age)),
            gender: Some(gender.to_string()),
            height: Some(parse_leading_float(height)),
            weight: Some(parse_leading_float(weight)),
            blood_type: Some(blood_type.to_string()),
            ..Default::default()
        }
    }

    pub fn with_updated_at(mut self, at: String) -> Self {
        self.updated_at = Some(at);
        self
    }
}

/// 解析字符串开头的整数（忽略前导空白与尾随字符）
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

/// 解析字符串开头的浮点数（忽略前导空白与尾随字符）
pub fn parse_leading_float(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let mut seen_dot = false;
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let ok = match c {
            '0'..='9' => true,
            '-' | '+' => i == 0,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    s[..end].parse().ok()
}

// =========================================================
// 登录记录
// =========================================================

/// `login_activity` 表的一行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginActivity {
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Option<String>,
}

impl LoginActivity {
    /// 如 "Chrome on macOS"
    pub fn describe(&self) -> String {
        format!(
            "{} on {}",
            self.browser.as_deref().unwrap_or("Browser"),
            self.os.as_deref().unwrap_or("Unknown OS")
        )
    }

    pub fn is_mobile(&self) -> bool {
        self.device_type.as_deref() == Some("mobile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ProfileRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_emergency_contact_array_takes_first() {
        let r = record(json!({
            "id": "u1",
            "emergency_contact": [
                {"name": "A", "phone": "1", "relation": "spouse"},
                {"name": "B", "phone": "2", "relation": "sibling"}
            ]
        }));
        let p = PatientProfile::from(r);
        assert_eq!(p.emergency_contact, EmergencyContact::new("A", "1", "spouse"));
    }

    #[test]
    fn test_emergency_contact_object_used_as_is() {
        let r = record(json!({
            "id": "u1",
            "emergency_contact": {"name": "A", "phone": "1", "relation": "spouse"}
        }));
        let p = PatientProfile::from(r);
        assert_eq!(p.emergency_contact, EmergencyContact::new("A", "1", "spouse"));
    }

    #[test]
    fn test_emergency_contact_null_or_absent_defaults() {
        let null = PatientProfile::from(record(json!({"id": "u1", "emergency_contact": null})));
        let absent = PatientProfile::from(record(json!({"id": "u1"})));
        assert_eq!(null.emergency_contact, EmergencyContact::default());
        assert_eq!(absent.emergency_contact, EmergencyContact::default());
    }

    #[test]
    fn test_emergency_contact_null_fields_become_empty() {
        let contact = json!({"name": "Bob", "phone": "555", "relation": null});
        let expected = EmergencyContact::new("Bob", "555", "");

        let one = PatientProfile::from(record(json!({"id": "u1", "emergency_contact": contact.clone()})));
        assert_eq!(one.emergency_contact, expected);

        let many = PatientProfile::from(record(json!({
            "id": "u1",
            "full_name": "Jane",
            "emergency_contact": [contact, {"name": null, "phone": null}]
        })));
        assert_eq!(many.full_name, "Jane");
        assert_eq!(many.emergency_contact, expected);
    }

    #[test]
    fn test_absent_scalars_default_to_empty() {
        let p = PatientProfile::from(record(json!({"id": "u1", "gender": null})));
        assert_eq!(p, PatientProfile::default());
    }

    #[test]
    fn test_numbers_render_like_form_input() {
        let p = PatientProfile::from(record(json!({
            "id": "u1",
            "full_name": "Jane",
            "age": 34,
            "height": 170.5,
            "weight": 62.0,
            "has_wearable": true,
            "allergies": ["Peanuts"]
        })));
        assert_eq!(p.age, "34");
        assert_eq!(p.height, "170.5");
        assert_eq!(p.weight, "62");
        assert!(p.has_wearable);
        assert_eq!(p.allergies, vec!["Peanuts".to_string()]);
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let r = record(json!({"id": "u1", "created_at": "2025-01-01", "full_name": "X"}));
        assert_eq!(r.full_name.as_deref(), Some("X"));
    }

    #[test]
    fn test_contact_list_fills_missing_ids() {
        let field = ContactField::Many(vec![
            EmergencyContact::new("A", "1", "spouse"),
            EmergencyContact {
                id: Some("abc".into()),
                ..EmergencyContact::new("B", "2", "friend")
            },
        ]);
        let list = field.into_list();
        assert_eq!(list[0].id.as_deref(), Some("1"));
        assert_eq!(list[1].id.as_deref(), Some("abc"));

        let empty = ContactField::One(EmergencyContact::default()).into_list();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_onboarding_update_parses_numbers_and_wraps_contact() {
        let profile = PatientProfile {
            age: "34 years".into(),
            height: "abc".into(),
            weight: "70.5kg".into(),
            emergency_contact: EmergencyContact::new("A", "1", "spouse"),
            ..Default::default()
        };
        let body = serde_json::to_value(ProfileUpdate::from_onboarding(&profile)).unwrap();
        assert_eq!(body["age"], json!(34));
        assert_eq!(body["height"], json!(null));
        assert_eq!(body["weight"], json!(70.5));
        assert_eq!(
            body["emergency_contact"],
            json!([{"name": "A", "phone": "1", "relation": "spouse"}])
        );
        assert!(body.get("full_name").is_none());
    }

    #[test]
    fn test_leading_number_parsing() {
        assert_eq!(parse_leading_int("  42abc"), Some(42));
        assert_eq!(parse_leading_int("-7"), Some(-7));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_float("1.5.2"), Some(1.5));
        assert_eq!(parse_leading_float("."), None);
    }

    #[test]
    fn test_toggle_condition_adds_and_removes() {
        let mut p = PatientProfile::default();
        p.toggle_condition("Asthma");
        assert_eq!(p.chronic_conditions, vec!["Asthma".to_string()]);
        p.toggle_condition("Asthma");
        assert!(p.chronic_conditions.is_empty());
    }

    #[test]
    fn test_login_activity_fallbacks() {
        let row: LoginActivity = serde_json::from_value(json!({"device_type": "mobile"})).unwrap();
        assert_eq!(row.describe(), "Browser on Unknown OS");
        assert!(row.is_mobile());
    }

    #[test]
    fn test_contact_book_crud() {
        let mut book = ContactBook::new(
            ContactField::One(EmergencyContact::new("Mom", "111", "Parent")).into_list(),
        );
        assert_eq!(book.contacts()[0].id.as_deref(), Some("1"));

        assert!(!book.add("x".into(), &EmergencyContact::new("Dad", "", "Parent")));
        assert!(book.add("1700".into(), &EmergencyContact::new("Dad", "222", "Parent")));
        assert_eq!(book.contacts().len(), 2);

        assert!(book.update("1700", &EmergencyContact::new("Dad", "333", "Parent")));
        assert_eq!(book.find("1700").unwrap().phone, "333");
        assert!(!book.update("missing", &EmergencyContact::new("A", "1", "B")));

        assert!(book.remove("1"));
        assert!(!book.remove("1"));
        assert_eq!(book.contacts().len(), 1);
    }
}
