use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Slack profile fields that may be driven from a desired-state row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Email,
    RealName,
    DisplayName,
    FirstName,
    LastName,
    Title,
    Phone,
    StatusText,
    StatusEmoji,
}

impl ProfileField {
    pub const ALL: [ProfileField; 9] = [
        ProfileField::Email,
        ProfileField::RealName,
        ProfileField::DisplayName,
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Title,
        ProfileField::Phone,
        ProfileField::StatusText,
        ProfileField::StatusEmoji,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Email => "email",
            ProfileField::RealName => "real_name",
            ProfileField::DisplayName => "display_name",
            ProfileField::FirstName => "first_name",
            ProfileField::LastName => "last_name",
            ProfileField::Title => "title",
            ProfileField::Phone => "phone",
            ProfileField::StatusText => "status_text",
            ProfileField::StatusEmoji => "status_emoji",
        }
    }

    /// Exact, case-sensitive lookup of a column name.
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field/value list. Serializes as a JSON object keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields(Vec<(ProfileField, String)>);

impl ProfileFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position of an existing field.
    pub fn insert(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(f, v)| (f.as_str().to_string(), Value::String(v.to_string())))
            .collect();
        Value::Object(map)
    }
}

impl<S: Into<String>> FromIterator<(ProfileField, S)> for ProfileFields {
    fn from_iter<I: IntoIterator<Item = (ProfileField, S)>>(iter: I) -> Self {
        let mut fields = ProfileFields::new();
        for (f, v) in iter {
            fields.insert(f, v);
        }
        fields
    }
}

impl Serialize for ProfileFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

/// Current profile as returned by `users.list`. Unknown keys are kept verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_emoji: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Email => &self.email,
            ProfileField::RealName => &self.real_name,
            ProfileField::DisplayName => &self.display_name,
            ProfileField::FirstName => &self.first_name,
            ProfileField::LastName => &self.last_name,
            ProfileField::Title => &self.title,
            ProfileField::Phone => &self.phone,
            ProfileField::StatusText => &self.status_text,
            ProfileField::StatusEmoji => &self.status_emoji,
        };
        value.as_deref()
    }
}

/// A directory member.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_primary_owner: bool,
    #[serde(default)]
    pub is_restricted: bool,
    #[serde(default)]
    pub is_ultra_restricted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Admin, owner or primary owner. Restricted (guest) accounts are not elevated.
    pub fn has_elevated_privilege(&self) -> bool {
        self.is_admin || self.is_owner || self.is_primary_owner
    }
}

/// One desired-state row: intended profile values keyed by email.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DesiredProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub profile: ProfileFields,
}

impl DesiredProfile {
    pub fn email(&self) -> Option<&str> {
        self.profile.get(ProfileField::Email)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SkippedColumnReason {
    #[serde(rename = "same_with_exsiting")]
    SameWithExisting,
}

impl SkippedColumnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkippedColumnReason::SameWithExisting => "same_with_exsiting",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedColumn {
    pub field: ProfileField,
    pub reason: SkippedColumnReason,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReasonKind {
    NoUserFoundForEmail,
    AdminUserCannotBeUpdated,
    AllFieldsAreUpdated,
}

impl SkipReasonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReasonKind::NoUserFoundForEmail => "no_user_found_for_email",
            SkipReasonKind::AdminUserCannotBeUpdated => "admin_user_cannot_be_updated",
            SkipReasonKind::AllFieldsAreUpdated => "all_fields_are_updated",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SkipReasonKind::NoUserFoundForEmail => {
                "指定されたメールアドレスを持つSlackユーザーが見つかりませんでした"
            }
            SkipReasonKind::AdminUserCannotBeUpdated => {
                "管理者ユーザーのプロフィールを更新することはできません"
            }
            SkipReasonKind::AllFieldsAreUpdated => {
                "全ての項目が更新済みだったので、更新APIの呼び出しをスキップしました"
            }
        }
    }

    /// Whether the per-field comparison is thrown away when this veto fires.
    pub fn discards_diff(&self) -> bool {
        !matches!(self, SkipReasonKind::AllFieldsAreUpdated)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkipReason {
    pub reason: SkipReasonKind,
    pub message: String,
}

impl From<SkipReasonKind> for SkipReason {
    fn from(reason: SkipReasonKind) -> Self {
        Self {
            reason,
            message: reason.message().to_string(),
        }
    }
}

/// Parameters for `users.profile.set`. Both are `None` exactly when the call is skipped.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ApiParam {
    pub user: Option<String>,
    pub profile: Option<ProfileFields>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuery {
    pub skip_call_api: bool,
    pub skip_reasons: Vec<SkipReason>,
    pub skipped_columns: Vec<SkippedColumn>,
    pub current_user_info: Option<UserRecord>,
    pub csv_param: DesiredProfile,
    pub api_param: ApiParam,
}

impl UpdateQuery {
    pub fn skipped(
        csv_param: DesiredProfile,
        current_user_info: Option<UserRecord>,
        reasons: Vec<SkipReason>,
        skipped_columns: Vec<SkippedColumn>,
    ) -> Self {
        Self {
            skip_call_api: true,
            skip_reasons: reasons,
            skipped_columns,
            current_user_info,
            csv_param,
            api_param: ApiParam::default(),
        }
    }

    pub fn call(
        csv_param: DesiredProfile,
        current_user_info: UserRecord,
        profile: ProfileFields,
        skipped_columns: Vec<SkippedColumn>,
    ) -> Self {
        let api_param = ApiParam {
            user: Some(current_user_info.id.clone()),
            profile: Some(profile),
        };
        Self {
            skip_call_api: false,
            skip_reasons: Vec::new(),
            skipped_columns,
            current_user_info: Some(current_user_info),
            csv_param,
            api_param,
        }
    }
}

/// Generic Slack Web API reply; everything besides `ok`/`error` stays in `rest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlackResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub api_call_response: Option<SlackResponse>,
    pub update_query: UpdateQuery,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationResult {
    pub notification: Notification,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub response: SlackResponse,
}

/// Identity of the token owner as reported by `auth.test`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthIdentity {
    pub ok: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}
