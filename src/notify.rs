//! Change notification sent to a user after their profile was updated.
use serde::{Deserialize, Serialize};

use crate::model::UpdateResult;

const BEFORE_LABEL: &str = "変更前: ";
const AFTER_LABEL: &str = "変更後: ";

const DEFAULT_ICON_URL: &str = "https://slack-files2.s3-us-west-2.amazonaws.com/avatars/2016-04-18/35486615538_c9bc6670992704e477bd_88.png";
const DEFAULT_COLOR: &str = "#81C784";

/// Static informational attachment appended after the diff section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
}

/// Sender identity and static parts of every change notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationTemplate {
    pub icon_url: String,
    pub color: Option<String>,
    pub text: Option<String>,
    pub notices: Vec<Notice>,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            icon_url: DEFAULT_ICON_URL.to_string(),
            color: Some(DEFAULT_COLOR.to_string()),
            text: None,
            notices: vec![
                Notice {
                    title: "Slackの運用改善に関する周知".to_string(),
                    title_link: Some(
                        "https://mediado.slack.com/archives/C03TWFV95/p1527578576000324"
                            .to_string(),
                    ),
                },
                Notice {
                    title: "Slack運用に関する問い合わせ".to_string(),
                    title_link: None,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentField {
    pub short: bool,
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
}

impl From<&Notice> for Attachment {
    fn from(notice: &Notice) -> Self {
        Attachment {
            title: Some(notice.title.clone()),
            title_link: notice.title_link.clone(),
            ..Default::default()
        }
    }
}

/// `chat.postMessage` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostMessage {
    pub channel: String,
    pub as_user: bool,
    pub icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

pub fn diff_value(old: &str, new: &str) -> String {
    format!("{BEFORE_LABEL}{old}\n{AFTER_LABEL}{new}")
}

/// Build the message for an applied update, or `None` when the update was skipped.
///
/// The user id is used as the channel, so the message arrives as a DM from the app.
/// One attachment is emitted per changed field, followed by the template notices in order.
pub fn compose_message(
    result: &UpdateResult,
    template: &NotificationTemplate,
) -> Option<PostMessage> {
    let query = &result.update_query;
    if query.skip_call_api {
        return None;
    }
    let channel = query.api_param.user.clone()?;
    let changes = query.api_param.profile.as_ref()?;
    let current = query.current_user_info.as_ref();

    let mut attachments: Vec<Attachment> = changes
        .iter()
        .map(|(field, new)| {
            let old = current
                .and_then(|u| u.profile.get(field))
                .unwrap_or_default();
            Attachment {
                color: template.color.clone(),
                fields: vec![AttachmentField {
                    short: false,
                    title: field.as_str().to_string(),
                    value: diff_value(old, new),
                }],
                ..Default::default()
            }
        })
        .collect();
    attachments.extend(template.notices.iter().map(Attachment::from));

    Some(PostMessage {
        channel,
        as_user: false,
        icon_url: template.icon_url.clone(),
        text: template.text.clone(),
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DesiredProfile, ProfileField, ProfileFields, SkipReason, SkipReasonKind, UpdateQuery,
        UserProfile, UserRecord,
    };
    use serde_json::json;

    fn jiro() -> UserRecord {
        UserRecord {
            id: "USERID2".into(),
            name: "jiro".into(),
            profile: UserProfile {
                real_name: Some("田中 二郎".into()),
                display_name: Some("JIRO".into()),
                status_text: Some(String::new()),
                status_emoji: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn applied(changes: &[(ProfileField, &str)]) -> UpdateResult {
        let profile: ProfileFields = changes.iter().map(|(f, v)| (*f, *v)).collect();
        UpdateResult {
            api_call_response: None,
            update_query: UpdateQuery::call(
                DesiredProfile::default(),
                jiro(),
                profile,
                Vec::new(),
            ),
        }
    }

    #[test]
    fn single_changed_field_message() {
        let result = applied(&[(ProfileField::StatusEmoji, ":sleepy:")]);
        let msg = compose_message(&result, &NotificationTemplate::default()).unwrap();
        assert_eq!(msg.channel, "USERID2");
        assert!(!msg.as_user);
        assert_eq!(msg.icon_url, DEFAULT_ICON_URL);

        let value = serde_json::to_value(&msg.attachments).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(
            value[0],
            json!({
                "color": "#81C784",
                "fields": [{
                    "short": false,
                    "title": "status_emoji",
                    "value": "変更前: \n変更後: :sleepy:"
                }]
            })
        );
        assert_eq!(
            value[1],
            json!({
                "title": "Slackの運用改善に関する周知",
                "title_link": "https://mediado.slack.com/archives/C03TWFV95/p1527578576000324"
            })
        );
        assert_eq!(value[2], json!({ "title": "Slack運用に関する問い合わせ" }));
    }

    #[test]
    fn one_attachment_per_changed_field_then_notices() {
        let result = applied(&[
            (ProfileField::DisplayName, "JIRO-T"),
            (ProfileField::Title, "Engineer"),
        ]);
        let msg = compose_message(&result, &NotificationTemplate::default()).unwrap();
        assert_eq!(msg.attachments.len(), 4);
        assert_eq!(msg.attachments[0].fields[0].value, "変更前: JIRO\n変更後: JIRO-T");
        assert_eq!(msg.attachments[1].fields[0].value, "変更前: \n変更後: Engineer");
        assert_eq!(msg.attachments[2].title.as_deref(), Some("Slackの運用改善に関する周知"));
    }

    #[test]
    fn skipped_update_yields_no_message() {
        let result = UpdateResult {
            api_call_response: None,
            update_query: UpdateQuery::skipped(
                DesiredProfile::default(),
                Some(jiro()),
                vec![SkipReason::from(SkipReasonKind::AllFieldsAreUpdated)],
                Vec::new(),
            ),
        };
        assert!(compose_message(&result, &NotificationTemplate::default()).is_none());
    }

    #[test]
    fn template_from_yaml_uses_defaults_for_missing_keys() {
        let template: NotificationTemplate =
            serde_yaml::from_str("text: \"updated\"\nnotices: []\n").unwrap();
        assert_eq!(template.icon_url, DEFAULT_ICON_URL);
        assert_eq!(template.text.as_deref(), Some("updated"));
        assert!(template.notices.is_empty());
    }
}
