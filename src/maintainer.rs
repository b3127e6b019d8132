//! Sequential batch driver: match, diff, update and notify one row at a time.
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use crate::input;
use crate::model::{
    AuthIdentity, DesiredProfile, Notification, NotificationResult, UpdateQuery, UpdateResult,
    UserRecord,
};
use crate::notify::{self, NotificationTemplate};
use crate::reconcile;
use crate::slack::{ProfileSetParam, SlackApi};
use crate::summary::{OperationKind, Outcome, Summary};

/// How the driver handles the change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPolicy {
    pub enabled: bool,
    pub notify_self: bool,
    pub template: NotificationTemplate,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_self: false,
            template: NotificationTemplate::default(),
        }
    }
}

impl From<&crate::config::Notification> for NotifyPolicy {
    fn from(cfg: &crate::config::Notification) -> Self {
        Self {
            enabled: cfg.enabled,
            notify_self: cfg.notify_self,
            template: cfg.template.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    /// No update call was made.
    Skipped,
    Updated {
        notification: Option<NotificationResult>,
    },
    Failed {
        stage: OperationKind,
        error: String,
    },
}

/// Outcome of one desired-state row.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RowReport {
    pub index: usize,
    pub update_query: UpdateQuery,
    #[serde(flatten)]
    pub status: RowStatus,
}

pub struct Maintainer<S> {
    api: S,
    policy: NotifyPolicy,
    auth_user: Option<AuthIdentity>,
    summary: Summary,
}

impl<S: SlackApi> Maintainer<S> {
    pub fn new(api: S, policy: NotifyPolicy) -> Self {
        Self {
            api,
            policy,
            auth_user: None,
            summary: Summary::default(),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn auth_user(&self) -> Option<&AuthIdentity> {
        self.auth_user.as_ref()
    }

    pub fn set_auth_user(&mut self, identity: Option<AuthIdentity>) {
        self.auth_user = identity;
    }

    /// Ask Slack who owns the token and remember the answer.
    #[instrument(skip_all)]
    pub async fn fetch_auth_user(&mut self) -> Result<AuthIdentity> {
        let identity = self.api.auth_test().await?;
        info!(user = %identity.user, team = ?identity.team, "authenticated");
        self.auth_user = Some(identity.clone());
        Ok(identity)
    }

    /// False until an identity has been fetched.
    pub fn is_auth_user(&self, name: &str) -> bool {
        self.auth_user
            .as_ref()
            .is_some_and(|identity| identity.user == name)
    }

    /// Every directory member, following `users.list` pagination.
    #[instrument(skip_all)]
    pub async fn fetch_user_list(&self) -> Result<Vec<UserRecord>> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.users_list(cursor.as_deref()).await?;
            cursor = page.next_cursor().map(str::to_string);
            members.extend(page.members);
            if cursor.is_none() {
                break;
            }
        }
        info!(count = members.len(), "fetched user list");
        Ok(members)
    }

    pub fn build_update_query(
        &self,
        desired: &DesiredProfile,
        directory: &[UserRecord],
    ) -> UpdateQuery {
        reconcile::build_update_query(desired, directory)
    }

    /// Call `users.profile.set` unless the query was vetoed.
    pub async fn apply_update(&mut self, query: UpdateQuery) -> Result<UpdateResult> {
        if query.skip_call_api {
            self.summary.record(OperationKind::ProfileSet, Outcome::Skip);
            return Ok(UpdateResult {
                api_call_response: None,
                update_query: query,
            });
        }
        let param = match (&query.api_param.user, &query.api_param.profile) {
            (Some(user), Some(profile)) => ProfileSetParam {
                user: user.clone(),
                profile: profile.clone(),
            },
            _ => return Err(anyhow!("update query without api parameters")),
        };

        self.summary.record(OperationKind::ProfileSet, Outcome::Try);
        match self.api.users_profile_set(&param).await {
            Ok(response) => {
                self.summary.record(OperationKind::ProfileSet, Outcome::Success);
                Ok(UpdateResult {
                    api_call_response: Some(response),
                    update_query: query,
                })
            }
            Err(err) => {
                self.summary.record(OperationKind::ProfileSet, Outcome::Error);
                Err(err)
            }
        }
    }

    /// DM the updated user with the field diff. `None` when nothing was sent.
    pub async fn notify_updated_user(
        &mut self,
        result: &UpdateResult,
    ) -> Result<Option<NotificationResult>> {
        let message = match notify::compose_message(result, &self.policy.template) {
            Some(message) if self.policy.enabled => message,
            _ => {
                self.summary.record(OperationKind::PostMessage, Outcome::Skip);
                return Ok(None);
            }
        };

        self.summary.record(OperationKind::PostMessage, Outcome::Try);
        match self.api.chat_post_message(&message).await {
            Ok(response) => {
                self.summary.record(OperationKind::PostMessage, Outcome::Success);
                Ok(Some(NotificationResult {
                    notification: Notification { response },
                }))
            }
            Err(err) => {
                self.summary.record(OperationKind::PostMessage, Outcome::Error);
                Err(err)
            }
        }
    }

    fn suppresses_notification(&self, result: &UpdateResult) -> bool {
        !self.policy.notify_self
            && result
                .update_query
                .current_user_info
                .as_ref()
                .is_some_and(|u| self.is_auth_user(&u.name))
    }

    /// Run one row end to end. Remote failures end up in the report, never in `Err`.
    #[instrument(skip_all, fields(row = index))]
    pub async fn process_row(
        &mut self,
        index: usize,
        desired: &DesiredProfile,
        directory: &[UserRecord],
    ) -> RowReport {
        let query = self.build_update_query(desired, directory);
        log_query(index, &query);

        let result = match self.apply_update(query.clone()).await {
            Ok(result) => result,
            Err(err) => {
                error!(?err, "profile update failed");
                return RowReport {
                    index,
                    update_query: query,
                    status: RowStatus::Failed {
                        stage: OperationKind::ProfileSet,
                        error: format!("{err:#}"),
                    },
                };
            }
        };

        let notification = if self.suppresses_notification(&result) {
            info!("not notifying the token owner about their own profile");
            self.summary.record(OperationKind::PostMessage, Outcome::Skip);
            Ok(None)
        } else {
            self.notify_updated_user(&result).await
        };

        let status = match notification {
            Ok(_) if result.update_query.skip_call_api => RowStatus::Skipped,
            Ok(notification) => RowStatus::Updated { notification },
            Err(err) => {
                error!(?err, "notification failed");
                RowStatus::Failed {
                    stage: OperationKind::PostMessage,
                    error: format!("{err:#}"),
                }
            }
        };
        RowReport {
            index,
            update_query: result.update_query,
            status,
        }
    }

    /// Process every row in order; one row's failure never stops the rest.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn update_profiles(
        &mut self,
        rows: &[DesiredProfile],
        directory: &[UserRecord],
    ) -> Vec<RowReport> {
        let mut reports = Vec::with_capacity(rows.len());
        for (index, desired) in rows.iter().enumerate() {
            reports.push(self.process_row(index, desired, directory).await);
        }
        info!(summary = %self.summary, "batch finished");
        reports
    }

    pub async fn update_profiles_from_csv<P: AsRef<Path>>(
        &mut self,
        path: P,
        directory: &[UserRecord],
    ) -> Result<Vec<RowReport>> {
        let rows = input::parse_rows(path)?;
        Ok(self.update_profiles(&rows, directory).await)
    }

    /// Build and log every query without calling Slack. Counters are left alone.
    pub fn plan(&self, rows: &[DesiredProfile], directory: &[UserRecord]) -> Vec<UpdateQuery> {
        rows.iter()
            .enumerate()
            .map(|(index, desired)| {
                let query = self.build_update_query(desired, directory);
                log_query(index, &query);
                query
            })
            .collect()
    }
}

fn log_query(index: usize, query: &UpdateQuery) {
    let email = query.csv_param.email().unwrap_or_default();
    let user = query
        .current_user_info
        .as_ref()
        .map(|u| u.id.as_str())
        .unwrap_or_default();
    let skipped: Vec<&str> = query
        .skipped_columns
        .iter()
        .map(|c| c.field.as_str())
        .collect();
    if query.skip_call_api {
        for reason in &query.skip_reasons {
            warn!(
                row = index,
                email,
                user,
                reason = reason.reason.as_str(),
                "{}",
                reason.message
            );
        }
    } else {
        let changed: Vec<&str> = query
            .api_param
            .profile
            .iter()
            .flat_map(|p| p.iter().map(|(f, _)| f.as_str()))
            .collect();
        info!(row = index, email, user, ?changed, ?skipped, "profile update planned");
    }
}
