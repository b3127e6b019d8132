//! Matching desired-state rows against the directory and deciding what to update.
use crate::model::{
    DesiredProfile, ProfileField, ProfileFields, SkipReason, SkipReasonKind, SkippedColumn,
    SkippedColumnReason, UpdateQuery, UserRecord,
};

/// Result of comparing a desired row against the current profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDiff {
    pub changes: ProfileFields,
    pub skipped_columns: Vec<SkippedColumn>,
}

/// A rule that can veto the whole update for a matched user.
pub type VetoRule = fn(&UserRecord, &ProfileDiff) -> Option<SkipReasonKind>;

/// Evaluated in order, first match wins.
pub const VETO_RULES: &[VetoRule] = &[veto_elevated_privilege, veto_no_changes];

pub fn veto_elevated_privilege(user: &UserRecord, _diff: &ProfileDiff) -> Option<SkipReasonKind> {
    user.has_elevated_privilege().then_some(SkipReasonKind::AdminUserCannotBeUpdated)
}

pub fn veto_no_changes(_user: &UserRecord, diff: &ProfileDiff) -> Option<SkipReasonKind> {
    diff.changes.is_empty().then_some(SkipReasonKind::AllFieldsAreUpdated)
}

/// First directory member whose profile email equals `email` exactly.
pub fn find_user_by_email<'a>(
    email: &str,
    directory: &'a [UserRecord],
) -> Option<&'a UserRecord> {
    directory
        .iter()
        .find(|u| u.profile.email.as_deref() == Some(email))
}

/// Compare every requested field except `email`. A missing current value counts as empty.
pub fn diff_profile(desired: &DesiredProfile, current: &UserRecord) -> ProfileDiff {
    let mut diff = ProfileDiff::default();
    for (field, wanted) in desired.profile.iter() {
        if field == ProfileField::Email {
            continue;
        }
        let existing = current.profile.get(field).unwrap_or_default();
        if existing == wanted {
            diff.skipped_columns.push(SkippedColumn {
                field,
                reason: SkippedColumnReason::SameWithExisting,
            });
        } else {
            diff.changes.insert(field, wanted);
        }
    }
    diff
}

/// Decide whether and how `users.profile.set` should be called for one row.
pub fn build_update_query(desired: &DesiredProfile, directory: &[UserRecord]) -> UpdateQuery {
    let current = match desired
        .email()
        .and_then(|email| find_user_by_email(email, directory))
    {
        Some(user) => user.clone(),
        None => {
            return UpdateQuery::skipped(
                desired.clone(),
                None,
                vec![SkipReason::from(SkipReasonKind::NoUserFoundForEmail)],
                Vec::new(),
            );
        }
    };

    let diff = diff_profile(desired, &current);

    if let Some(kind) = VETO_RULES.iter().find_map(|rule| rule(&current, &diff)) {
        let skipped_columns = if kind.discards_diff() {
            Vec::new()
        } else {
            diff.skipped_columns
        };
        return UpdateQuery::skipped(
            desired.clone(),
            Some(current),
            vec![SkipReason::from(kind)],
            skipped_columns,
        );
    }

    UpdateQuery::call(desired.clone(), current, diff.changes, diff.skipped_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiParam, UserProfile};

    fn member(id: &str, email: &str, admin: bool) -> UserRecord {
        UserRecord {
            id: id.into(),
            name: id.to_lowercase(),
            profile: UserProfile {
                email: Some(email.into()),
                real_name: Some("田中 二郎".into()),
                display_name: Some("JIRO".into()),
                status_emoji: Some(String::new()),
                ..Default::default()
            },
            is_admin: admin,
            ..Default::default()
        }
    }

    fn directory() -> Vec<UserRecord> {
        vec![
            member("USERID1", "admin@example.com", true),
            member("USERID2", "jiro@example.com", false),
            member("USERID3", "jiro@example.com", false),
        ]
    }

    fn desired(fields: &[(ProfileField, &str)]) -> DesiredProfile {
        DesiredProfile {
            user: None,
            profile: fields.iter().map(|(f, v)| (*f, *v)).collect(),
        }
    }

    #[test]
    fn find_user_returns_first_exact_match() {
        let dir = directory();
        assert_eq!(find_user_by_email("jiro@example.com", &dir).unwrap().id, "USERID2");
        assert!(find_user_by_email("JIRO@example.com", &dir).is_none());
        assert!(find_user_by_email("", &dir).is_none());
    }

    #[test]
    fn missing_email_is_treated_as_no_user_found() {
        let query = build_update_query(&desired(&[(ProfileField::DisplayName, "X")]), &directory());
        assert!(query.skip_call_api);
        assert_eq!(query.skip_reasons[0].reason, SkipReasonKind::NoUserFoundForEmail);
        assert!(query.current_user_info.is_none());
    }

    #[test]
    fn admin_veto_precedes_no_change_veto() {
        let dir = directory();
        let admin = &dir[0];
        let diff = diff_profile(&desired(&[(ProfileField::DisplayName, "JIRO")]), admin);
        assert!(diff.changes.is_empty());
        let first = VETO_RULES.iter().find_map(|rule| rule(admin, &diff));
        assert_eq!(first, Some(SkipReasonKind::AdminUserCannotBeUpdated));
    }

    #[test]
    fn veto_rules_in_isolation() {
        let dir = directory();
        let empty = ProfileDiff::default();
        assert_eq!(veto_elevated_privilege(&dir[1], &empty), None);
        assert_eq!(
            veto_no_changes(&dir[1], &empty),
            Some(SkipReasonKind::AllFieldsAreUpdated)
        );
        let mut changed = ProfileDiff::default();
        changed.changes.insert(ProfileField::Title, "Engineer");
        assert_eq!(veto_no_changes(&dir[1], &changed), None);
    }

    #[test]
    fn absent_current_value_compares_as_empty() {
        let dir = directory();
        let diff = diff_profile(
            &desired(&[(ProfileField::Title, ""), (ProfileField::Phone, "090")]),
            &dir[1],
        );
        assert_eq!(diff.skipped_columns.len(), 1);
        assert_eq!(diff.skipped_columns[0].field, ProfileField::Title);
        assert_eq!(diff.changes.get(ProfileField::Phone), Some("090"));
    }

    #[test]
    fn email_is_never_written_back() {
        let query = build_update_query(
            &desired(&[
                (ProfileField::Email, "jiro@example.com"),
                (ProfileField::StatusEmoji, ":sleepy:"),
            ]),
            &directory(),
        );
        assert_eq!(
            query.api_param,
            ApiParam {
                user: Some("USERID2".into()),
                profile: Some(desired(&[(ProfileField::StatusEmoji, ":sleepy:")]).profile),
            }
        );
        assert!(query.skipped_columns.is_empty());
    }
}
