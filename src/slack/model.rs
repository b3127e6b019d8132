use serde::{Deserialize, Serialize};

use crate::model::{ProfileFields, UserRecord};

/// Body of `users.profile.set`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileSetParam {
    pub user: String,
    pub profile: ProfileFields,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// One page of `users.list`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsersListPage {
    pub ok: bool,
    #[serde(default)]
    pub members: Vec<UserRecord>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

impl UsersListPage {
    /// Cursor for the following page, `None` on the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|m| m.next_cursor.as_str())
            .filter(|c| !c.is_empty())
    }
}
