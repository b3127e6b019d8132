//! Desired-state input: CSV rows mapped onto typed profile updates.
use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use tracing::debug;

use crate::model::{DesiredProfile, ProfileField, ProfileFields, UserRecord};

const USER_COLUMN: &str = "user";

/// Keep only allow-listed profile columns and the bare `user` column.
/// Unknown columns are dropped silently. Output order follows [`ProfileField::ALL`].
pub fn csv_row_to_profile_update_body(row: &HashMap<String, String>) -> DesiredProfile {
    let profile: ProfileFields = ProfileField::ALL
        .into_iter()
        .filter_map(|field| row.get(field.as_str()).map(|v| (field, v.clone())))
        .collect();
    let user = row
        .get(USER_COLUMN)
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    DesiredProfile { user, profile }
}

/// Read a CSV file with a header row. Row order is preserved.
pub fn parse_rows<P: AsRef<Path>>(path: P) -> Result<Vec<DesiredProfile>> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("failed to open CSV: {}", path.display()))?;
    read_rows(reader).with_context(|| format!("failed to parse CSV: {}", path.display()))
}

/// Duplicate `user` or profile columns are rejected; unknown columns may repeat.
pub fn read_rows<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<DesiredProfile>> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Spreadsheet exports often start with a UTF-8 BOM.
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut seen = HashSet::new();
    for header in &headers {
        let known = header == USER_COLUMN || ProfileField::from_column(header).is_some();
        if known && !seen.insert(header.as_str()) {
            bail!("duplicate column '{header}' in CSV header");
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("invalid CSV record #{}", index + 1))?;
        let row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        let desired = csv_row_to_profile_update_body(&row);
        debug!(index, email = ?desired.email(), fields = desired.profile.len(), "parsed row");
        rows.push(desired);
    }
    Ok(rows)
}

/// Write `members` as a desired-state CSV: a `user` column then every profile field.
///
/// Bots, deactivated accounts and members without an email are left out unless `all` is set,
/// since those rows could never be matched back to a user.
pub fn write_template<W: io::Write>(members: &[UserRecord], all: bool, w: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(w);
    let mut header = vec![USER_COLUMN];
    header.extend(ProfileField::ALL.iter().map(|f| f.as_str()));
    out.write_record(&header)?;

    let mut written = 0usize;
    for member in members.iter().filter(|m| all || is_template_candidate(m)) {
        let mut record = vec![member.id.as_str()];
        record.extend(
            ProfileField::ALL
                .iter()
                .map(|f| member.profile.get(*f).unwrap_or_default()),
        );
        out.write_record(&record)?;
        written += 1;
    }
    out.flush().context("failed to write CSV template")?;
    debug!(written, total = members.len(), "wrote template");
    Ok(())
}

fn is_template_candidate(member: &UserRecord) -> bool {
    let has_email = member.profile.email.as_deref().is_some_and(|e| !e.is_empty());
    has_email && !member.is_bot && !member.deleted
}
