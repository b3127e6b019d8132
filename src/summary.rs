//! Counters for the remote calls made during one batch run.
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    ProfileSet,
    PostMessage,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ProfileSet => "profileSet",
            OperationKind::PostMessage => "postMessage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Try,
    Skip,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Counters {
    #[serde(rename = "try")]
    pub tried: u64,
    pub skip: u64,
    pub success: u64,
    pub error: u64,
}

impl Counters {
    fn bump(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Try => &mut self.tried,
            Outcome::Skip => &mut self.skip,
            Outcome::Success => &mut self.success,
            Outcome::Error => &mut self.error,
        };
        *slot += 1;
    }
}

/// Per-run counters. Only ever incremented.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub profile_set: Counters,
    pub post_message: Counters,
}

impl Summary {
    pub fn record(&mut self, kind: OperationKind, outcome: Outcome) {
        self.counters_mut(kind).bump(outcome);
    }

    pub fn counters(&self, kind: OperationKind) -> &Counters {
        match kind {
            OperationKind::ProfileSet => &self.profile_set,
            OperationKind::PostMessage => &self.post_message,
        }
    }

    fn counters_mut(&mut self, kind: OperationKind) -> &mut Counters {
        match kind {
            OperationKind::ProfileSet => &mut self.profile_set,
            OperationKind::PostMessage => &mut self.post_message,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in [OperationKind::ProfileSet, OperationKind::PostMessage]
            .into_iter()
            .enumerate()
        {
            let c = self.counters(kind);
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}: try={} skip={} success={} error={}",
                kind.as_str(),
                c.tried,
                c.skip,
                c.success,
                c.error
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_at_zero() {
        let summary = Summary::default();
        let zero = json!({ "try": 0, "skip": 0, "success": 0, "error": 0 });
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({ "profileSet": zero, "postMessage": zero })
        );
    }

    #[test]
    fn record_targets_one_kind() {
        let mut summary = Summary::default();
        summary.record(OperationKind::ProfileSet, Outcome::Try);
        summary.record(OperationKind::ProfileSet, Outcome::Success);
        summary.record(OperationKind::PostMessage, Outcome::Skip);
        summary.record(OperationKind::PostMessage, Outcome::Skip);
        assert_eq!(
            summary.profile_set,
            Counters {
                tried: 1,
                skip: 0,
                success: 1,
                error: 0,
            }
        );
        assert_eq!(summary.post_message.skip, 2);
        assert_eq!(
            summary.to_string(),
            "profileSet: try=1 skip=0 success=1 error=0, postMessage: try=0 skip=2 success=0 error=0"
        );
    }
}
