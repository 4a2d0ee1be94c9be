//! Disk attachments and the diff between observed and desired sets
//!
//! Two attachments are the same only when both the disk id and the mode
//! match. The API has no way to change the mode of an attached disk, so a mode
//! change shows up as one removal (old mode) plus one addition (new mode).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Access mode of an attached disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentMode {
    #[serde(rename = "read-write")]
    ReadWrite,
    #[serde(rename = "read-only")]
    ReadOnly,
}

impl fmt::Display for AttachmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentMode::ReadWrite => write!(f, "read-write"),
            AttachmentMode::ReadOnly => write!(f, "read-only"),
        }
    }
}

impl FromStr for AttachmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rw" | "read-write" => Ok(AttachmentMode::ReadWrite),
            "ro" | "read-only" => Ok(AttachmentMode::ReadOnly),
            other => Err(format!(
                "invalid attachment mode '{other}' (expected rw, ro, read-write or read-only)"
            )),
        }
    }
}

/// Role of a disk on its VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    /// Boot disk, managed with the VM itself
    Os,
    Data,
}

/// One disk attached (or to be attached) to a VM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: String,
    pub attachment_type: AttachmentType,
    pub mode: AttachmentMode,
}

impl AttachmentRecord {
    /// A data disk attachment
    pub fn data(id: impl Into<String>, mode: AttachmentMode) -> Self {
        Self {
            id: id.into(),
            attachment_type: AttachmentType::Data,
            mode,
        }
    }

    fn key(&self) -> (&str, AttachmentMode) {
        (self.id.as_str(), self.mode)
    }
}

impl fmt::Display for AttachmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.mode)
    }
}

/// Parses `disk-id` or `disk-id:mode`; the mode defaults to read-write.
impl FromStr for AttachmentRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, mode) = match s.rsplit_once(':') {
            Some((id, mode)) => (id, mode.parse()?),
            None => (s, AttachmentMode::ReadWrite),
        };
        if id.is_empty() {
            return Err(format!("missing disk id in '{s}'"));
        }
        Ok(AttachmentRecord::data(id, mode))
    }
}

/// Attachments to add and to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Present in desired, absent from observed
    pub added: Vec<AttachmentRecord>,
    /// Present in observed, absent from desired
    pub removed: Vec<AttachmentRecord>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute which attachments must be added and removed to turn `observed`
/// into `desired`, keyed on `(id, mode)`.
///
/// Both output sequences keep the order of the input they came from.
pub fn diff(observed: &[AttachmentRecord], desired: &[AttachmentRecord]) -> DiffResult {
    let observed_keys: HashSet<_> = observed.iter().map(AttachmentRecord::key).collect();
    let desired_keys: HashSet<_> = desired.iter().map(AttachmentRecord::key).collect();

    let added = desired
        .iter()
        .filter(|record| !observed_keys.contains(&record.key()))
        .cloned()
        .collect();
    let removed = observed
        .iter()
        .filter(|record| !desired_keys.contains(&record.key()))
        .cloned()
        .collect();

    DiffResult { added, removed }
}

/// First disk id that appears more than once in `records`, in any mode.
///
/// A VM can hold a disk only once, so a desired set naming the same id twice
/// has no valid end state.
pub fn duplicate_id(records: &[AttachmentRecord]) -> Option<&str> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|record| record.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Reorder `records` to follow the order of `desired`.
///
/// Records matching a desired entry come first in desired order; anything
/// else keeps its relative order at the end.
pub fn order_like(desired: &[AttachmentRecord], records: &[AttachmentRecord]) -> Vec<AttachmentRecord> {
    let mut ordered: Vec<_> = desired
        .iter()
        .filter_map(|d| records.iter().find(|r| r.key() == d.key()))
        .cloned()
        .collect();
    let desired_keys: HashSet<_> = desired.iter().map(AttachmentRecord::key).collect();
    ordered.extend(
        records
            .iter()
            .filter(|r| !desired_keys.contains(&r.key()))
            .cloned(),
    );
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rw(id: &str) -> AttachmentRecord {
        AttachmentRecord::data(id, AttachmentMode::ReadWrite)
    }

    fn ro(id: &str) -> AttachmentRecord {
        AttachmentRecord::data(id, AttachmentMode::ReadOnly)
    }

    #[test]
    fn test_disjoint_sets_partition_exactly() {
        let observed = vec![rw("a"), ro("b")];
        let desired = vec![rw("c"), ro("d")];

        let result = diff(&observed, &desired);

        assert_eq!(result.added, desired);
        assert_eq!(result.removed, observed);
    }

    #[test]
    fn test_identical_sets_produce_empty_diff() {
        let records = vec![rw("a"), ro("b"), rw("c")];
        assert!(diff(&records, &records).is_empty());
    }

    #[test]
    fn test_order_does_not_matter_for_equality() {
        let observed = vec![rw("a"), ro("b")];
        let desired = vec![ro("b"), rw("a")];
        assert!(diff(&observed, &desired).is_empty());
    }

    #[test]
    fn test_empty_observed_adds_everything() {
        let desired = vec![rw("a"), ro("b")];
        let result = diff(&[], &desired);
        assert_eq!(result.added, desired);
        assert!(result.removed.is_empty());
    }

    #[test]
    fn test_empty_desired_removes_everything() {
        let observed = vec![rw("a"), ro("b")];
        let result = diff(&observed, &[]);
        assert!(result.added.is_empty());
        assert_eq!(result.removed, observed);
    }

    #[test]
    fn test_mode_change_is_remove_plus_add() {
        let result = diff(&[rw("a"), rw("keep")], &[ro("a"), rw("keep")]);

        assert_eq!(result.removed, vec![rw("a")]);
        assert_eq!(result.added, vec![ro("a")]);
    }

    #[test]
    fn test_partial_overlap() {
        let result = diff(&[rw("a")], &[rw("a"), ro("b")]);
        assert_eq!(result.added, vec![ro("b")]);
        assert!(result.removed.is_empty());
    }

    #[test]
    fn test_added_and_removed_never_share_a_key() {
        let observed = vec![rw("a"), ro("b"), rw("c"), ro("d")];
        let desired = vec![ro("a"), ro("b"), rw("e"), ro("d")];

        let result = diff(&observed, &desired);

        for added in &result.added {
            assert!(!result.removed.contains(added), "{added} in both sets");
        }
        assert_eq!(result.added, vec![ro("a"), rw("e")]);
        assert_eq!(result.removed, vec![rw("a"), rw("c")]);
    }

    #[test]
    fn test_order_like_follows_desired() {
        let desired = vec![ro("c"), rw("a"), rw("b")];
        let observed = vec![rw("a"), rw("b"), ro("c"), rw("extra")];

        assert_eq!(
            order_like(&desired, &observed),
            vec![ro("c"), rw("a"), rw("b"), rw("extra")]
        );
    }

    #[test]
    fn test_parse_attachment_argument() {
        assert_eq!("disk-1".parse::<AttachmentRecord>().unwrap(), rw("disk-1"));
        assert_eq!("disk-1:ro".parse::<AttachmentRecord>().unwrap(), ro("disk-1"));
        assert_eq!(
            "disk-1:read-write".parse::<AttachmentRecord>().unwrap(),
            rw("disk-1")
        );
        assert!("disk-1:rx".parse::<AttachmentRecord>().is_err());
        assert!(":ro".parse::<AttachmentRecord>().is_err());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(ro("d")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "d", "attachment_type": "data", "mode": "read-only"})
        );
    }

    #[test]
    fn test_duplicate_id_ignores_mode() {
        assert_eq!(duplicate_id(&[rw("a"), ro("b"), ro("a")]), Some("a"));
        assert_eq!(duplicate_id(&[rw("a"), rw("a")]), Some("a"));
        assert_eq!(duplicate_id(&[rw("a"), ro("b")]), None);
        assert_eq!(duplicate_id(&[]), None);
    }
}
