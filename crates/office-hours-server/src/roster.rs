//! Staff roster files.
//!
//! The roster is a TOML document with one `[[staff]]` table per staff member
//! and their timeslots in unix seconds:
//!
//! ```toml
//! [[staff]]
//! id = 1001
//! name = "Ada Lovelace"
//!
//! [[staff.timeslots]]
//! starts_at = 1700000000
//! ends_at = 1700007200
//! location = "MCB 100"
//! ```

use std::{collections::BTreeSet, path::Path};

use office_hours_core::{StaffId, StaffMember, Timeslot, Timestamp};
use serde::Deserialize;

/// Roster loading errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// The file could not be read.
    #[error("cannot read roster: {0}")]
    Io(String),

    /// The document is not a valid roster.
    #[error("invalid roster: {0}")]
    Parse(String),

    /// Two entries share a staff id.
    #[error("staff member {0} is listed twice")]
    DuplicateStaff(StaffId),

    /// A timeslot ends before it starts.
    #[error("staff member {staff} has a timeslot ending before it starts ({starts_at}..{ends_at})")]
    InvertedTimeslot {
        /// Staff member
        staff: StaffId,
        /// Start, unix seconds
        starts_at: u64,
        /// End, unix seconds
        ends_at: u64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterFile {
    #[serde(default)]
    staff: Vec<StaffEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaffEntry {
    id: u64,
    name: String,
    #[serde(default)]
    timeslots: Vec<TimeslotEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeslotEntry {
    starts_at: u64,
    ends_at: u64,
    location: Option<String>,
}

/// Parse a roster document.
pub fn parse_roster(source: &str) -> Result<Vec<StaffMember>, RosterError> {
    let file: RosterFile = toml::from_str(source).map_err(|e| RosterError::Parse(e.to_string()))?;

    let mut seen = BTreeSet::new();
    let mut roster = Vec::with_capacity(file.staff.len());
    for entry in file.staff {
        let id = StaffId(entry.id);
        if !seen.insert(id) {
            return Err(RosterError::DuplicateStaff(id));
        }

        let mut member = StaffMember::new(id, entry.name);
        for slot in entry.timeslots {
            if slot.ends_at <= slot.starts_at {
                return Err(RosterError::InvertedTimeslot {
                    staff: id,
                    starts_at: slot.starts_at,
                    ends_at: slot.ends_at,
                });
            }
            let mut timeslot = Timeslot::new(
                Timestamp::from_secs(slot.starts_at),
                Timestamp::from_secs(slot.ends_at),
            );
            timeslot.location = slot.location;
            member = member.with_timeslot(timeslot);
        }
        roster.push(member);
    }

    Ok(roster)
}

/// Read and parse a roster file.
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<StaffMember>, RosterError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| RosterError::Io(format!("{}: {e}", path.as_ref().display())))?;
    parse_roster(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"
        [[staff]]
        id = 1001
        name = "Ada Lovelace"

        [[staff.timeslots]]
        starts_at = 1700000000
        ends_at = 1700007200
        location = "MCB 100"

        [[staff.timeslots]]
        starts_at = 1700100000
        ends_at = 1700103600

        [[staff]]
        id = 1002
        name = "Alan Turing"
    "#;

    #[test]
    fn parses_staff_and_timeslots() {
        let roster = parse_roster(ROSTER).unwrap();

        assert_eq!(roster.len(), 2);
        let ada = &roster[0];
        assert_eq!(ada.id, StaffId(1001));
        assert_eq!(ada.timeslots.len(), 2);
        assert_eq!(ada.timeslots[0].starts_at, Timestamp::from_secs(1_700_000_000));
        assert_eq!(ada.timeslots[0].location.as_deref(), Some("MCB 100"));
        assert_eq!(ada.timeslots[1].location, None);
        assert!(roster[1].timeslots.is_empty());
    }

    #[test]
    fn empty_document_is_empty_roster() {
        assert!(parse_roster("").unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let source = r#"
            [[staff]]
            id = 1
            name = "A"
            [[staff]]
            id = 1
            name = "B"
        "#;
        assert_eq!(parse_roster(source), Err(RosterError::DuplicateStaff(StaffId(1))));
    }

    #[test]
    fn inverted_timeslot_is_rejected() {
        let source = r#"
            [[staff]]
            id = 1
            name = "A"
            [[staff.timeslots]]
            starts_at = 20
            ends_at = 10
        "#;
        assert!(matches!(parse_roster(source), Err(RosterError::InvertedTimeslot { .. })));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let source = r#"
            [[staff]]
            id = 1
            name = "A"
            email = "a@example.edu"
        "#;
        assert!(matches!(parse_roster(source), Err(RosterError::Parse(_))));
    }

    #[test]
    fn load_roster_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, ROSTER).unwrap();

        assert_eq!(load_roster(&path).unwrap().len(), 2);
        assert!(matches!(load_roster(dir.path().join("missing.toml")), Err(RosterError::Io(_))));
    }
}
