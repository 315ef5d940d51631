//! Room conflict detection.
//!
//! Reservations occupy half-open intervals `[start, end)` measured in epoch
//! seconds, so an application ending at 10:00 and another starting at 10:00
//! on the same room do not conflict.

use crate::models::{Application, ApplicationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    /// Returns `None` unless `start < end`.
    pub fn new(start: i64, end: i64) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub(crate) fn new_unchecked(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// The status that holds a room against other applications.
pub const BLOCKING_STATUS: ApplicationStatus = ApplicationStatus::Approved;

pub fn holds_room(status: ApplicationStatus) -> bool {
    status == BLOCKING_STATUS
}

/// Whether `other` blocks `candidate`: same room, overlapping interval,
/// `other` approved and `candidate` still in play.
pub fn conflicts_with(candidate: &Application, other: &Application) -> bool {
    candidate.id != other.id
        && candidate.status != ApplicationStatus::Rejected
        && candidate.room_id == other.room_id
        && holds_room(other.status)
        && candidate.time_range().overlaps(&other.time_range())
}

/// Lowest id among the applications that block `candidate`.
pub fn find_conflict_id<'a, I>(candidate: &Application, others: I) -> Option<i32>
where
    I: IntoIterator<Item = &'a Application>,
{
    others
        .into_iter()
        .filter(|other| conflicts_with(candidate, other))
        .map(|other| other.id)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: i32, room_id: i32, start_time: i64, end_time: i64, status: ApplicationStatus) -> Application {
        Application {
            id,
            applicant_id: id,
            room_id,
            organization: "Student union".into(),
            phone: "010-1234567".into(),
            event: "Rehearsal".into(),
            start_time,
            end_time,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn ranges_require_positive_length() {
        assert!(TimeRange::new(10, 20).is_some());
        assert!(TimeRange::new(20, 20).is_none());
        assert!(TimeRange::new(30, 20).is_none());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let morning = TimeRange::new(100, 200).unwrap();
        let noon = TimeRange::new(200, 300).unwrap();
        assert!(!morning.overlaps(&noon));
        assert!(!noon.overlaps(&morning));
    }

    #[test]
    fn contained_and_partial_ranges_overlap() {
        let outer = TimeRange::new(100, 400).unwrap();
        let inner = TimeRange::new(150, 200).unwrap();
        let tail = TimeRange::new(350, 500).unwrap();
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&tail));
        assert!(!inner.overlaps(&tail));
    }

    #[test]
    fn only_approved_applications_block() {
        let candidate = app(1, 7, 100, 200, ApplicationStatus::Pending);
        let approved = app(2, 7, 150, 250, ApplicationStatus::Approved);
        let pending = app(3, 7, 150, 250, ApplicationStatus::Pending);
        let rejected = app(4, 7, 150, 250, ApplicationStatus::Rejected);

        assert!(conflicts_with(&candidate, &approved));
        assert!(!conflicts_with(&candidate, &pending));
        assert!(!conflicts_with(&candidate, &rejected));
    }

    #[test]
    fn other_rooms_and_self_are_ignored() {
        let candidate = app(1, 7, 100, 200, ApplicationStatus::Approved);
        let other_room = app(2, 8, 100, 200, ApplicationStatus::Approved);
        assert!(!conflicts_with(&candidate, &other_room));
        assert!(!conflicts_with(&candidate, &candidate.clone()));
    }

    #[test]
    fn rejected_candidates_never_conflict() {
        let candidate = app(1, 7, 100, 200, ApplicationStatus::Rejected);
        let approved = app(2, 7, 100, 200, ApplicationStatus::Approved);
        assert!(!conflicts_with(&candidate, &approved));
    }

    #[test]
    fn lookup_returns_lowest_conflicting_id() {
        let candidate = app(5, 7, 100, 200, ApplicationStatus::Pending);
        let rows = vec![
            app(9, 7, 190, 260, ApplicationStatus::Approved),
            app(3, 7, 50, 101, ApplicationStatus::Approved),
            app(2, 7, 200, 300, ApplicationStatus::Approved),
            candidate.clone(),
        ];
        assert_eq!(find_conflict_id(&candidate, &rows), Some(3));
        assert_eq!(find_conflict_id(&candidate, &rows[2..]), None);
    }
}
