//! Leave approval engine.
//!
//! Pure decision logic: given a snapshot of the conflict state around the
//! candidate dates, decide which dates are approved and which are declined,
//! and emit the Leave/Replacement rows the caller should insert. The HTTP
//! handler applies the whole plan inside a single transaction, so the batch
//! becomes visible atomically. There is no isolation between reading the
//! snapshot and committing the writes; concurrent batches can race past the
//! checks before either commits.

use chrono::NaiveDate;

/// Same-day absentees must stay below this fraction of total staff.
pub const CAPACITY_RATIO: f64 = 0.33;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    CapacityReached,
    ReplacementOnLeave,
    MutualCover,
    ReplacementBooked,
}

impl DeclineReason {
    pub fn label(&self) -> &'static str {
        match self {
            DeclineReason::CapacityReached => "daily absence capacity reached",
            DeclineReason::ReplacementOnLeave => "replacement is on leave that day",
            DeclineReason::MutualCover => "mutual cover on the same day",
            DeclineReason::ReplacementBooked => "replacement already covering someone",
        }
    }
}

/// One covering assignment: who stands in for whom on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub employee_on_leave_id: u64,
    pub replacement_employee_id: u64,
    pub date: NaiveDate,
}

/// Conflict state loaded for the candidate dates of one batch.
///
/// `leaves` and `assignments` only need to cover the dates under
/// evaluation; rows on other dates never influence a decision. Leave rows
/// are kept as a plain list because duplicate (employee, date) pairs are
/// possible through admin edits and each row counts toward capacity.
#[derive(Debug, Default, Clone)]
pub struct ConflictSnapshot {
    total_employees: i64,
    leaves: Vec<(u64, NaiveDate)>,
    assignments: Vec<Assignment>,
}

impl ConflictSnapshot {
    pub fn new(
        total_employees: i64,
        leaves: impl IntoIterator<Item = (u64, NaiveDate)>,
        assignments: impl IntoIterator<Item = Assignment>,
    ) -> Self {
        Self {
            total_employees,
            leaves: leaves.into_iter().collect(),
            assignments: assignments.into_iter().collect(),
        }
    }

    fn leaves_on(&self, date: NaiveDate) -> usize {
        self.leaves.iter().filter(|(_, d)| *d == date).count()
    }

    fn has_leave(&self, employee_id: u64, date: NaiveDate) -> bool {
        self.leaves.iter().any(|&(e, d)| e == employee_id && d == date)
    }

    fn within_capacity(&self, date: NaiveDate) -> bool {
        if self.total_employees == 0 {
            return true;
        }
        (self.leaves_on(date) as f64) / (self.total_employees as f64) < CAPACITY_RATIO
    }

    /// Evaluate one candidate date. Checks run in a fixed order and stop
    /// at the first failure.
    fn decision(
        &self,
        employee_id: u64,
        replacement_employee_id: u64,
        date: NaiveDate,
    ) -> Option<DeclineReason> {
        if !self.within_capacity(date) {
            return Some(DeclineReason::CapacityReached);
        }

        if self.has_leave(replacement_employee_id, date) {
            return Some(DeclineReason::ReplacementOnLeave);
        }

        // A covers B while B covers A on the same day is disallowed.
        let mutual = self.assignments.iter().any(|a| {
            a.employee_on_leave_id == replacement_employee_id
                && a.replacement_employee_id == employee_id
                && a.date == date
        });
        if mutual {
            return Some(DeclineReason::MutualCover);
        }

        let booked = self
            .assignments
            .iter()
            .any(|a| a.replacement_employee_id == replacement_employee_id && a.date == date);
        if booked {
            return Some(DeclineReason::ReplacementBooked);
        }

        None
    }
}

/// Result of planning one batch: the approved/declined partition of the
/// input dates plus the rows to insert for the approved ones.
#[derive(Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub approved: Vec<NaiveDate>,
    pub declined: Vec<(NaiveDate, DeclineReason)>,
    pub new_leaves: Vec<(u64, NaiveDate)>,
    pub new_assignments: Vec<Assignment>,
}

/// Plan a leave batch for one employee/replacement pair.
///
/// Dates are evaluated independently, in input order. Approved dates are
/// fed back into the working snapshot, so a duplicate date later in the
/// same batch sees the earlier approval. Declined dates produce no rows;
/// earlier approvals in the batch are not rolled back when a later date
/// fails its checks.
pub fn plan_batch(
    mut snapshot: ConflictSnapshot,
    employee_id: u64,
    replacement_employee_id: u64,
    dates: &[NaiveDate],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for &date in dates {
        match snapshot.decision(employee_id, replacement_employee_id, date) {
            Some(reason) => outcome.declined.push((date, reason)),
            None => {
                let assignment = Assignment {
                    employee_on_leave_id: employee_id,
                    replacement_employee_id,
                    date,
                };
                snapshot.leaves.push((employee_id, date));
                snapshot.assignments.push(assignment);

                outcome.new_leaves.push((employee_id, date));
                outcome.new_assignments.push(assignment);
                outcome.approved.push(date);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn leave(employee_id: u64, date: NaiveDate) -> (u64, NaiveDate) {
        (employee_id, date)
    }

    fn assignment(on_leave: u64, replacement: u64, date: NaiveDate) -> Assignment {
        Assignment {
            employee_on_leave_id: on_leave,
            replacement_employee_id: replacement,
            date,
        }
    }

    #[test]
    fn approved_and_declined_partition_the_input() {
        // Employee 2 is already covering employee 3 on day 11, so that
        // date must fall out while the others go through.
        let snapshot = ConflictSnapshot::new(
            10,
            [leave(3, d(11))],
            [assignment(3, 2, d(11))],
        );
        let dates = [d(10), d(11), d(12)];

        let outcome = plan_batch(snapshot, 1, 2, &dates);

        assert_eq!(outcome.approved, vec![d(10), d(12)]);
        assert_eq!(
            outcome.declined,
            vec![(d(11), DeclineReason::ReplacementBooked)]
        );

        let mut seen: Vec<NaiveDate> = outcome
            .approved
            .iter()
            .copied()
            .chain(outcome.declined.iter().map(|(date, _)| *date))
            .collect();
        seen.sort();
        assert_eq!(seen, dates.to_vec());
    }

    #[test]
    fn empty_batch_plans_nothing() {
        let snapshot = ConflictSnapshot::new(10, [leave(3, d(11))], []);

        let outcome = plan_batch(snapshot, 1, 2, &[]);

        assert!(outcome.approved.is_empty());
        assert!(outcome.declined.is_empty());
        assert!(outcome.new_leaves.is_empty());
        assert!(outcome.new_assignments.is_empty());
    }

    #[test]
    fn zero_employees_never_declines_on_capacity() {
        let snapshot = ConflictSnapshot::new(0, [leave(5, d(10))], []);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(outcome.approved, vec![d(10)]);
        assert!(outcome.declined.is_empty());
    }

    #[test]
    fn capacity_declines_at_one_third() {
        // 1 of 3 on leave is 33.3% >= 0.33, so the next request is out.
        let snapshot = ConflictSnapshot::new(3, [leave(3, d(10))], []);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(
            outcome.declined,
            vec![(d(10), DeclineReason::CapacityReached)]
        );
    }

    #[test]
    fn capacity_allows_thirty_percent() {
        // 3 of 10 on leave is 30% < 0.33; the fourth request goes through
        // even though it pushes the day to 40%.
        let snapshot = ConflictSnapshot::new(
            10,
            [leave(4, d(10)), leave(5, d(10)), leave(6, d(10))],
            [],
        );

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(outcome.approved, vec![d(10)]);
    }

    #[test]
    fn replacement_on_leave_declines() {
        let snapshot = ConflictSnapshot::new(10, [leave(2, d(10))], []);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(
            outcome.declined,
            vec![(d(10), DeclineReason::ReplacementOnLeave)]
        );
    }

    #[test]
    fn mutual_cover_declines() {
        // Employee 1 already covers employee 2 on day 10; 2 cannot cover
        // 1 the same day.
        let snapshot = ConflictSnapshot::new(10, [], [assignment(2, 1, d(10))]);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(outcome.declined, vec![(d(10), DeclineReason::MutualCover)]);
    }

    #[test]
    fn double_booked_replacement_declines() {
        let snapshot = ConflictSnapshot::new(10, [], [assignment(7, 2, d(10))]);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(
            outcome.declined,
            vec![(d(10), DeclineReason::ReplacementBooked)]
        );
    }

    #[test]
    fn duplicate_date_in_batch_sees_earlier_approval() {
        let snapshot = ConflictSnapshot::new(10, [], []);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10), d(10)]);

        assert_eq!(outcome.approved, vec![d(10)]);
        assert_eq!(
            outcome.declined,
            vec![(d(10), DeclineReason::ReplacementBooked)]
        );
        assert_eq!(outcome.new_leaves, vec![(1, d(10))]);
        assert_eq!(outcome.new_assignments, vec![assignment(1, 2, d(10))]);
    }

    #[test]
    fn three_employee_scenario() {
        // Fresh roster of 3: first request approved, then the same
        // replacement is blocked for anyone else, then the mutual pair
        // is blocked too.
        let snapshot = ConflictSnapshot::new(3, [], []);
        let first = plan_batch(snapshot.clone(), 1, 2, &[d(10)]);
        assert_eq!(first.approved, vec![d(10)]);
        assert_eq!(first.new_leaves, vec![(1, d(10))]);
        assert_eq!(first.new_assignments, vec![assignment(1, 2, d(10))]);

        // State after the first batch committed.
        let committed = ConflictSnapshot::new(
            3,
            first.new_leaves.clone(),
            first.new_assignments.clone(),
        );

        let second = plan_batch(committed.clone(), 3, 2, &[d(10)]);
        assert!(second.approved.is_empty());
        assert_eq!(second.declined.len(), 1);

        let third = plan_batch(committed, 2, 1, &[d(10)]);
        assert!(third.approved.is_empty());
        assert_eq!(third.declined.len(), 1);
    }

    #[test]
    fn emitted_rows_match_approved_dates() {
        let snapshot = ConflictSnapshot::new(10, [], []);

        let outcome = plan_batch(snapshot, 1, 2, &[d(10), d(11), d(12)]);

        assert_eq!(outcome.approved.len(), outcome.new_leaves.len());
        assert_eq!(outcome.approved.len(), outcome.new_assignments.len());
        for (date, (leave_row, assignment_row)) in outcome
            .approved
            .iter()
            .zip(outcome.new_leaves.iter().zip(outcome.new_assignments.iter()))
        {
            assert_eq!(leave_row, &(1, *date));
            assert_eq!(assignment_row, &assignment(1, 2, *date));
        }
    }

    #[test]
    fn checks_on_other_dates_do_not_interfere() {
        let snapshot = ConflictSnapshot::new(
            10,
            [leave(2, d(11))],
            [assignment(7, 2, d(12))],
        );

        let outcome = plan_batch(snapshot, 1, 2, &[d(10)]);

        assert_eq!(outcome.approved, vec![d(10)]);
    }
}
