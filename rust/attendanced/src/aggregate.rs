use crate::model::{AttendanceRecord, AttendanceStatus, StudentAttendance};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Percentage under which a student is marked มส. in the attendance report.
pub const DEFICIENCY_PERCENT: f64 = 80.0;
const CRITICAL_PERCENT: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOutcome {
    Present,
    SickLeave,
    Activity,
    Absent,
}

// A date with no record, or with a status outside present/sick/activity,
// counts against the student.
fn classify(status: Option<&AttendanceStatus>) -> DayOutcome {
    match status {
        Some(AttendanceStatus::Present) => DayOutcome::Present,
        Some(AttendanceStatus::SickLeave) => DayOutcome::SickLeave,
        Some(AttendanceStatus::Activity) => DayOutcome::Activity,
        _ => DayOutcome::Absent,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub present_count: usize,
    pub sick_leave_count: usize,
    pub activity_count: usize,
    pub absent_count: usize,
    pub total_checked_days: usize,
    pub percentage: f64,
    pub sick_leave_dates: Vec<NaiveDate>,
    pub absent_dates: Vec<NaiveDate>,
}

impl AttendanceSummary {
    pub fn attended(&self) -> usize {
        self.present_count + self.sick_leave_count + self.activity_count
    }

    /// Whole-number percentage as shown in the reports.
    pub fn rounded_percentage(&self) -> i64 {
        self.percentage.round() as i64
    }
}

pub fn first_recorded_date(records: &[AttendanceRecord]) -> Option<NaiveDate> {
    records.iter().map(|r| r.date).min()
}

/// Counts a student's attendance over the reference dates.
///
/// Reference dates before the student's first record are skipped, so a late
/// joiner is only measured from the day they were first checked.
pub fn summarize(records: &[AttendanceRecord], reference_dates: &[NaiveDate]) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    let Some(first) = first_recorded_date(records) else {
        return summary;
    };
    let by_date: HashMap<NaiveDate, &AttendanceStatus> =
        records.iter().map(|r| (r.date, &r.status)).collect();

    for date in reference_dates.iter().copied().filter(|d| *d >= first) {
        summary.total_checked_days += 1;
        match classify(by_date.get(&date).copied()) {
            DayOutcome::Present => summary.present_count += 1,
            DayOutcome::SickLeave => {
                summary.sick_leave_count += 1;
                summary.sick_leave_dates.push(date);
            }
            DayOutcome::Activity => summary.activity_count += 1,
            DayOutcome::Absent => {
                summary.absent_count += 1;
                summary.absent_dates.push(date);
            }
        }
    }

    summary.percentage = if summary.total_checked_days > 0 {
        summary.attended() as f64 / summary.total_checked_days as f64 * 100.0
    } else {
        0.0
    };
    summary
}

/// Every date anyone has a record for, most recent first.
pub fn reference_dates<'a, I>(students: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a StudentAttendance>,
{
    let all: BTreeSet<NaiveDate> = students
        .into_iter()
        .flat_map(|s| s.attendance.iter().map(|r| r.date))
        .collect();
    all.into_iter().rev().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    Good,
    Warning,
    Critical,
}

impl AttendanceBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < CRITICAL_PERCENT {
            AttendanceBand::Critical
        } else if percentage < DEFICIENCY_PERCENT {
            AttendanceBand::Warning
        } else {
            AttendanceBand::Good
        }
    }
}

/// Cut-off for the มส. list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeficiencyThreshold {
    #[default]
    Eighty,
    Sixty,
}

impl DeficiencyThreshold {
    pub fn from_percent(percent: i64) -> Option<Self> {
        match percent {
            80 => Some(DeficiencyThreshold::Eighty),
            60 => Some(DeficiencyThreshold::Sixty),
            _ => None,
        }
    }

    pub fn percent(self) -> f64 {
        match self {
            DeficiencyThreshold::Eighty => DEFICIENCY_PERCENT,
            DeficiencyThreshold::Sixty => CRITICAL_PERCENT,
        }
    }

    pub fn is_deficient(self, percentage: f64) -> bool {
        percentage < self.percent()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReportRow {
    pub id: String,
    pub student_number: i64,
    pub name: String,
    pub grade: String,
    pub classroom: i64,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
    pub rounded_percentage: i64,
    pub band: AttendanceBand,
    pub deficient: bool,
}

/// Per-student attendance table, optionally narrowed to one classroom,
/// ordered by student number.
pub fn attendance_report<'a, I>(
    students: I,
    reference_dates: &[NaiveDate],
    classroom: Option<i64>,
) -> Vec<AttendanceReportRow>
where
    I: IntoIterator<Item = &'a StudentAttendance>,
{
    let mut rows: Vec<AttendanceReportRow> = students
        .into_iter()
        .filter(|s| classroom.map_or(true, |c| s.student.classroom == c))
        .map(|s| {
            let summary = summarize(&s.attendance, reference_dates);
            AttendanceReportRow {
                id: s.student.id.clone(),
                student_number: s.student.student_number,
                name: s.student.name.clone(),
                grade: s.student.grade.clone(),
                classroom: s.student.classroom,
                rounded_percentage: summary.rounded_percentage(),
                band: AttendanceBand::from_percentage(summary.percentage),
                deficient: DeficiencyThreshold::Eighty.is_deficient(summary.percentage),
                summary,
            }
        })
        .collect();
    rows.sort_by_key(|r| r.student_number);
    rows
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficiencyRow {
    pub rank: usize,
    pub classroom: i64,
    pub student_number: i64,
    pub id: String,
    pub name: String,
    pub present_count: usize,
    pub absent_count: usize,
    pub percentage: f64,
    pub rounded_percentage: i64,
    pub band: AttendanceBand,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficiencyReport {
    pub threshold: f64,
    pub total: usize,
    pub rows: Vec<DeficiencyRow>,
}

/// Students under the threshold across all classrooms, grouped by classroom
/// then student number.
pub fn deficiency_report<'a, I>(
    students: I,
    reference_dates: &[NaiveDate],
    threshold: DeficiencyThreshold,
) -> DeficiencyReport
where
    I: IntoIterator<Item = &'a StudentAttendance>,
{
    let mut flagged: Vec<(&StudentAttendance, AttendanceSummary)> = students
        .into_iter()
        .map(|s| (s, summarize(&s.attendance, reference_dates)))
        .filter(|(_, summary)| threshold.is_deficient(summary.percentage))
        .collect();
    flagged.sort_by_key(|(s, _)| (s.student.classroom, s.student.student_number));

    let rows: Vec<DeficiencyRow> = flagged
        .into_iter()
        .enumerate()
        .map(|(idx, (s, summary))| DeficiencyRow {
            rank: idx + 1,
            classroom: s.student.classroom,
            student_number: s.student.student_number,
            id: s.student.id.clone(),
            name: s.student.name.clone(),
            present_count: summary.present_count,
            absent_count: summary.absent_count,
            percentage: summary.percentage,
            rounded_percentage: summary.rounded_percentage(),
            band: AttendanceBand::from_percentage(summary.percentage),
        })
        .collect();

    DeficiencyReport {
        threshold: threshold.percent(),
        total: rows.len(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Student, DATE_FORMAT};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).expect("date")
    }

    fn rec(date: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            date: d(date),
            status,
        }
    }

    fn student(id: &str, number: i64, classroom: i64, records: Vec<AttendanceRecord>) -> StudentAttendance {
        StudentAttendance {
            student: Student {
                id: id.to_string(),
                student_number: number,
                name: format!("Student {}", id),
                grade: "ม.5".to_string(),
                classroom,
            },
            attendance: records,
        }
    }

    #[test]
    fn late_joiner_scenario() {
        let records = vec![
            rec("2024-01-10", AttendanceStatus::Present),
            rec("2024-01-11", AttendanceStatus::Absent),
        ];
        let dates = [d("2024-01-09"), d("2024-01-10"), d("2024-01-11"), d("2024-01-12")];
        let s = summarize(&records, &dates);

        assert_eq!(first_recorded_date(&records), Some(d("2024-01-10")));
        assert_eq!(s.total_checked_days, 3);
        assert_eq!(s.present_count, 1);
        assert_eq!(s.absent_count, 2);
        assert_eq!(s.absent_dates, vec![d("2024-01-11"), d("2024-01-12")]);
        assert!((s.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.rounded_percentage(), 33);
    }

    #[test]
    fn no_records_means_no_days_and_zero_percent() {
        let dates = [d("2024-01-09"), d("2024-01-10")];
        let s = summarize(&[], &dates);
        assert_eq!(s.total_checked_days, 0);
        assert_eq!(s.percentage, 0.0);
        assert!(s.absent_dates.is_empty());
    }

    #[test]
    fn counts_always_sum_to_checked_days() {
        let records = vec![
            rec("2024-03-01", AttendanceStatus::Present),
            rec("2024-03-02", AttendanceStatus::SickLeave),
            rec("2024-03-03", AttendanceStatus::Activity),
            rec("2024-03-04", AttendanceStatus::Absent),
            rec("2024-03-05", AttendanceStatus::Unrecognized("สาย".to_string())),
        ];
        let dates: Vec<NaiveDate> = (1..=8)
            .map(|day| d(&format!("2024-03-{:02}", day)))
            .rev()
            .collect();
        let s = summarize(&records, &dates);
        assert_eq!(
            s.present_count + s.sick_leave_count + s.activity_count + s.absent_count,
            s.total_checked_days
        );
        assert_eq!(s.total_checked_days, 8);
        // 03-04 explicit, 03-05 unrecognized, 03-06..08 missing.
        assert_eq!(s.absent_count, 5);
        assert_eq!(s.sick_leave_dates, vec![d("2024-03-02")]);
        assert!((s.percentage - 37.5).abs() < 1e-9);
    }

    #[test]
    fn sick_and_activity_count_as_attended() {
        let records = vec![
            rec("2024-05-01", AttendanceStatus::SickLeave),
            rec("2024-05-02", AttendanceStatus::Activity),
        ];
        let s = summarize(&records, &[d("2024-05-02"), d("2024-05-01")]);
        assert_eq!(s.percentage, 100.0);
    }

    #[test]
    fn reference_dates_are_distinct_and_descending() {
        let roster = vec![
            student("a", 1, 1, vec![rec("2024-01-10", AttendanceStatus::Present)]),
            student(
                "b",
                2,
                1,
                vec![
                    rec("2024-01-12", AttendanceStatus::Present),
                    rec("2024-01-10", AttendanceStatus::Absent),
                ],
            ),
        ];
        assert_eq!(
            reference_dates(&roster),
            vec![d("2024-01-12"), d("2024-01-10")]
        );
    }

    #[test]
    fn bands_follow_report_colours() {
        assert_eq!(AttendanceBand::from_percentage(80.0), AttendanceBand::Good);
        assert_eq!(AttendanceBand::from_percentage(79.9), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::from_percentage(60.0), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::from_percentage(59.9), AttendanceBand::Critical);
    }

    #[test]
    fn attendance_report_filters_classroom_and_sorts_by_number() {
        let roster = vec![
            student("c", 3, 2, vec![rec("2024-01-10", AttendanceStatus::Present)]),
            student("b", 2, 1, vec![rec("2024-01-10", AttendanceStatus::Absent)]),
            student("a", 1, 1, vec![rec("2024-01-10", AttendanceStatus::Present)]),
        ];
        let dates = reference_dates(&roster);
        let rows = attendance_report(&roster, &dates, Some(1));
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!rows[0].deficient);
        assert!(rows[1].deficient);
        assert_eq!(rows[1].band, AttendanceBand::Critical);
    }

    #[test]
    fn deficiency_report_honours_threshold_and_ordering() {
        let dates = [d("2024-01-04"), d("2024-01-03"), d("2024-01-02"), d("2024-01-01")];
        let roster = vec![
            // 75%
            student(
                "x",
                4,
                2,
                vec![
                    rec("2024-01-01", AttendanceStatus::Present),
                    rec("2024-01-02", AttendanceStatus::Present),
                    rec("2024-01-03", AttendanceStatus::Present),
                    rec("2024-01-04", AttendanceStatus::Absent),
                ],
            ),
            // 50%
            student(
                "y",
                9,
                1,
                vec![
                    rec("2024-01-01", AttendanceStatus::Present),
                    rec("2024-01-02", AttendanceStatus::Absent),
                    rec("2024-01-03", AttendanceStatus::SickLeave),
                    rec("2024-01-04", AttendanceStatus::Absent),
                ],
            ),
            // 100%
            student(
                "z",
                1,
                1,
                dates.iter().map(|date| AttendanceRecord {
                    date: *date,
                    status: AttendanceStatus::Present,
                }).collect(),
            ),
        ];

        let at_80 = deficiency_report(&roster, &dates, DeficiencyThreshold::Eighty);
        let ids: Vec<&str> = at_80.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x"]);
        assert_eq!(at_80.total, 2);
        assert_eq!(at_80.rows[0].rank, 1);
        assert_eq!(at_80.rows[1].rank, 2);

        let at_60 = deficiency_report(&roster, &dates, DeficiencyThreshold::Sixty);
        assert_eq!(at_60.total, 1);
        assert_eq!(at_60.rows[0].id, "y");
        assert_eq!(at_60.threshold, 60.0);
    }

    #[test]
    fn threshold_from_percent_only_knows_80_and_60() {
        assert_eq!(DeficiencyThreshold::from_percent(80), Some(DeficiencyThreshold::Eighty));
        assert_eq!(DeficiencyThreshold::from_percent(60), Some(DeficiencyThreshold::Sixty));
        assert_eq!(DeficiencyThreshold::from_percent(70), None);
    }
}
