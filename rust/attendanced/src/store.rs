use crate::aggregate;
use crate::model::{AttendanceRecord, AttendanceStatus, DisplayStatus, StudentAttendance};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    Unchanged,
    UnknownStudent,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Replaced => "replaced",
            UpsertOutcome::Unchanged => "unchanged",
            UpsertOutcome::UnknownStudent => "ignored",
        }
    }
}

/// In-memory roster.
///
/// Students sit behind `Arc` and are cloned on write, so a snapshot handed to
/// a save job keeps the exact roster it was taken from.
#[derive(Debug, Default, Clone)]
pub struct AttendanceStore {
    students: Vec<Arc<StudentAttendance>>,
}

impl AttendanceStore {
    /// Installs a fresh roster, collapsing records that land on the same
    /// date. Returns how many records were dropped.
    pub fn replace_all(&mut self, students: Vec<StudentAttendance>) -> usize {
        let mut collapsed = 0;
        self.students = students
            .into_iter()
            .map(|mut s| {
                let dropped = collapse_duplicate_dates(&mut s.attendance);
                if dropped > 0 {
                    log::warn!(
                        "student {}: {} duplicate date record(s) collapsed",
                        s.student.id,
                        dropped
                    );
                }
                collapsed += dropped;
                Arc::new(s)
            })
            .collect();
        collapsed
    }

    pub fn snapshot(&self) -> Vec<Arc<StudentAttendance>> {
        self.students.clone()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn students(&self) -> impl Iterator<Item = &StudentAttendance> {
        self.students.iter().map(|s| s.as_ref())
    }

    pub fn find(&self, student_id: &str) -> Option<&StudentAttendance> {
        self.students()
            .find(|s| s.student.id == student_id)
    }

    /// Sets one student's status for one date: replaces the record at that
    /// date or appends a new one. An unknown student is ignored.
    pub fn upsert(
        &mut self,
        student_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> UpsertOutcome {
        let Some(slot) = self
            .students
            .iter_mut()
            .find(|s| s.student.id == student_id)
        else {
            return UpsertOutcome::UnknownStudent;
        };

        match slot.attendance.iter().position(|r| r.date == date) {
            Some(idx) if slot.attendance[idx].status == status => UpsertOutcome::Unchanged,
            Some(idx) => {
                Arc::make_mut(slot).attendance[idx].status = status;
                UpsertOutcome::Replaced
            }
            None => {
                Arc::make_mut(slot)
                    .attendance
                    .push(AttendanceRecord { date, status });
                UpsertOutcome::Inserted
            }
        }
    }

    /// Gives every student without a record at `date` a PRESENT record there.
    /// Returns how many records were added.
    pub fn fill_default(&mut self, date: NaiveDate) -> usize {
        let mut filled = 0;
        for slot in self.students.iter_mut() {
            if slot.record_on(date).is_some() {
                continue;
            }
            Arc::make_mut(slot).attendance.push(AttendanceRecord {
                date,
                status: AttendanceStatus::Present,
            });
            filled += 1;
        }
        filled
    }

    pub fn status_on(&self, student_id: &str, date: NaiveDate) -> Option<DisplayStatus> {
        self.find(student_id)
            .map(|s| DisplayStatus::from(s.record_on(date).map(|r| &r.status)))
    }

    pub fn classrooms(&self) -> Vec<i64> {
        let rooms: BTreeSet<i64> = self.students().map(|s| s.student.classroom).collect();
        rooms.into_iter().collect()
    }

    /// Students of one classroom (or everyone) by student number.
    pub fn roster(&self, classroom: Option<i64>) -> Vec<&StudentAttendance> {
        let mut rows: Vec<&StudentAttendance> = self
            .students()
            .filter(|s| classroom.map_or(true, |c| s.student.classroom == c))
            .collect();
        rows.sort_by_key(|s| s.student.student_number);
        rows
    }

    pub fn reference_dates(&self) -> Vec<NaiveDate> {
        aggregate::reference_dates(self.students())
    }
}

// One record per date: the first one keeps its position, later ones on the
// same date overwrite its status.
fn collapse_duplicate_dates(records: &mut Vec<AttendanceRecord>) -> usize {
    let before = records.len();
    let mut slot_of: HashMap<NaiveDate, usize> = HashMap::new();
    let mut kept: Vec<AttendanceRecord> = Vec::with_capacity(before);
    for rec in records.drain(..) {
        match slot_of.get(&rec.date) {
            Some(&idx) => kept[idx].status = rec.status,
            None => {
                slot_of.insert(rec.date, kept.len());
                kept.push(rec);
            }
        }
    }
    *records = kept;
    before - records.len()
}
