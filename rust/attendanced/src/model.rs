use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

const LABEL_PRESENT: &str = "มา";
const LABEL_SICK_LEAVE: &str = "ลา";
const LABEL_ABSENT: &str = "ขาด";
const LABEL_ACTIVITY: &str = "กิจกรรม";
const LABEL_NOT_RECORDED: &str = "ยังไม่เช็คชื่อ";

/// Status stored in the attendance sheet.
///
/// Serialized as the label the sheet keeps in its cells. Labels this daemon
/// does not know are carried as `Unrecognized` so a save writes them back
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttendanceStatus {
    Present,
    SickLeave,
    Absent,
    Activity,
    Unrecognized(String),
}

impl AttendanceStatus {
    pub fn label(&self) -> &str {
        match self {
            AttendanceStatus::Present => LABEL_PRESENT,
            AttendanceStatus::SickLeave => LABEL_SICK_LEAVE,
            AttendanceStatus::Absent => LABEL_ABSENT,
            AttendanceStatus::Activity => LABEL_ACTIVITY,
            AttendanceStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::SickLeave => "SICK_LEAVE",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Activity => "ACTIVITY",
            AttendanceStatus::Unrecognized(_) => "UNRECOGNIZED",
        }
    }

    /// Parses a status supplied by an IPC caller, by code or by sheet label.
    /// Only the four recordable statuses are accepted.
    pub fn parse_input(raw: &str) -> Option<Self> {
        let t = raw.trim();
        let status = match t.to_ascii_uppercase().as_str() {
            "PRESENT" => AttendanceStatus::Present,
            "SICK_LEAVE" => AttendanceStatus::SickLeave,
            "ABSENT" => AttendanceStatus::Absent,
            "ACTIVITY" => AttendanceStatus::Activity,
            _ => match AttendanceStatus::from(t.to_string()) {
                AttendanceStatus::Unrecognized(_) => return None,
                known => known,
            },
        };
        Some(status)
    }
}

impl From<String> for AttendanceStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            LABEL_PRESENT => AttendanceStatus::Present,
            LABEL_SICK_LEAVE => AttendanceStatus::SickLeave,
            LABEL_ABSENT => AttendanceStatus::Absent,
            LABEL_ACTIVITY => AttendanceStatus::Activity,
            _ => AttendanceStatus::Unrecognized(raw),
        }
    }
}

impl From<AttendanceStatus> for String {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Unrecognized(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

/// What the roster shows for a student on a given day. `NotRecorded` only
/// exists here; it is never written to the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayStatus {
    Recorded(AttendanceStatus),
    NotRecorded,
}

impl DisplayStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DisplayStatus::Recorded(s) => s.code(),
            DisplayStatus::NotRecorded => "NOT_RECORDED",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DisplayStatus::Recorded(s) => s.label(),
            DisplayStatus::NotRecorded => LABEL_NOT_RECORDED,
        }
    }
}

impl From<Option<&AttendanceStatus>> for DisplayStatus {
    fn from(status: Option<&AttendanceStatus>) -> Self {
        match status {
            Some(s) => DisplayStatus::Recorded(s.clone()),
            None => DisplayStatus::NotRecorded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "de_record_date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "de_loose_string")]
    pub id: String,
    #[serde(deserialize_with = "de_loose_int")]
    pub student_number: i64,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub grade: String,
    #[serde(deserialize_with = "de_loose_int")]
    pub classroom: i64,
}

/// One roster row as the sheet stores it: the student plus their records,
/// at most one per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAttendance {
    #[serde(flatten)]
    pub student: Student,
    #[serde(default, deserialize_with = "de_records")]
    pub attendance: Vec<AttendanceRecord>,
}

impl StudentAttendance {
    pub fn record_on(&self, date: NaiveDate) -> Option<&AttendanceRecord> {
        self.attendance.iter().find(|r| r.date == date)
    }
}

/// Canonical calendar date for a value coming back from the sheet.
///
/// Plain `YYYY-MM-DD` is taken as-is. Date cells come back from Apps Script
/// as RFC 3339 timestamps; those resolve to their UTC calendar day.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, DATE_FORMAT) {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(t)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

pub fn parse_date_param(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("invalid date {:?}, expected YYYY-MM-DD", raw))
}

fn de_record_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    normalize_date(&raw).ok_or_else(|| D::Error::custom(format!("unrecognized date {:?}", raw)))
}

fn de_records<'de, D>(deserializer: D) -> Result<Vec<AttendanceRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<AttendanceRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

// Sheet cells are loosely typed: ids typed as numbers, numbers typed as text.
fn de_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected text, got {}", other))),
    }
}

fn de_loose_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("expected whole number, got {}", value)))
}
