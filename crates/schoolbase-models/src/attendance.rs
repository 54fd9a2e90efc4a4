//! Daily attendance marks and the derived streak view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use schoolbase_core::compact_adjacent;
use schoolbase_core::serde::empty_string_as_none;

use crate::ids::{AttendanceId, StudentId};
use crate::text_enum::impl_text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Absent => "ABSENT",
        }
    }

    /// Late and absent marks warrant an email to guardians.
    pub fn is_concerning(&self) -> bool {
        !matches!(self, AttendanceStatus::Present)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "LATE" => Ok(AttendanceStatus::Late),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            other => Err(format!("invalid attendance status: {other}")),
        }
    }
}

impl TryFrom<String> for AttendanceStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl_text_enum!(AttendanceStatus);

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Attendance {
    pub id: AttendanceId,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AttendanceSheetParams {
    #[param(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub class_name: Option<String>,
}

/// One roster line; `status` is `None` when no mark exists for the day.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct AttendanceSheetRow {
    pub student_id: StudentId,
    pub admission_no: String,
    pub full_name: String,
    pub class_name: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceSheet {
    pub date: NaiveDate,
    pub items: Vec<AttendanceSheetRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MarkItem {
    pub student_id: StudentId,
    #[schema(value_type = String, example = "ABSENT")]
    pub status: AttendanceStatus,
    #[validate(length(max = 255))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceDto {
    pub date: NaiveDate,
    #[validate(length(min = 1), nested)]
    pub items: Vec<MarkItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DateRangeParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
}

/// A stretch of consecutive recorded days sharing one status.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStreak {
    #[schema(value_type = String)]
    pub status: AttendanceStatus,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StreakSummary {
    pub student_id: StudentId,
    pub streaks: Vec<AttendanceStreak>,
    /// The run containing the most recent mark.
    pub current: Option<AttendanceStreak>,
    /// Longest run of `ABSENT` marks.
    pub longest_absence: usize,
}

/// Compacts date-ordered marks into runs of identical status.
///
/// Marks must already be sorted by date. Runs are over recorded marks, so a
/// weekend between two `PRESENT` Fridays and Mondays does not break a streak.
pub fn attendance_streaks(student_id: StudentId, marks: &[(NaiveDate, AttendanceStatus)]) -> StreakSummary {
    let streaks: Vec<AttendanceStreak> = compact_adjacent(marks.iter().copied(), |(_, status)| *status)
        .into_iter()
        .map(|run| AttendanceStreak {
            status: run.key,
            from: run.first.0,
            to: run.last.0,
            days: run.count,
        })
        .collect();

    let longest_absence = streaks
        .iter()
        .filter(|s| s.status == AttendanceStatus::Absent)
        .map(|s| s.days)
        .max()
        .unwrap_or(0);

    StreakSummary {
        student_id,
        current: streaks.last().cloned(),
        longest_absence,
        streaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("absent".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
        assert!("EXCUSED".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let s: AttendanceStatus = serde_json::from_str(r#""late""#).unwrap();
        assert_eq!(s, AttendanceStatus::Late);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""LATE""#);
    }

    #[test]
    fn test_concerning_statuses() {
        assert!(AttendanceStatus::Absent.is_concerning());
        assert!(AttendanceStatus::Late.is_concerning());
        assert!(!AttendanceStatus::Present.is_concerning());
    }

    #[test]
    fn test_mark_items_are_validated() {
        let dto = MarkAttendanceDto {
            date: day(4),
            items: vec![MarkItem {
                student_id: StudentId::new(),
                status: AttendanceStatus::Late,
                remarks: Some("x".repeat(300)),
            }],
        };
        assert!(dto.validate().is_err());

        let empty = MarkAttendanceDto {
            date: day(4),
            items: vec![],
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_streaks_fold_adjacent_statuses() {
        use AttendanceStatus::*;
        let marks = vec![
            (day(1), Present),
            (day(4), Present),
            (day(5), Absent),
            (day(6), Absent),
            (day(7), Absent),
            (day(8), Present),
        ];
        let summary = attendance_streaks(StudentId::new(), &marks);
        assert_eq!(summary.streaks.len(), 3);
        assert_eq!(summary.streaks[0].days, 2);
        assert_eq!(summary.streaks[1].from, day(5));
        assert_eq!(summary.streaks[1].to, day(7));
        assert_eq!(summary.longest_absence, 3);
        assert_eq!(summary.current.map(|c| c.status), Some(Present));
    }

    #[test]
    fn test_streaks_empty_history() {
        let summary = attendance_streaks(StudentId::new(), &[]);
        assert!(summary.streaks.is_empty());
        assert!(summary.current.is_none());
        assert_eq!(summary.longest_absence, 0);
    }

    #[test]
    fn test_mark_requires_items() {
        let dto = MarkAttendanceDto {
            date: day(1),
            items: vec![],
        };
        assert!(dto.validate().is_err());
    }
}
