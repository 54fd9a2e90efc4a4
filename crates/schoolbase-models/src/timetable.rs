//! Timetable shape, allocations, slots and the conflict engine.
//!
//! [`compute_conflicts`] runs over every slot of one term. Double-bookings are
//! found per dimension (class, teacher, room) by partitioning on
//! `(day, period, dimension value)`. A slot may show up once per dimension.
//! Allocation checks compare `required_per_week` against the number of slots
//! scheduled for the same class and subject.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use schoolbase_core::serde::empty_string_as_none;

use crate::ids::{AllocationId, SlotId, TeacherId, TimetableConfigId};
use crate::text_enum::impl_text_enum;

pub const DEFAULT_START_TIME: &str = "08:30";
pub const DEFAULT_PERIOD_MINUTES: i32 = 40;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "String", into = "String")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const WEEKDAYS: [DayOfWeek; 5] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "Mon",
            DayOfWeek::Tue => "Tue",
            DayOfWeek::Wed => "Wed",
            DayOfWeek::Thu => "Thu",
            DayOfWeek::Fri => "Fri",
            DayOfWeek::Sat => "Sat",
            DayOfWeek::Sun => "Sun",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `Mon`, `monday`, `MON` and the like.
impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let day = match lower.get(..3).unwrap_or(lower.as_str()) {
            "mon" => DayOfWeek::Mon,
            "tue" => DayOfWeek::Tue,
            "wed" => DayOfWeek::Wed,
            "thu" => DayOfWeek::Thu,
            "fri" => DayOfWeek::Fri,
            "sat" => DayOfWeek::Sat,
            "sun" => DayOfWeek::Sun,
            _ => return Err(format!("invalid day of week: {s}")),
        };
        Ok(day)
    }
}

impl TryFrom<String> for DayOfWeek {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayOfWeek> for String {
    fn from(day: DayOfWeek) -> Self {
        day.as_str().to_string()
    }
}

impl_text_enum!(DayOfWeek);

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TimetableConfig {
    pub id: TimetableConfigId,
    pub term: String,
    /// `HH:MM` start of period 0.
    pub start_time: String,
    pub period_minutes: i32,
    #[schema(value_type = Vec<String>)]
    pub days: Json<Vec<DayOfWeek>>,
    /// Free-form layout (breaks, lunch) interpreted by the frontend.
    #[schema(value_type = Object)]
    pub blocks: Json<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl TimetableConfig {
    /// Start and end clock time of `period_index`, ignoring blocks.
    pub fn period_window(&self, period_index: i32) -> Option<(NaiveTime, NaiveTime)> {
        period_window(&self.start_time, self.period_minutes, period_index)
    }
}

pub fn period_window(
    start_time: &str,
    period_minutes: i32,
    period_index: i32,
) -> Option<(NaiveTime, NaiveTime)> {
    if period_index < 0 || period_minutes <= 0 {
        return None;
    }
    let start = NaiveTime::parse_from_str(start_time, "%H:%M").ok()?;
    let offset = Duration::minutes(i64::from(period_minutes) * i64::from(period_index));
    let from = start + offset;
    let to = from + Duration::minutes(i64::from(period_minutes));
    Some((from, to))
}

fn validate_clock(value: &str) -> Result<(), ValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new("time_format"))
}

fn default_start_time() -> String {
    DEFAULT_START_TIME.to_string()
}

fn default_period_minutes() -> i32 {
    DEFAULT_PERIOD_MINUTES
}

fn default_days() -> Vec<DayOfWeek> {
    DayOfWeek::WEEKDAYS.to_vec()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertConfigDto {
    #[validate(length(min = 1, max = 50))]
    pub term: String,
    #[serde(default = "default_start_time")]
    #[validate(custom(function = "validate_clock"))]
    #[schema(example = "08:30")]
    pub start_time: String,
    #[serde(default = "default_period_minutes")]
    #[validate(range(min = 5, max = 240))]
    pub period_minutes: i32,
    #[serde(default = "default_days")]
    #[validate(length(min = 1, max = 7))]
    #[schema(value_type = Vec<String>, example = json!(["Mon", "Tue", "Wed", "Thu", "Fri"]))]
    pub days: Vec<DayOfWeek>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub blocks: serde_json::Value,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct SubjectAllocation {
    pub id: AllocationId,
    pub term: String,
    pub class_name: String,
    pub subject: String,
    pub required_per_week: i32,
    pub teacher_id: Option<TeacherId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAllocationDto {
    #[validate(length(min = 1, max = 50))]
    pub term: String,
    #[validate(length(min = 1, max = 50))]
    pub class_name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(range(min = 0, max = 60))]
    pub required_per_week: i32,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAllocationDto {
    #[validate(range(min = 0, max = 60))]
    pub required_per_week: Option<i32>,
    /// `null` leaves the teacher unchanged.
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AllocationFilterParams {
    pub term: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TimetableSlot {
    pub id: SlotId,
    pub term: String,
    pub day_of_week: DayOfWeek,
    pub period_index: i32,
    pub class_name: String,
    pub subject: String,
    pub room: Option<String>,
    pub teacher_id: Option<TeacherId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSlotDto {
    #[validate(length(min = 1, max = 50))]
    pub term: String,
    #[schema(value_type = String, example = "Mon")]
    pub day_of_week: DayOfWeek,
    #[validate(range(min = 0, max = 20))]
    pub period_index: i32,
    #[validate(length(min = 1, max = 50))]
    pub class_name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(max = 50))]
    pub room: Option<String>,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSlotDto {
    #[schema(value_type = Option<String>)]
    pub day_of_week: Option<DayOfWeek>,
    #[validate(range(min = 0, max = 20))]
    pub period_index: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SlotFilterParams {
    pub term: Option<String>,
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct TermParams {
    pub term: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ClassDoubleBook,
    TeacherDoubleBook,
    RoomDoubleBook,
    AllocationDeficit,
    AllocationExcess,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conflict {
    ClassDoubleBook {
        #[schema(value_type = String)]
        day_of_week: DayOfWeek,
        period_index: i32,
        class_name: String,
        slot_ids: Vec<SlotId>,
    },
    TeacherDoubleBook {
        #[schema(value_type = String)]
        day_of_week: DayOfWeek,
        period_index: i32,
        teacher_id: TeacherId,
        slot_ids: Vec<SlotId>,
    },
    RoomDoubleBook {
        #[schema(value_type = String)]
        day_of_week: DayOfWeek,
        period_index: i32,
        room: String,
        slot_ids: Vec<SlotId>,
    },
    AllocationDeficit {
        class_name: String,
        subject: String,
        required: i32,
        scheduled: i32,
    },
    AllocationExcess {
        class_name: String,
        subject: String,
        required: i32,
        scheduled: i32,
    },
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match self {
            Conflict::ClassDoubleBook { .. } => ConflictKind::ClassDoubleBook,
            Conflict::TeacherDoubleBook { .. } => ConflictKind::TeacherDoubleBook,
            Conflict::RoomDoubleBook { .. } => ConflictKind::RoomDoubleBook,
            Conflict::AllocationDeficit { .. } => ConflictKind::AllocationDeficit,
            Conflict::AllocationExcess { .. } => ConflictKind::AllocationExcess,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConflictReport {
    pub term: String,
    pub total: usize,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn new(term: String, conflicts: Vec<Conflict>) -> Self {
        Self {
            term,
            total: conflicts.len(),
            conflicts,
        }
    }
}

/// Groups slot ids by `(day, period, key)`, skipping slots without a key.
/// Partitions keep first-seen slot order; keys come out sorted.
fn partition<'a, K, F>(slots: &'a [TimetableSlot], key_of: F) -> BTreeMap<(DayOfWeek, i32, K), Vec<SlotId>>
where
    K: Ord,
    F: Fn(&'a TimetableSlot) -> Option<K>,
{
    let mut groups: BTreeMap<(DayOfWeek, i32, K), Vec<SlotId>> = BTreeMap::new();
    for slot in slots {
        if let Some(key) = key_of(slot) {
            groups
                .entry((slot.day_of_week, slot.period_index, key))
                .or_default()
                .push(slot.id);
        }
    }
    groups
}

/// Double-bookings for every dimension, then allocation mismatches.
///
/// Callers pass the slots and allocations of a single term.
pub fn compute_conflicts(
    slots: &[TimetableSlot],
    allocations: &[SubjectAllocation],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for ((day_of_week, period_index, class_name), slot_ids) in
        partition(slots, |s| Some(s.class_name.as_str()))
    {
        if slot_ids.len() > 1 {
            conflicts.push(Conflict::ClassDoubleBook {
                day_of_week,
                period_index,
                class_name: class_name.to_string(),
                slot_ids,
            });
        }
    }

    for ((day_of_week, period_index, teacher_id), slot_ids) in partition(slots, |s| s.teacher_id) {
        if slot_ids.len() > 1 {
            conflicts.push(Conflict::TeacherDoubleBook {
                day_of_week,
                period_index,
                teacher_id,
                slot_ids,
            });
        }
    }

    for ((day_of_week, period_index, room), slot_ids) in partition(slots, |s| {
        s.room.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }) {
        if slot_ids.len() > 1 {
            conflicts.push(Conflict::RoomDoubleBook {
                day_of_week,
                period_index,
                room: room.to_string(),
                slot_ids,
            });
        }
    }

    let mut scheduled: HashMap<(&str, &str), i32> = HashMap::new();
    for slot in slots {
        *scheduled
            .entry((slot.class_name.as_str(), slot.subject.as_str()))
            .or_default() += 1;
    }

    for alloc in allocations {
        let count = scheduled
            .get(&(alloc.class_name.as_str(), alloc.subject.as_str()))
            .copied()
            .unwrap_or(0);
        let (class_name, subject, required) = (
            alloc.class_name.clone(),
            alloc.subject.clone(),
            alloc.required_per_week,
        );
        if count < required {
            conflicts.push(Conflict::AllocationDeficit {
                class_name,
                subject,
                required,
                scheduled: count,
            });
        } else if count > required {
            conflicts.push(Conflict::AllocationExcess {
                class_name,
                subject,
                required,
                scheduled: count,
            });
        }
    }

    conflicts
}

/// A slot with its clock window resolved against the term config.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduledPeriod {
    #[serde(flatten)]
    pub slot: TimetableSlot,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyTimetable {
    pub term: String,
    pub class_name: String,
    pub periods: Vec<ScheduledPeriod>,
}

impl MyTimetable {
    /// Orders slots by day then period and attaches clock times when a config exists.
    pub fn build(
        term: String,
        class_name: String,
        mut slots: Vec<TimetableSlot>,
        config: Option<&TimetableConfig>,
    ) -> Self {
        slots.sort_by_key(|s| (s.day_of_week, s.period_index));
        let periods = slots
            .into_iter()
            .map(|slot| {
                let window = config.and_then(|c| c.period_window(slot.period_index));
                ScheduledPeriod {
                    starts_at: window.map(|(from, _)| from.format("%H:%M").to_string()),
                    ends_at: window.map(|(_, to)| to.format("%H:%M").to_string()),
                    slot,
                }
            })
            .collect();
        Self {
            term,
            class_name,
            periods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: DayOfWeek, period: i32, class: &str, subject: &str) -> TimetableSlot {
        TimetableSlot {
            id: SlotId::new(),
            term: "T1".into(),
            day_of_week: day,
            period_index: period,
            class_name: class.into(),
            subject: subject.into(),
            room: None,
            teacher_id: None,
            created_at: Utc::now(),
        }
    }

    fn allocation(class: &str, subject: &str, required: i32) -> SubjectAllocation {
        SubjectAllocation {
            id: AllocationId::new(),
            term: "T1".into(),
            class_name: class.into(),
            subject: subject.into(),
            required_per_week: required,
            teacher_id: None,
            created_at: Utc::now(),
        }
    }

    fn kinds(conflicts: &[Conflict]) -> Vec<ConflictKind> {
        conflicts.iter().map(Conflict::kind).collect()
    }

    #[test]
    fn test_shared_teacher_is_one_teacher_double_book() {
        let teacher = TeacherId::new();
        let mut a = slot(DayOfWeek::Mon, 1, "Form 1", "Maths");
        let mut b = slot(DayOfWeek::Mon, 1, "Form 2", "Maths");
        a.teacher_id = Some(teacher);
        b.teacher_id = Some(teacher);

        let conflicts = compute_conflicts(&[a.clone(), b.clone()], &[]);
        assert_eq!(conflicts.len(), 1);
        match &conflicts[0] {
            Conflict::TeacherDoubleBook {
                teacher_id,
                slot_ids,
                day_of_week,
                period_index,
            } => {
                assert_eq!(*teacher_id, teacher);
                assert_eq!(slot_ids, &vec![a.id, b.id]);
                assert_eq!(*day_of_week, DayOfWeek::Mon);
                assert_eq!(*period_index, 1);
            }
            other => panic!("unexpected conflict {other:?}"),
        }
    }

    #[test]
    fn test_no_shared_dimension_no_conflict() {
        let mut a = slot(DayOfWeek::Mon, 1, "Form 1", "Maths");
        let mut b = slot(DayOfWeek::Mon, 1, "Form 2", "Maths");
        a.teacher_id = Some(TeacherId::new());
        b.teacher_id = Some(TeacherId::new());
        a.room = Some("Lab 1".into());
        b.room = Some("Lab 2".into());
        assert!(compute_conflicts(&[a, b], &[]).is_empty());
    }

    #[test]
    fn test_slot_can_appear_in_every_dimension() {
        let teacher = TeacherId::new();
        let mut a = slot(DayOfWeek::Tue, 3, "Form 1", "Maths");
        let mut b = slot(DayOfWeek::Tue, 3, "Form 1", "Physics");
        for s in [&mut a, &mut b] {
            s.teacher_id = Some(teacher);
            s.room = Some("Lab".into());
        }
        let conflicts = compute_conflicts(&[a, b], &[]);
        assert_eq!(
            kinds(&conflicts),
            vec![
                ConflictKind::ClassDoubleBook,
                ConflictKind::TeacherDoubleBook,
                ConflictKind::RoomDoubleBook
            ]
        );
    }

    #[test]
    fn test_unset_teacher_and_blank_room_are_ignored() {
        let mut a = slot(DayOfWeek::Wed, 0, "Form 1", "Maths");
        let mut b = slot(DayOfWeek::Wed, 0, "Form 2", "Maths");
        a.room = Some("  ".into());
        b.room = Some(String::new());
        assert!(compute_conflicts(&[a, b], &[]).is_empty());
    }

    #[test]
    fn test_different_periods_do_not_collide() {
        let teacher = TeacherId::new();
        let mut a = slot(DayOfWeek::Mon, 1, "Form 1", "Maths");
        let mut b = slot(DayOfWeek::Mon, 2, "Form 2", "Maths");
        a.teacher_id = Some(teacher);
        b.teacher_id = Some(teacher);
        assert!(compute_conflicts(&[a, b], &[]).is_empty());
    }

    #[test]
    fn test_allocation_deficit_and_excess() {
        let slots = vec![
            slot(DayOfWeek::Mon, 0, "Form 1", "Maths"),
            slot(DayOfWeek::Tue, 0, "Form 1", "Maths"),
            slot(DayOfWeek::Wed, 0, "Form 1", "English"),
        ];
        let allocations = vec![
            allocation("Form 1", "Maths", 4),
            allocation("Form 1", "English", 1),
            allocation("Form 1", "Chemistry", 0),
            allocation("Form 2", "Maths", 1),
        ];
        let conflicts = compute_conflicts(&slots, &allocations);
        assert_eq!(
            conflicts,
            vec![
                Conflict::AllocationDeficit {
                    class_name: "Form 1".into(),
                    subject: "Maths".into(),
                    required: 4,
                    scheduled: 2,
                },
                Conflict::AllocationDeficit {
                    class_name: "Form 2".into(),
                    subject: "Maths".into(),
                    required: 1,
                    scheduled: 0,
                },
            ]
        );

        let conflicts = compute_conflicts(&slots, &[allocation("Form 1", "English", 0)]);
        assert_eq!(kinds(&conflicts), vec![ConflictKind::AllocationExcess]);
    }

    #[test]
    fn test_conflict_serializes_with_type_tag() {
        let c = Conflict::AllocationExcess {
            class_name: "Form 1".into(),
            subject: "Maths".into(),
            required: 1,
            scheduled: 2,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "allocation_excess");
        assert_eq!(v["scheduled"], 2);
    }

    #[test]
    fn test_day_parsing() {
        assert_eq!("monday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Mon);
        assert_eq!("FRI".parse::<DayOfWeek>().unwrap(), DayOfWeek::Fri);
        assert!("someday".parse::<DayOfWeek>().is_err());
        let d: DayOfWeek = serde_json::from_str(r#""thu""#).unwrap();
        assert_eq!(serde_json::to_string(&d).unwrap(), r#""Thu""#);
    }

    #[test]
    fn test_period_window() {
        let (from, to) = period_window("08:30", 40, 2).unwrap();
        assert_eq!(from.format("%H:%M").to_string(), "09:50");
        assert_eq!(to.format("%H:%M").to_string(), "10:30");
        assert!(period_window("8.30", 40, 0).is_none());
        assert!(period_window("08:30", 40, -1).is_none());
    }

    #[test]
    fn test_my_timetable_orders_by_day_then_period() {
        let slots = vec![
            slot(DayOfWeek::Wed, 0, "Form 1", "Art"),
            slot(DayOfWeek::Mon, 2, "Form 1", "Maths"),
            slot(DayOfWeek::Mon, 0, "Form 1", "English"),
        ];
        let tt = MyTimetable::build("T1".into(), "Form 1".into(), slots, None);
        let order: Vec<_> = tt.periods.iter().map(|p| p.slot.subject.as_str()).collect();
        assert_eq!(order, vec!["English", "Maths", "Art"]);
        assert!(tt.periods[0].starts_at.is_none());
    }
}
