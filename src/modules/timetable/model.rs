pub use schoolbase_models::timetable::{
    AllocationFilterParams, Conflict, ConflictKind, ConflictReport, CreateAllocationDto,
    CreateSlotDto, DayOfWeek, MyTimetable, ScheduledPeriod, SlotFilterParams, SubjectAllocation,
    TermParams, TimetableConfig, TimetableSlot, UpdateAllocationDto, UpdateSlotDto,
    UpsertConfigDto, compute_conflicts,
};
