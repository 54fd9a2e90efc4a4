pub use schoolbase_models::attendance::{
    Attendance, AttendanceSheet, AttendanceSheetParams, AttendanceSheetRow, AttendanceStatus,
    AttendanceStreak, DateRangeParams, MarkAttendanceDto, MarkAttendanceResponse, MarkItem,
    StreakSummary, attendance_streaks,
};
