pub use schoolbase_models::discipline::{
    CaseFilterParams, CaseStatus, CaseWithStudent, CreateCaseDto, DisciplinaryCase,
    DisciplineSummary, SeverityCount, UpdateCaseDto, cases_csv, is_high_severity,
};
