pub use schoolbase_models::exams::{
    Assessment, AssessmentFilterParams, AssessmentResults, CreateAssessmentDto, DEFAULT_MAX_SCORE,
    DEFAULT_WEIGHT, ExamResult, ResultRow, ScoreItem, UpdateAssessmentDto, UpsertResultsDto,
    UpsertResultsResponse,
};
