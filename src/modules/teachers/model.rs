pub use schoolbase_models::teachers::{
    AssignmentFilterParams, CreateAssignmentDto, CreateTeacherDto, Teacher, TeacherAssignment,
    TeacherFilterParams, TeachingScope, UpdateTeacherDto,
};
