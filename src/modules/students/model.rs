pub use schoolbase_models::students::{
    CreateStudentDto, Student, StudentFilterParams, UpdateStudentDto,
};
