pub use schoolbase_models::users::{
    CreateGuardianLinkDto, CreateUserDto, GuardianLink, LinkedStudent, RoleInfo,
    SetStudentLinkDto, UpdateUserDto, User, UserFilterParams, UserWithRoles, parse_role_names,
};
