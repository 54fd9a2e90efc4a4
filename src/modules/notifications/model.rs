pub use schoolbase_models::notifications::{
    MarkedRead, Notification, NotificationListParams, NotificationPreference, NotificationType,
    PreferencesUpdate, UnreadCount,
};
pub use schoolbase_models::users::LinkedStudent;
