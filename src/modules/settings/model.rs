pub use schoolbase_models::settings::{SchoolSettings, SettingsPatch, UpdateSettingsDto, Versioned};
