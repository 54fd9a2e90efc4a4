pub use schoolbase_models::communication::{
    AnnouncementDto, BulkEmailDto, CommTemplate, CreateTemplateDto, DeliveryReport, Rendered,
    SendEmailDto, UpdateTemplateDto, compose, render,
};
