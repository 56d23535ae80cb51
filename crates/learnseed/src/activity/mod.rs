//! Activity types, their content contracts, and the name-indexed activity catalog.

pub mod catalog;
pub mod content;
pub mod schema;
pub mod validation;

pub use catalog::{
    Activity, ActivityCatalog, ActivityDraft, ActivityId, Admission, CatalogError,
    DefaultDesignation, SYSTEM_DEFAULT_TAG,
};
pub use content::{
    ActivityContent, Article, BuiltinType, CustomContent, InClassTask, Music, PausePoint, Video,
    Worksheet,
};
pub use schema::{ActivityTypeRegistry, ActivityTypeSchema, Registration, SchemaError};
pub use validation::{
    validate_content, validate_content_with, ContentValidationError, ContentViolation,
    UnknownFieldPolicy,
};
