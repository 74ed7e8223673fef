//! askui Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtime specifics
//!
//! All types here represent the wire-level and domain model of askui:
//! UI requests, their lifecycle status, and the per-widget payload shapes.

pub mod error;
pub mod ids;
pub mod request;
pub mod widget;

// Re-export commonly used types
pub use error::StoreError;
pub use ids::{ImageId, RequestId};
pub use request::{RequestStatus, UiRequest, WidgetType};
pub use widget::{
    ConfirmInput, ConfirmOutput, FormInput, FormOutput, ImageInput, ImageItem, ImageOutput,
    SelectInput, SelectOutput, TableInput, TableOutput, UploadInput, UploadOutput, UploadedFile,
};
