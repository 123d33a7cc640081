pub mod attributes;
pub mod document;
pub mod error;
pub mod frame;
pub mod history;
pub mod localization;
pub mod panic_handler;
pub mod plugin;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod view;
pub mod viewer;

pub use attributes::Attributes;
pub use document::{Destination, Document, DocumentInfo, DocumentSource, OutlineEntry};
pub use error::{Result, ViewerError};
pub use frame::{Frame, Layer, PageSlot};
pub use localization::Localization;
pub use plugin::{CommandSender, Plugin, PluginContext, ViewerSnapshot};
pub use scheduler::RenderStatus;
pub use view::{
    Command, Effect, RotateDirection, Rotation, ScrollMode, Size, ViewMode, ZoomLevel,
};
pub use viewer::{Viewer, ViewerOptions};
