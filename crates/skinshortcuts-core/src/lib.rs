// Core modules
pub mod builder;
pub mod conditions;
pub mod error;
pub mod expressions;
pub mod markup;
pub mod model;
pub mod suffix;

// Re-export commonly used types
pub use builder::{BuildOutput, TemplateBuilder};
pub use error::{Result, SkinshortcutsError};
pub use markup::{MarkupNode, MarkupTree, NodeId};
pub use model::PropertyMap;
