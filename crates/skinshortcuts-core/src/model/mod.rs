//! Data model consumed by the template builder.
//!
//! Menus and property fallbacks are produced by external loaders and handed
//! in ready-made; the template schema is the name-indexed registry of
//! reusable fragments a build resolves against.

pub mod menu;
pub mod property;
pub mod template;

use indexmap::IndexMap;

/// Ordered name→value property mapping.
///
/// Insertion order is preserved everywhere it matters: contexts, preset
/// rows, defaults. Deterministic iteration keeps repeated builds
/// byte-identical.
pub type PropertyMap = IndexMap<String, String>;
