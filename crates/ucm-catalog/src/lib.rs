//! UCM Catalog - verbs, devices and modifiers parsed from descriptor text
//!
//! A card's catalog is read once at open time and is immutable afterwards.
//! Two on-disk shapes are supported: one shared file holding every verb, or
//! a master index naming one file per verb. In the indexed shape the primary
//! verb is parsed before `open` returns and the rest on a background thread.

pub mod loader;
pub mod model;
pub mod parser;

mod build;

pub use loader::{parse_catalog, CardInfo, CatalogHandle, CatalogLoader};
pub use model::{Catalog, Descriptor, DeviceId, ModifierId, Scope, UseCase, Verb, VerbId};
pub use parser::{parse_control_line, SectionKind};
