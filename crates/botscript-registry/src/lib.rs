//! BotScript registry crate.
//!
//! The engine-wide directories a compiled program is checked and linked
//! against:
//!
//! - [`ClassRegistry`]: classes, their parents, instance templates and
//!   declared call signatures, plus one [`SyncGuard`] per class
//! - [`PublicRegistry`]: the non-owning directory of `public` functions

pub mod class;
pub mod guard;
pub mod public;

pub use class::{ClassEntry, ClassRegistry, FieldDef, MethodDecl, RegistryError};
pub use guard::{DEFAULT_MAX_WAITERS, SyncGuard};
pub use public::PublicRegistry;
