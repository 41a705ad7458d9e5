//! Core value types: key paths, change triggers and subscription options.

mod options;
mod path;
mod trigger;

pub use options::SubscribeOptions;
pub use path::{NamespaceResolver, ResolvedKey, RootKey, SEPARATOR, StandardResolver};
pub use trigger::ChangeTrigger;
