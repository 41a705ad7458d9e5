//! Change trigger mask.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Kinds of change that wake a subscription.
    ///
    /// The bit values match the native notify filter, so the mask can be
    /// passed through to the OS unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeTrigger: u32 {
        /// A subkey was added or deleted.
        const SUBTREE = 1;
        /// Attributes of the key changed.
        const ATTRIBUTES = 2;
        /// A value of the key was added, deleted or modified.
        const VALUE = 4;
        /// The security descriptor of the key changed.
        const SECURITY = 8;
        /// Any of the above.
        const ANY = Self::SUBTREE.bits()
            | Self::ATTRIBUTES.bits()
            | Self::VALUE.bits()
            | Self::SECURITY.bits();
    }
}

impl Default for ChangeTrigger {
    fn default() -> Self {
        ChangeTrigger::ANY
    }
}

impl Serialize for ChangeTrigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for ChangeTrigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}
