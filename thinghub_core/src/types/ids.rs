//! Newtype identifiers for the entities in the data model.
//!
//! Every id in the hub is a 128-bit UUID. Wrapping each kind in its own
//! type (rather than passing `Uuid` everywhere) keeps a `ThingId` from
//! being accidentally handed to a function expecting a `RuleId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(VendorId, "Identifies a Vendor.");
define_id!(PluginId, "Identifies a loaded Plugin.");
define_id!(ThingClassId, "Identifies a ThingClass.");
define_id!(ParamTypeId, "Identifies a ParamType.");
define_id!(StateTypeId, "Identifies a StateType.");
define_id!(ActionTypeId, "Identifies an ActionType.");
define_id!(EventTypeId, "Identifies an EventType.");
define_id!(ThingId, "Identifies a configured Thing.");
define_id!(ThingDescriptorId, "Identifies a ThingDescriptor.");
define_id!(PairingTransactionId, "Identifies a PairingTransaction.");
define_id!(RuleId, "Identifies a Rule.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_uuid() {
        let uuid = Uuid::new_v4();
        let thing_id: ThingId = uuid.into();
        let back: Uuid = thing_id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn distinct_id_types_do_not_compare_equal_by_accident() {
        let uuid = Uuid::new_v4();
        let thing_id = ThingId(uuid);
        let rule_id = RuleId(uuid);
        // This wouldn't even compile if the types were interchangeable;
        // the assertion just documents that the underlying value can match.
        assert_eq!(thing_id.0, rule_id.0);
    }
}
