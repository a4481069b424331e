//! ThingDescriptor and PairingTransaction: provisional things pending
//! add/discard or confirmation.

use serde::{Deserialize, Serialize};

use super::ids::{PairingTransactionId, ThingClassId, ThingDescriptorId, ThingId};
use super::param::ParamMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingDescriptor {
    pub id: ThingDescriptorId,
    pub thing_class_id: ThingClassId,
    pub title: String,
    pub description: String,
    pub parent_id: Option<ThingId>,
    /// Set when discovery recognizes an already-configured thing (the
    /// descriptor represents a re-appearance, not a new thing).
    pub existing_thing_id: Option<ThingId>,
    pub params: ParamMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingTransaction {
    pub id: PairingTransactionId,
    pub thing_class_id: ThingClassId,
    pub thing_id: Option<ThingId>,
    pub params: ParamMap,
    pub name: String,
    pub parent_id: Option<ThingId>,
    pub o_auth_url: Option<String>,
}
