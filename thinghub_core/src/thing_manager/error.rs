use thiserror::Error;

use crate::types::{
    ActionTypeId, EventTypeId, PairingTransactionId, PluginId, StateTypeId, ThingClassId,
    ThingDescriptorId, ThingId, VendorId,
};

/// Stable status names exposed to transport servers (§6). Every
/// fallible ThingManager operation resolves to one of these.
#[derive(Debug, Error)]
pub enum ThingManagerError {
    #[error("plugin not found: {0}")]
    PluginNotFound(PluginId),
    #[error("vendor not found: {0}")]
    VendorNotFound(VendorId),
    #[error("thing not found: {0}")]
    ThingNotFound(ThingId),
    #[error("thing class not found: {0}")]
    ThingClassNotFound(ThingClassId),
    #[error("action type not found: {0}")]
    ActionTypeNotFound(ActionTypeId),
    #[error("state type not found: {0}")]
    StateTypeNotFound(StateTypeId),
    #[error("event type not found: {0}")]
    EventTypeNotFound(EventTypeId),
    #[error("thing descriptor not found: {0}")]
    ThingDescriptorNotFound(ThingDescriptorId),
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("setup failed: {0}")]
    SetupFailed(String),
    #[error("duplicate uuid")]
    DuplicateUuid,
    #[error("creation method not supported")]
    CreationMethodNotSupported,
    #[error("setup method not supported")]
    SetupMethodNotSupported,
    #[error("hardware not available")]
    HardwareNotAvailable,
    #[error("hardware failure: {0}")]
    HardwareFailure(String),
    #[error("authentication failure")]
    AuthenticationFailure,
    #[error("thing is in use")]
    ThingInUse,
    #[error("thing is referenced by a rule")]
    ThingInRule,
    #[error("thing is a child of another thing")]
    ThingIsChild,
    #[error("pairing transaction not found: {0}")]
    PairingTransactionIdNotFound(PairingTransactionId),
    #[error("parameter is not writable: {0}")]
    ParameterNotWritable(String),
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("item not executable: {0}")]
    ItemNotExecutable(String),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("operation timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, ThingManagerError>;
