//! The hub's data model: newtype ids, param/value coercion, and the
//! entities (ThingClass, Thing, Rule, ...) built from them.

pub mod action;
pub mod browser;
pub mod descriptor;
pub mod ids;
pub mod interface;
pub mod param;
pub mod rule;
pub mod state;
pub mod tag;
pub mod thing;
pub mod thing_class;
pub mod traits;
pub mod vendor_plugin;

pub use action::{Action, ActionExecutionStatus, Event, Trigger};
pub use browser::{BrowserItem, BrowserItemAction};
pub use descriptor::{PairingTransaction, ThingDescriptor};
pub use ids::{
    ActionTypeId, EventTypeId, PairingTransactionId, ParamTypeId, PluginId, RuleId, StateTypeId,
    ThingClassId, ThingDescriptorId, ThingId, VendorId,
};
pub use interface::Interface;
pub use param::{InputType, ParamMap, ParamType, SemanticType, Value};
pub use rule::{
    BoolOperator, CalendarItem, ComparisonOperator, EventDescriptor, RepeatingMode,
    RepeatingOption, Rule, RuleAction, RuleActionParam, RuleActionParamValue, RuleActionTarget,
    RuleKind, StateDescriptor, StateEvaluator, StateTarget, TimeDescriptor, TimeEventItem,
};
pub use state::{ActionType, EventType, StateType};
pub use tag::{Tag, TagTarget};
pub use thing::{SetupStatus, Thing};
pub use thing_class::{CreateMethod, SetupMethod, ThingClass};
pub use traits::{Describable, Identifiable, Validatable};
pub use vendor_plugin::{Plugin, Vendor};
