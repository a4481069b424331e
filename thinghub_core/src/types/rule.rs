//! Rule and its embedded descriptors: the data model consumed by the
//! RuleEngine (§3, §4.6).

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ids::{ActionTypeId, EventTypeId, ParamTypeId, RuleId, StateTypeId, ThingId};
use super::param::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatingMode {
    None,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// How a CalendarItem/TimeEventItem repeats. `weekDays` are ISO weekday
/// numbers (1 = Monday .. 7 = Sunday); `monthDays` are 1..31.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingOption {
    pub mode: Option<RepeatingMode>,
    #[serde(default)]
    pub week_days: Vec<u8>,
    #[serde(default)]
    pub month_days: Vec<u8>,
}

impl RepeatingOption {
    pub fn mode(&self) -> RepeatingMode {
        self.mode.unwrap_or(RepeatingMode::None)
    }

    /// Validates the weekDays/monthDays-only-with-matching-mode invariant.
    pub fn validate(&self) -> Result<(), String> {
        match self.mode() {
            RepeatingMode::Weekly => {
                if self.month_days.iter().any(|_| true) && !self.month_days.is_empty() {
                    return Err("monthDays is only valid with mode=monthly".into());
                }
                if self.week_days.iter().any(|d| !(1..=7).contains(d)) {
                    return Err("weekDays must be in 1..=7".into());
                }
            }
            RepeatingMode::Monthly => {
                if !self.week_days.is_empty() {
                    return Err("weekDays is only valid with mode=weekly".into());
                }
                if self.month_days.iter().any(|d| !(1..=31).contains(d)) {
                    return Err("monthDays must be in 1..=31".into());
                }
            }
            _ => {
                if !self.week_days.is_empty() {
                    return Err("weekDays is only valid with mode=weekly".into());
                }
                if !self.month_days.is_empty() {
                    return Err("monthDays is only valid with mode=monthly".into());
                }
            }
        }
        Ok(())
    }
}

/// An interval with a start (time-of-day or dateTime) and a duration,
/// optionally repeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarItem {
    pub start_time: Option<NaiveTime>,
    pub start_date_time: Option<NaiveDateTime>,
    /// Minutes, >= 1.
    pub duration: i64,
    #[serde(default)]
    pub repeating: RepeatingOption,
}

impl CalendarItem {
    pub fn validate(&self) -> Result<(), String> {
        match (self.start_time, self.start_date_time) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => return Err("exactly one of startTime/startDateTime must be set".into()),
        }
        if self.duration < 1 {
            return Err("duration must be >= 1 minute".into());
        }
        if self.start_date_time.is_some()
            && !matches!(self.repeating.mode(), RepeatingMode::None | RepeatingMode::Yearly)
        {
            return Err("startDateTime items may only repeat none or yearly".into());
        }
        self.repeating.validate()
    }
}

/// An instant (time-of-day or dateTime), optionally repeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEventItem {
    pub time: Option<NaiveTime>,
    pub date_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub repeating: RepeatingOption,
}

impl TimeEventItem {
    pub fn validate(&self) -> Result<(), String> {
        match (self.time, self.date_time) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => return Err("exactly one of time/dateTime must be set".into()),
        }
        if self.date_time.is_some()
            && !matches!(self.repeating.mode(), RepeatingMode::None | RepeatingMode::Yearly)
        {
            return Err("dateTime items may only repeat none or yearly".into());
        }
        self.repeating.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeDescriptor {
    #[serde(default)]
    pub calendar_items: Vec<CalendarItem>,
    #[serde(default)]
    pub time_event_items: Vec<TimeEventItem>,
}

impl TimeDescriptor {
    pub fn is_empty(&self) -> bool {
        self.calendar_items.is_empty() && self.time_event_items.is_empty()
    }
}

/// One leaf of an EventDescriptor: references an EventType and pins
/// specific param values it must carry to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub thing_id: ThingId,
    pub event_type_id: EventTypeId,
    #[serde(default)]
    pub param_values: Vec<(ParamTypeId, ComparisonOperator, Value)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Either a concrete thing or every configured thing implementing an
/// interface (union semantics, §4.6, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateTarget {
    Thing { thing_id: ThingId, state_type_id: StateTypeId },
    Interface { interface: String, state_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDescriptor {
    #[serde(flatten)]
    pub target: StateTarget,
    pub operator: ComparisonOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoolOperator {
    And,
    Or,
}

/// A boolean tree over StateDescriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateEvaluator {
    Leaf(StateDescriptor),
    Node {
        operator: BoolOperator,
        children: Vec<StateEvaluator>,
    },
}

/// A RuleActionParam is exactly one of value-based, event-based, or
/// state-based (mirrors `original_source`'s RuleActionParam).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuleActionParamValue {
    Value(Value),
    Event {
        event_type_id: EventTypeId,
        event_param_type_id: ParamTypeId,
    },
    State {
        state_thing_id: ThingId,
        state_type_id: StateTypeId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleActionParam {
    pub param_type_id: ParamTypeId,
    pub value: RuleActionParamValue,
}

/// What a RuleAction addresses: a single thing's action, every thing
/// implementing an interface's action (fan-out), or a browser item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuleActionTarget {
    Thing {
        thing_id: ThingId,
        action_type_id: ActionTypeId,
    },
    Interface {
        interface: String,
        interface_action: String,
    },
    Browser {
        thing_id: ThingId,
        browser_item_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAction {
    pub target: RuleActionTarget,
    #[serde(default)]
    pub params: Vec<RuleActionParam>,
}

impl RuleAction {
    pub fn is_event_based(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p.value, RuleActionParamValue::Event { .. }))
    }

    pub fn is_state_based(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p.value, RuleActionParamValue::State { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub time_descriptor: TimeDescriptor,
    #[serde(default)]
    pub event_descriptors: Vec<EventDescriptor>,
    pub state_evaluator: Option<StateEvaluator>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub exit_actions: Vec<RuleAction>,
    pub executable: bool,
    /// Derived; only meaningful for state-based and mixed rules.
    #[serde(default)]
    pub active: bool,
    pub last_active_change: Option<chrono::DateTime<chrono::Utc>>,
}

/// The three rule archetypes §4.6 distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    EventBased,
    StateBased,
    Mixed,
}

impl Rule {
    /// Validates the §3 invariant: exactly one of
    /// `{eventDescriptors, stateEvaluator, timeDescriptor}` is non-empty
    /// as the rule's *primary* trigger, and at least one of
    /// `actions`/`exitActions` is non-empty.
    ///
    /// Per §4.6, timeEventItems count as an event-like trigger, so a
    /// rule may combine `eventDescriptors`/`timeEventItems` with
    /// `stateEvaluator` and `calendarItems` as gates without violating
    /// the single-primary-trigger rule; this is the "mixed" archetype.
    pub fn kind(&self) -> Result<RuleKind, String> {
        let has_events = !self.event_descriptors.is_empty();
        let has_time_events = !self.time_descriptor.time_event_items.is_empty();
        let has_state = self.state_evaluator.is_some();
        let has_calendar = !self.time_descriptor.calendar_items.is_empty();

        if self.actions.is_empty() && self.exit_actions.is_empty() {
            return Err("a rule needs at least one action or exit action".into());
        }

        let is_event_based = has_events || has_time_events;
        let is_state_gated_only = has_state || has_calendar;

        match (is_event_based, is_state_gated_only) {
            (true, true) => Ok(RuleKind::Mixed),
            (true, false) => Ok(RuleKind::EventBased),
            (false, true) => Ok(RuleKind::StateBased),
            (false, false) => Err(
                "a rule needs at least one of eventDescriptors, timeDescriptor, stateEvaluator"
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_time_descriptor() -> TimeDescriptor {
        TimeDescriptor::default()
    }

    fn base_rule() -> Rule {
        Rule {
            id: RuleId::new(),
            name: "test".into(),
            enabled: true,
            time_descriptor: empty_time_descriptor(),
            event_descriptors: vec![],
            state_evaluator: None,
            actions: vec![],
            exit_actions: vec![],
            executable: true,
            active: false,
            last_active_change: None,
        }
    }

    #[test]
    fn rejects_rule_with_no_actions() {
        let mut rule = base_rule();
        rule.event_descriptors.push(EventDescriptor {
            thing_id: ThingId::new(),
            event_type_id: EventTypeId::new(),
            param_values: vec![],
        });
        assert!(rule.kind().is_err());
    }

    #[test]
    fn rejects_rule_with_no_trigger() {
        let mut rule = base_rule();
        rule.actions.push(RuleAction {
            target: RuleActionTarget::Thing {
                thing_id: ThingId::new(),
                action_type_id: ActionTypeId::new(),
            },
            params: vec![],
        });
        assert!(rule.kind().is_err());
    }

    #[test]
    fn event_descriptor_only_is_event_based() {
        let mut rule = base_rule();
        rule.event_descriptors.push(EventDescriptor {
            thing_id: ThingId::new(),
            event_type_id: EventTypeId::new(),
            param_values: vec![],
        });
        rule.actions.push(RuleAction {
            target: RuleActionTarget::Thing {
                thing_id: ThingId::new(),
                action_type_id: ActionTypeId::new(),
            },
            params: vec![],
        });
        assert_eq!(rule.kind().unwrap(), RuleKind::EventBased);
    }

    #[test]
    fn event_plus_state_gate_is_mixed() {
        let mut rule = base_rule();
        rule.event_descriptors.push(EventDescriptor {
            thing_id: ThingId::new(),
            event_type_id: EventTypeId::new(),
            param_values: vec![],
        });
        rule.state_evaluator = Some(StateEvaluator::Leaf(StateDescriptor {
            target: StateTarget::Thing {
                thing_id: ThingId::new(),
                state_type_id: StateTypeId::new(),
            },
            operator: ComparisonOperator::Eq,
            value: Value::Bool(true),
        }));
        rule.actions.push(RuleAction {
            target: RuleActionTarget::Thing {
                thing_id: ThingId::new(),
                action_type_id: ActionTypeId::new(),
            },
            params: vec![],
        });
        assert_eq!(rule.kind().unwrap(), RuleKind::Mixed);
    }

    #[test]
    fn calendar_item_rejects_both_start_fields() {
        let item = CalendarItem {
            start_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            start_date_time: Some(
                chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            duration: 5,
            repeating: RepeatingOption::default(),
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn calendar_item_rejects_zero_duration() {
        let item = CalendarItem {
            start_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            start_date_time: None,
            duration: 0,
            repeating: RepeatingOption::default(),
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn start_date_time_rejects_non_yearly_repeat() {
        let item = CalendarItem {
            start_time: None,
            start_date_time: Some(
                chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            duration: 5,
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Daily),
                ..Default::default()
            },
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn week_days_rejected_outside_weekly_mode() {
        let opt = RepeatingOption {
            mode: Some(RepeatingMode::Daily),
            week_days: vec![1, 2],
            month_days: vec![],
        };
        assert!(opt.validate().is_err());
    }
}
