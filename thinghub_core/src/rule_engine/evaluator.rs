//! StateEvaluator tree evaluation against live thing state (§4.6).

use crate::thing_manager::ThingManager;
use crate::types::{BoolOperator, ComparisonOperator, StateDescriptor, StateEvaluator, StateTarget};

fn compare(lhs: &crate::types::Value, op: ComparisonOperator, rhs: &crate::types::Value) -> bool {
    use std::cmp::Ordering::*;
    let coerced_rhs = rhs.coerce(match lhs {
        crate::types::Value::Bool(_) => crate::types::SemanticType::Bool,
        crate::types::Value::Int(_) => crate::types::SemanticType::Int,
        crate::types::Value::UInt(_) => crate::types::SemanticType::UInt,
        crate::types::Value::Double(_) => crate::types::SemanticType::Double,
        crate::types::Value::String(_) => crate::types::SemanticType::String,
        crate::types::Value::Uuid(_) => crate::types::SemanticType::Uuid,
        crate::types::Value::Variant(_) => crate::types::SemanticType::Variant,
    });
    let Some(rhs) = coerced_rhs else { return false };

    match (op, lhs.partial_compare(&rhs)) {
        (ComparisonOperator::Eq, Some(Equal)) => true,
        (ComparisonOperator::Neq, Some(o)) => o != Equal,
        (ComparisonOperator::Lt, Some(Less)) => true,
        (ComparisonOperator::Lte, Some(Less | Equal)) => true,
        (ComparisonOperator::Gt, Some(Greater)) => true,
        (ComparisonOperator::Gte, Some(Greater | Equal)) => true,
        _ => false,
    }
}

fn descriptor_matches(descriptor: &StateDescriptor, things: &ThingManager) -> bool {
    match &descriptor.target {
        StateTarget::Thing { thing_id, state_type_id } => match things.thing(*thing_id) {
            Ok(thing) => thing
                .state_value(*state_type_id)
                .map(|v| compare(v, descriptor.operator, &descriptor.value))
                .unwrap_or(false),
            Err(_) => false,
        },
        // Interface-addressed descriptors use union (any-match) semantics
        // over every configured thing implementing the interface (§9).
        StateTarget::Interface { interface, state_name } => things
            .operational_things_implementing(interface)
            .iter()
            .any(|thing| {
                let Some(state_type_id) = things
                    .registry()
                    .state_type_id_by_name(thing.thing_class_id, state_name)
                else {
                    return false;
                };
                thing
                    .state_value(state_type_id)
                    .map(|v| compare(v, descriptor.operator, &descriptor.value))
                    .unwrap_or(false)
            }),
    }
}

pub fn evaluate(evaluator: &StateEvaluator, things: &ThingManager) -> bool {
    match evaluator {
        StateEvaluator::Leaf(descriptor) => descriptor_matches(descriptor, things),
        StateEvaluator::Node { operator, children } => match operator {
            BoolOperator::And => children.iter().all(|c| evaluate(c, things)),
            BoolOperator::Or => children.iter().any(|c| evaluate(c, things)),
        },
    }
}
