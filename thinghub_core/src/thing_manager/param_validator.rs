//! ParamValidator: checks a supplied params map against a ParamType
//! list (§4.2).

use crate::types::{ParamMap, ParamType};

use super::error::{Result, ThingManagerError};

/// Whether the caller is a user-initiated request or a discovery-
/// sourced one; `readOnly` params may only be supplied in the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    User,
    Discovery,
}

/// Validates `params` against `types`, returning the coerced map (with
/// missing optional params filled from `defaultValue`) or the first
/// violation encountered.
pub fn validate(types: &[ParamType], params: &ParamMap, source: ParamSource) -> Result<ParamMap> {
    let mut out = ParamMap::new();

    for param_type in types {
        let supplied = params.get(&param_type.id);

        if param_type.read_only && source == ParamSource::User && supplied.is_some() {
            return Err(ThingManagerError::ParameterNotWritable(param_type.name.clone()));
        }

        let value = match supplied {
            Some(v) => v.clone(),
            None => match &param_type.default_value {
                Some(default) => default.clone(),
                None => {
                    return Err(ThingManagerError::MissingParameter(param_type.name.clone()));
                }
            },
        };

        let coerced = value
            .coerce(param_type.semantic_type)
            .ok_or_else(|| ThingManagerError::InvalidParameter(param_type.name.clone()))?;

        if let Some(min) = &param_type.min_value {
            if matches!(coerced.partial_compare(min), Some(std::cmp::Ordering::Less) | None) {
                return Err(ThingManagerError::InvalidParameter(param_type.name.clone()));
            }
        }
        if let Some(max) = &param_type.max_value {
            if matches!(coerced.partial_compare(max), Some(std::cmp::Ordering::Greater) | None) {
                return Err(ThingManagerError::InvalidParameter(param_type.name.clone()));
            }
        }
        if !param_type.allowed_values.is_empty()
            && !param_type.allowed_values.iter().any(|v| v == &coerced)
        {
            return Err(ThingManagerError::InvalidParameter(param_type.name.clone()));
        }

        out.insert(param_type.id, coerced);
    }

    Ok(out)
}
