//! Tags: free-form user labels attached to a Thing or a RuleId.

use serde::{Deserialize, Serialize};

use super::ids::{RuleId, ThingId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagTarget {
    Thing(ThingId),
    Rule(RuleId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub target: TagTarget,
    pub app_id: String,
    pub tag_id: String,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_targets_are_distinguishable() {
        let thing_tag = Tag {
            target: TagTarget::Thing(ThingId::new()),
            app_id: "app".into(),
            tag_id: "favorite".into(),
            value: String::new(),
        };
        matches!(thing_tag.target, TagTarget::Thing(_));
    }
}
