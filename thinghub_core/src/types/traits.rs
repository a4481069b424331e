//! Common small traits shared across the data model.

use uuid::Uuid;

/// An entity that can be uniquely identified by a `Uuid`.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// An entity whose invariants can be checked independent of any store.
pub trait Validatable {
    type Error;

    fn validate(&self) -> Result<(), Self::Error>;
}

/// An entity carrying a human-facing name/description pair.
pub trait Describable {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

impl Identifiable for super::thing::Thing {
    fn id(&self) -> Uuid {
        self.id.into()
    }
}

impl Identifiable for super::rule::Rule {
    fn id(&self) -> Uuid {
        self.id.into()
    }
}

impl Identifiable for super::thing_class::ThingClass {
    fn id(&self) -> Uuid {
        self.id.into()
    }
}

impl Validatable for super::rule::Rule {
    type Error = String;

    fn validate(&self) -> Result<(), Self::Error> {
        self.kind().map(|_| ())
    }
}
