use serde::Serialize;
use uuid::Uuid;

/// A named feature switched on for a subset of accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeatureToggle {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}
