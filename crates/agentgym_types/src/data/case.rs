use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Difficulty of a case relative to its scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Easy,
    Medium,
    Hard,
}

impl Complexity {
    /// Extra chance of a step going wrong on harder cases.
    pub fn error_bias(&self) -> f64 {
        match self {
            Self::Easy => 0.0,
            Self::Medium => 0.03,
            Self::Hard => 0.06,
        }
    }
}

/// One unit of scenario work presented to the acting policy in an episode
/// (a support ticket, a pull request, an analysis task).
///
/// Cases are immutable once a scenario has produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    id: String,
    title: String,
    category: String,
    complexity: Complexity,
    expected_actions: Vec<String>,
    attributes: BTreeMap<String, f64>,
}

impl Case {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        complexity: Complexity,
        expected_actions: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            complexity,
            expected_actions,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn expected_actions(&self) -> &[String] {
        &self.expected_actions
    }

    pub fn attribute(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).copied()
    }
}
