use serde::{Deserialize, Serialize};

/// Per-step rewards for one trajectory, index-aligned with its steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardVector(Vec<f64>);

impl RewardVector {
    pub fn new(rewards: Vec<f64>) -> Self {
        Self(rewards)
    }

    /// `len` copies of `value`: the broadcast part of an outcome reward.
    pub fn broadcast(value: f64, len: usize) -> Self {
        Self(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, f64> {
        self.0.iter_mut()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            0.0
        } else {
            self.sum() / self.0.len() as f64
        }
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for RewardVector {
    fn from(rewards: Vec<f64>) -> Self {
        Self(rewards)
    }
}
