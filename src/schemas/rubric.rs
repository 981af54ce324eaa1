use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::models::ScoredExample;
use crate::schemas::training::TrainingExample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Rubric {
    pub(crate) criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Criterion {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) prompt: String,
    pub(crate) options: Vec<CriterionOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CriterionOption {
    pub(crate) name: String,
    pub(crate) points: i32,
    #[serde(default)]
    pub(crate) explanation: String,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RubricError {
    #[error("rubric is malformed: {0}")]
    Malformed(String),
    #[error("rubric must contain at least one criterion")]
    NoCriteria,
    #[error("criterion name must not be empty")]
    EmptyCriterionName,
    #[error("duplicate criterion '{0}'")]
    DuplicateCriterion(String),
    #[error("criterion '{0}' has no options")]
    NoOptions(String),
    #[error("criterion '{criterion}' has duplicate option '{option}'")]
    DuplicateOption { criterion: String, option: String },
    #[error("option '{option}' of criterion '{criterion}' has negative points")]
    NegativePoints { criterion: String, option: String },
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ExampleError {
    #[error("at least one training example is required")]
    Empty,
    #[error("example {index} selects unknown criterion '{criterion}'")]
    UnknownCriterion { index: usize, criterion: String },
    #[error("example {index} selects unknown option '{option}' for criterion '{criterion}'")]
    UnknownOption { index: usize, criterion: String, option: String },
    #[error("example {index} has no selection for criterion '{criterion}'")]
    MissingCriterion { index: usize, criterion: String },
}

impl Rubric {
    /// Parses and validates a rubric supplied as free-form JSON.
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self, RubricError> {
        let rubric: Self =
            serde_json::from_value(value).map_err(|err| RubricError::Malformed(err.to_string()))?;
        rubric.validate()?;
        Ok(rubric)
    }

    pub(crate) fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::NoCriteria);
        }

        let mut names = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.trim().is_empty() {
                return Err(RubricError::EmptyCriterionName);
            }
            if !names.insert(criterion.name.as_str()) {
                return Err(RubricError::DuplicateCriterion(criterion.name.clone()));
            }
            if criterion.options.is_empty() {
                return Err(RubricError::NoOptions(criterion.name.clone()));
            }

            let mut option_names = HashSet::new();
            for option in &criterion.options {
                if !option_names.insert(option.name.as_str()) {
                    return Err(RubricError::DuplicateOption {
                        criterion: criterion.name.clone(),
                        option: option.name.clone(),
                    });
                }
                if option.points < 0 {
                    return Err(RubricError::NegativePoints {
                        criterion: criterion.name.clone(),
                        option: option.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Hex SHA-256 of the canonical JSON body; identical rubrics share a key.
    pub(crate) fn content_hash(&self) -> String {
        let body = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&body))
    }

    pub(crate) fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|criterion| criterion.name == name)
    }

    pub(crate) fn points_possible(&self) -> i32 {
        self.criteria.iter().map(Criterion::max_points).sum()
    }

    /// Resolves each example's selected options to points, in submission order.
    pub(crate) fn score_examples(
        &self,
        examples: &[TrainingExample],
    ) -> Result<Vec<ScoredExample>, ExampleError> {
        if examples.is_empty() {
            return Err(ExampleError::Empty);
        }

        examples
            .iter()
            .enumerate()
            .map(|(index, example)| {
                for criterion in example.options_selected.keys() {
                    if self.criterion(criterion).is_none() {
                        return Err(ExampleError::UnknownCriterion {
                            index,
                            criterion: criterion.clone(),
                        });
                    }
                }

                let mut scores = BTreeMap::new();
                for criterion in &self.criteria {
                    let selected = example.options_selected.get(&criterion.name).ok_or_else(|| {
                        ExampleError::MissingCriterion { index, criterion: criterion.name.clone() }
                    })?;
                    let option =
                        criterion.option(selected).ok_or_else(|| ExampleError::UnknownOption {
                            index,
                            criterion: criterion.name.clone(),
                            option: selected.clone(),
                        })?;
                    scores.insert(criterion.name.clone(), option.points);
                }

                Ok(ScoredExample { text: example.answer.clone(), scores })
            })
            .collect()
    }
}

impl Criterion {
    pub(crate) fn option(&self, name: &str) -> Option<&CriterionOption> {
        self.options.iter().find(|option| option.name == name)
    }

    pub(crate) fn max_points(&self) -> i32 {
        self.options.iter().map(|option| option.points).max().unwrap_or(0)
    }

    /// Option whose points are nearest to `score`; ties go to the lower points.
    pub(crate) fn closest_option(&self, score: f64) -> Option<&CriterionOption> {
        let mut best: Option<(&CriterionOption, f64)> = None;
        for option in &self.options {
            let distance = (f64::from(option.points) - score).abs();
            best = match best {
                Some((current, current_distance))
                    if distance > current_distance
                        || (distance == current_distance && option.points >= current.points) =>
                {
                    Some((current, current_distance))
                }
                _ => Some((option, distance)),
            };
        }
        best.map(|(option, _)| option)
    }
}
