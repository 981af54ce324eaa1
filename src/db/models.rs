use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::WorkflowStatus;
use crate::schemas::rubric::Rubric;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct RubricRecord {
    pub(crate) id: String,
    pub(crate) content_hash: String,
    pub(crate) body: Json<Rubric>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Training essay with the points of the option selected for each criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoredExample {
    pub(crate) text: String,
    pub(crate) scores: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TrainingWorkflow {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) training_examples: Json<Vec<ScoredExample>>,
    pub(crate) status: WorkflowStatus,
    pub(crate) classifier_set_id: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GradingWorkflow {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) essay_text: String,
    pub(crate) classifier_set_id: Option<String>,
    pub(crate) status: WorkflowStatus,
    pub(crate) assessment_id: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

/// Opaque, algorithm-defined classifier payload. Never parsed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Classifier(Vec<u8>);

impl Classifier {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Classifier {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ClassifierSetRow {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ClassifierRow {
    pub(crate) criterion_name: String,
    pub(crate) payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct ClassifierSet {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) classifiers: BTreeMap<String, Classifier>,
}

impl ClassifierSet {
    pub(crate) fn from_rows(row: ClassifierSetRow, classifiers: Vec<ClassifierRow>) -> Self {
        Self {
            id: row.id,
            rubric_id: row.rubric_id,
            algorithm_id: row.algorithm_id,
            created_at: row.created_at,
            classifiers: classifiers
                .into_iter()
                .map(|item| (item.criterion_name, Classifier::from(item.payload)))
                .collect(),
        }
    }

    pub(crate) fn classifier(&self, criterion_name: &str) -> Option<&Classifier> {
        self.classifiers.get(criterion_name)
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AssessmentRow {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) scorer_id: String,
    pub(crate) score_type: String,
    pub(crate) points_earned: i32,
    pub(crate) points_possible: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentPart {
    pub(crate) criterion_name: String,
    pub(crate) option_name: String,
    pub(crate) points: i32,
    pub(crate) raw_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Assessment {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) scorer_id: String,
    pub(crate) score_type: String,
    pub(crate) points_earned: i32,
    pub(crate) points_possible: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) parts: Vec<AssessmentPart>,
}

impl Assessment {
    pub(crate) fn from_rows(row: AssessmentRow, parts: Vec<AssessmentPart>) -> Self {
        Self {
            id: row.id,
            submission_id: row.submission_id,
            rubric_id: row.rubric_id,
            scorer_id: row.scorer_id,
            score_type: row.score_type,
            points_earned: row.points_earned,
            points_possible: row.points_possible,
            created_at: row.created_at,
            parts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) student_id: String,
    pub(crate) answer: String,
    pub(crate) created_at: PrimitiveDateTime,
}

/// A (course, item) pair that still holds pending workflows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, FromRow)]
pub(crate) struct WorkflowScope {
    pub(crate) course_id: String,
    pub(crate) item_id: String,
}
