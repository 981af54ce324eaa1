use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Classifier, ClassifierSet};
use crate::schemas::rubric::Rubric;
use crate::services::errors::StoreError;
use crate::services::workflow_store::{NewClassifierSet, WorkflowStore};

#[derive(Debug, Error)]
pub(crate) enum ClassifierSetError {
    #[error("no classifier supplied for criterion '{0}'")]
    MissingCriterion(String),
    #[error("classifier supplied for unknown criterion '{0}'")]
    UnexpectedCriterion(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists a new immutable set holding exactly one classifier per rubric criterion
/// and completes the training workflow that produced it, in one write.
///
/// Returns `None` when the workflow was no longer pending; nothing is stored then.
pub(crate) async fn create_classifier_set(
    store: &dyn WorkflowStore,
    training_workflow_id: &str,
    classifiers: BTreeMap<String, Classifier>,
    rubric_id: &str,
    rubric: &Rubric,
    algorithm_id: &str,
) -> Result<Option<ClassifierSet>, ClassifierSetError> {
    for criterion in &rubric.criteria {
        if !classifiers.contains_key(&criterion.name) {
            return Err(ClassifierSetError::MissingCriterion(criterion.name.clone()));
        }
    }
    if let Some(extra) = classifiers.keys().find(|name| rubric.criterion(name).is_none()) {
        return Err(ClassifierSetError::UnexpectedCriterion(extra.clone()));
    }

    let created_at = primitive_now_utc();
    let classifier_set = store
        .complete_training_with_set(
            training_workflow_id,
            NewClassifierSet {
                id: uuid::Uuid::new_v4().to_string(),
                rubric_id: rubric_id.to_string(),
                algorithm_id: algorithm_id.to_string(),
                created_at,
                classifiers,
            },
            created_at,
        )
        .await?;

    if let Some(classifier_set) = &classifier_set {
        tracing::info!(
            classifier_set_id = %classifier_set.id,
            training_workflow_id,
            rubric_id,
            algorithm_id,
            criteria = classifier_set.classifiers.len(),
            "Classifier set created"
        );
    }

    Ok(classifier_set)
}
