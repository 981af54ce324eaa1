use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{
    Assessment, AssessmentPart, Classifier, ClassifierSet, ClassifierSetRow, GradingWorkflow,
    RubricRecord, ScoredExample, TrainingWorkflow, WorkflowScope,
};
use crate::repositories;
use crate::schemas::rubric::Rubric;
use crate::services::errors::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct NewTrainingWorkflow {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) training_examples: Vec<ScoredExample>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct NewGradingWorkflow {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) essay_text: String,
    pub(crate) classifier_set_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct NewClassifierSet {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) classifiers: BTreeMap<String, Classifier>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewAssessment {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) scorer_id: String,
    pub(crate) points_earned: i32,
    pub(crate) points_possible: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) parts: Vec<AssessmentPart>,
}

/// Durable workflow state shared by the orchestrators, the worker tasks and the sweep.
///
/// Terminal writes (`complete_*`, `fail_*`) only apply to pending workflows and
/// `assign_classifier_set` only applies while no set is assigned; each reports
/// when it was a no-op.
#[async_trait]
pub(crate) trait WorkflowStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Stores the rubric content-addressed; identical rubrics resolve to one row.
    async fn save_rubric(&self, rubric: &Rubric) -> Result<RubricRecord, StoreError>;

    async fn find_rubric(&self, rubric_id: &str) -> Result<Option<RubricRecord>, StoreError>;

    async fn create_training_workflow(
        &self,
        workflow: NewTrainingWorkflow,
    ) -> Result<TrainingWorkflow, StoreError>;

    async fn find_training_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<TrainingWorkflow>, StoreError>;

    async fn list_incomplete_training(
        &self,
        course_id: &str,
        item_id: &str,
    ) -> Result<Vec<TrainingWorkflow>, StoreError>;

    /// Inserts the classifier set and completes the workflow atomically.
    ///
    /// Returns `None` and stores nothing when the workflow was no longer pending.
    async fn complete_training_with_set(
        &self,
        workflow_id: &str,
        classifier_set: NewClassifierSet,
        completed_at: PrimitiveDateTime,
    ) -> Result<Option<ClassifierSet>, StoreError>;

    async fn fail_training(
        &self,
        workflow_id: &str,
        error: &str,
        completed_at: PrimitiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn find_classifier_set(
        &self,
        classifier_set_id: &str,
    ) -> Result<Option<ClassifierSet>, StoreError>;

    async fn latest_classifier_set(
        &self,
        rubric_id: &str,
        algorithm_id: &str,
    ) -> Result<Option<ClassifierSetRow>, StoreError>;

    async fn create_grading_workflow(
        &self,
        workflow: NewGradingWorkflow,
    ) -> Result<GradingWorkflow, StoreError>;

    async fn find_grading_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<GradingWorkflow>, StoreError>;

    async fn list_incomplete_grading(
        &self,
        course_id: &str,
        item_id: &str,
    ) -> Result<Vec<GradingWorkflow>, StoreError>;

    async fn assign_classifier_set(
        &self,
        workflow_id: &str,
        classifier_set_id: &str,
    ) -> Result<bool, StoreError>;

    /// Persists the assessment and completes the workflow atomically.
    async fn complete_grading(
        &self,
        workflow_id: &str,
        assessment: NewAssessment,
    ) -> Result<bool, StoreError>;

    async fn fail_grading(
        &self,
        workflow_id: &str,
        error: &str,
        completed_at: PrimitiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn latest_assessment(&self, submission_id: &str)
        -> Result<Option<Assessment>, StoreError>;

    async fn list_incomplete_scopes(&self) -> Result<Vec<WorkflowScope>, StoreError>;
}

#[derive(Debug, Clone)]
pub(crate) struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn ping(&self) -> Result<(), StoreError> {
        repositories::health::ping(&self.pool).await?;
        Ok(())
    }

    async fn save_rubric(&self, rubric: &Rubric) -> Result<RubricRecord, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let content_hash = rubric.content_hash();
        let record = repositories::rubrics::upsert(
            &self.pool,
            repositories::rubrics::UpsertRubric {
                id: &id,
                content_hash: &content_hash,
                body: rubric,
                created_at: crate::core::time::primitive_now_utc(),
            },
        )
        .await?;
        Ok(record)
    }

    async fn find_rubric(&self, rubric_id: &str) -> Result<Option<RubricRecord>, StoreError> {
        Ok(repositories::rubrics::find_by_id(&self.pool, rubric_id).await?)
    }

    async fn create_training_workflow(
        &self,
        workflow: NewTrainingWorkflow,
    ) -> Result<TrainingWorkflow, StoreError> {
        let created = repositories::training_workflows::create(
            &self.pool,
            repositories::training_workflows::CreateTrainingWorkflow {
                id: &workflow.id,
                rubric_id: &workflow.rubric_id,
                course_id: &workflow.course_id,
                item_id: &workflow.item_id,
                algorithm_id: &workflow.algorithm_id,
                training_examples: &workflow.training_examples,
                created_at: workflow.created_at,
            },
        )
        .await?;
        Ok(created)
    }

    async fn find_training_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<TrainingWorkflow>, StoreError> {
        Ok(repositories::training_workflows::find_by_id(&self.pool, workflow_id).await?)
    }

    async fn list_incomplete_training(
        &self,
        course_id: &str,
        item_id: &str,
    ) -> Result<Vec<TrainingWorkflow>, StoreError> {
        Ok(repositories::training_workflows::list_incomplete(&self.pool, course_id, item_id)
            .await?)
    }

    async fn complete_training_with_set(
        &self,
        workflow_id: &str,
        classifier_set: NewClassifierSet,
        completed_at: PrimitiveDateTime,
    ) -> Result<Option<ClassifierSet>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = repositories::classifier_sets::insert_set(
            &mut *tx,
            repositories::classifier_sets::CreateClassifierSet {
                id: &classifier_set.id,
                rubric_id: &classifier_set.rubric_id,
                algorithm_id: &classifier_set.algorithm_id,
                created_at: classifier_set.created_at,
            },
        )
        .await?;

        let payloads = classifier_set
            .classifiers
            .iter()
            .map(|(name, classifier)| (name.clone(), classifier.as_bytes().to_vec()))
            .collect::<Vec<_>>();
        repositories::classifier_sets::insert_classifiers(&mut tx, &row.id, &payloads).await?;

        let updated = repositories::training_workflows::mark_complete(
            &mut *tx,
            workflow_id,
            &row.id,
            completed_at,
        )
        .await?;

        if !updated {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(ClassifierSet {
            id: row.id,
            rubric_id: row.rubric_id,
            algorithm_id: row.algorithm_id,
            created_at: row.created_at,
            classifiers: classifier_set.classifiers,
        }))
    }

    async fn fail_training(
        &self,
        workflow_id: &str,
        error: &str,
        completed_at: PrimitiveDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::training_workflows::mark_failed(
            &self.pool,
            workflow_id,
            error,
            completed_at,
        )
        .await?)
    }

    async fn find_classifier_set(
        &self,
        classifier_set_id: &str,
    ) -> Result<Option<ClassifierSet>, StoreError> {
        let Some(row) =
            repositories::classifier_sets::find_by_id(&self.pool, classifier_set_id).await?
        else {
            return Ok(None);
        };
        let classifiers =
            repositories::classifier_sets::list_classifiers(&self.pool, classifier_set_id).await?;
        Ok(Some(ClassifierSet::from_rows(row, classifiers)))
    }

    async fn latest_classifier_set(
        &self,
        rubric_id: &str,
        algorithm_id: &str,
    ) -> Result<Option<ClassifierSetRow>, StoreError> {
        Ok(repositories::classifier_sets::find_latest(&self.pool, rubric_id, algorithm_id).await?)
    }

    async fn create_grading_workflow(
        &self,
        workflow: NewGradingWorkflow,
    ) -> Result<GradingWorkflow, StoreError> {
        let created = repositories::grading_workflows::create(
            &self.pool,
            repositories::grading_workflows::CreateGradingWorkflow {
                id: &workflow.id,
                submission_id: &workflow.submission_id,
                rubric_id: &workflow.rubric_id,
                algorithm_id: &workflow.algorithm_id,
                course_id: &workflow.course_id,
                item_id: &workflow.item_id,
                essay_text: &workflow.essay_text,
                classifier_set_id: workflow.classifier_set_id.as_deref(),
                created_at: workflow.created_at,
            },
        )
        .await?;
        Ok(created)
    }

    async fn find_grading_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Option<GradingWorkflow>, StoreError> {
        Ok(repositories::grading_workflows::find_by_id(&self.pool, workflow_id).await?)
    }

    async fn list_incomplete_grading(
        &self,
        course_id: &str,
        item_id: &str,
    ) -> Result<Vec<GradingWorkflow>, StoreError> {
        Ok(repositories::grading_workflows::list_incomplete(&self.pool, course_id, item_id).await?)
    }

    async fn assign_classifier_set(
        &self,
        workflow_id: &str,
        classifier_set_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(repositories::grading_workflows::assign_classifier_set(
            &self.pool,
            workflow_id,
            classifier_set_id,
        )
        .await?)
    }

    async fn complete_grading(
        &self,
        workflow_id: &str,
        assessment: NewAssessment,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        repositories::assessments::insert(
            &mut tx,
            repositories::assessments::CreateAssessment {
                id: &assessment.id,
                submission_id: &assessment.submission_id,
                rubric_id: &assessment.rubric_id,
                scorer_id: &assessment.scorer_id,
                points_earned: assessment.points_earned,
                points_possible: assessment.points_possible,
                created_at: assessment.created_at,
            },
            &assessment.parts,
        )
        .await?;

        let updated = repositories::grading_workflows::mark_complete(
            &mut *tx,
            workflow_id,
            &assessment.id,
            assessment.created_at,
        )
        .await?;

        if !updated {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn fail_grading(
        &self,
        workflow_id: &str,
        error: &str,
        completed_at: PrimitiveDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::grading_workflows::mark_failed(
            &self.pool,
            workflow_id,
            error,
            completed_at,
        )
        .await?)
    }

    async fn latest_assessment(
        &self,
        submission_id: &str,
    ) -> Result<Option<Assessment>, StoreError> {
        let Some(row) =
            repositories::assessments::find_latest_for_submission(&self.pool, submission_id)
                .await?
        else {
            return Ok(None);
        };
        let parts = repositories::assessments::list_parts(&self.pool, &row.id).await?;
        Ok(Some(Assessment::from_rows(row, parts)))
    }

    async fn list_incomplete_scopes(&self) -> Result<Vec<WorkflowScope>, StoreError> {
        Ok(repositories::scopes::list_incomplete(&self.pool).await?)
    }
}
