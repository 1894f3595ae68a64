//! Service for creating problems and attaching generated affirmations to them.

use db::models::{
    affirmation::{Affirmation, AffirmationSource, AffirmationType, CreateAffirmation},
    problem::{NewProblem, Problem, ProblemWithCategory},
    problem_category::ProblemCategory,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};
use ts_rs::TS;
use uuid::Uuid;

use super::affirmations::{
    AffirmationGenerator, PersonalizationPreferences, ProblemContext,
};

#[derive(Debug, Error)]
pub enum ProblemServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("problem not found")]
    NotFound,
    #[error("unknown category")]
    UnknownCategory,
}

/// A generated statement as shown to the client right after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct GeneratedAffirmation {
    pub content: String,
    #[serde(rename = "type")]
    pub affirmation_type: AffirmationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatedProblem {
    pub problem: ProblemWithCategory,
    pub affirmations: Vec<GeneratedAffirmation>,
    pub source: AffirmationSource,
}

pub struct ProblemService {
    pool: SqlitePool,
    generator: AffirmationGenerator,
}

impl ProblemService {
    pub fn new(pool: SqlitePool, generator: AffirmationGenerator) -> Self {
        Self { pool, generator }
    }

    /// Insert the problem, generate its affirmation set and store it.
    ///
    /// Generation always produces content (model or fallback). Failing to store the
    /// generated rows is logged and does not fail the request.
    pub async fn create_with_affirmations(
        &self,
        user_id: Uuid,
        data: NewProblem,
    ) -> Result<CreatedProblem, ProblemServiceError> {
        if ProblemCategory::find_by_id(&self.pool, data.category_id)
            .await?
            .is_none()
        {
            return Err(ProblemServiceError::UnknownCategory);
        }

        let id = Uuid::new_v4();
        Problem::create(&self.pool, id, user_id, &data).await?;
        let problem = ProblemWithCategory::find_for_user(&self.pool, id, user_id)
            .await?
            .ok_or(ProblemServiceError::NotFound)?;

        info!(
            problem_id = %id,
            user_id = %user_id,
            category = %problem.problem_categories.name,
            "Created problem, generating affirmations"
        );

        let context = ProblemContext {
            category: problem.problem_categories.name.clone(),
            title: problem.title.clone(),
            description: problem.description.clone(),
            severity: problem.severity,
        };
        let generated = self.generator.generate_affirmations(&context).await;
        let source = generated.source();
        let set = generated.into_value();

        let rows: Vec<CreateAffirmation> = set
            .entries()
            .map(|(affirmation_type, content)| CreateAffirmation {
                problem_id: id,
                content: content.to_string(),
                affirmation_type,
                source,
            })
            .collect();

        if let Err(e) = Affirmation::create_many(&self.pool, &rows).await {
            error!(problem_id = %id, error = %e, "Failed to store affirmations");
        }

        let affirmations = rows
            .into_iter()
            .map(|row| GeneratedAffirmation {
                content: row.content,
                affirmation_type: row.affirmation_type,
            })
            .collect();

        Ok(CreatedProblem {
            problem,
            affirmations,
            source,
        })
    }

    /// Generate one extra affirmation for an owned problem and store it as `positive`.
    pub async fn generate_personalized(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
        preferences: &PersonalizationPreferences,
    ) -> Result<Affirmation, ProblemServiceError> {
        let problem = ProblemWithCategory::find_for_user(&self.pool, problem_id, user_id)
            .await?
            .ok_or(ProblemServiceError::NotFound)?;

        let context = ProblemContext {
            category: problem.problem_categories.name.clone(),
            title: problem.title.clone(),
            description: problem.description.clone(),
            severity: problem.severity,
        };
        let generated = self
            .generator
            .generate_personalized_affirmation(&context, preferences)
            .await;
        let source = generated.source();

        let affirmation = Affirmation::create(
            &self.pool,
            &CreateAffirmation {
                problem_id,
                content: generated.into_value(),
                affirmation_type: AffirmationType::Positive,
                source,
            },
        )
        .await?;

        info!(
            problem_id = %problem_id,
            affirmation_id = %affirmation.id,
            source = %source,
            "Stored personalized affirmation"
        );
        Ok(affirmation)
    }
}
