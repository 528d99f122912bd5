use async_graphql::{Context, Object, Result, ID};
use validator::Validate;

use super::resolve;
use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppError,
    models::{
        domain::{QuizDefinition, QuizResponse},
        dto::request::{QuizSettingsRequest, SubmitQuizRequest},
    },
    services::{quiz_generation_service::GenerationJob, retake_service::RetakeDecision},
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Starts background generation; poll `generationJob` for progress.
    async fn generate_quiz(
        &self,
        ctx: &Context<'_>,
        input: QuizSettingsRequest,
    ) -> Result<GenerationJob> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            input.validate()?;
            let settings = input.into_settings(state.config.default_quiz_duration_minutes);

            Ok::<_, AppError>(
                state
                    .generation_service
                    .start_job(claims.user_id(), settings)
                    .await,
            )
        })
        .await
    }

    async fn publish_quiz(&self, ctx: &Context<'_>, id: ID) -> Result<QuizDefinition> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state.quiz_service.publish_quiz(&claims, &id).await
        })
        .await
    }

    /// Without `input` the saved progress is graded.
    async fn submit_quiz(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
        input: Option<SubmitQuizRequest>,
    ) -> Result<QuizResponse> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            let input = input.unwrap_or_default();
            input.validate()?;

            state
                .session_service
                .submit(&claims, &quiz_id, input.answer_map())
                .await
        })
        .await
    }

    async fn begin_retake(&self, ctx: &Context<'_>, quiz_id: ID) -> Result<RetakeDecision> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state
                .retake_service
                .begin_retake(claims.user_id(), &quiz_id)
                .await
        })
        .await
    }
}
