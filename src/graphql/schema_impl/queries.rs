use async_graphql::{Context, Object, Result, ID};

use super::resolve;
use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppError,
    models::{
        domain::QuizResponse,
        dto::response::{QuizDetail, QuizForTaking},
    },
    services::{
        quiz_generation_service::GenerationJob, quiz_session_service::ensure_takeable,
        retake_service::RetakeDecision,
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Full quiz with answers; creator or admin only.
    async fn quiz(&self, ctx: &Context<'_>, id: ID) -> Result<QuizDetail> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            let saved = state.quiz_service.get_quiz_for_owner(&claims, &id).await?;
            Ok::<_, AppError>(saved.into())
        })
        .await
    }

    async fn quiz_for_taking(&self, ctx: &Context<'_>, id: ID) -> Result<QuizForTaking> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            let quiz = state.quiz_service.get_quiz(&id).await?;
            ensure_takeable(&claims, &quiz)?;
            let questions = state.quiz_service.get_questions(&id).await?;

            Ok::<_, AppError>(QuizForTaking::from_quiz(&quiz, &questions))
        })
        .await
    }

    /// The caller's attempts at a quiz, newest first.
    async fn quiz_responses(&self, ctx: &Context<'_>, quiz_id: ID) -> Result<Vec<QuizResponse>> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state
                .retake_service
                .attempt_history(claims.user_id(), &quiz_id)
                .await
        })
        .await
    }

    /// The caller's most recent attempt, if any.
    async fn latest_response(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> Result<Option<QuizResponse>> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state
                .retake_service
                .latest_response(claims.user_id(), &quiz_id)
                .await
        })
        .await
    }

    async fn retake_status(&self, ctx: &Context<'_>, quiz_id: ID) -> Result<RetakeDecision> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state
                .retake_service
                .retake_status(claims.user_id(), &quiz_id)
                .await
        })
        .await
    }

    async fn generation_job(&self, ctx: &Context<'_>, job_id: ID) -> Result<GenerationJob> {
        resolve(async {
            let state = ctx.data::<AppState>()?;
            let claims = extract_claims_from_context(ctx)?;

            state
                .generation_service
                .job_status(claims.user_id(), &job_id)
                .await
        })
        .await
    }
}
