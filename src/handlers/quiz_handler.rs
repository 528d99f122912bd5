use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{CreateQuizRequest, QuizSettingsRequest},
        response::QuizDetail,
    },
};

#[post("/quizzes")]
pub async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let new_quiz = request.into_new_quiz(state.config.default_quiz_duration_minutes)?;
    let saved = state.quiz_service.save_quiz(auth.user_id(), new_quiz).await?;
    Ok(HttpResponse::Created().json(QuizDetail::from(saved)))
}

#[post("/quizzes/generate")]
pub async fn generate_quiz(
    state: web::Data<AppState>,
    request: web::Json<QuizSettingsRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let settings = request.into_settings(state.config.default_quiz_duration_minutes);
    let job = state
        .generation_service
        .start_job(auth.user_id(), settings)
        .await;
    Ok(HttpResponse::Accepted().json(job))
}

#[get("/generation-jobs/{job_id}")]
pub async fn get_generation_job(
    state: web::Data<AppState>,
    job_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let job = state
        .generation_service
        .job_status(auth.user_id(), &job_id)
        .await?;
    Ok(HttpResponse::Ok().json(job))
}

#[get("/quizzes/{id}")]
pub async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let saved = state.quiz_service.get_quiz_for_owner(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(QuizDetail::from(saved)))
}

#[post("/quizzes/{id}/publish")]
pub async fn publish_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.publish_quiz(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[get("/quizzes/{id}/retake")]
pub async fn retake_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let decision = state
        .retake_service
        .retake_status(auth.user_id(), &id)
        .await?;
    Ok(HttpResponse::Ok().json(decision))
}

#[post("/quizzes/{id}/retake")]
pub async fn begin_retake(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let decision = state
        .retake_service
        .begin_retake(auth.user_id(), &id)
        .await?;
    Ok(HttpResponse::Ok().json(decision))
}

#[get("/quizzes/{id}/responses")]
pub async fn list_responses(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let responses = state
        .retake_service
        .attempt_history(auth.user_id(), &id)
        .await?;
    Ok(HttpResponse::Ok().json(responses))
}

#[get("/quizzes/{id}/responses/latest")]
pub async fn latest_response(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let response = state
        .retake_service
        .latest_response(auth.user_id(), &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No attempts at quiz '{}' yet", id)))?;
    Ok(HttpResponse::Ok().json(response))
}
