use actix_web::{get, post, put, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{SelectAnswerRequest, SubmitQuizRequest},
        response::{ProgressUpdateResponse, SessionResponse},
    },
};

#[get("/quizzes/{id}/session")]
pub async fn load_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let loaded = state.session_service.load_session(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(SessionResponse::from(&loaded)))
}

#[post("/quizzes/{id}/session/resume")]
pub async fn resume_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let session = state.session_service.resume(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(SessionResponse::from(&session)))
}

#[post("/quizzes/{id}/session/start-fresh")]
pub async fn start_fresh_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let session = state.session_service.start_fresh(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(SessionResponse::from(&session)))
}

#[put("/quizzes/{id}/session/answers")]
pub async fn select_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SelectAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let update = state
        .session_service
        .select_answer(&auth.0, &id, request.question_index as usize, request.answer)
        .await?;
    Ok(HttpResponse::Ok().json(ProgressUpdateResponse::from(&update)))
}

#[post("/quizzes/{id}/session/next")]
pub async fn next_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let update = state.session_service.next(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(ProgressUpdateResponse::from(&update)))
}

#[post("/quizzes/{id}/session/previous")]
pub async fn previous_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let update = state.session_service.previous(&auth.0, &id).await?;
    Ok(HttpResponse::Ok().json(ProgressUpdateResponse::from(&update)))
}

/// An empty body submits the saved progress.
#[post("/quizzes/{id}/submit")]
pub async fn submit_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: Option<web::Json<SubmitQuizRequest>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    request.validate()?;

    let response = state
        .session_service
        .submit(&auth.0, &id, request.answer_map())
        .await?;
    Ok(HttpResponse::Created().json(response))
}
