pub mod graphql_handler;
pub mod health_handler;
pub mod quiz_handler;
pub mod session_handler;

use actix_web::web;

pub use graphql_handler::{graphiql, graphql};
pub use health_handler::{health_check, health_check_ready};

/// Registers every authenticated route; mount under `/api` behind `AuthMiddleware`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(quiz_handler::create_quiz)
        .service(quiz_handler::generate_quiz)
        .service(quiz_handler::get_generation_job)
        .service(quiz_handler::get_quiz)
        .service(quiz_handler::publish_quiz)
        .service(quiz_handler::retake_status)
        .service(quiz_handler::begin_retake)
        .service(quiz_handler::list_responses)
        .service(quiz_handler::latest_response)
        .service(session_handler::load_session)
        .service(session_handler::resume_session)
        .service(session_handler::start_fresh_session)
        .service(session_handler::select_answer)
        .service(session_handler::next_question)
        .service(session_handler::previous_question)
        .service(session_handler::submit_quiz);
}
