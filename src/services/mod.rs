pub mod generation_progress;
pub mod option_shuffle;
pub mod question_cache;
pub mod question_generator;
pub mod quiz_generation_service;
pub mod quiz_service;
pub mod quiz_session_service;
pub mod quiz_submission_service;
pub mod quiz_timer;
pub mod retake_service;
pub mod retry;
pub mod scoring;
pub mod session_lock;
