use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use quizforge_server::{
    app_state::AppState,
    auth::AuthMiddleware,
    config::Config,
    graphql::create_schema,
    handlers,
    middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        config.validate_for_production();
    }

    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = AppState::new(config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let schema = create_schema(state.clone());
    let jwt_service = web::Data::from(state.jwt_service.clone());

    log::info!("Starting HTTP server on {}:{}", host, port);
    log::info!("GraphiQL playground: http://{}:{}/graphiql", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(schema.clone()))
            .app_data(jwt_service.clone())
            .service(handlers::health_check)
            .service(handlers::health_check_ready)
            .service(handlers::graphql)
            .service(handlers::graphiql)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(handlers::configure_api),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
