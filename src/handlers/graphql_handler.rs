use actix_web::{get, http::header::Header, post, web, HttpRequest, HttpResponse};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{auth::JwtService, graphql::Schema};

/// Resolvers that need a user fail with `Unauthorized` when no valid token was sent.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    jwt_service: web::Data<JwtService>,
    http_req: HttpRequest,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    if let Ok(authorization) = Authorization::<Bearer>::parse(&http_req) {
        match jwt_service.validate_token(authorization.as_ref().token()) {
            Ok(claims) => request = request.data(claims),
            Err(e) => log::debug!("Ignoring invalid GraphQL bearer token: {}", e),
        }
    }

    schema.execute(request).await.into()
}

#[get("/graphiql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
