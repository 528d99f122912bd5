pub mod mutations;
pub mod queries;

use std::future::Future;

use async_graphql::{EmptySubscription, ErrorExtensions, Schema as GraphQLSchema};

use crate::{app_state::AppState, errors::AppResult};

pub use mutations::MutationRoot;
pub use queries::QueryRoot;

pub type Schema = GraphQLSchema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn create_schema(app_state: AppState) -> Schema {
    GraphQLSchema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(app_state)
        .finish()
}

/// Awaits a resolver body, attaching `code` and `retryable` extensions to its error.
pub(crate) async fn resolve<T, F>(body: F) -> async_graphql::Result<T>
where
    F: Future<Output = AppResult<T>>,
{
    body.await.map_err(|e| e.extend())
}
