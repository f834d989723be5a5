use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{run, service_fn, tracing, Error, Request};
use listings_shared::config::Config;
use listings_shared::password::CredentialHasher;
use listings_shared::table::{DynamoTable, Table};
use listings_shared::AppState;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Clients and secrets are set up once per cold start. Missing settings
    // are tolerated here and answered with a 500 by the routes that need them.
    let config = Config::from_env();
    let aws_config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&aws_config);

    let state = AppState::from_config(&config, CredentialHasher::new()?, |table_name| {
        Arc::new(DynamoTable::new(dynamo_client, table_name)) as Arc<dyn Table>
    });

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
