use aws_lambda_events::apigw::ApiGatewayCustomAuthorizerRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use listings_shared::authorizer::{self, AuthorizerResponse};
use listings_shared::config::Config;
use listings_shared::token::TokenSigner;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env();
    let signer = Arc::new(
        config
            .jwt_secret
            .as_deref()
            .map(|secret| TokenSigner::new(secret.as_bytes(), config.token_ttl)),
    );

    run(service_fn(move |event: LambdaEvent<ApiGatewayCustomAuthorizerRequest>| {
        let signer = Arc::clone(&signer);
        async move { function_handler(event, Option::as_ref(&signer)).await }
    }))
    .await
}

async fn function_handler(
    event: LambdaEvent<ApiGatewayCustomAuthorizerRequest>,
    signer: Option<&TokenSigner>,
) -> Result<AuthorizerResponse, Error> {
    let request = event.payload;
    tracing::info!(
        "Authorizer invoked for {}",
        request.method_arn.as_deref().unwrap_or("unknown method")
    );

    Ok(authorizer::authorize(
        signer,
        request.type_.as_deref(),
        request.authorization_token.as_deref(),
    ))
}
