use lambda_http::{Body, Response};

use crate::error::ApiError;
use crate::keys;
use crate::records::Record;
use crate::response;
use crate::types::{Principal, UserProfile};
use crate::AppState;

/// Profile of the authenticated caller.
pub async fn get_me(state: &AppState, principal: &Principal) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;
    let email = &principal.email;

    let item = table
        .get(&keys::user_pk(email), &keys::user_profile_sk(email))
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    match Record::from_item(&item)? {
        Record::UserProfile(profile) => response::ok(&UserProfile::from(&profile)),
        other @ (Record::UserAuth(_) | Record::Post(_)) => {
            tracing::error!(
                "Profile key for {} holds a {} record",
                email,
                other.entity_type()
            );
            Err(ApiError::NotFound("Profile"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::testing;
    use crate::types::LoginResponse;
    use lambda_http::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn token_principal_reads_own_profile() {
        let state = testing::state();
        let registration = json!({
            "email": "ana@example.com",
            "password": "hunter22",
            "firstName": "Ana",
            "lastName": "Pop",
            "phone": "+40700000000"
        });
        auth::register(&state, registration.to_string().as_bytes())
            .await
            .unwrap();

        let login = json!({"email": "ana@example.com", "password": "hunter22"});
        let resp = auth::login(&state, login.to_string().as_bytes()).await.unwrap();
        let token: LoginResponse = serde_json::from_slice(resp.body()).unwrap();
        let principal = state.tokens().unwrap().verify(&token.access_token).unwrap();

        let resp = get_me(&state, &principal).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let profile: UserProfile = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(profile.email, principal.email);
        assert_eq!(profile.first_name, "Ana");
    }

    #[tokio::test]
    async fn unknown_principal_is_404() {
        let state = testing::state();
        let principal = testing::principal("ghost@example.com", "Ghost");

        let err = get_me(&state, &principal).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
