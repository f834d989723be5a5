//! Gateway token authorizer: turns a bearer token into an allow/deny policy
//! plus the principal context the API handlers read back.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::token::TokenSigner;
use crate::types::Principal;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INVOKE_ACTION: &str = "execute-api:Invoke";
pub const PRINCIPAL_ID: &str = "user";
pub const TOKEN_EVENT_TYPE: &str = "TOKEN";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Principal>,
}

impl AuthorizerResponse {
    pub fn allow(principal: Principal) -> Self {
        Self::with_effect(Effect::Allow, Some(principal))
    }

    pub fn deny() -> Self {
        Self::with_effect(Effect::Deny, None)
    }

    fn with_effect(effect: Effect, context: Option<Principal>) -> Self {
        Self {
            principal_id: PRINCIPAL_ID.to_string(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: "*".to_string(),
                }],
            },
            context,
        }
    }

    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map(|s| s.effect)
            .unwrap_or(Effect::Deny)
    }
}

/// Decide on a TOKEN authorizer event.
///
/// Every failure is the same opaque deny; the reason only goes to the log.
pub fn authorize(
    signer: Option<&TokenSigner>,
    event_type: Option<&str>,
    authorization: Option<&str>,
) -> AuthorizerResponse {
    if event_type != Some(TOKEN_EVENT_TYPE) {
        tracing::warn!("Unsupported authorizer event type: {:?}", event_type);
        return AuthorizerResponse::deny();
    }

    let Some(signer) = signer else {
        tracing::error!("Token secret is not configured; denying");
        return AuthorizerResponse::deny();
    };

    let Some(token) = authorization.and_then(bearer_token) else {
        tracing::info!("Missing or malformed authorization header");
        return AuthorizerResponse::deny();
    };

    match signer.verify(token) {
        Ok(principal) => {
            tracing::info!("Authorized {}", principal.email);
            AuthorizerResponse::allow(principal)
        }
        Err(e) => {
            tracing::info!("Token rejected: {}", e);
            AuthorizerResponse::deny()
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl Principal {
    /// Read the principal back out of the authorizer context the gateway
    /// attaches to a request. Anything without an email is not a principal.
    pub fn from_context(context: &HashMap<String, Value>) -> Option<Self> {
        let email = context.get("email")?.as_str()?.trim();
        if email.is_empty() {
            return None;
        }
        let full_name = context
            .get("fullName")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Some(Self {
            email: email.to_string(),
            full_name: full_name.to_string(),
        })
    }
}
