pub mod types;
pub mod config;
pub mod error;
pub mod response;
pub mod keys;
pub mod records;
pub mod table;
pub mod password;
pub mod token;
pub mod authorizer;
pub mod auth;
pub mod users;
pub mod posts;

use std::sync::Arc;

use crate::config::{Config, JWT_SECRET_VAR, TABLE_NAME_VAR};
use crate::error::ApiError;
use crate::password::CredentialHasher;
use crate::table::Table;
use crate::token::TokenSigner;

/// Shared application state, built once per cold start and handed to every
/// invocation.
///
/// Optional members are absent when their configuration is missing; the
/// accessors turn that into a 500 for the request that needed them.
pub struct AppState {
    pub table: Option<Arc<dyn Table>>,
    pub tokens: Option<TokenSigner>,
    pub hasher: CredentialHasher,
}

impl AppState {
    pub fn new(
        table: Option<Arc<dyn Table>>,
        tokens: Option<TokenSigner>,
        hasher: CredentialHasher,
    ) -> Arc<Self> {
        Arc::new(Self {
            table,
            tokens,
            hasher,
        })
    }

    /// Wire up a state from configuration, building the table with
    /// `make_table` when a table name is configured.
    pub fn from_config(
        config: &Config,
        hasher: CredentialHasher,
        make_table: impl FnOnce(&str) -> Arc<dyn Table>,
    ) -> Arc<Self> {
        let table = config.table_name.as_deref().map(make_table);
        let tokens = config
            .jwt_secret
            .as_deref()
            .map(|secret| TokenSigner::new(secret.as_bytes(), config.token_ttl));
        Self::new(table, tokens, hasher)
    }

    pub fn table(&self) -> Result<&dyn Table, ApiError> {
        self.table
            .as_deref()
            .ok_or(ApiError::MissingConfig(TABLE_NAME_VAR))
    }

    pub fn tokens(&self) -> Result<&TokenSigner, ApiError> {
        self.tokens
            .as_ref()
            .ok_or(ApiError::MissingConfig(JWT_SECRET_VAR))
    }
}
