//! Core identifier and schema types

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Invocation identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Arc<str>);

impl InvocationId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Fresh id for invocations the orchestrator synthesizes itself.
    pub fn generate() -> Self {
        Self::new(format!("call_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InvocationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for InvocationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Event role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    OracleDecision,
    ActionResult,
    Terminal,
}

/// Declared action, as shown to the oracle
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionSchema {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}
