//! GraphQL request types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL request.
///
/// Serializes to the `{query, variables}` body used by both the unary call
/// and the subscription start message. `operationName` is only emitted when
/// one was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// The GraphQL document.
    pub query: String,

    /// Optional variables for the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    /// Optional operation name (for documents with multiple operations).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "operationName"
    )]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    /// Create a request from a query, mutation or subscription document.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let request = GraphQLRequest::new(r#"
    ///     query GetUsers {
    ///         users { id name }
    ///     }
    /// "#);
    /// ```
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    /// Set a single variable value.
    ///
    /// Values that fail to serialize are skipped.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let request = GraphQLRequest::new("...")
    ///     .variable("id", "123")
    ///     .variable("limit", 10);
    /// ```
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        if !matches!(self.variables, Some(Value::Object(_))) {
            self.variables = Some(Value::Object(Default::default()));
        }
        if let Some(Value::Object(map)) = self.variables.as_mut()
            && let Ok(value) = serde_json::to_value(value)
        {
            map.insert(name.into(), value);
        }
        self
    }

    /// Replace all variables with a serializable value.
    pub fn variables(mut self, variables: impl Serialize) -> Self {
        self.variables = serde_json::to_value(variables)
            .ok()
            .filter(|value| !value.is_null());
        self
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

impl From<&str> for GraphQLRequest {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for GraphQLRequest {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}
