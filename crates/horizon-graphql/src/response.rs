//! GraphQL response types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{ClientError, Result};

/// A GraphQL error entry returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Create an error entry with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{}", name)?,
                    PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// A GraphQL response body: `{data?, errors?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// The data returned by the operation. `null` and absent both map to `None`.
    #[serde(default)]
    pub data: Option<Value>,

    /// Errors that occurred during execution.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub errors: Vec<GraphQLError>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<GraphQLError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GraphQLError>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GraphQLResponse {
    /// Check if the response contains errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the first error, if any.
    pub fn first_error(&self) -> Option<&GraphQLError> {
        self.errors.first()
    }

    /// Classify the response.
    ///
    /// Returns the `data` value when no errors were reported (which may be
    /// `None`), [`ClientError::Request`] when only errors came back, and
    /// [`ClientError::Field`] when errors came back alongside data. Both
    /// error kinds carry the first reported entry.
    pub fn into_result(self) -> Result<Option<Value>> {
        let mut errors = self.errors.into_iter();
        match (errors.next(), self.data) {
            (None, data) => Ok(data),
            (Some(error), None) => Err(ClientError::Request(error)),
            (Some(error), Some(data)) => Err(ClientError::Field { error, data }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn parse(body: Value) -> GraphQLResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_successful_response() {
        let response = parse(json!({"data": {"user": {"id": "1", "name": "John"}}}));
        assert!(!response.has_errors());
        assert_eq!(
            response.into_result().unwrap(),
            Some(json!({"user": {"id": "1", "name": "John"}}))
        );
    }

    #[test]
    fn test_null_data_is_success() {
        assert_eq!(parse(json!({"data": null})).into_result().unwrap(), None);
        assert_eq!(parse(json!({})).into_result().unwrap(), None);
    }

    #[test]
    fn test_null_errors_is_empty() {
        let response = parse(json!({"data": {"ok": true}, "errors": null}));
        assert!(!response.has_errors());
    }

    #[test]
    fn test_request_error_uses_first_entry() {
        let response = parse(json!({
            "errors": [
                {"message": "User not found", "locations": [{"line": 1, "column": 3}], "path": ["user"]},
                {"message": "second"}
            ]
        }));

        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        let entry = err.graphql_error().unwrap();
        assert_eq!(entry.message, "User not found");
        assert_eq!(entry.to_string(), "User not found (at user)");
    }

    #[test]
    fn test_partial_response_is_field_error() {
        let response = parse(json!({
            "data": {"user": null},
            "errors": [{"message": "Permission denied", "path": ["user", 0, "email"]}]
        }));

        match response.into_result().unwrap_err() {
            ClientError::Field { error, data } => {
                assert_eq!(error.to_string(), "Permission denied (at user.[0].email)");
                assert_eq!(data, json!({"user": null}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
