//! GraphQL request and response envelope handling

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of a GraphQL POST
#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest<'a> {
    pub query: &'a str,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
    pub variables: serde_json::Value,
}

impl<'a> GraphqlRequest<'a> {
    pub fn new(query: &'a str, variables: serde_json::Value) -> Self {
        Self {
            query,
            operation_name: None,
            variables,
        }
    }

    pub fn with_operation_name(
        query: &'a str,
        operation_name: &'a str,
        variables: serde_json::Value,
    ) -> Self {
        Self {
            query,
            operation_name: Some(operation_name),
            variables,
        }
    }
}

/// Standard `{data, errors}` response envelope
#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Decode a GraphQL response body into the operation payload.
///
/// Any entry in the `errors` array fails the call; a missing or null
/// `data` field is a contract violation.
pub(crate) fn decode_data<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    let envelope: GraphqlEnvelope = serde_json::from_value(body)
        .map_err(|e| Error::Api(format!("failed to decode GraphQL response: {}", e)))?;

    if let Some(errors) = envelope.errors {
        if let Some(first) = errors.first() {
            return Err(Error::Api(first.message.clone()));
        }
    }

    let data = envelope
        .data
        .ok_or_else(|| Error::Contract("GraphQL response missing data".to_string()))?;

    serde_json::from_value(data)
        .map_err(|e| Error::Api(format!("failed to decode GraphQL data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: String,
    }

    #[test]
    fn test_decode_data_happy_path() {
        let body = json!({ "data": { "value": "ok" } });
        let payload: Payload = decode_data(body).unwrap();
        assert_eq!(payload.value, "ok");
    }

    #[test]
    fn test_decode_data_surfaces_first_error() {
        let body = json!({
            "data": null,
            "errors": [
                { "message": "team branch is protected" },
                { "message": "secondary" }
            ]
        });
        let err = decode_data::<Payload>(body).unwrap_err();
        assert_matches!(&err, Error::Api(msg) if msg == "team branch is protected");
    }

    #[test]
    fn test_decode_data_errors_win_over_data() {
        let body = json!({
            "data": { "value": "partial" },
            "errors": [{ "message": "partial failure" }]
        });
        let err = decode_data::<Payload>(body).unwrap_err();
        assert_matches!(&err, Error::Api(msg) if msg == "partial failure");
    }

    #[test]
    fn test_decode_data_null_data_is_contract_violation() {
        let body = json!({ "data": null });
        let err = decode_data::<Payload>(body).unwrap_err();
        assert_matches!(err, Error::Contract(_));
    }

    #[test]
    fn test_decode_data_missing_data_is_contract_violation() {
        let body = json!({});
        let err = decode_data::<Payload>(body).unwrap_err();
        assert_matches!(err, Error::Contract(_));
    }

    #[test]
    fn test_request_serialization_skips_absent_operation_name() {
        let request = GraphqlRequest::new("query { x }", json!({ "a": 1 }));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["query"], "query { x }");
        assert_eq!(body["variables"]["a"], 1);
        assert!(body.get("operationName").is_none());
    }

    #[test]
    fn test_request_serialization_includes_operation_name() {
        let request =
            GraphqlRequest::with_operation_name("mutation { y }", "createEnvironment", json!({}));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["operationName"], "createEnvironment");
    }
}
