use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::members::validate::validate_identifier_value;
use crate::members::{LookupResult, SharedMemberStore, UserInfoResponse};

use super::Tool;

/// `get_user_info(member_identifier)` over the member store.
pub struct GetUserInfoTool {
    store: SharedMemberStore,
}

impl GetUserInfoTool {
    pub fn new(store: SharedMemberStore) -> Self {
        Self { store }
    }

    /// Typed entry point shared by the tool call and the `lookup` command.
    pub fn get_user_info(&self, member_identifier: &str) -> UserInfoResponse {
        self.store.lookup(member_identifier).into_response()
    }

    fn lookup_args(&self, args: &Value) -> LookupResult {
        match validate_identifier_value(args.get("member_identifier")) {
            Ok(identifier) => self.store.lookup(identifier),
            Err(err) => LookupResult::Invalid(format!("Validation error: {err}")),
        }
    }
}

#[async_trait]
impl Tool for GetUserInfoTool {
    fn name(&self) -> &'static str {
        "get_user_info"
    }

    fn description(&self) -> &'static str {
        "Retrieve a member's profile from the member database by member ID (e.g. 'M001') or full name."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "member_identifier": {
                    "type": "string",
                    "minLength": 2,
                    "maxLength": 100,
                    "description": "Member ID or name"
                }
            },
            "required": ["member_identifier"]
        })
    }

    #[instrument(skip_all, name = "get_user_info")]
    async fn call(&self, args: Value) -> Value {
        let response = self.lookup_args(&args).into_response();
        info!(success = response.success, "Member lookup finished");
        serde_json::to_value(&response).unwrap_or_else(
            |err| json!({ "success": false, "data": null, "error": err.to_string() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::members::MemberStore;

    fn tool() -> GetUserInfoTool {
        let store = MemberStore::from_json_str(
            r#"{"members": [{
                "id": "M001",
                "name": "John Smith",
                "gender": "Male",
                "language": "English",
                "ethnicity": "European",
                "race": "Caucasian",
                "medical_history": ["Hypertension"]
            }]}"#,
        )
        .expect("fixture");
        GetUserInfoTool::new(Arc::new(store))
    }

    #[tokio::test]
    async fn found_member_serializes_full_envelope() {
        let result = tool()
            .call(json!({ "member_identifier": "john smith" }))
            .await;
        assert_eq!(
            result,
            json!({
                "success": true,
                "data": {
                    "id": "M001",
                    "name": "John Smith",
                    "gender": "Male",
                    "language": "English",
                    "ethnicity": "European",
                    "race": "Caucasian",
                    "medical_history": ["Hypertension"]
                },
                "error": null
            })
        );
    }

    #[tokio::test]
    async fn unknown_member_reports_not_found() {
        let result = tool().call(json!({ "member_identifier": "M002" })).await;
        assert_eq!(
            result,
            json!({
                "success": false,
                "data": null,
                "error": "Member 'M002' not found in the database"
            })
        );
    }

    #[tokio::test]
    async fn missing_or_non_string_argument_is_invalid() {
        for args in [json!({}), json!({ "member_identifier": 7 }), json!(null)] {
            let result = tool().call(args).await;
            assert_eq!(result["success"], json!(false));
            assert_eq!(
                result["error"],
                json!("Validation error: member_identifier must be a non-empty string")
            );
        }
    }

    #[test]
    fn typed_entry_point_matches_tool_contract() {
        let response = tool().get_user_info("J");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert!(response
            .error
            .as_deref()
            .is_some_and(|err| err.starts_with("Validation error:")));
    }
}
