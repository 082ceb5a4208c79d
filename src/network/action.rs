use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::model::{AttrValue, ComponentKind};

/// A structured, schema-validated instruction against one component.
///
/// This is the exact shape the action interpreter must emit; unknown
/// component kinds or operations are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The grid component table the action targets.
    pub component: ComponentKind,
    /// Integer id of the component within its table.
    pub id: i64,
    /// Modify an existing row or create a new one.
    #[serde(rename = "type")]
    pub op: ActionOp,
    /// Parameter name to scalar value. For `modify`, a string value of the
    /// form `+10%` / `-5%` is resolved against the current numeric value.
    pub parameters: BTreeMap<String, AttrValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOp {
    Modify,
    Create,
}

/// Wire shape of an interpreter reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionList {
    pub actions: Vec<Action>,
}

impl Action {
    /// JSON schema for the interpreter's structured output, one action list
    /// per reply.
    pub fn response_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "actions": {
                    "type": "array",
                    "description": "List of actions to apply to the network to fulfill the request.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "component": {
                                "type": "string",
                                "enum": ["node", "edge", "load", "generator", "static-generator"],
                                "description": "The type of grid component to act on."
                            },
                            "id": {
                                "type": "integer",
                                "description": "The integer id of the component within its table."
                            },
                            "type": {
                                "type": "string",
                                "enum": ["modify", "create"],
                                "description": "Use 'modify' for existing components."
                            },
                            "parameters": {
                                "type": "object",
                                "description": "Parameter name to scalar value, e.g. {\"p_mw\": 50.0, \"in_service\": false}. Relative values like \"+10%\" are allowed for numeric fields."
                            }
                        },
                        "required": ["component", "id", "type", "parameters"]
                    }
                }
            },
            "required": ["actions"]
        })
    }
}

/// Parse a percentage suffix value like `+10%` or `-5%` into its factor
/// argument (10.0, -5.0). `None` if the string does not end in `%`.
pub fn percent_of(value: &AttrValue) -> Option<Result<f64, ()>> {
    let AttrValue::Text(s) = value else {
        return None;
    };
    let body = s.strip_suffix('%')?;
    Some(body.trim().parse::<f64>().map_err(|_| ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn interpreter_reply_deserializes() {
        let raw = r#"{
            "actions": [
                {"component": "load", "id": 3, "type": "modify", "parameters": {"p_mw": "+50%"}},
                {"component": "node", "id": 5, "type": "modify", "parameters": {"in_service": false}},
                {"component": "static-generator", "id": 2, "type": "create", "parameters": {"p_mw": 12.5}}
            ]
        }"#;
        let list: ActionList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.actions.len(), 3);
        assert_eq!(list.actions[0].component, ComponentKind::Load);
        assert_eq!(list.actions[0].op, ActionOp::Modify);
        assert_eq!(
            list.actions[0].parameters["p_mw"],
            AttrValue::Text("+50%".to_string())
        );
        assert_eq!(list.actions[1].parameters["in_service"], AttrValue::Bool(false));
        assert_eq!(list.actions[2].component, ComponentKind::StaticGenerator);
        assert_eq!(list.actions[2].op, ActionOp::Create);
    }

    #[test]
    fn unknown_component_is_rejected_at_decode_time() {
        let raw = r#"{"actions": [{"component": "transformer", "id": 1, "type": "modify", "parameters": {}}]}"#;
        assert!(serde_json::from_str::<ActionList>(raw).is_err());
    }

    #[rstest]
    #[case("+10%", Some(Ok(10.0)))]
    #[case("-5%", Some(Ok(-5.0)))]
    #[case("50%", Some(Ok(50.0)))]
    #[case("+1.5%", Some(Ok(1.5)))]
    #[case("ten%", Some(Err(())))]
    #[case("10", None)]
    fn percent_parsing(#[case] input: &str, #[case] expected: Option<Result<f64, ()>>) {
        let got = percent_of(&AttrValue::Text(input.to_string()));
        assert_eq!(got, expected);
    }

    #[test]
    fn non_text_values_are_not_percentages() {
        assert_eq!(percent_of(&AttrValue::Number(10.0)), None);
        assert_eq!(percent_of(&AttrValue::Bool(true)), None);
    }

    #[test]
    fn schema_names_all_component_kinds() {
        let schema = Action::response_schema().to_string();
        for kind in ["node", "edge", "load", "generator", "static-generator"] {
            assert!(schema.contains(kind));
        }
    }
}
