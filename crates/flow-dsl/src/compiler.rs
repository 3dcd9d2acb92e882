//! Compiler: converts declarative action records into a typed Flow
//!
//! Each record carries a `kind` string, optional `name`, `duration`, and
//! `guard`, a kind-specific `params` map, and for control-flow kinds a
//! nested `actions` list (or `branches` for parallel). Unknown param keys
//! are ignored; absent keys take documented defaults.

use crate::validator;
use flow_types::{Action, ActionKind, DisplayKind, Flow, FlowError, FlowResult};
use serde_json::{Map, Value};

/// Compile a flow document into a typed `Flow`.
///
/// Accepts either a JSON array of action records or an object with an
/// `actions` array. Fails with `UnknownActionKind` or `MalformedAction`;
/// no collaborator is ever touched at this stage.
pub fn compile(doc: &Value) -> FlowResult<Flow> {
    let records = match doc {
        Value::Array(records) => records.as_slice(),
        Value::Object(map) => match map.get("actions") {
            Some(Value::Array(records)) => records.as_slice(),
            _ => {
                return Err(FlowError::MalformedAction {
                    action: "<document>".into(),
                    message: "expected an array of actions or an object with an 'actions' array"
                        .into(),
                })
            }
        },
        _ => {
            return Err(FlowError::MalformedAction {
                action: "<document>".into(),
                message: "flow document must be an array or object".into(),
            })
        }
    };

    let flow = Flow::new(compile_records(records)?);
    validator::validate(&flow)?;
    Ok(flow)
}

fn compile_records(records: &[Value]) -> FlowResult<Vec<Action>> {
    records.iter().map(compile_record).collect()
}

fn compile_record(record: &Value) -> FlowResult<Action> {
    let map = record.as_object().ok_or_else(|| FlowError::MalformedAction {
        action: "<record>".into(),
        message: "action record must be an object".into(),
    })?;

    let kind_str = match map.get("kind").and_then(Value::as_str) {
        Some(s) => s,
        None => {
            return Err(FlowError::MalformedAction {
                action: record_label(map, "<record>").into(),
                message: "missing string field 'kind'".into(),
            })
        }
    };
    let label = record_label(map, kind_str);

    let empty = Map::new();
    let params = match map.get("params") {
        None => &empty,
        Some(Value::Object(p)) => p,
        Some(_) => {
            return Err(FlowError::MalformedAction {
                action: label.into(),
                message: "'params' must be an object".into(),
            })
        }
    };

    let kind = match kind_str {
        "stand" => ActionKind::Stand,
        "sit" => ActionKind::Sit,
        "crouch" => ActionKind::Crouch {
            height: f64_param(params, "height", 0.3, label)?,
        },
        "stop" => ActionKind::Stop,
        "trick" => ActionKind::Trick {
            command: str_param(params, "command", "", label)?,
        },
        "move" => ActionKind::Move {
            vx: f64_param(params, "vx", 0.0, label)?,
            vy: f64_param(params, "vy", 0.0, label)?,
            vyaw: f64_param(params, "vyaw", 0.0, label)?,
        },
        "move_to" => ActionKind::MoveTo {
            x: f64_param(params, "x", 0.0, label)?,
            y: f64_param(params, "y", 0.0, label)?,
            heading: opt_f64_param(params, "heading", label)?,
            speed: f64_param(params, "speed", 0.3, label)?,
        },
        // Documents author rotation angles in degrees; the engine and the
        // pose estimate work in radians.
        "rotate" => ActionKind::Rotate {
            angle: f64_param(params, "angle", 0.0, label)?.to_radians(),
            speed: f64_param(params, "speed", 0.5, label)?,
        },
        "wait" => ActionKind::Wait,
        "speak" => ActionKind::Speak {
            text: str_param(params, "text", "", label)?,
        },
        "search" => ActionKind::Search {
            query: str_param(params, "query", "", label)?,
            max_results: usize_param(params, "max_results", 5, label)?,
        },
        "show" => ActionKind::Show {
            title: str_param(params, "title", "", label)?,
            content: str_param(params, "content", "", label)?,
            display: display_param(params, label)?,
        },
        "condition" => ActionKind::Conditional {
            guard: map
                .get("guard")
                .and_then(Value::as_str)
                .unwrap_or("true")
                .to_string(),
            actions: nested_actions(map, label)?,
        },
        "loop" => ActionKind::Loop {
            count: u32_param(params, "count", 1, label)?,
            actions: nested_actions(map, label)?,
        },
        "parallel" => ActionKind::Parallel {
            branches: parallel_branches(map, label)?,
        },
        other => return Err(FlowError::UnknownActionKind(other.into())),
    };

    let mut action = Action::new(kind);
    if let Some(name) = map.get("name").and_then(Value::as_str) {
        action = action.with_name(name);
    }
    if let Some(duration) = map.get("duration") {
        let secs = duration.as_f64().ok_or_else(|| FlowError::MalformedAction {
            action: label.into(),
            message: "'duration' must be a number".into(),
        })?;
        action = action.with_duration(secs);
    }
    // A conditional's guard selects its branch; for every other kind the
    // guard gates whether the action runs at all.
    if !matches!(action.kind, ActionKind::Conditional { .. }) {
        if let Some(guard) = map.get("guard").and_then(Value::as_str) {
            action = action.with_guard(guard);
        }
    }

    Ok(action)
}

fn record_label<'a>(map: &'a Map<String, Value>, fallback: &'a str) -> &'a str {
    map.get("name").and_then(Value::as_str).unwrap_or(fallback)
}

fn nested_actions(map: &Map<String, Value>, label: &str) -> FlowResult<Vec<Action>> {
    match map.get("actions") {
        None => Ok(Vec::new()),
        Some(Value::Array(records)) => compile_records(records),
        Some(_) => Err(FlowError::MalformedAction {
            action: label.into(),
            message: "'actions' must be an array".into(),
        }),
    }
}

/// Parallel branches: the canonical form is `branches`, a list of action
/// lists. A bare `actions` list is also accepted, with each record
/// becoming its own single-action branch.
fn parallel_branches(map: &Map<String, Value>, label: &str) -> FlowResult<Vec<Vec<Action>>> {
    if let Some(value) = map.get("branches") {
        let lists = value.as_array().ok_or_else(|| FlowError::MalformedAction {
            action: label.into(),
            message: "'branches' must be an array of action arrays".into(),
        })?;
        return lists
            .iter()
            .map(|list| match list {
                Value::Array(records) => compile_records(records),
                _ => Err(FlowError::MalformedAction {
                    action: label.into(),
                    message: "each parallel branch must be an array".into(),
                }),
            })
            .collect();
    }

    let actions = nested_actions(map, label)?;
    Ok(actions.into_iter().map(|a| vec![a]).collect())
}

fn f64_param(params: &Map<String, Value>, key: &str, default: f64, label: &str) -> FlowResult<f64> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| FlowError::MalformedAction {
            action: label.into(),
            message: format!("param '{}' must be a number", key),
        }),
    }
}

fn opt_f64_param(
    params: &Map<String, Value>,
    key: &str,
    label: &str,
) -> FlowResult<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| FlowError::MalformedAction {
                action: label.into(),
                message: format!("param '{}' must be a number", key),
            }),
    }
}

fn u32_param(params: &Map<String, Value>, key: &str, default: u32, label: &str) -> FlowResult<u32> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| FlowError::MalformedAction {
                action: label.into(),
                message: format!("param '{}' must be a non-negative integer", key),
            }),
    }
}

fn usize_param(
    params: &Map<String, Value>,
    key: &str,
    default: usize,
    label: &str,
) -> FlowResult<usize> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| FlowError::MalformedAction {
                action: label.into(),
                message: format!("param '{}' must be a non-negative integer", key),
            }),
    }
}

fn str_param(
    params: &Map<String, Value>,
    key: &str,
    default: &str,
    label: &str,
) -> FlowResult<String> {
    match params.get(key) {
        None => Ok(default.to_string()),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FlowError::MalformedAction {
                action: label.into(),
                message: format!("param '{}' must be a string", key),
            }),
    }
}

fn display_param(params: &Map<String, Value>, label: &str) -> FlowResult<DisplayKind> {
    match params.get("display").and_then(Value::as_str) {
        None | Some("text") => Ok(DisplayKind::Text),
        Some("search_results") => Ok(DisplayKind::SearchResults),
        Some(other) => Err(FlowError::MalformedAction {
            action: label.into(),
            message: format!("unknown display kind '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_minimal() {
        let doc = json!([
            { "kind": "stand" },
            { "kind": "wait", "duration": 1.0 },
        ]);
        let flow = compile(&doc).unwrap();
        assert_eq!(flow.len(), 2);
        assert_eq!(flow.actions[0].kind, ActionKind::Stand);
        assert_eq!(flow.actions[1].duration, Some(1.0));
    }

    #[test]
    fn test_compile_object_document() {
        let doc = json!({ "actions": [ { "kind": "sit" } ] });
        let flow = compile(&doc).unwrap();
        assert_eq!(flow.actions[0].kind, ActionKind::Sit);
    }

    #[test]
    fn test_unknown_kind_fails_at_load() {
        let doc = json!([ { "kind": "not-a-real-kind" } ]);
        let result = compile(&doc);
        assert!(matches!(result, Err(FlowError::UnknownActionKind(k)) if k == "not-a-real-kind"));
    }

    #[test]
    fn test_unknown_kind_inside_nested_list_fails() {
        let doc = json!([
            { "kind": "loop", "params": { "count": 2 }, "actions": [
                { "kind": "moonwalk" }
            ]}
        ]);
        assert!(matches!(
            compile(&doc),
            Err(FlowError::UnknownActionKind(_))
        ));
    }

    #[test]
    fn test_missing_kind_is_malformed() {
        let doc = json!([ { "name": "nameless" } ]);
        assert!(matches!(
            compile(&doc),
            Err(FlowError::MalformedAction { .. })
        ));
    }

    #[test]
    fn test_move_defaults() {
        let doc = json!([ { "kind": "move", "params": { "vx": 0.3 } } ]);
        let flow = compile(&doc).unwrap();
        assert_eq!(
            flow.actions[0].kind,
            ActionKind::Move { vx: 0.3, vy: 0.0, vyaw: 0.0 }
        );
    }

    #[test]
    fn test_rotate_angle_converted_to_radians() {
        let doc = json!([ { "kind": "rotate", "params": { "angle": 90.0 } } ]);
        let flow = compile(&doc).unwrap();
        match flow.actions[0].kind {
            ActionKind::Rotate { angle, speed } => {
                assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
                assert_eq!(speed, 0.5);
            }
            ref other => panic!("Expected rotate, got {:?}", other),
        }
    }

    #[test]
    fn test_move_to_optional_heading() {
        let doc = json!([
            { "kind": "move_to", "params": { "x": 1.0, "y": 2.0 } },
            { "kind": "move_to", "params": { "x": 0.0, "y": 0.0, "heading": 1.5 } },
        ]);
        let flow = compile(&doc).unwrap();
        match flow.actions[0].kind {
            ActionKind::MoveTo { heading, speed, .. } => {
                assert_eq!(heading, None);
                assert_eq!(speed, 0.3);
            }
            ref other => panic!("Expected move_to, got {:?}", other),
        }
        match flow.actions[1].kind {
            ActionKind::MoveTo { heading, .. } => assert_eq!(heading, Some(1.5)),
            ref other => panic!("Expected move_to, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_kept_on_leaf_actions() {
        let doc = json!([
            { "kind": "speak", "params": { "text": "hi" }, "guard": "pose.x > 1.0" }
        ]);
        let flow = compile(&doc).unwrap();
        assert_eq!(flow.actions[0].guard.as_deref(), Some("pose.x > 1.0"));
    }

    #[test]
    fn test_condition_moves_guard_into_variant() {
        let doc = json!([
            { "kind": "condition", "guard": "running", "actions": [ { "kind": "stand" } ] }
        ]);
        let flow = compile(&doc).unwrap();
        assert_eq!(flow.actions[0].guard, None);
        match &flow.actions[0].kind {
            ActionKind::Conditional { guard, actions } => {
                assert_eq!(guard, "running");
                assert_eq!(actions.len(), 1);
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_branches_form() {
        let doc = json!([
            { "kind": "parallel", "branches": [
                [ { "kind": "wait", "duration": 1.0 }, { "kind": "stand" } ],
                [ { "kind": "speak", "params": { "text": "hi" } } ],
            ]}
        ]);
        let flow = compile(&doc).unwrap();
        match &flow.actions[0].kind {
            ActionKind::Parallel { branches } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[0].len(), 2);
                assert_eq!(branches[1].len(), 1);
            }
            other => panic!("Expected parallel, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_actions_shorthand() {
        let doc = json!([
            { "kind": "parallel", "actions": [
                { "kind": "wait" },
                { "kind": "stand" },
            ]}
        ]);
        let flow = compile(&doc).unwrap();
        match &flow.actions[0].kind {
            ActionKind::Parallel { branches } => {
                assert_eq!(branches.len(), 2);
                assert!(branches.iter().all(|b| b.len() == 1));
            }
            other => panic!("Expected parallel, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_param_type_is_malformed() {
        let doc = json!([ { "kind": "move", "params": { "vx": "fast" } } ]);
        assert!(matches!(
            compile(&doc),
            Err(FlowError::MalformedAction { .. })
        ));
    }

    #[test]
    fn test_loop_count_default() {
        let doc = json!([ { "kind": "loop", "actions": [ { "kind": "wait" } ] } ]);
        let flow = compile(&doc).unwrap();
        match &flow.actions[0].kind {
            ActionKind::Loop { count, .. } => assert_eq!(*count, 1),
            other => panic!("Expected loop, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_param_keys_ignored() {
        let doc = json!([
            { "kind": "stand", "params": { "bogus": 42, "other": "x" } }
        ]);
        assert!(compile(&doc).is_ok());
    }
}
