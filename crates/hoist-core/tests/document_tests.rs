use hoist_core::document::{build_program, ProgramDoc};
use hoist_core::{print_program, DocumentError, Program};
use hoist_test_helpers::fixtures::COMPANION_COUNTER;
use hoist_test_helpers::{dump, load};

#[test]
fn test_json_and_yaml_documents_agree() {
    let json = r#"{
        "name": "Counter.kt",
        "declarations": [{
            "name": "Counter",
            "kind": "class",
            "members": [{
                "member": "declaration",
                "name": "Companion",
                "kind": "companion",
                "members": [
                    { "member": "property", "name": "count", "type": "Int", "final": false,
                      "init": { "expr": "int", "value": 0 } }
                ]
            }]
        }]
    }"#;
    let yaml = r#"
name: Counter.kt
declarations:
  - name: Counter
    kind: class
    members:
      - member: declaration
        name: Companion
        kind: companion
        members:
          - member: property
            name: count
            type: Int
            final: false
            init: { expr: int, value: 0 }
"#;
    let from_json = build_program(ProgramDoc::from_json(json).unwrap()).unwrap();
    let from_yaml = Program::from_yaml(yaml).unwrap();
    assert_eq!(print_program(&from_json), print_program(&from_yaml));
}

#[test]
fn test_fixture_prints_before_lowering() {
    let program = load(COMPANION_COUNTER);
    insta::assert_snapshot!(dump(&program), @r###"
    program Counter.kt
    class Counter {
      fun next() { this%0.count#f1 = (this%0.count#f1 + 1); return this%0.count#f1 }
      companion Companion (this%0) {
        property count -> f1
          field count#f1: Int = 0
        init { this%0.register() }
        property label -> f2
          field label#f2: String [final] = "counter"
      }
      field Companion#f0: Counter.Companion [static, final]
    }
    "###);
}

#[test]
fn test_duplicate_field_rejected() {
    let text = r#"
name: Dup.kt
declarations:
  - name: Host
    kind: class
    members:
      - { member: field, name: x, type: Int }
      - { member: field, name: x, type: Int }
"#;
    let err = Program::from_yaml(text).map(|_| ()).unwrap_err();
    assert!(matches!(err, DocumentError::DuplicateField(ref path) if path == "Host.x"));
}

#[test]
fn test_unknown_member_kind_rejected() {
    let text = r#"
name: Bad.kt
declarations:
  - name: Host
    kind: class
    members:
      - { member: method, name: run }
"#;
    let err = Program::from_yaml(text).map(|_| ()).unwrap_err();
    assert!(matches!(err, DocumentError::Yaml(_)));
}

#[test]
fn test_lambda_parameters_shadow_outer_locals() {
    let text = r#"
name: Shadow.kt
functions:
  - name: main
    params: [{ name: x, type: Int }]
    body:
      - stmt: expr
        value:
          expr: lambda
          params: [{ name: x, type: Int }]
          body:
            - stmt: return
              value: { expr: get, name: x }
      - stmt: return
        value: { expr: get, name: x }
"#;
    let program = Program::from_yaml(text).unwrap();
    insta::assert_snapshot!(print_program(&program), @r###"
    program Shadow.kt
    fun main(x%0) { lambda(x%1) { return x%1 }; return x%0 }
    "###);
}
