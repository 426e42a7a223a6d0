use hoist_core::ir::{Expr, FieldFlags, Member};
use hoist_core::{
    verify_program, DeclKind, DefaultInterop, FieldId, Lowerer, LoweringConfig, LoweringError,
    RelocationKind,
};
use hoist_test_helpers::fixtures::{
    COMPANION_COUNTER, CROSS_CLASS_READERS, INTERFACE_COMPANION, NOTHING_TO_LOWER,
    SELF_REFERENCING_SINGLETON, STANDALONE_SINGLETON, TOP_LEVEL_READER,
};
use hoist_test_helpers::{dump, load, lower, try_lower};

// =============================================================================
// Companion hoisting
// =============================================================================

#[test]
fn test_companion_fields_hoisted_into_parent() {
    let mut program = load(COMPANION_COUNTER);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Counter.kt
    class Counter {
      fun next() { Counter::count#f3 = (Counter::count#f3 + 1); return Counter::count#f3 }
      companion Companion (this%0) {
        property count -> f3
        property label -> f4
      }
      field Companion#f0: Counter.Companion [static, final]
      field count#f3: Int [static] = 0
      static init { Counter::Companion#f0.register() }
      field label#f4: String [static, final] = "counter"
    }
    "###);

    assert_eq!(report.count(RelocationKind::Hoisted), 2);
    assert_eq!(report.relocated_initializers, 1);
    assert_eq!(report.rewritten_references, 3);
    assert_eq!(report.relocations[0].from, "Counter.Companion.count");
    assert_eq!(report.relocations[0].to, "Counter.count");
}

#[test]
fn test_companion_keeps_properties_and_loses_blocks() {
    let mut program = load(COMPANION_COUNTER);
    lower(&mut program);

    let companion = program
        .declarations
        .iter()
        .find(|(_, d)| d.kind == DeclKind::Companion)
        .map(|(id, _)| id)
        .unwrap();
    let members = &program.declarations[companion].members;
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| matches!(m, Member::Property(_))));
    assert!(program.owned_fields(companion).is_empty());
}

#[test]
fn test_top_level_function_references_rewritten() {
    let mut program = load(TOP_LEVEL_READER);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Config.kt
    class Config {
      companion Companion (this%0) {
        property limit -> f2
      }
      field Companion#f0: Config.Companion [static, final]
      field limit#f2: Int [static, final] = 10
    }
    fun limit() { return Config::limit#f2 }
    "###);
    assert_eq!(report.rewritten_references, 1);
}

#[test]
fn test_other_classes_of_the_file_follow_moved_fields() {
    let mut program = load(CROSS_CLASS_READERS);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Settings.kt
    class User {
      fun limit() { return Config::limit#f2 }
    }
    class Config {
      companion Companion (this%0) {
        property limit -> f2
      }
      field Companion#f0: Config.Companion [static, final]
      field limit#f2: Int [static] = 10
    }
    class Audit {
      fun reset() { Config::limit#f2 = 0 }
    }
    "###);
    assert_eq!(report.rewritten_references, 2);
}

#[test]
fn test_other_classes_rewritten_without_verification() {
    let mut program = load(CROSS_CLASS_READERS);
    let config = LoweringConfig {
        verify: false,
        ..LoweringConfig::default()
    };
    let interop = DefaultInterop::new(&config);
    let report = Lowerer::new(&config, &interop).lower(&mut program).unwrap();

    assert_eq!(report.substitutions.len(), 1);
    verify_program(&program, &report.substitutions).unwrap();
}

// =============================================================================
// Interface companions
// =============================================================================

#[test]
fn test_interface_companion_moves_only_constant_like_properties() {
    let mut program = load(INTERFACE_COMPANION);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Api.kt
    interface Api {
      companion Companion (this%0) {
        property VERSION -> f4 [const]
        property cache -> f2
          field cache#f2: Cache [final] = newCache()
        property DEFAULT -> f5
      }
      field Companion#f0: Api.Companion [static, final]
      field VERSION#f4: Int [static, final] = 3
      field DEFAULT#f5: Api [static, final] @JvmField = null
    }
    "###);

    let moved: Vec<&str> = report.relocations.iter().map(|r| r.to.as_str()).collect();
    assert_eq!(moved, vec!["Api.VERSION", "Api.DEFAULT"]);
}

// =============================================================================
// Standalone singletons
// =============================================================================

#[test]
fn test_singleton_fields_promoted_in_place() {
    let mut program = load(STANDALONE_SINGLETON);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Registry.kt
    object Registry (this%0) {
      field INSTANCE#f0: Registry [static, final]
      property entries -> f2
        field entries#f2: List [static, final] = emptyList()
      static init { let seed%2 = 42; Registry::entries#f2.add(seed%2) }
      fun size() { return Registry::entries#f2.size() }
    }
    "###);

    assert_eq!(report.count(RelocationKind::Promoted), 1);
    assert_eq!(report.count(RelocationKind::Hoisted), 0);
    assert_eq!(report.relocated_initializers, 1);
}

#[test]
fn test_singleton_initializer_self_reference_becomes_instance_load() {
    let mut program = load(SELF_REFERENCING_SINGLETON);
    let report = lower(&mut program);

    insta::assert_snapshot!(dump(&program), @r###"
    program Reg.kt
    object Reg (this%0) {
      field INSTANCE#f0: Reg [static, final]
      property me -> f3
        field me#f3: Reg [static, final] = wrap(Reg::INSTANCE#f0)
      property alias -> f4
        field alias#f4: Reg [static, final] = Reg::me#f3
    }
    "###);

    let reg = program.top_level_declarations().next().unwrap();
    let instance = program.declarations[reg].instance_field.unwrap();
    let moved: Vec<FieldId> = report.substitutions.values().collect();
    assert_eq!(moved.len(), 2);

    let me = &program.fields[moved[0]];
    assert!(me.flags.contains(FieldFlags::STATIC));
    match &me.initializer {
        Some(Expr::Call {
            receiver: None,
            args,
            ..
        }) => assert_eq!(args, &vec![Expr::get_field(instance, None)]),
        other => panic!("unexpected initializer: {other:?}"),
    }

    let alias = &program.fields[moved[1]];
    assert!(alias.flags.contains(FieldFlags::STATIC));
    assert_eq!(alias.initializer, Some(Expr::get_field(moved[0], None)));
    assert_eq!(report.rewritten_references, 1);
}

// =============================================================================
// No-op and failure modes
// =============================================================================

#[test]
fn test_nothing_to_lower_leaves_program_unchanged() {
    let mut program = load(NOTHING_TO_LOWER);
    let before = dump(&program);
    let report = lower(&mut program);

    assert_eq!(dump(&program), before);
    assert!(report.relocations.is_empty());
    assert_eq!(report.relocated_initializers, 0);
    assert_eq!(report.rewritten_references, 0);
    insta::assert_snapshot!(before, @r###"
    program Plain.kt
    class Point {
      field x#f0: Int [final]
      object Origin (this%0) {
        field INSTANCE#f1: Point.Origin [static, final]
        property zero -> f2
          field zero#f2: Int [final] = 0
      }
    }
    interface Shape {
      property area -> none
    }
    fun main() { println("hi") }
    "###);
}

#[test]
fn test_second_run_fails_fast() {
    let mut program = load(COMPANION_COUNTER);
    lower(&mut program);
    let lowered = dump(&program);

    let err = try_lower(&mut program).unwrap_err();
    assert!(matches!(
        err,
        LoweringError::AlreadyLowered { ref declaration } if declaration == "Counter"
    ));
    assert_eq!(dump(&program), lowered);
}

#[test]
fn test_unresolved_annotations_rejected() {
    let text = COMPANION_COUNTER.replacen(
        "name: Counter.kt",
        "name: Counter.kt\nannotations_resolved: false",
        1,
    );
    let mut program = load(&text);
    let before = dump(&program);

    let err = try_lower(&mut program).unwrap_err();
    assert_eq!(
        err.to_string(),
        "annotations of `Counter.kt` are not resolved; run annotation resolution first"
    );
    assert_eq!(dump(&program), before);
}
