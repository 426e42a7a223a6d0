//! Program documents shared by the integration tests and benches.

use indoc::indoc;

/// A class whose companion holds a mutable counter, a constant label and an
/// initializer block between them. A method of the class reads and writes the
/// counter.
pub const COMPANION_COUNTER: &str = indoc! {r#"
    name: Counter.kt
    declarations:
      - name: Counter
        kind: class
        members:
          - member: function
            name: next
            body:
              - stmt: expr
                value:
                  expr: set_field
                  field: Counter.Companion.count
                  receiver: { expr: this, of: Counter.Companion }
                  value:
                    expr: binary
                    op: add
                    lhs:
                      expr: get_field
                      field: Counter.Companion.count
                      receiver: { expr: this, of: Counter.Companion }
                    rhs: { expr: int, value: 1 }
              - stmt: return
                value:
                  expr: get_field
                  field: Counter.Companion.count
                  receiver: { expr: this, of: Counter.Companion }
          - member: declaration
            name: Companion
            kind: companion
            members:
              - member: property
                name: count
                type: Int
                final: false
                init: { expr: int, value: 0 }
              - member: init
                body:
                  - stmt: expr
                    value:
                      expr: call
                      callee: register
                      receiver: { expr: this, of: Counter.Companion }
              - member: property
                name: label
                type: String
                init: { expr: str, value: counter }
"#};

/// An interface companion with one property of each eligibility class:
/// `const`, plain, and annotated for direct field exposure.
pub const INTERFACE_COMPANION: &str = indoc! {r#"
    name: Api.kt
    declarations:
      - name: Api
        kind: interface
        members:
          - member: declaration
            name: Companion
            kind: companion
            members:
              - member: property
                name: VERSION
                type: Int
                const: true
                init: { expr: int, value: 3 }
              - member: property
                name: cache
                type: Cache
                init: { expr: call, callee: newCache }
              - member: property
                name: DEFAULT
                type: Api
                annotations: [JvmField]
                init: { expr: "null" }
"#};

/// A standalone singleton with an initializer block that declares a local
/// and reads its own receiver.
pub const STANDALONE_SINGLETON: &str = indoc! {r#"
    name: Registry.kt
    declarations:
      - name: Registry
        kind: singleton
        members:
          - member: property
            name: entries
            type: List
            init: { expr: call, callee: emptyList }
          - member: init
            body:
              - stmt: let
                name: seed
                type: Int
                value: { expr: int, value: 42 }
              - stmt: expr
                value:
                  expr: call
                  callee: add
                  receiver:
                    expr: get_field
                    field: Registry.entries
                    receiver: { expr: this, of: Registry }
                  args:
                    - { expr: get, name: seed }
          - member: function
            name: size
            body:
              - stmt: return
                value:
                  expr: call
                  callee: size
                  receiver:
                    expr: get_field
                    field: Registry.entries
                    receiver: { expr: this, of: Registry }
"#};

/// Nothing to lower: a class without a companion, a nested singleton and an
/// interface.
pub const NOTHING_TO_LOWER: &str = indoc! {r#"
    name: Plain.kt
    declarations:
      - name: Point
        kind: class
        members:
          - member: field
            name: x
            type: Int
            final: true
          - member: declaration
            name: Origin
            kind: singleton
            members:
              - member: property
                name: zero
                type: Int
                init: { expr: int, value: 0 }
      - name: Shape
        kind: interface
        members:
          - member: property
            name: area
            type: Int
            backing: false
    functions:
      - name: main
        body:
          - stmt: expr
            value: { expr: call, callee: println, args: [{ expr: str, value: hi }] }
"#};

/// A companion field read from a top-level function.
pub const TOP_LEVEL_READER: &str = indoc! {r#"
    name: Config.kt
    declarations:
      - name: Config
        kind: class
        members:
          - member: declaration
            name: Companion
            kind: companion
            members:
              - member: property
                name: limit
                type: Int
                init: { expr: int, value: 10 }
    functions:
      - name: limit
        body:
          - stmt: return
            value:
              expr: get_field
              field: Config.Companion.limit
              receiver: { expr: this, of: Config.Companion }
"#};

/// Two classes of one file using the companion field of a third: `User`
/// reads it before `Config` is declared, `Audit` writes it after.
pub const CROSS_CLASS_READERS: &str = indoc! {r#"
    name: Settings.kt
    declarations:
      - name: User
        kind: class
        members:
          - member: function
            name: limit
            body:
              - stmt: return
                value:
                  expr: get_field
                  field: Config.Companion.limit
                  receiver: { expr: this, of: Config.Companion }
      - name: Config
        kind: class
        members:
          - member: declaration
            name: Companion
            kind: companion
            members:
              - member: property
                name: limit
                type: Int
                final: false
                init: { expr: int, value: 10 }
      - name: Audit
        kind: class
        members:
          - member: function
            name: reset
            body:
              - stmt: expr
                value:
                  expr: set_field
                  field: Config.Companion.limit
                  receiver: { expr: this, of: Config.Companion }
                  value: { expr: int, value: 0 }
"#};

/// A singleton whose property initializers read its own receiver, the second
/// one through the first property.
pub const SELF_REFERENCING_SINGLETON: &str = indoc! {r#"
    name: Reg.kt
    declarations:
      - name: Reg
        kind: singleton
        members:
          - member: property
            name: me
            type: Reg
            init:
              expr: call
              callee: wrap
              args:
                - { expr: this, of: Reg }
          - member: property
            name: alias
            type: Reg
            init:
              expr: get_field
              field: Reg.me
              receiver: { expr: this, of: Reg }
"#};
