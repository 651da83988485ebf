//! Integration tests for compilation, call resolution and execution.
//!
//! Scripts under `test_scripts/` are compiled into a fresh engine and driven
//! through the public API.

use std::cell::Cell;
use std::path::PathBuf;

use botscript::prelude::*;
use botscript::{RegistryError, SourceRegion};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

/// Load a test script from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn register_robots(engine: &mut Engine) {
    engine
        .register_class(ClassEntry::new("Machine").with_field("serial", DataType::int()))
        .unwrap();
    engine
        .register_class(
            ClassEntry::new("Robot")
                .with_parent("Machine")
                .with_field("energy", DataType::int()),
        )
        .unwrap();
}

/// Compile `source` on its own and return the error it fails with.
fn compile_error(source: &str) -> CompileError {
    let mut engine = Engine::new();
    match engine.compile_program("test", source) {
        Err(EngineError::Compile(err)) => err,
        Err(other) => panic!("unexpected engine error {other}"),
        Ok(_) => panic!("'{source}' compiled"),
    }
}

fn completed(outcome: CallOutcome) -> Value {
    match outcome {
        CallOutcome::Completed(value) => value,
        other => panic!("call did not complete: {other:?}"),
    }
}

fn failed(outcome: CallOutcome) -> RuntimeError {
    match outcome {
        CallOutcome::Failed(err) => err,
        other => panic!("call did not fail: {other:?}"),
    }
}

// =============================================================================
// Overload Resolution
// =============================================================================

#[rstest]
#[case(Variable::int(5), 1)]
#[case(Variable::float(2.5), 2)]
#[case(Variable::long(3), 2)]
#[case(Variable::double(2.5), 2)]
fn test_exact_overload_wins(#[case] arg: Variable, #[case] expected: i64) {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("overloads", &load_script("overloads.bs"))
        .unwrap();
    let mut stack = engine.new_stack(program);

    let value = completed(engine.call(&mut stack, "pick", &[arg]).unwrap());
    assert_eq!(value, Value::Int(expected));
}

#[test]
fn test_widening_beats_narrowing() {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("overloads", &load_script("overloads.bs"))
        .unwrap();

    let cached = Cell::new(None);
    let target = engine
        .resolve_call(program, "widen", &[DataType::int()], &cached)
        .unwrap();
    assert_eq!(target.format_params(), "( long a )");
    assert_eq!(cached.get(), Some(target.id()));

    let mut stack = engine.new_stack(program);
    let value = completed(engine.call(&mut stack, "widen", &[Variable::int(1)]).unwrap());
    assert_eq!(value, Value::Int(1));
}

#[test]
fn test_cached_identity_is_stable() {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("overloads", &load_script("overloads.bs"))
        .unwrap();

    let cached = Cell::new(None);
    let first = engine
        .resolve_call(program, "widen", &[DataType::int()], &cached)
        .unwrap();

    // An exact match appears after the call site resolved.
    engine
        .compile_program("better", "public int widen(int a) { return 3; }")
        .unwrap();

    let again = engine
        .resolve_call(program, "widen", &[DataType::int()], &cached)
        .unwrap();
    assert_eq!(again.id(), first.id());

    let fresh = engine
        .resolve_call(program, "widen", &[DataType::int()], &Cell::new(None))
        .unwrap();
    assert_ne!(fresh.id(), first.id());
    assert_eq!(fresh.format_params(), "( int a )");
}

#[rstest]
#[case("pick", vec![], ErrorCode::TooFewParameters)]
#[case("pick", vec![DataType::int(), DataType::int()], ErrorCode::TooManyParameters)]
#[case("pick", vec![DataType::string()], ErrorCode::BadParameterType)]
#[case("missing", vec![DataType::int()], ErrorCode::UndefinedCall)]
fn test_resolution_errors(
    #[case] name: &str,
    #[case] args: Vec<DataType>,
    #[case] code: ErrorCode,
) {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("overloads", &load_script("overloads.bs"))
        .unwrap();

    let result = engine.resolve_call(program, name, &args, &Cell::new(None));
    assert_eq!(result.err(), Some(code));
}

#[test]
fn test_ambiguous_parameter_count() {
    let mut engine = Engine::new();
    let program = engine
        .compile_program(
            "counts",
            "int h(int a) { return 1; } int h(int a, int b, int c) { return 3; }",
        )
        .unwrap();
    let mut stack = engine.new_stack(program);

    let outcome = engine
        .call(&mut stack, "h", &[Variable::int(1), Variable::int(2)])
        .unwrap();
    assert_eq!(outcome, CallOutcome::NotFound(ErrorCode::AmbiguousParameterCount));
    assert!(!stack.is_active());
}

#[test]
fn test_public_calls_can_be_disabled() {
    let mut engine = Engine::new();
    engine
        .compile_program("lib", "public int answer() { return 42; }")
        .unwrap();
    let program = engine.compile_program("main", "int local() { return 1; }").unwrap();
    let mut stack = engine.new_stack(program);

    assert_eq!(
        completed(engine.call(&mut stack, "answer", &[]).unwrap()),
        Value::Int(42)
    );

    engine.set_property(EngineProperty::ResolvePublicCalls, 0);
    assert_eq!(
        engine.call(&mut stack, "answer", &[]).unwrap(),
        CallOutcome::NotFound(ErrorCode::UndefinedCall)
    );
}

// =============================================================================
// Compilation
// =============================================================================

#[rstest]
#[case("void f() { } void f() { }", ErrorCode::Redefinition)]
#[case("int Nope::f() { return 1; }", ErrorCode::UnknownClass)]
#[case("void f() return;", ErrorCode::MissingOpenBlock)]
#[case("f() { }", ErrorCode::NoTypeForReturnValue)]
#[case("void () { }", ErrorCode::NoSuchFunctionName)]
#[case("void f() { g(); }", ErrorCode::UndefinedCall)]
#[case("void h(int a) { } void f() { h(); }", ErrorCode::TooFewParameters)]
#[case("void h(int a) { } void f() { h(1, 2); }", ErrorCode::TooManyParameters)]
#[case(
    "void h(int a) { } void h(int a, int b, int c) { } void f() { h(1, 2); }",
    ErrorCode::AmbiguousParameterCount
)]
#[case("void h(string s) { } void f() { h(1); }", ErrorCode::BadParameterType)]
#[case("int f() { return; }", ErrorCode::MissingReturnValue)]
#[case("void f() { return 1; }", ErrorCode::TypeMismatch)]
#[case("int f() { return x; }", ErrorCode::UnknownVariable)]
#[case("void f(int a, int a) { }", ErrorCode::RedefinedVariable)]
#[case("void f() { int a = 1 }", ErrorCode::ExpectedSemicolon)]
#[case("void f() { int a = 1;", ErrorCode::UnexpectedEof)]
fn test_compile_errors(#[case] source: &str, #[case] code: ErrorCode) {
    assert_eq!(compile_error(source).code, code);
}

#[test]
fn test_error_points_at_call_site() {
    let source = "void f() {\n    missing(1);\n}";
    let err = compile_error(source);
    assert_eq!(err.code, ErrorCode::UndefinedCall);
    assert_eq!(err.span.line, 2);
    assert_eq!(&source[err.span.start as usize..err.span.end as usize], "missing");
}

#[test]
fn test_forward_references() {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("overloads", &load_script("overloads.bs"))
        .unwrap();
    let mut stack = engine.new_stack(program);

    assert_eq!(
        completed(engine.call(&mut stack, "later", &[]).unwrap()),
        Value::Int(7)
    );
    assert_eq!(
        completed(
            engine
                .call(&mut stack, "sum", &[Variable::int(1), Variable::int(3)])
                .unwrap()
        ),
        Value::Int(7)
    );
}

#[test]
fn test_params_and_positions() {
    let source = "extern int clamp(int value, float limit) { return value; }";
    let mut engine = Engine::new();
    let program = engine.compile_program("positions", source).unwrap();
    let function = engine
        .program(program)
        .unwrap()
        .functions()
        .by_name("clamp")
        .next()
        .cloned()
        .unwrap();

    assert!(function.is_extern());
    assert_eq!(function.format_params(), "( int value, float limit )");

    let text = |start: SourceRegion, stop: SourceRegion| {
        let (from, to) = function.position(start, stop);
        &source[from as usize..to as usize]
    };
    assert_eq!(text(SourceRegion::Extern, SourceRegion::Extern), "extern");
    assert_eq!(text(SourceRegion::Name, SourceRegion::Name), "clamp");
    assert_eq!(
        text(SourceRegion::Params, SourceRegion::Params),
        "(int value, float limit)"
    );
    assert_eq!(text(SourceRegion::Body, SourceRegion::Body), "{ return value; }");
    assert_eq!(text(SourceRegion::Whole, SourceRegion::Whole), source);
    assert_eq!(
        text(SourceRegion::Name, SourceRegion::Params),
        "clamp(int value, float limit)"
    );
}

#[test]
fn test_empty_params_format() {
    let mut engine = Engine::new();
    let program = engine.compile_program("p", "void idle() { }").unwrap();
    let function = engine.program(program).unwrap().functions().iter().next().cloned().unwrap();
    assert_eq!(function.format_params(), "()");
}

#[test]
fn test_destructor_naming() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let program = engine
        .compile_program("dtor", "void Robot::~Robot() { energy = 0; }")
        .unwrap();
    let function = engine
        .program(program)
        .unwrap()
        .functions()
        .iter()
        .next()
        .cloned()
        .unwrap();
    assert_eq!(function.name(), "~Robot");
    assert_eq!(function.owner(), Some("Robot"));
}

#[test]
fn test_class_block_methods_cannot_be_public() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let err = match engine.compile_program("p", "class Robot { public int f() { return 1; } }") {
        Err(EngineError::Compile(err)) => err,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(err.code, ErrorCode::UnexpectedToken);
}

#[test]
fn test_class_registration_errors() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let duplicate = engine.register_class(ClassEntry::new("Robot"));
    assert!(matches!(
        duplicate,
        Err(EngineError::Registry(RegistryError::DuplicateClass(_)))
    ));
}

// =============================================================================
// Public Registry
// =============================================================================

#[test]
fn test_public_redefinition_keeps_one() {
    let mut engine = Engine::new();
    engine.compile_program("first", "public void g() { }").unwrap();

    let err = match engine.compile_program("second", "public void g() { }") {
        Err(EngineError::Compile(err)) => err,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(err.code, ErrorCode::Redefinition);

    let names: Vec<String> = engine
        .public_functions()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["g".to_string()]);
}

#[test]
fn test_failed_program_publishes_nothing() {
    let mut engine = Engine::new();
    let result = engine.compile_program(
        "broken",
        "public int ok() { return 1; } public int bad() { return nope(); }",
    );
    assert!(result.is_err());
    assert!(engine.public_functions().is_empty());
    assert!(engine.programs().is_empty());
}

#[test]
fn test_unload_unlinks_public_functions() {
    let mut engine = Engine::new();
    let lib = engine
        .compile_program("lib", "public int one() { return 1; } int two() { return 2; }")
        .unwrap();
    assert_eq!(engine.public_functions().len(), 1);

    engine.unload_program(lib).unwrap();
    assert!(engine.public_functions().is_empty());

    // The name is free again.
    engine
        .compile_program("lib2", "public int one() { return 11; }")
        .unwrap();
    assert_eq!(engine.public_functions().len(), 1);
}

proptest! {
    /// Whatever is compiled and unloaded, the public registry holds exactly
    /// the public functions of the loaded programs.
    #[test]
    fn prop_public_membership(ops in prop::collection::vec((0usize..6, any::<bool>(), any::<bool>()), 1..24)) {
        let mut engine = Engine::new();
        let mut loaded: Vec<ProgramId> = Vec::new();

        for (n, public, unload) in ops {
            if unload && !loaded.is_empty() {
                let id = loaded.remove(n % loaded.len());
                engine.unload_program(id).unwrap();
            } else {
                let modifier = if public { "public " } else { "" };
                let source = format!("{modifier}int f{n}() {{ return {n}; }}");
                if let Ok(id) = engine.compile_program("gen", &source) {
                    loaded.push(id);
                }
            }

            let mut expected: Vec<FunctionId> = engine
                .programs()
                .iter()
                .flat_map(|p| p.all_functions())
                .filter(|f| f.is_public())
                .map(|f| f.id())
                .collect();
            let mut actual: Vec<FunctionId> = engine.public_functions().ids().collect();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

#[test]
fn test_methods_and_super() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let program = engine
        .compile_program("robots", &load_script("robots.bs"))
        .unwrap();
    let robot = engine.new_instance("Robot").unwrap();
    let machine = engine.new_instance("Machine").unwrap();
    let mut stack = engine.new_stack(program);

    let power = engine.call_method(&mut stack, robot, "power", &[]).unwrap();
    assert_eq!(completed(power), Value::Int(11));
    let power = engine.call_method(&mut stack, machine, "power", &[]).unwrap();
    assert_eq!(completed(power), Value::Int(1));

    let charged = engine
        .call_method(&mut stack, robot, "charge", &[Variable::int(5)])
        .unwrap();
    assert_eq!(completed(charged), Value::Int(5));
    let twice = engine.call_method(&mut stack, robot, "chargeTwice", &[]).unwrap();
    assert_eq!(completed(twice), Value::Int(6 + 8));

    let described = engine.call_method(&mut stack, robot, "describe", &[]).unwrap();
    assert_eq!(completed(described), Value::String("robot 8".into()));
    let described = engine.call_method(&mut stack, machine, "describe", &[]).unwrap();
    assert_eq!(completed(described), Value::String("machine 0".into()));

    let energy = engine.heap().get(robot).unwrap().field("energy").unwrap();
    assert_eq!(energy.value(), &Value::Int(8));
}

#[test]
fn test_inherited_method_runs_on_derived_instance() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let program = engine
        .compile_program("robots", "class Machine { int id() { return serial; } }")
        .unwrap();
    let robot = engine.new_instance("Robot").unwrap();
    engine
        .heap_mut()
        .get_mut(robot)
        .unwrap()
        .field_mut("serial")
        .unwrap()
        .set_value(Value::Int(99));
    let mut stack = engine.new_stack(program);

    let id = engine.call_method(&mut stack, robot, "id", &[]).unwrap();
    assert_eq!(completed(id), Value::Int(99));
    assert_eq!(
        engine.call_method(&mut stack, robot, "fly", &[]).unwrap(),
        CallOutcome::NotFound(ErrorCode::UndefinedCall)
    );
}

#[test]
fn test_free_form_method_uses_bound_instance() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let program = engine
        .compile_program("robots", &load_script("robots.bs"))
        .unwrap();
    let robot = engine.new_instance("Robot").unwrap();
    engine.bind_instance(program, robot).unwrap();
    let mut stack = engine.new_stack(program);

    let boosted = engine.call(&mut stack, "boost", &[Variable::int(2)]).unwrap();
    assert_eq!(completed(boosted), Value::Int(20));
    let charged = engine
        .call_method(&mut stack, robot, "charge", &[Variable::int(1)])
        .unwrap();
    assert_eq!(completed(charged), Value::Int(21));
}

#[test]
fn test_stale_receiver_is_rejected() {
    let mut engine = Engine::new();
    register_robots(&mut engine);
    let program = engine
        .compile_program("robots", &load_script("robots.bs"))
        .unwrap();
    let robot = engine.new_instance("Robot").unwrap();
    engine.heap_mut().free(robot);
    let mut stack = engine.new_stack(program);

    assert!(matches!(
        engine.call_method(&mut stack, robot, "power", &[]),
        Err(EngineError::StaleObject)
    ));
    assert!(matches!(
        engine.bind_instance(program, robot),
        Err(EngineError::StaleObject)
    ));
}

#[rstest]
#[case("int f() { return 7 / 2; }", Value::Int(3))]
#[case("int f() { return -(2 + 3) * 4; }", Value::Int(-20))]
#[case("double f() { return 1.5 * 2; }", Value::Float(3.0))]
#[case("long f() { return 3000000000 + 1; }", Value::Int(3_000_000_001))]
#[case("int f() { return 2147483647 + 1; }", Value::Int(i32::MIN as i64))]
#[case("string f() { return \"n=\" + 4 + true; }", Value::String("n=4true".into()))]
#[case("int f() { int a = 2; a = a * a; return a; }", Value::Int(4))]
#[case("int f() { }", Value::Int(0))]
#[case("string f() { { string s = \"in\"; return s; } }", Value::String("in".into()))]
fn test_expression_results(#[case] source: &str, #[case] expected: Value) {
    let mut engine = Engine::new();
    let program = engine.compile_program("expr", source).unwrap();
    let mut stack = engine.new_stack(program);
    assert_eq!(completed(engine.call(&mut stack, "f", &[]).unwrap()), expected);
}

#[test]
fn test_arguments_convert_to_parameter_types() {
    let mut engine = Engine::new();
    let program = engine
        .compile_program("conv", "int trunc(int a) { return a; } float half(float a) { return a / 2; }")
        .unwrap();
    let mut stack = engine.new_stack(program);

    let truncated = engine.call(&mut stack, "trunc", &[Variable::double(2.9)]).unwrap();
    assert_eq!(completed(truncated), Value::Int(2));
    let halved = engine.call(&mut stack, "half", &[Variable::int(3)]).unwrap();
    assert_eq!(completed(halved), Value::Float(1.5));
}

#[test]
fn test_division_by_zero() {
    let source = "int div(int a, int b) { return a / b; }";
    let mut engine = Engine::new();
    let program = engine.compile_program("div", source).unwrap();
    let mut stack = engine.new_stack(program);

    let err = failed(
        engine
            .call(&mut stack, "div", &[Variable::int(1), Variable::int(0)])
            .unwrap(),
    );
    assert_eq!(err.code, RuntimeErrorCode::DivisionByZero);
    let span = err.span.unwrap();
    assert_eq!(&source[span.start as usize..span.end as usize], "a / b");
    assert_eq!(stack.last_error(), Some(&err));
    assert!(!stack.is_active());
}

#[test]
fn test_stack_overflow() {
    let mut engine = Engine::new();
    engine.set_property(EngineProperty::MaxCallDepth, 16);
    let program = engine
        .compile_program("deep", "int down(int n) { return down(n + 1); }")
        .unwrap();
    let mut stack = engine.new_stack(program);

    let err = failed(engine.call(&mut stack, "down", &[Variable::int(0)]).unwrap());
    assert_eq!(err.code, RuntimeErrorCode::StackOverflow);
}

#[test]
fn test_cross_program_failure_gets_call_site() {
    let mut engine = Engine::new();
    engine
        .compile_program("lib", "public int boom(int a) { return a / 0; }")
        .unwrap();
    let source = "int run() {\n    return boom(1) + 1;\n}";
    let program = engine.compile_program("main", source).unwrap();
    let mut stack = engine.new_stack(program);

    let err = failed(engine.call(&mut stack, "run", &[]).unwrap());
    assert_eq!(err.code, RuntimeErrorCode::DivisionByZero);
    let span = err.span.unwrap();
    assert_eq!(span.line, 2);
    assert_eq!(&source[span.start as usize..span.end as usize], "boom(1)");
}
