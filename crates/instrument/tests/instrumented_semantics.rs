//! End-to-end semantics of instrumented bodies: the transformer's
//! output is executed against a real runtime and must count hits and
//! honor forced branch/boolean actuation.

use probe_instrument::{
    ClassModel, ClassTransformer, CondOp, EvalOutcome, Evaluator, Insn, LabelId, MethodModel,
};
use probe_protocol::RuntimeMode;
use probe_runtime::ProbeRuntime;

/// `boolean m() { if (predicate != 0) return true; return false; }`
/// with the conditional jump on line 10.
fn branchy_method(predicate: i64) -> MethodModel {
    MethodModel::new(
        "m",
        vec![
            Insn::LineNumber(9),
            Insn::PushInt(predicate),
            Insn::LineNumber(10),
            Insn::Cond(CondOp::IfNe, LabelId(0)),
            Insn::LineNumber(11),
            Insn::PushBool(false),
            Insn::ReturnBool,
            Insn::Label(LabelId(0)),
            Insn::LineNumber(12),
            Insn::PushBool(true),
            Insn::ReturnBool,
        ],
    )
    .returning_boolean()
}

fn instrument(class: &ClassModel) -> ClassModel {
    ClassTransformer::new()
        .transform_class(class)
        .expect("transform")
}

fn run_method(runtime: &ProbeRuntime, class: &ClassModel, method: &str) -> EvalOutcome {
    let body = &class
        .methods
        .iter()
        .find(|m| m.name == method)
        .expect("method")
        .body;
    Evaluator::new(runtime).run(body).expect("eval")
}

#[test]
fn observe_mode_runs_the_original_condition_and_counts_hits() {
    let runtime = ProbeRuntime::new();
    let class = instrument(&ClassModel::new("c.C", vec![branchy_method(0)]));

    let outcome = run_method(&runtime, &class, "m");
    assert_eq!(outcome, EvalOutcome::Bool(false));

    assert_eq!(runtime.get_count("c.C#m"), 1);
    assert_eq!(runtime.get_count("c.C#m:9"), 1);
    assert_eq!(runtime.get_count("c.C#m:10"), 1);
    assert_eq!(runtime.get_count("c.C#m:11"), 1);
    assert_eq!(runtime.get_count("c.C#m:12"), 0);
    assert!(runtime.get_last_hit_epoch_ms("c.C#m:10") > 0);
}

#[test]
fn forced_taken_overrides_a_false_predicate() {
    let runtime = ProbeRuntime::new();
    runtime.configure(RuntimeMode::Actuate, "test", "c.C#m:10", true);
    let class = instrument(&ClassModel::new("c.C", vec![branchy_method(0)]));

    let outcome = run_method(&runtime, &class, "m");
    assert_eq!(outcome, EvalOutcome::Bool(true));
    assert_eq!(runtime.get_count("c.C#m:12"), 1);
    assert_eq!(runtime.get_count("c.C#m:11"), 0);
}

#[test]
fn forced_fallthrough_overrides_a_true_predicate() {
    let runtime = ProbeRuntime::new();
    runtime.configure(RuntimeMode::Actuate, "test", "c.C#m:10", false);
    let class = instrument(&ClassModel::new("c.C", vec![branchy_method(1)]));

    let outcome = run_method(&runtime, &class, "m");
    assert_eq!(outcome, EvalOutcome::Bool(false));
    assert_eq!(runtime.get_count("c.C#m:11"), 1);
    assert_eq!(runtime.get_count("c.C#m:12"), 0);
}

#[test]
fn armed_branch_on_another_line_defers_to_the_original_condition() {
    let runtime = ProbeRuntime::new();
    runtime.configure(RuntimeMode::Actuate, "test", "c.C#m:99", true);
    let class = instrument(&ClassModel::new("c.C", vec![branchy_method(0)]));

    let outcome = run_method(&runtime, &class, "m");
    assert_eq!(outcome, EvalOutcome::Bool(false));
}

#[test]
fn binary_comparison_bypass_pops_both_operands() {
    // `if (1 < 2) …` forced to fall through: both operands must be
    // dropped, leaving a balanced stack for the rest of the body.
    let runtime = ProbeRuntime::new();
    runtime.configure(RuntimeMode::Actuate, "test", "c.C#cmp:20", false);
    let method = MethodModel::new(
        "cmp",
        vec![
            Insn::LineNumber(20),
            Insn::PushInt(1),
            Insn::PushInt(2),
            Insn::Cond(CondOp::IfICmpLt, LabelId(0)),
            Insn::PushBool(false),
            Insn::ReturnBool,
            Insn::Label(LabelId(0)),
            Insn::PushBool(true),
            Insn::ReturnBool,
        ],
    )
    .returning_boolean();
    let class = instrument(&ClassModel::new("c.C", vec![method]));

    let outcome = run_method(&runtime, &class, "cmp");
    assert_eq!(outcome, EvalOutcome::Bool(false));
}

#[test]
fn unary_null_check_bypass_pops_one_operand() {
    let runtime = ProbeRuntime::new();
    runtime.configure(RuntimeMode::Actuate, "test", "c.C#nn:30", true);
    let method = MethodModel::new(
        "nn",
        vec![
            Insn::LineNumber(30),
            Insn::PushNull,
            Insn::Cond(CondOp::IfNonNull, LabelId(0)),
            Insn::PushBool(false),
            Insn::ReturnBool,
            Insn::Label(LabelId(0)),
            Insn::PushBool(true),
            Insn::ReturnBool,
        ],
    )
    .returning_boolean();
    let class = instrument(&ClassModel::new("c.C", vec![method]));

    // A null reference would never take the IfNonNull jump naturally.
    let outcome = run_method(&runtime, &class, "nn");
    assert_eq!(outcome, EvalOutcome::Bool(true));
}

#[test]
fn boolean_return_is_overridden_only_when_armed_for_the_method() {
    let method = MethodModel::new(
        "isReady",
        vec![Insn::LineNumber(5), Insn::PushBool(false), Insn::ReturnBool],
    )
    .returning_boolean();
    let class = instrument(&ClassModel::new("c.C", vec![method]));

    let runtime = ProbeRuntime::new();
    assert_eq!(
        run_method(&runtime, &class, "isReady"),
        EvalOutcome::Bool(false)
    );

    runtime.configure(RuntimeMode::Actuate, "test", "c.C#isReady", true);
    assert_eq!(
        run_method(&runtime, &class, "isReady"),
        EvalOutcome::Bool(true)
    );

    runtime.configure(RuntimeMode::Actuate, "test", "c.C#other", true);
    assert_eq!(
        run_method(&runtime, &class, "isReady"),
        EvalOutcome::Bool(false)
    );
}

#[test]
fn non_positive_line_directives_emit_no_line_hits() {
    let runtime = ProbeRuntime::new();
    let method = MethodModel::new(
        "zero",
        vec![Insn::LineNumber(0), Insn::LineNumber(-1), Insn::Return],
    );
    let class = instrument(&ClassModel::new("c.C", vec![method]));

    run_method(&runtime, &class, "zero");
    assert_eq!(runtime.get_count("c.C#zero"), 1);
    assert_eq!(runtime.get_count("c.C#zero:0"), 0);
    assert_eq!(runtime.get_count("c.C#zero:-1"), 0);
}
