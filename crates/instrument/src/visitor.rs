//! The rewrite pass over one method body.

use crate::insn::{CondOp, Insn, LabelId, ProbeHook};
use crate::transform::MethodModel;

struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    fn for_body(body: &[Insn]) -> Self {
        let mut max = 0;
        for insn in body {
            let id = match insn {
                Insn::Label(LabelId(id)) => *id,
                Insn::Goto(LabelId(id)) => *id,
                Insn::Cond(_, LabelId(id)) => *id,
                _ => continue,
            };
            max = max.max(id + 1);
        }
        Self { next: max }
    }

    fn fresh(&mut self) -> LabelId {
        let id = LabelId(self.next);
        self.next += 1;
        id
    }
}

fn push_location(out: &mut Vec<Insn>, class: &str, method: &str) {
    out.push(Insn::PushStr(class.to_string()));
    out.push(Insn::PushStr(method.to_string()));
}

fn pop_conditional_operands(out: &mut Vec<Insn>, op: CondOp) {
    if op.is_unary() {
        out.push(Insn::Pop);
    } else {
        out.push(Insn::Pop2);
    }
}

/// Wrap a conditional jump so the runtime can force or defer it.
///
/// Stack on entry: the original condition operands. All three paths
/// leave the operand stack balanced: the decision value is always
/// dropped, and the original operands are either consumed by the
/// original opcode (defer) or popped explicitly (force).
fn emit_branch_wrapper(
    out: &mut Vec<Insn>,
    labels: &mut LabelAllocator,
    class: &str,
    method: &str,
    line: i32,
    op: CondOp,
    target: LabelId,
) {
    let natural = labels.fresh();
    let force_taken = labels.fresh();
    let done = labels.fresh();

    push_location(out, class, method);
    out.push(Insn::PushInt(line as i64));
    out.push(Insn::Invoke(ProbeHook::BranchDecision));

    // decision == -1: evaluate the original condition.
    out.push(Insn::Dup);
    out.push(Insn::PushInt(-1));
    out.push(Insn::Cond(CondOp::IfICmpEq, natural));

    // decision == 1: force jump/taken.
    out.push(Insn::Dup);
    out.push(Insn::PushInt(1));
    out.push(Insn::Cond(CondOp::IfICmpEq, force_taken));

    // decision == 0: force fallthrough.
    out.push(Insn::Pop);
    pop_conditional_operands(out, op);
    out.push(Insn::Goto(done));

    out.push(Insn::Label(force_taken));
    out.push(Insn::Pop);
    pop_conditional_operands(out, op);
    out.push(Insn::Goto(target));

    out.push(Insn::Label(natural));
    out.push(Insn::Pop);
    out.push(Insn::Cond(op, target));

    out.push(Insn::Label(done));
}

/// Boolean-return advice: when actuation is armed for this method, the
/// original return value is dropped and the forced boolean returned
/// instead.
fn emit_boolean_return(out: &mut Vec<Insn>, labels: &mut LabelAllocator, class: &str, method: &str) {
    let keep = labels.fresh();

    push_location(out, class, method);
    out.push(Insn::Invoke(ProbeHook::ShouldActuateBool));
    out.push(Insn::Cond(CondOp::IfEq, keep));
    out.push(Insn::Pop);
    out.push(Insn::Invoke(ProbeHook::ForcedBool));
    out.push(Insn::Label(keep));
    out.push(Insn::ReturnBool);
}

/// Produce the instrumented body for one method: entry advice, line
/// hits emitted ahead of each line's instructions, branch decision
/// wrappers at every conditional jump with a known line, and boolean
/// return advice where the declared return type is primitive boolean.
pub fn instrument_method(class: &str, method: &MethodModel) -> Vec<Insn> {
    let mut labels = LabelAllocator::for_body(&method.body);
    let mut out = Vec::with_capacity(method.body.len() * 2 + 4);

    push_location(&mut out, class, &method.name);
    out.push(Insn::Invoke(ProbeHook::MethodHit));

    let mut current_line: i32 = -1;
    for insn in &method.body {
        match insn {
            Insn::LineNumber(line) => {
                out.push(insn.clone());
                if *line <= 0 {
                    continue;
                }
                current_line = *line;
                push_location(&mut out, class, &method.name);
                out.push(Insn::PushInt(*line as i64));
                out.push(Insn::Invoke(ProbeHook::LineHit));
            }
            Insn::Cond(op, target) if current_line > 0 => {
                emit_branch_wrapper(
                    &mut out,
                    &mut labels,
                    class,
                    &method.name,
                    current_line,
                    *op,
                    *target,
                );
            }
            Insn::ReturnBool if method.returns_boolean => {
                emit_boolean_return(&mut out, &mut labels, class, &method.name);
            }
            _ => out.push(insn.clone()),
        }
    }

    out
}
