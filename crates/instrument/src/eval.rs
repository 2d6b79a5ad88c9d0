//! Host-side execution of (instrumented) method bodies.
//!
//! A plain stack machine: it resolves labels, executes instructions,
//! and dispatches probe hooks against a [`ProbeRuntime`]. This is how
//! the abstract instruction stream actually feeds the hit table.

use crate::insn::{CondOp, Insn, LabelId, ProbeHook};
use probe_runtime::ProbeRuntime;
use std::collections::HashMap;
use thiserror::Error;

const STEP_LIMIT: usize = 100_000;

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("operand stack underflow at instruction {0}")]
    StackUnderflow(usize),
    #[error("type mismatch at instruction {index}: expected {expected}")]
    TypeMismatch { index: usize, expected: &'static str },
    #[error("jump to undefined label {0:?}")]
    UndefinedLabel(LabelId),
    #[error("fell off the end of the body without a return")]
    MissingReturn,
    #[error("step limit exceeded")]
    StepLimit,
}

/// Operand-stack value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

impl Value {
    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }
}

/// What a completed body evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Void,
    Bool(bool),
}

/// Executes method bodies against a probe runtime.
pub struct Evaluator<'r> {
    runtime: &'r ProbeRuntime,
}

impl<'r> Evaluator<'r> {
    pub fn new(runtime: &'r ProbeRuntime) -> Self {
        Self { runtime }
    }

    pub fn run(&self, body: &[Insn]) -> Result<EvalOutcome, EvalError> {
        let labels = resolve_labels(body);
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0usize;
        let mut steps = 0usize;

        while pc < body.len() {
            steps += 1;
            if steps > STEP_LIMIT {
                return Err(EvalError::StepLimit);
            }
            let index = pc;
            pc += 1;
            match &body[index] {
                Insn::Label(_) | Insn::LineNumber(_) | Insn::Nop => {}
                Insn::PushInt(v) => stack.push(Value::Int(*v)),
                Insn::PushStr(v) => stack.push(Value::Str(v.clone())),
                Insn::PushBool(v) => stack.push(Value::Bool(*v)),
                Insn::PushNull => stack.push(Value::Null),
                Insn::Dup => {
                    let top = stack.last().cloned().ok_or(EvalError::StackUnderflow(index))?;
                    stack.push(top);
                }
                Insn::Pop => {
                    stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                }
                Insn::Pop2 => {
                    stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                    stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                }
                Insn::Goto(label) => {
                    pc = *labels.get(label).ok_or(EvalError::UndefinedLabel(*label))?;
                }
                Insn::Cond(op, label) => {
                    if self.eval_condition(*op, &mut stack, index)? {
                        pc = *labels.get(label).ok_or(EvalError::UndefinedLabel(*label))?;
                    }
                }
                Insn::Invoke(hook) => self.invoke(*hook, &mut stack, index)?,
                Insn::Return => return Ok(EvalOutcome::Void),
                Insn::ReturnBool => {
                    let value = stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                    let value = match value {
                        Value::Bool(v) => v,
                        Value::Int(v) => v != 0,
                        _ => {
                            return Err(EvalError::TypeMismatch {
                                index,
                                expected: "boolean",
                            })
                        }
                    };
                    return Ok(EvalOutcome::Bool(value));
                }
            }
        }
        Err(EvalError::MissingReturn)
    }

    fn eval_condition(
        &self,
        op: CondOp,
        stack: &mut Vec<Value>,
        index: usize,
    ) -> Result<bool, EvalError> {
        match op {
            CondOp::IfNull | CondOp::IfNonNull => {
                let value = stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                let is_null = matches!(value, Value::Null);
                Ok(if op == CondOp::IfNull { is_null } else { !is_null })
            }
            CondOp::IfEq | CondOp::IfNe | CondOp::IfLt | CondOp::IfGe | CondOp::IfGt
            | CondOp::IfLe => {
                let value = stack
                    .pop()
                    .ok_or(EvalError::StackUnderflow(index))?
                    .as_int()
                    .ok_or(EvalError::TypeMismatch {
                        index,
                        expected: "int",
                    })?;
                Ok(match op {
                    CondOp::IfEq => value == 0,
                    CondOp::IfNe => value != 0,
                    CondOp::IfLt => value < 0,
                    CondOp::IfGe => value >= 0,
                    CondOp::IfGt => value > 0,
                    _ => value <= 0,
                })
            }
            CondOp::IfICmpEq | CondOp::IfICmpNe | CondOp::IfICmpLt | CondOp::IfICmpGe
            | CondOp::IfICmpGt | CondOp::IfICmpLe => {
                let rhs = stack
                    .pop()
                    .ok_or(EvalError::StackUnderflow(index))?
                    .as_int()
                    .ok_or(EvalError::TypeMismatch {
                        index,
                        expected: "int",
                    })?;
                let lhs = stack
                    .pop()
                    .ok_or(EvalError::StackUnderflow(index))?
                    .as_int()
                    .ok_or(EvalError::TypeMismatch {
                        index,
                        expected: "int",
                    })?;
                Ok(match op {
                    CondOp::IfICmpEq => lhs == rhs,
                    CondOp::IfICmpNe => lhs != rhs,
                    CondOp::IfICmpLt => lhs < rhs,
                    CondOp::IfICmpGe => lhs >= rhs,
                    CondOp::IfICmpGt => lhs > rhs,
                    _ => lhs <= rhs,
                })
            }
            CondOp::IfACmpEq | CondOp::IfACmpNe => {
                let rhs = stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                let lhs = stack.pop().ok_or(EvalError::StackUnderflow(index))?;
                let equal = lhs == rhs;
                Ok(if op == CondOp::IfACmpEq { equal } else { !equal })
            }
        }
    }

    fn invoke(
        &self,
        hook: ProbeHook,
        stack: &mut Vec<Value>,
        index: usize,
    ) -> Result<(), EvalError> {
        let pop_str = |stack: &mut Vec<Value>| -> Result<String, EvalError> {
            match stack.pop().ok_or(EvalError::StackUnderflow(index))? {
                Value::Str(v) => Ok(v),
                _ => Err(EvalError::TypeMismatch {
                    index,
                    expected: "string",
                }),
            }
        };
        let pop_int = |stack: &mut Vec<Value>| -> Result<i64, EvalError> {
            stack
                .pop()
                .ok_or(EvalError::StackUnderflow(index))?
                .as_int()
                .ok_or(EvalError::TypeMismatch {
                    index,
                    expected: "int",
                })
        };

        match hook {
            ProbeHook::MethodHit => {
                let method = pop_str(stack)?;
                let class = pop_str(stack)?;
                self.runtime.hit_by_class_method(&class, &method);
            }
            ProbeHook::LineHit => {
                let line = pop_int(stack)?;
                let method = pop_str(stack)?;
                let class = pop_str(stack)?;
                self.runtime.hit_line_by_class_method(&class, &method, line);
            }
            ProbeHook::BranchDecision => {
                let line = pop_int(stack)?;
                let method = pop_str(stack)?;
                let class = pop_str(stack)?;
                let decision =
                    self.runtime
                        .branch_decision_by_class_method_line(&class, &method, line);
                stack.push(Value::Int(i64::from(decision)));
            }
            ProbeHook::ShouldActuateBool => {
                let method = pop_str(stack)?;
                let class = pop_str(stack)?;
                let armed = self.runtime.should_actuate_boolean_return(&class, &method);
                stack.push(Value::Bool(armed));
            }
            ProbeHook::ForcedBool => {
                stack.push(Value::Bool(self.runtime.config().actuate_return_boolean));
            }
        }
        Ok(())
    }
}

fn resolve_labels(body: &[Insn]) -> HashMap<LabelId, usize> {
    let mut labels = HashMap::new();
    for (index, insn) in body.iter().enumerate() {
        if let Insn::Label(label) = insn {
            labels.insert(*label, index);
        }
    }
    labels
}
