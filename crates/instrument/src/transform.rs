//! Class-level transformation and its failure policy.

use crate::insn::{Insn, LabelId};
use crate::visitor::instrument_method;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{class}.{method}: jump to undefined label {label:?}")]
    UndefinedLabel {
        class: String,
        method: String,
        label: LabelId,
    },
    #[error("{class}.{method}: duplicate label {label:?}")]
    DuplicateLabel {
        class: String,
        method: String,
        label: LabelId,
    },
}

/// One method of a loaded class.
#[derive(Debug, Clone)]
pub struct MethodModel {
    pub name: String,
    pub is_abstract: bool,
    pub is_native: bool,
    /// Declared return type is the primitive boolean.
    pub returns_boolean: bool,
    pub body: Vec<Insn>,
}

impl MethodModel {
    pub fn new(name: impl Into<String>, body: Vec<Insn>) -> Self {
        Self {
            name: name.into(),
            is_abstract: false,
            is_native: false,
            returns_boolean: false,
            body,
        }
    }

    pub fn returning_boolean(mut self) -> Self {
        self.returns_boolean = true;
        self
    }

    /// Compiler-synthesized closure bodies are never instrumented.
    pub fn is_synthetic_closure(&self) -> bool {
        self.name.starts_with("lambda$")
    }

    fn is_instrumentable(&self) -> bool {
        !self.is_abstract && !self.is_native && !self.is_synthetic_closure()
    }
}

/// A loaded class as presented by the host runtime.
#[derive(Debug, Clone)]
pub struct ClassModel {
    /// Dotted fully-qualified name.
    pub name: String,
    pub methods: Vec<MethodModel>,
}

impl ClassModel {
    pub fn new(name: impl Into<String>, methods: Vec<MethodModel>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }
}

/// Rewrites eligible methods of a class. Label validation stands in
/// for the host bytecode library's frame computation: a body whose
/// jumps cannot be resolved is rejected before any rewrite is kept.
#[derive(Debug, Default)]
pub struct ClassTransformer;

impl ClassTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform_class(&self, class: &ClassModel) -> Result<ClassModel, TransformError> {
        let mut methods = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            if !method.is_instrumentable() {
                methods.push(method.clone());
                continue;
            }
            let body = instrument_method(&class.name, method);
            validate_labels(&class.name, &method.name, &body)?;
            let mut rewritten = method.clone();
            rewritten.body = body;
            methods.push(rewritten);
        }
        Ok(ClassModel {
            name: class.name.clone(),
            methods,
        })
    }
}

fn validate_labels(class: &str, method: &str, body: &[Insn]) -> Result<(), TransformError> {
    let mut defined: HashSet<LabelId> = HashSet::new();
    for insn in body {
        if let Insn::Label(label) = insn {
            if !defined.insert(*label) {
                return Err(TransformError::DuplicateLabel {
                    class: class.to_string(),
                    method: method.to_string(),
                    label: *label,
                });
            }
        }
    }
    for insn in body {
        let target = match insn {
            Insn::Goto(label) => *label,
            Insn::Cond(_, label) => *label,
            _ => continue,
        };
        if !defined.contains(&target) {
            return Err(TransformError::UndefinedLabel {
                class: class.to_string(),
                method: method.to_string(),
                label: target,
            });
        }
    }
    Ok(())
}
