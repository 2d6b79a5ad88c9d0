//! Instrumentation driver: filter decision plus the per-class failure
//! policy. A transform error is logged and skips that class only.

use crate::filter::ClassFilter;
use probe_instrument::{ClassModel, ClassTransformer, Evaluator, Insn, MethodModel};
use probe_runtime::ProbeRuntime;

pub struct InstrumentationDriver {
    filter: ClassFilter,
    transformer: ClassTransformer,
}

impl InstrumentationDriver {
    pub fn new(filter: ClassFilter) -> Self {
        Self {
            filter,
            transformer: ClassTransformer::new(),
        }
    }

    /// Instrument one loaded class. `None` means the class is left
    /// untouched, either because the filter rejected it or because the
    /// rewrite failed.
    pub fn transform(&self, class: &ClassModel) -> Option<ClassModel> {
        if !self.filter.should_instrument(&class.name) {
            return None;
        }
        match self.transformer.transform_class(class) {
            Ok(rewritten) => {
                log::info!("instrumented: {}", class.name);
                Some(rewritten)
            }
            Err(err) => {
                log::warn!("transform error: {}: {err}", class.name);
                None
            }
        }
    }
}

/// Startup self-check: transform and execute a one-line method against
/// a throwaway runtime and confirm the hit table recorded it. Proves
/// the advice wiring end-to-end before any real class goes through.
pub fn self_check() -> Result<(), String> {
    let runtime = ProbeRuntime::new();
    let class = ClassModel::new(
        "probe.SelfCheck",
        vec![MethodModel::new(
            "selfCheck",
            vec![Insn::LineNumber(1), Insn::Return],
        )],
    );
    let rewritten = ClassTransformer::new()
        .transform_class(&class)
        .map_err(|err| err.to_string())?;
    Evaluator::new(&runtime)
        .run(&rewritten.methods[0].body)
        .map_err(|err| err.to_string())?;
    if runtime.get_count("probe.SelfCheck#selfCheck") != 1
        || runtime.get_count("probe.SelfCheck#selfCheck:1") != 1
    {
        return Err("hit table did not record the self-check hits".to_string());
    }
    Ok(())
}
