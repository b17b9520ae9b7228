//! CEL evaluation of tuple conditions.
//!
//! Compiled programs are cached by expression source. Parameters come from
//! the request context overlaid with the tuple's stored context, so values
//! written with a tuple cannot be overridden by a caller.

use std::collections::BTreeMap;
use std::panic;
use std::sync::Arc;

use cel_interpreter::{Context, Program, Value as CelValue};
use dashmap::DashMap;
use rsauthz_common::model::ConditionDefinition;
use rsauthz_common::Condition;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

#[derive(Default)]
pub struct ConditionEvaluator {
    programs: DashMap<String, Arc<Program>>,
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("cached_programs", &self.programs.len())
            .finish()
    }
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `condition` against its definition.
    ///
    /// A parameter that is bound neither by the tuple nor by the request
    /// makes the condition false.
    pub fn evaluate(
        &self,
        definition: &ConditionDefinition,
        condition: &Condition,
        request_context: &BTreeMap<String, Value>,
    ) -> StoreResult<bool> {
        let mut params: BTreeMap<&str, &Value> = request_context
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        params.extend(condition.context.iter().map(|(k, v)| (k.as_str(), v)));

        if definition
            .parameters
            .iter()
            .any(|p| !params.contains_key(p.as_str()))
        {
            return Ok(false);
        }

        let program = self.program(definition)?;
        let mut ctx = Context::default();
        for (name, value) in params {
            ctx.add_variable(name.to_string(), value.clone())
                .map_err(|e| condition_error(definition, e.to_string()))?;
        }

        match program.execute(&ctx) {
            Ok(CelValue::Bool(allowed)) => Ok(allowed),
            Ok(other) => Err(condition_error(
                definition,
                format!("expected bool, got {other:?}"),
            )),
            Err(e) => Err(condition_error(definition, e.to_string())),
        }
    }

    fn program(&self, definition: &ConditionDefinition) -> StoreResult<Arc<Program>> {
        if let Some(program) = self.programs.get(&definition.expression) {
            return Ok(Arc::clone(program.value()));
        }

        // The parser can panic on malformed input.
        let compiled = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            Program::compile(&definition.expression)
        }));
        let program = match compiled {
            Ok(Ok(program)) => Arc::new(program),
            Ok(Err(e)) => return Err(condition_error(definition, e.to_string())),
            Err(_) => {
                return Err(condition_error(
                    definition,
                    "parser failed on expression".to_string(),
                ))
            }
        };

        self.programs
            .insert(definition.expression.clone(), Arc::clone(&program));
        Ok(program)
    }
}

fn condition_error(definition: &ConditionDefinition, message: String) -> StoreError {
    StoreError::ConditionError {
        name: definition.name.clone(),
        message,
    }
}
