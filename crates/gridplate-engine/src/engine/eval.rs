//! Expression evaluation.
//!
//! The transformer only sees the [`Evaluator`] trait. [`RhaiEvaluator`] is the
//! implementation used by the CLI: expressions are Rhai expressions evaluated
//! against a scope built from the current [`Bindings`], with optional user
//! functions compiled from a Rhai script.

use std::collections::BTreeMap;

use rhai::{AST, Dynamic, Engine, EvalAltResult, Map, Scope};
use thiserror::Error;

/// How unknown identifiers are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalMode {
    /// Unknown identifiers are errors.
    Strict,
    /// Unknown identifiers evaluate to unit. Used while probing cells for
    /// implicit collections.
    Lenient,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown variable `{name}` in `{expr}`")]
    UnknownVariable { name: String, expr: String },

    #[error("cannot evaluate `{expr}`: {message}")]
    Evaluation { expr: String, message: String },

    #[error("invalid data: {0}")]
    Data(String),

    #[error("error in custom functions: {0}")]
    Functions(String),
}

/// Variables visible to an expression.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: BTreeMap<String, Dynamic>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Dynamic) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Dynamic> {
        self.values.remove(name)
    }

    /// A copy of these bindings with one more variable.
    pub fn with(&self, name: impl Into<String>, value: Dynamic) -> Bindings {
        let mut next = self.clone();
        next.insert(name, value);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Dynamic)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn to_scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, value) in &self.values {
            scope.push_dynamic(name.clone(), value.clone());
        }
        scope
    }
}

impl From<Map> for Bindings {
    fn from(map: Map) -> Self {
        Bindings {
            values: map
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

/// Evaluates template expressions.
pub trait Evaluator {
    fn evaluate(&self, expr: &str, bindings: &Bindings, mode: EvalMode)
    -> Result<Dynamic, EvalError>;
}

/// [`Evaluator`] backed by a Rhai engine.
pub struct RhaiEvaluator {
    engine: Engine,
    functions: Option<AST>,
}

impl Default for RhaiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiEvaluator {
    pub fn new() -> Self {
        RhaiEvaluator {
            engine: Engine::new(),
            functions: None,
        }
    }

    /// Create an evaluator whose expressions can call the functions defined
    /// in `script`. Top-level statements of the script are ignored.
    pub fn with_functions(script: &str) -> Result<Self, EvalError> {
        let mut evaluator = Self::new();
        let ast = evaluator
            .engine
            .compile(script)
            .map_err(|e| EvalError::Functions(e.to_string()))?;
        evaluator.functions = Some(ast.clone_functions_only());
        Ok(evaluator)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Parse a JSON object into top-level bindings. `null` becomes unit.
    pub fn parse_json(&self, json: &str) -> Result<Bindings, EvalError> {
        self.engine
            .parse_json(json, true)
            .map(Bindings::from)
            .map_err(|e| EvalError::Data(e.to_string()))
    }

    fn run(&self, expr: &str, scope: &mut Scope<'static>) -> Result<Dynamic, Box<EvalAltResult>> {
        let ast = self.engine.compile_expression_with_scope(scope, expr)?;
        match &self.functions {
            Some(functions) => {
                let merged = functions.merge(&ast);
                self.engine.eval_ast_with_scope::<Dynamic>(scope, &merged)
            }
            None => self.engine.eval_ast_with_scope::<Dynamic>(scope, &ast),
        }
    }
}

impl Evaluator for RhaiEvaluator {
    fn evaluate(
        &self,
        expr: &str,
        bindings: &Bindings,
        mode: EvalMode,
    ) -> Result<Dynamic, EvalError> {
        let mut scope = bindings.to_scope();
        match self.run(expr, &mut scope) {
            Ok(value) => Ok(value),
            Err(err) => match *err {
                EvalAltResult::ErrorVariableNotFound(_, _) if mode == EvalMode::Lenient => {
                    Ok(Dynamic::UNIT)
                }
                EvalAltResult::ErrorVariableNotFound(name, _) => Err(EvalError::UnknownVariable {
                    name,
                    expr: expr.to_string(),
                }),
                other => Err(EvalError::Evaluation {
                    expr: expr.to_string(),
                    message: other.to_string(),
                }),
            },
        }
    }
}
