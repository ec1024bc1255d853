use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::eval::{self, EvalError, PrintSink, Scope, Value};
use super::validate::{self, ParsedFunction};
use super::RejectionReason;

/// Call-time failure of a bound extension. Distinct from
/// [`RejectionReason`]: the snippet already passed validation; its
/// invocation went wrong.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    #[error("missing argument `{0}`")]
    MissingArgument(String),
    #[error("too many arguments: expected {expected}, got {given}")]
    TooManyArguments { expected: usize, given: usize },
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A validated function bound to one host instance. If the first parameter
/// is named `self` it receives an opaque reference to the owner; every other
/// parameter must be supplied explicitly at call time.
#[derive(Debug, Clone)]
pub struct BoundExtension {
    owner: String,
    func: Arc<ParsedFunction>,
}

impl BoundExtension {
    pub fn name(&self) -> &str {
        &self.func.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn invoke(&self, args: &[Value], sink: &mut dyn PrintSink) -> Result<Value, CallError> {
        let params = &self.func.params;
        let mut bound = Vec::with_capacity(params.len());

        let explicit: &[String] = match params.split_first() {
            Some((first, rest)) if first == "self" => {
                bound.push(Value::Host(self.owner.clone()));
                rest
            }
            _ => params,
        };

        if args.len() > explicit.len() {
            return Err(CallError::TooManyArguments {
                expected: explicit.len(),
                given: args.len(),
            });
        }
        if args.len() < explicit.len() {
            return Err(CallError::MissingArgument(explicit[args.len()].clone()));
        }
        bound.extend(args.iter().cloned());

        Ok(eval::run_function(&self.func, bound, sink)?)
    }
}

/// Per-host mapping from function name to bound extension. Created empty at
/// host construction and mutated only by successful loads; a later snippet
/// defining the same name replaces the prior binding.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    host_name: String,
    extensions: HashMap<String, BoundExtension>,
}

impl ExtensionRegistry {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            extensions: HashMap::new(),
        }
    }

    /// Validate a candidate snippet and, if it passes, bind and register the
    /// function it defines. Returns the function name on success.
    pub fn load(&mut self, snippet: &str) -> Result<String, RejectionReason> {
        let parsed = validate::validate(snippet)?;
        let name = parsed.name.clone();

        let mut scope = Scope::isolated();
        scope
            .define(parsed)
            .map_err(|err| RejectionReason::ExecutionFailed(err.to_string()))?;
        let func = scope
            .lookup(&name)
            .ok_or(RejectionReason::RegistrationFailed)?;

        tracing::debug!(extension = %name, host = %self.host_name, "extension registered");
        self.extensions.insert(
            name.clone(),
            BoundExtension {
                owner: self.host_name.clone(),
                func,
            },
        );
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&BoundExtension> {
        self.extensions.get(name)
    }

    /// Invoke a registered extension by name.
    pub fn invoke(
        &self,
        name: &str,
        args: &[Value],
        sink: &mut dyn PrintSink,
    ) -> Option<Result<Value, CallError>> {
        self.get(name).map(|ext| ext.invoke(args, sink))
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
