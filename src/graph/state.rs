//! Conditional state read by the enable conditions of passes.
//!
//! All of this state lives in one [`GraphState`] value owned by the graph. Conditions are pure functions of this
//! value, so whether the set of enabled passes changed between two frames is a simple comparison of snapshots.
//!
//! # Example
//! ```
//! use deimos::prelude::*;
//!
//! let mut state = GraphState::default();
//! state.define_bool("bloom", true);
//! state.define_switch("tonemapper", ["aces", "reinhard"], "aces")?;
//!
//! let bloom = Condition::bool("bloom");
//! let reinhard = Condition::switch("tonemapper", "reinhard");
//! assert!(bloom.evaluate(&state));
//! assert!(!reinhard.evaluate(&state));
//!
//! state.set_switch("tonemapper", "reinhard")?;
//! assert!(reinhard.evaluate(&state));
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::Error;

/// A named conditional variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// Boolean variable.
    Bool(bool),
    /// Switch over a fixed set of named cases.
    Switch {
        /// All possible cases
        cases: Vec<String>,
        /// Index of the current case
        current: usize,
    },
}

/// Current values of all conditional variables, plus per-pass enable switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphState {
    variables: HashMap<String, Variable>,
    pass_switches: HashMap<String, bool>,
}

impl GraphState {
    /// Define a boolean variable, or overwrite an existing one.
    pub fn define_bool(&mut self, name: impl Into<String>, value: bool) {
        self.variables.insert(name.into(), Variable::Bool(value));
    }

    /// Define a switch variable with the given cases.
    /// # Errors
    /// * Fails if `initial` is not one of `cases`.
    pub fn define_switch<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        cases: impl IntoIterator<Item = S>,
        initial: &str,
    ) -> Result<()> {
        let name = name.into();
        let cases = cases.into_iter().map(Into::into).collect::<Vec<String>>();
        let current = cases
            .iter()
            .position(|case| case == initial)
            .ok_or_else(|| Error::UnknownSwitchCase {
                variable: name.clone(),
                case: initial.to_owned(),
            })?;
        self.variables.insert(
            name,
            Variable::Switch {
                cases,
                current,
            },
        );
        Ok(())
    }

    /// Set the value of a boolean variable.
    /// # Errors
    /// * Fails if the variable does not exist or is a switch.
    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        match self.variables.get_mut(name) {
            None => Err(Error::UnknownVariable(name.to_owned()).into()),
            Some(Variable::Bool(current)) => {
                *current = value;
                Ok(())
            }
            Some(_) => Err(Error::VariableTypeMismatch(name.to_owned()).into()),
        }
    }

    /// Set the current case of a switch variable.
    /// # Errors
    /// * Fails if the variable does not exist, is a boolean, or has no such case.
    pub fn set_switch(&mut self, name: &str, case: &str) -> Result<()> {
        match self.variables.get_mut(name) {
            None => Err(Error::UnknownVariable(name.to_owned()).into()),
            Some(Variable::Switch {
                cases,
                current,
            }) => {
                *current = cases.iter().position(|c| c == case).ok_or_else(|| Error::UnknownSwitchCase {
                    variable: name.to_owned(),
                    case: case.to_owned(),
                })?;
                Ok(())
            }
            Some(_) => Err(Error::VariableTypeMismatch(name.to_owned()).into()),
        }
    }

    /// Get the value of a boolean variable.
    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.variables.get(name) {
            None => Err(Error::UnknownVariable(name.to_owned()).into()),
            Some(Variable::Bool(value)) => Ok(*value),
            Some(_) => Err(Error::VariableTypeMismatch(name.to_owned()).into()),
        }
    }

    /// Get the current case of a switch variable.
    pub fn switch(&self, name: &str) -> Result<&str> {
        match self.variables.get(name) {
            None => Err(Error::UnknownVariable(name.to_owned()).into()),
            Some(Variable::Switch {
                cases,
                current,
            }) => Ok(cases[*current].as_str()),
            Some(_) => Err(Error::VariableTypeMismatch(name.to_owned()).into()),
        }
    }

    /// Whether a variable with this name exists.
    pub fn is_defined(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub(crate) fn set_pass_enabled(&mut self, pass: &str, enabled: bool) {
        self.pass_switches.insert(pass.to_owned(), enabled);
    }

    /// Explicit enable switch of a pass, if [`RenderGraph::enable_pass()`](crate::RenderGraph::enable_pass) or
    /// [`RenderGraph::disable_pass()`](crate::RenderGraph::disable_pass) was ever called for it.
    pub fn pass_switch(&self, pass: &str) -> Option<bool> {
        self.pass_switches.get(pass).copied()
    }
}

/// Custom enable predicate.
pub type PredicateFn = Arc<dyn Fn(&GraphState) -> bool + Send + Sync>;

/// Condition under which a pass is enabled. Evaluated once per frame against the current [`GraphState`].
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum Condition {
    /// Always enabled.
    Always,
    /// Enabled if a boolean variable has the given value.
    Bool {
        /// Variable name
        variable: String,
        /// Value the variable must have
        value: bool,
    },
    /// Enabled if a switch variable is set to the given case.
    Switch {
        /// Variable name
        variable: String,
        /// Case the variable must be set to
        case: String,
    },
    /// Inverts a condition.
    Not(Box<Condition>),
    /// Enabled if all conditions hold.
    All(Vec<Condition>),
    /// Enabled if any condition holds.
    Any(Vec<Condition>),
    /// Arbitrary function of the graph state.
    Custom(#[derivative(Debug = "ignore")] PredicateFn),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Always
    }
}

impl Condition {
    /// Enabled while the boolean variable is `true`.
    pub fn bool(variable: impl Into<String>) -> Self {
        Condition::Bool {
            variable: variable.into(),
            value: true,
        }
    }

    /// Enabled while the switch variable is set to `case`.
    pub fn switch(variable: impl Into<String>, case: impl Into<String>) -> Self {
        Condition::Switch {
            variable: variable.into(),
            case: case.into(),
        }
    }

    /// Enabled while `f` returns true.
    pub fn custom(f: impl Fn(&GraphState) -> bool + Send + Sync + 'static) -> Self {
        Condition::Custom(Arc::new(f))
    }

    /// Evaluate the condition. Variables that do not exist (or have the wrong type) evaluate to false.
    pub fn evaluate(&self, state: &GraphState) -> bool {
        match self {
            Condition::Always => true,
            Condition::Bool {
                variable,
                value,
            } => state.bool(variable).map(|v| v == *value).unwrap_or(false),
            Condition::Switch {
                variable,
                case,
            } => state.switch(variable).map(|c| c == case).unwrap_or(false),
            Condition::Not(inner) => !inner.evaluate(state),
            Condition::All(inner) => inner.iter().all(|c| c.evaluate(state)),
            Condition::Any(inner) => inner.iter().any(|c| c.evaluate(state)),
            Condition::Custom(f) => f(state),
        }
    }

    /// Collect the names of all variables this condition reads. Custom predicates are opaque and report nothing.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Bool {
                variable,
                ..
            }
            | Condition::Switch {
                variable,
                ..
            } => out.push(variable.as_str()),
            Condition::Not(inner) => inner.collect_variables(out),
            Condition::All(inner) | Condition::Any(inner) => {
                inner.iter().for_each(|c| c.collect_variables(out));
            }
            Condition::Always | Condition::Custom(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_is_reported() {
        let mut state = GraphState::default();
        state.define_bool("taa", false);
        state.define_switch("aa", ["none", "fxaa"], "none").unwrap();
        assert!(state.set_switch("taa", "none").is_err());
        assert!(state.set_bool("aa", true).is_err());
        assert!(state.set_bool("missing", true).is_err());
        assert!(state.set_switch("aa", "msaa").is_err());
        assert_eq!(state.switch("aa").unwrap(), "none");
    }

    #[test]
    fn composite_conditions() {
        let mut state = GraphState::default();
        state.define_bool("a", true);
        state.define_bool("b", false);
        let cond = Condition::All(vec![
            Condition::bool("a"),
            Condition::Not(Box::new(Condition::bool("b"))),
        ]);
        assert!(cond.evaluate(&state));
        state.set_bool("b", true).unwrap();
        assert!(!cond.evaluate(&state));
        assert_eq!(cond.variables(), vec!["a", "b"]);
    }

    #[test]
    fn missing_variables_evaluate_false() {
        let state = GraphState::default();
        assert!(!Condition::bool("nope").evaluate(&state));
        assert!(Condition::custom(|_| true).evaluate(&state));
    }
}
