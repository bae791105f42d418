//! Spreadsheet function table
//!
//! Maps each supported spreadsheet function name to its arity and the rule
//! used to render it as SQL. Rules form a closed set; the translator matches
//! on them. Supporting a new function means registering one more entry.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Function {func} takes {expected} argument(s), got {actual}")]
    ArityMismatch {
        func: String,
        expected: Arity,
        actual: usize,
    },
}

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(lo, hi) => write!(f, "between {} and {}", lo, hi),
        }
    }
}

/// How a function call becomes SQL, given its already translated arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "sql", rename_all = "snake_case")]
pub enum RenderRule {
    /// Flatten ranges into their columns and join every term with an infix
    /// operator, e.g. `SUM(A1:C1)` -> `col1 + col2 + col3`
    FlattenJoin(&'static str),
    /// Join scalar arguments with a keyword, e.g. `AND(x, y)` -> `x AND y`
    KeywordJoin(&'static str),
    /// Flattened terms summed and divided by the term count
    Average,
    /// `IF(cond, then, else)` -> `CASE WHEN cond THEN then ELSE else END`
    Case,
    /// Keyword in front of a single scalar argument, e.g. `NOT x`
    Prefix(&'static str),
    /// Plain SQL function call over scalar arguments
    Call(&'static str),
    /// SQL function call with ranges flattened into its argument list
    FlattenCall(&'static str),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionRule {
    pub name: String,
    pub arity: Arity,
    #[serde(flatten)]
    pub rule: RenderRule,
}

impl FunctionRule {
    pub fn new(name: impl Into<String>, arity: Arity, rule: RenderRule) -> Self {
        Self {
            name: name.into(),
            arity,
            rule,
        }
    }
}

pub struct FunctionRegistry {
    functions: HashMap<String, FunctionRule>,
    version: String,
}

impl FunctionRegistry {
    /// Registry holding the built-in function table
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self::empty(version);
        registry.register_builtins();
        registry
    }

    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            functions: HashMap::new(),
            version: version.into(),
        }
    }

    fn register_builtins(&mut self) {
        use Arity::*;
        use RenderRule::*;

        // Arithmetic over row ranges
        self.register(FunctionRule::new("SUM", AtLeast(1), FlattenJoin("+")));
        self.register(FunctionRule::new("AVERAGE", AtLeast(1), Average));
        self.register(FunctionRule::new("MIN", AtLeast(1), FlattenCall("LEAST")));
        self.register(FunctionRule::new("MAX", AtLeast(1), FlattenCall("GREATEST")));
        self.register(FunctionRule::new("ABS", Exact(1), Call("ABS")));

        // Logic
        self.register(FunctionRule::new("IF", Exact(3), Case));
        self.register(FunctionRule::new("AND", AtLeast(1), KeywordJoin("AND")));
        self.register(FunctionRule::new("OR", AtLeast(1), KeywordJoin("OR")));
        self.register(FunctionRule::new("NOT", Exact(1), Prefix("NOT")));

        // Text
        self.register(FunctionRule::new("CONCATENATE", AtLeast(1), FlattenJoin("||")));
    }

    /// Add or replace a function. Returns the rule previously registered
    /// under the same name.
    pub fn register(&mut self, rule: FunctionRule) -> Option<FunctionRule> {
        self.functions.insert(rule.name.clone(), rule)
    }

    /// Case-sensitive lookup by name
    pub fn lookup(&self, name: &str) -> Result<&FunctionRule, RegistryError> {
        self.functions
            .get(name)
            .ok_or_else(|| RegistryError::FunctionNotFound(name.to_string()))
    }

    /// Lookup plus arity validation for a call with `arg_count` arguments
    pub fn resolve_call(&self, name: &str, arg_count: usize) -> Result<&FunctionRule, RegistryError> {
        let rule = self.lookup(name)?;
        if !rule.arity.accepts(arg_count) {
            return Err(RegistryError::ArityMismatch {
                func: name.to_string(),
                expected: rule.arity,
                actual: arg_count,
            });
        }
        Ok(rule)
    }

    /// Registered rules ordered by name
    pub fn rules(&self) -> Vec<&FunctionRule> {
        let mut rules: Vec<_> = self.functions.values().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}
