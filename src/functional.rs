//! Additional functions: named input rewrites applied before a request.
//!
//! Each function is a handlebars template rendered with `{{input}}`.
//! A function may also clear the history so the request starts fresh.

use crate::error::BridgeError;
use crate::message::History;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_FUNCTIONS: &[(&str, &str, bool)] = &[
    (
        "Summarize",
        "Summarize the following text in a few sentences, keeping every key fact:\n\n{{input}}",
        false,
    ),
    (
        "Polish",
        "Below is a paragraph from an academic paper. Polish the writing to meet the academic style and improve clarity and concision. Rewrite whole sentences when necessary.\n\n{{input}}",
        false,
    ),
    (
        "Translate to Chinese",
        "Translate the following text into Chinese. Output only the translation.\n\n{{input}}",
        true,
    ),
    (
        "Explain Code",
        "Please explain what the following code does:\n```\n{{input}}\n```",
        false,
    ),
];

/// Definition of one additional function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreFunction {
    pub name: String,
    /// Handlebars template; `{{input}}` is the user's text
    pub template: String,
    /// Drop the history before sending
    #[serde(default)]
    pub auto_clear_history: bool,
}

/// Rewrites (input, history) for a named additional function
pub trait InputPreprocessor: Send + Sync {
    fn apply(
        &self,
        function: &str,
        input: &str,
        history: History,
    ) -> Result<(String, History), BridgeError>;
}

/// Registry of additional functions backed by handlebars
pub struct FunctionRegistry {
    handlebars: Handlebars<'static>,
    functions: BTreeMap<String, CoreFunction>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            handlebars,
            functions: BTreeMap::new(),
        }
    }

    /// Registry with the built-in functions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, template, auto_clear_history) in BUILTIN_FUNCTIONS {
            registry
                .register(CoreFunction {
                    name: name.to_string(),
                    template: template.to_string(),
                    auto_clear_history: *auto_clear_history,
                })
                .expect("Failed to register built-in function template");
        }
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, function: CoreFunction) -> Result<(), BridgeError> {
        self.handlebars
            .register_template_string(&function.name, &function.template)?;
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    /// Load a YAML list of functions, returning how many were added
    pub fn load_yaml(&mut self, path: &Path) -> anyhow::Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let functions: Vec<CoreFunction> = serde_yaml::from_str(&content)?;
        let count = functions.len();
        for function in functions {
            self.register(function)?;
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&CoreFunction> {
        self.functions.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InputPreprocessor for FunctionRegistry {
    fn apply(
        &self,
        function: &str,
        input: &str,
        mut history: History,
    ) -> Result<(String, History), BridgeError> {
        let definition = self
            .functions
            .get(function)
            .ok_or_else(|| BridgeError::UnknownFunction(function.to_string()))?;

        let rendered = self
            .handlebars
            .render(&definition.name, &serde_json::json!({ "input": input }))?;

        if definition.auto_clear_history {
            history.clear();
        }

        Ok((rendered, history))
    }
}
