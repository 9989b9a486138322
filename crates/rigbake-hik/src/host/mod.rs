//! Host application capability interface.
//!
//! Everything rigbake does to a scene goes through the [`Host`] trait: node
//! existence, attribute access, selection, and named commands. The real
//! application is reached through [`CommandPortHost`]; tests use
//! [`FakeHost`](crate::fake::FakeHost).

pub mod command_port;

use serde_json::Value;

use crate::error::HostResult;

pub use command_port::{CommandPortConfig, CommandPortHost};

/// Capabilities rigbake needs from the host application.
///
/// Plugs are `node.attribute` strings. Values use JSON so that every host
/// reply (string, number, bool, array) has one representation.
pub trait Host {
    /// Returns true if a node with this exact name exists.
    fn object_exists(&mut self, name: &str) -> HostResult<bool>;

    /// Reads an attribute value.
    fn get_attribute(&mut self, plug: &str) -> HostResult<Value>;

    /// Writes an attribute value.
    fn set_attribute(&mut self, plug: &str, value: &Value) -> HostResult<()>;

    /// Returns true if the attribute is locked against edits.
    fn is_attribute_locked(&mut self, plug: &str) -> HostResult<bool>;

    /// Returns the current selection, in selection order.
    fn selection(&mut self) -> HostResult<Vec<String>>;

    /// Replaces the selection. An empty slice clears it.
    fn select(&mut self, nodes: &[String]) -> HostResult<()>;

    /// Runs a named host command and returns its result.
    fn run_command(&mut self, command: &Command) -> HostResult<Value>;
}

/// A named host command with flags and positional arguments.
///
/// Flags keep insertion order. A flag without a value is a bare switch
/// (e.g., `-query`).
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    flags: Vec<(String, Option<Value>)>,
    args: Vec<Value>,
}

impl Command {
    /// Creates a command with no flags or arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends several positional arguments.
    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Appends a flag with a value.
    pub fn flag(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.flags.push((name.into(), Some(value.into())));
        self
    }

    /// Appends a bare switch flag.
    pub fn switch(mut self, name: impl Into<String>) -> Self {
        self.flags.push((name.into(), None));
        self
    }

    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments.
    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    /// Flags in insertion order.
    pub fn flags(&self) -> &[(String, Option<Value>)] {
        &self.flags
    }

    /// Returns true if the flag or switch is present.
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|(flag, _)| flag == name)
    }

    /// Returns the value of a flag, if present with a value.
    pub fn flag_value(&self, name: &str) -> Option<&Value> {
        self.flags
            .iter()
            .find(|(flag, _)| flag == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Returns a positional argument as a string.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }

    /// Returns a positional argument as an integer.
    pub fn arg_u64(&self, index: usize) -> Option<u64> {
        self.args.get(index).and_then(Value::as_u64)
    }
}

/// Flattens a reply into strings. Null is empty; scalars become one item.
pub fn value_to_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(value_to_strings).collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

/// Flattens a reply into numbers, skipping anything non-numeric.
pub fn value_to_f64s(value: &Value) -> Vec<f64> {
    match value {
        Value::Array(items) => items.iter().flat_map(value_to_f64s).collect(),
        Value::Number(n) => n.as_f64().into_iter().collect(),
        Value::String(s) => s.trim().parse().ok().into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Reads a reply as a boolean. Numbers are true when non-zero.
pub fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
        Value::Array(items) => items.first().map(value_as_bool).unwrap_or(false),
        _ => false,
    }
}

/// Reads a reply as a single string. Arrays yield their first item.
pub fn value_as_string(value: &Value) -> Option<String> {
    value_to_strings(value).into_iter().next()
}
