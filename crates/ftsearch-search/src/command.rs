//! Engine-agnostic search commands

use std::fmt;

/// Name of the select command
pub const SELECT: &str = "select";

/// Argument carrying the filter expression
pub const FILTER: &str = "filter";

/// Argument naming the target table, always set by the compiler
pub const TABLE: &str = "table";

/// Value of a command argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    Text(String),
    Integer(i64),
    /// Sent comma-separated, e.g. `output_columns` or `match_columns`
    List(Vec<String>),
}

impl ArgumentValue {
    /// Blank values are omitted from compiled queries
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Integer(_) => false,
            Self::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }

    /// Wire form passed to the engine
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::List(items) => items.join(", "),
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<&str> for ArgumentValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<String>> for ArgumentValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<&[&str]> for ArgumentValue {
    fn from(items: &[&str]) -> Self {
        Self::List(items.iter().map(ToString::to_string).collect())
    }
}

/// A named engine command with ordered arguments
///
/// Arguments keep the order in which they were first set; setting an
/// existing name replaces its value in place. Absent values are kept so the
/// caller's order survives, and are dropped at compile time like blank ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCommand {
    name: String,
    arguments: Vec<(String, Option<ArgumentValue>)>,
}

impl SearchCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn select() -> Self {
        Self::new(SELECT)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builder form of [`Self::set`]
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<ArgumentValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ArgumentValue>) {
        self.set_optional(name, Some(value.into()));
    }

    pub fn set_optional(&mut self, name: &str, value: Option<ArgumentValue>) {
        match self.arguments.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.arguments.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Filter expression in wire form, `None` when unset or blank
    pub fn filter(&self) -> Option<String> {
        self.get(FILTER)
            .filter(|value| !value.is_blank())
            .map(ArgumentValue::to_wire)
    }

    /// Arguments in caller-defined order, including absent ones
    pub fn arguments(&self) -> impl Iterator<Item = (&str, Option<&ArgumentValue>)> {
        self.arguments
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut command = SearchCommand::select()
            .with("query", "redmine")
            .with("limit", 10_i64);
        command.set("query", "groonga");

        let names: Vec<&str> = command.arguments().map(|(name, _)| name).collect();
        assert_eq!(names, ["query", "limit"]);
        assert_eq!(command.get("query"), Some(&ArgumentValue::from("groonga")));
    }

    #[test]
    fn test_blank_values() {
        assert!(ArgumentValue::from("  ").is_blank());
        assert!(ArgumentValue::List(Vec::new()).is_blank());
        assert!(!ArgumentValue::from(0_i64).is_blank());
        assert!(!ArgumentValue::from("x").is_blank());
    }

    #[test]
    fn test_list_wire_form() {
        let columns = ArgumentValue::from(&["_id", "title"][..]);
        assert_eq!(columns.to_wire(), "_id, title");
    }

    #[test]
    fn test_blank_filter_is_none() {
        let command = SearchCommand::select().with(FILTER, " ");
        assert_eq!(command.filter(), None);
        assert_eq!(
            SearchCommand::select().with(FILTER, "a == 1").filter().as_deref(),
            Some("a == 1")
        );
    }

    #[test]
    fn test_non_text_filter_is_kept() {
        let listed = SearchCommand::select().with(FILTER, vec!["project_id == 7".to_string()]);
        assert_eq!(listed.filter().as_deref(), Some("project_id == 7"));

        let numeric = SearchCommand::select().with(FILTER, 1_i64);
        assert_eq!(numeric.filter().as_deref(), Some("1"));
    }
}
