//! Compilation of search commands into PGroonga SQL
//!
//! Every compiled query targets the configured index and carries the
//! liveness predicate, so rows whose heap tuple is dead are never returned.

use std::fmt::Write as _;

use ftsearch_config::SearchConfig;

use crate::command::{FILTER, SearchCommand, TABLE};

/// Excludes index entries whose backing row was deleted or superseded
pub const LIVENESS_PREDICATE: &str = "pgroonga_tuple_is_alive(ctid)";

/// SQL with positional placeholders and the values bound to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    /// `$1` is the command name, `$2` the index name, then name/value pairs
    pub params: Vec<String>,
}

/// Builds `pgroonga_command` calls from [`SearchCommand`]s
#[derive(Debug, Clone)]
pub struct SearchCommandCompiler {
    index_name: String,
}

impl SearchCommandCompiler {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.index_name.clone())
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The command as it is sent: table forced to the index, filter
    /// conjoined with [`LIVENESS_PREDICATE`]
    pub fn prepare(&self, command: &SearchCommand) -> SearchCommand {
        let mut prepared = command.clone();
        prepared.set(
            TABLE,
            format!("pgroonga_table_name('{}')", self.index_name),
        );
        let filter = match command.filter() {
            Some(filter) => format!("({filter}) && {LIVENESS_PREDICATE}"),
            None => LIVENESS_PREDICATE.to_string(),
        };
        prepared.set(FILTER, filter);
        prepared
    }

    /// Compile `command` into a single `SELECT pgroonga_command(...)`
    ///
    /// Blank and absent arguments are omitted; `table` is only ever taken
    /// from the configured index. All values are bound, never interpolated.
    pub fn compile(&self, command: &SearchCommand) -> CompiledQuery {
        self.compile_prepared(&self.prepare(command))
    }

    /// Compile a command already passed through [`Self::prepare`]
    pub(crate) fn compile_prepared(&self, prepared: &SearchCommand) -> CompiledQuery {
        let mut params = vec![prepared.name().to_string(), self.index_name.clone()];
        for (name, value) in prepared.arguments() {
            let Some(value) = value.filter(|value| !value.is_blank()) else {
                continue;
            };
            if name == TABLE {
                continue;
            }
            params.push(name.to_string());
            params.push(value.to_wire());
        }

        let mut sql =
            String::from("SELECT pgroonga_command($1, ARRAY['table', pgroonga_table_name($2)");
        for position in 3..=params.len() {
            let _ = write!(sql, ", ${position}");
        }
        sql.push_str("])");

        CompiledQuery { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ArgumentValue;

    fn compiler() -> SearchCommandCompiler {
        SearchCommandCompiler::new("searcher_records_index")
    }

    #[test]
    fn test_caller_filter_is_conjoined_with_liveness() {
        let command = SearchCommand::select().with(FILTER, "status = 1");
        let prepared = compiler().prepare(&command);
        assert_eq!(
            prepared.filter().as_deref(),
            Some("(status = 1) && pgroonga_tuple_is_alive(ctid)")
        );
    }

    #[test]
    fn test_list_filter_is_conjoined_with_liveness() {
        let command = SearchCommand::select().with(
            FILTER,
            ArgumentValue::List(vec!["project_id == 7".to_string()]),
        );
        let prepared = compiler().prepare(&command);
        assert_eq!(
            prepared.filter().as_deref(),
            Some("(project_id == 7) && pgroonga_tuple_is_alive(ctid)")
        );
    }

    #[test]
    fn test_missing_filter_becomes_liveness_alone() {
        let compiled = compiler().compile(&SearchCommand::select());
        assert_eq!(
            compiled.params,
            ["select", "searcher_records_index", "filter", LIVENESS_PREDICATE]
        );
        assert_eq!(
            compiled.sql,
            "SELECT pgroonga_command($1, ARRAY['table', pgroonga_table_name($2), $3, $4])"
        );
    }

    #[test]
    fn test_blank_arguments_are_omitted() {
        let mut command = SearchCommand::select()
            .with("query", "")
            .with("limit", 20_i64);
        command.set_optional("sort_keys", None);

        let compiled = compiler().compile(&command);
        assert_eq!(
            compiled.params,
            [
                "select",
                "searcher_records_index",
                "limit",
                "20",
                "filter",
                LIVENESS_PREDICATE
            ]
        );
    }

    #[test]
    fn test_caller_table_is_overridden() {
        let command = SearchCommand::select()
            .with(TABLE, "users")
            .with("query", "secret");
        let compiled = compiler().compile(&command);

        assert!(!compiled.params.iter().any(|param| param == "users"));
        assert!(!compiled.params.iter().any(|param| param == TABLE));
        assert_eq!(
            compiler().prepare(&command).get(TABLE),
            Some(&ArgumentValue::from(
                "pgroonga_table_name('searcher_records_index')"
            ))
        );
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let command = SearchCommand::select().with("query", "'); DROP TABLE x; --");
        let compiled = compiler().compile(&command);
        assert!(!compiled.sql.contains("DROP"));
        assert!(compiled.params.iter().any(|param| param == "'); DROP TABLE x; --"));
    }

    #[test]
    fn test_argument_order_is_preserved() {
        let command = SearchCommand::select()
            .with("match_columns", "content")
            .with("query", "pdf")
            .with("output_columns", &["_id", "_score"][..]);
        let compiled = compiler().compile(&command);
        let names: Vec<&str> = compiled
            .params
            .iter()
            .skip(2)
            .step_by(2)
            .map(String::as_str)
            .collect();
        assert_eq!(names, ["match_columns", "query", "output_columns", "filter"]);
    }
}
