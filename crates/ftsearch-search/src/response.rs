//! Typed parse of the JSON returned by `pgroonga_command`
//!
//! The envelope is `[header, body]` where the header is
//! `[return_code, start_time, elapsed_time, error_message?, ...]`.
//! A `select` body starts with the result set
//! `[[n_hits], [[column, type], ...], record, ...]`; drilldowns follow it
//! and are kept only in the raw body.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::{SELECT, SearchCommand};
use crate::error::{SearchError, SearchResult};

/// Status line of an engine response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub return_code: i64,
    /// Seconds since the epoch
    pub start_time: f64,
    /// Seconds
    pub elapsed_time: f64,
    pub error_message: Option<String>,
}

/// Output column of a select
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub value_type: String,
}

/// Result set of a `select` command
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SelectResult {
    /// Total matches, not limited by `limit`
    pub n_hits: u64,
    pub columns: Vec<Column>,
    /// One value per column, in column order
    pub records: Vec<Vec<Value>>,
}

impl SelectResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn value(&self, record: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.records.get(record)?.get(index)
    }

    /// Records keyed by column name
    pub fn record_maps(&self) -> Vec<Map<String, Value>> {
        self.records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .zip(record)
                    .map(|(column, value)| (column.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Select(SelectResult),
    /// Body of any other command, or of a failed one
    Other(Value),
}

/// Parsed response keyed to the command that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// The command as sent to the engine
    pub command: SearchCommand,
    pub header: ResponseHeader,
    pub body: ResponseBody,
}

impl SearchResponse {
    /// Parse the raw scalar returned for `command`
    ///
    /// # Errors
    ///
    /// Returns `SearchError::MalformedResponse` when `raw` is not a valid
    /// engine envelope
    pub fn parse(command: &SearchCommand, raw: &str) -> SearchResult<Self> {
        let name = command.name();
        let envelope: Value =
            serde_json::from_str(raw).map_err(|e| SearchError::malformed(name, e))?;
        let parts = envelope
            .as_array()
            .ok_or_else(|| SearchError::malformed(name, "envelope is not an array"))?;

        let header = parse_header(name, parts.first())?;
        let body = parts.get(1).cloned().unwrap_or(Value::Null);

        let body = if name == SELECT && header.return_code == 0 {
            ResponseBody::Select(parse_select(name, &body)?)
        } else {
            ResponseBody::Other(body)
        };

        Ok(Self {
            command: command.clone(),
            header,
            body,
        })
    }

    pub const fn is_success(&self) -> bool {
        self.header.return_code == 0
    }

    pub const fn select(&self) -> Option<&SelectResult> {
        match &self.body {
            ResponseBody::Select(result) => Some(result),
            ResponseBody::Other(_) => None,
        }
    }

    /// Turn an engine-side failure into an error
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Engine` when the return code is not zero
    pub fn into_result(self) -> SearchResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(SearchError::Engine {
            command: self.command.name().to_string(),
            return_code: self.header.return_code,
            message: self.header.error_message.unwrap_or_default(),
        })
    }
}

fn parse_header(command: &str, header: Option<&Value>) -> SearchResult<ResponseHeader> {
    let fields = header
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::malformed(command, "missing response header"))?;

    let return_code = fields
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| SearchError::malformed(command, "missing return code"))?;

    Ok(ResponseHeader {
        return_code,
        start_time: fields.get(1).and_then(Value::as_f64).unwrap_or_default(),
        elapsed_time: fields.get(2).and_then(Value::as_f64).unwrap_or_default(),
        error_message: fields
            .get(3)
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}

fn parse_select(command: &str, body: &Value) -> SearchResult<SelectResult> {
    let result_set = body
        .as_array()
        .and_then(|parts| parts.first())
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::malformed(command, "missing result set"))?;

    let mut rows = result_set.iter();
    let n_hits = rows
        .next()
        .and_then(Value::as_array)
        .and_then(|count| count.first())
        .and_then(Value::as_u64)
        .ok_or_else(|| SearchError::malformed(command, "missing hit count"))?;

    let columns = match rows.next() {
        Some(Value::Array(columns)) => columns
            .iter()
            .map(|column| parse_column(command, column))
            .collect::<SearchResult<Vec<_>>>()?,
        Some(_) => return Err(SearchError::malformed(command, "columns are not an array")),
        None => Vec::new(),
    };

    let records = rows
        .map(|record| {
            record
                .as_array()
                .cloned()
                .ok_or_else(|| SearchError::malformed(command, "record is not an array"))
        })
        .collect::<SearchResult<Vec<_>>>()?;

    Ok(SelectResult {
        n_hits,
        columns,
        records,
    })
}

fn parse_column(command: &str, column: &Value) -> SearchResult<Column> {
    let pair = column
        .as_array()
        .ok_or_else(|| SearchError::malformed(command, "column is not a [name, type] pair"))?;
    let text = |index: usize| {
        pair.get(index)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| SearchError::malformed(command, "column is not a [name, type] pair"))
    };
    Ok(Column {
        name: text(0)?,
        value_type: text(1)?,
    })
}
