//! Suite files: TOML documents with an optional `define` layer and a list
//! of `[[case]]` tables.

use permtest_types::{Case, ParamMap, ParamSource, ParamValue, Suite};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{CliError, CliResult};

fn code_start() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"^\s*code\s*=\s*('''|""")"#).expect("code pattern is valid"))
}

/// Read and parse the suite at `path`.
pub fn load_suite(path: &Path) -> CliResult<Suite> {
    let text = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
    parse_suite(path, &text)
}

/// Parse suite text; `path` names the suite and is recorded for `#line`.
pub fn parse_suite(path: &Path, text: &str) -> CliResult<Suite> {
    let doc: toml::Table = toml::from_str(text).map_err(|e| invalid(path, e.to_string()))?;

    let mut suite = Suite::new(path);
    if let Some(define) = doc.get("define") {
        suite = suite.with_defines(param_source(define).map_err(|m| invalid(path, format!("define: {m}")))?);
    }

    let cases = match doc.get("case") {
        Some(toml::Value::Array(cases)) if !cases.is_empty() => cases,
        Some(_) => return Err(invalid(path, "'case' must be a non-empty array of tables")),
        None => return Err(invalid(path, "no [[case]] entries")),
    };

    // Code blocks start on the line after their opening quotes.
    let lines: Vec<usize> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| code_start().is_match(line))
        .map(|(i, _)| i + 2)
        .collect();

    for (index, value) in cases.iter().enumerate() {
        let table = value
            .as_table()
            .ok_or_else(|| invalid(path, format!("case {index} is not a table")))?;
        let code = table
            .get("code")
            .and_then(toml::Value::as_str)
            .ok_or_else(|| invalid(path, format!("case {index} has no code")))?;
        let line = *lines.get(index).ok_or_else(|| {
            invalid(
                path,
                format!("case {index}: code must be a multi-line string ''' or \"\"\""),
            )
        })?;

        let mut case = Case::new(index, line, code);
        if let Some(define) = table.get("define") {
            case = case.with_defines(
                param_source(define).map_err(|m| invalid(path, format!("case {index} define: {m}")))?,
            );
        }
        match table.get("leaky") {
            None => {}
            Some(toml::Value::Boolean(leaky)) => case = case.with_leaky(*leaky),
            Some(_) => return Err(invalid(path, format!("case {index}: leaky must be a boolean"))),
        }
        suite = suite.with_case(case);
    }

    tracing::debug!(suite = %suite.name, cases = suite.cases.len(), "loaded suite");
    Ok(suite)
}

/// A `define` value: one table, or an array of alternative tables.
pub fn param_source(value: &toml::Value) -> Result<ParamSource, String> {
    match value {
        toml::Value::Table(table) => Ok(ParamSource::Single(param_map(table))),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_table()
                    .map(param_map)
                    .ok_or_else(|| "alternatives must be tables".to_string())
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ParamSource::Alternatives),
        other => Err(format!("expected a table, found {}", other.type_str())),
    }
}

pub fn param_map(table: &toml::Table) -> ParamMap {
    table.iter().map(|(k, v)| (k.as_str(), param_value(v))).collect()
}

/// Map a TOML value onto a parameter value; types without a parameter
/// counterpart keep their textual form.
pub fn param_value(value: &toml::Value) -> ParamValue {
    match value {
        toml::Value::Integer(v) => ParamValue::Int(*v),
        toml::Value::Boolean(b) => ParamValue::Bool(*b),
        toml::Value::String(s) => ParamValue::Str(s.clone()),
        toml::Value::Array(items) => ParamValue::List(items.iter().map(param_value).collect()),
        toml::Value::Float(f) => ParamValue::Str(f.to_string()),
        toml::Value::Datetime(d) => ParamValue::Str(d.to_string()),
        toml::Value::Table(t) => ParamValue::Str(t.to_string()),
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> CliError {
    CliError::Suite {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
