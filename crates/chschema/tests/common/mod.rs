#![allow(dead_code)]

use std::sync::Mutex;

use chschema::connection::{Connection, Row};
use chschema::error::{ChError, Result};
use serde_json::json;

/// In-memory connection recording every statement.
///
/// Queries are answered from canned rows registered by fragment; the first
/// fragment contained in the query wins, unmatched queries return no rows.
#[derive(Default)]
pub struct MockConnection {
    responses: Vec<(String, Vec<Row>)>,
    fail_on: Option<String>,
    executed: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers queries containing `fragment` with `rows`.
    pub fn respond(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.responses.push((fragment.to_string(), rows));
        self
    }

    /// Makes any statement containing `fragment` fail.
    pub fn fail_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    /// Registers a table as `system.tables` and `system.columns` would report it.
    pub fn with_table(
        self,
        database: &str,
        name: &str,
        engine_full: &str,
        sorting_key: &str,
        columns: &[(&str, &str)],
    ) -> Self {
        let engine = engine_full
            .split(|c: char| c == '(' || c == ' ')
            .next()
            .unwrap_or_default();
        let table = row(json!({
            "engine": engine,
            "engine_full": engine_full,
            "partition_key": "",
            "sorting_key": sorting_key,
            "primary_key": sorting_key,
            "comment": "",
        }));
        let columns = columns
            .iter()
            .map(|(name, ty)| row(json!({ "name": name, "type": ty, "comment": "" })))
            .collect();

        self.respond(
            &format!("\"system\".\"tables\" WHERE database = '{database}' AND name = '{name}'"),
            vec![table],
        )
        .respond(
            &format!("\"system\".\"columns\" WHERE database = '{database}' AND table = '{name}'"),
            columns,
        )
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(ChError::Server {
                status: 500,
                message: format!("Code: 44. DB::Exception: rejected {fragment}"),
            }),
            _ => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    async fn exec(&self, sql: &str) -> Result<()> {
        self.check_failure(sql)?;
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.check_failure(sql)?;
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("Expected a JSON object, got {other}"),
    }
}
