//! In-memory connection provider for session tests.
//!
//! Understands exactly the statement shapes the session emits, plus
//! `SELECT * FROM t WHERE col <op> $1` for hand-written queries. Every
//! statement is recorded, and acquire/release are counted so tests can check
//! that connections are returned on every path.

#![allow(dead_code)]

use pgmap::{Connection, ConnectionProvider, OrmError, OrmResult, Row, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    log: Vec<(String, Vec<Value>)>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    fail_statements: AtomicBool,
    refuse_connections: AtomicBool,
    drop_returned_keys: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw row, bypassing the session.
    pub fn seed(&self, table: &str, row: Row) {
        self.lock().tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Every executed statement with its parameters, oldest first.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().log.clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.lock().log.last().map(|(sql, _)| sql.clone())
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(AtomicOrdering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(AtomicOrdering::SeqCst)
    }

    /// Make every following statement fail after the connection is acquired.
    pub fn fail_statements(&self, fail: bool) {
        self.fail_statements.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make `acquire` fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, AtomicOrdering::SeqCst);
    }

    /// Answer `INSERT ... RETURNING` with a row that lacks the key column.
    pub fn drop_returned_keys(&self, enabled: bool) {
        self.drop_returned_keys.store(enabled, AtomicOrdering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn run(&self, sql: &str, params: &[Value]) -> OrmResult<(u64, Vec<Row>)> {
        let mut state = self.lock();
        state.log.push((sql.to_string(), params.to_vec()));

        if self.fail_statements.load(AtomicOrdering::SeqCst) {
            return Err(OrmError::Other("simulated statement failure".into()));
        }

        let mut binder = Binder::new(params);

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (body, returning) = match rest.split_once(" RETURNING ") {
                Some((body, column)) => (body, Some(column.to_string())),
                None => (rest, None),
            };

            let (table, mut row) = if let Some(table) = body.strip_suffix(" DEFAULT VALUES") {
                (table.to_string(), Row::new())
            } else {
                let (table, tail) = split(body, " (")?;
                let (columns, placeholders) = split(tail, ") VALUES (")?;
                let placeholders = placeholders.strip_suffix(')').ok_or_else(malformed)?;
                let mut row = Row::new();
                for (column, placeholder) in columns.split(", ").zip(placeholders.split(", ")) {
                    row.push(column, binder.bind(placeholder)?);
                }
                (table.to_string(), row)
            };

            let mut returned = Vec::new();
            if let Some(column) = returning {
                state.next_id += 1;
                let id = Value::I64(state.next_id);
                row = std::iter::once((column.clone(), id.clone())).chain(row).collect();
                if self.drop_returned_keys.load(AtomicOrdering::SeqCst) {
                    returned.push(Row::new());
                } else {
                    returned.push(Row::new().with(column, id));
                }
            }
            state.tables.entry(table).or_default().push(row);
            return Ok((1, returned));
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (table, tail) = split(rest, " SET ")?;
            let (assignments, condition) = split(tail, " WHERE ")?;
            let mut changes = Vec::new();
            for assignment in assignments.split(", ") {
                let (column, placeholder) = split(assignment, " = ")?;
                changes.push((column.to_string(), binder.bind(placeholder)?));
            }
            let filter = Filter::parse(condition, &mut binder)?;

            let mut affected = 0;
            for row in state.tables.get_mut(table).into_iter().flatten() {
                if filter.matches(row) {
                    *row = row
                        .clone()
                        .into_iter()
                        .map(|(name, value)| {
                            match changes.iter().find(|(c, _)| *c == name) {
                                Some((_, new)) => (name, new.clone()),
                                None => (name, value),
                            }
                        })
                        .collect();
                    affected += 1;
                }
            }
            return Ok((affected, Vec::new()));
        }

        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let (table, condition) = split(rest, " WHERE ")?;
            let filter = Filter::parse(condition, &mut binder)?;
            let rows = state.tables.entry(table.to_string()).or_default();
            let before = rows.len();
            rows.retain(|row| !filter.matches(row));
            return Ok(((before - rows.len()) as u64, Vec::new()));
        }

        if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
            let (table, filter) = match rest.split_once(" WHERE ") {
                Some((table, condition)) => (table, Some(Filter::parse(condition, &mut binder)?)),
                None => (rest, None),
            };
            let rows: Vec<Row> = state
                .tables
                .get(table)
                .into_iter()
                .flatten()
                .filter(|row| filter.as_ref().is_none_or(|f| f.matches(row)))
                .cloned()
                .collect();
            return Ok((rows.len() as u64, rows));
        }

        Err(OrmError::Other(format!("unsupported statement: {sql}")))
    }
}

fn malformed() -> OrmError {
    OrmError::Other("malformed statement".into())
}

fn split<'a>(s: &'a str, delimiter: &str) -> OrmResult<(&'a str, &'a str)> {
    s.split_once(delimiter).ok_or_else(malformed)
}

/// Resolves `$n` and `?` placeholders against the parameter list.
struct Binder<'a> {
    params: &'a [Value],
    next: usize,
}

impl<'a> Binder<'a> {
    fn new(params: &'a [Value]) -> Self {
        Self { params, next: 0 }
    }

    fn bind(&mut self, placeholder: &str) -> OrmResult<Value> {
        let index = match placeholder.trim() {
            "?" => {
                self.next += 1;
                self.next - 1
            }
            p => p
                .strip_prefix('$')
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(malformed)?,
        };
        self.params
            .get(index)
            .cloned()
            .ok_or_else(|| OrmError::Other(format!("no parameter for {placeholder}")))
    }
}

struct Filter {
    column: String,
    op: String,
    value: Value,
}

impl Filter {
    fn parse(condition: &str, binder: &mut Binder<'_>) -> OrmResult<Self> {
        let parts: Vec<&str> = condition.split_whitespace().collect();
        let [column, op, placeholder] = parts.as_slice() else {
            return Err(malformed());
        };
        Ok(Self {
            column: column.to_string(),
            op: op.to_string(),
            value: binder.bind(placeholder)?,
        })
    }

    fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(&self.column) else {
            return false;
        };
        let Some(ordering) = compare(actual, &self.value) else {
            return false;
        };
        match self.op.as_str() {
            "=" => ordering == Ordering::Equal,
            ">" => ordering == Ordering::Greater,
            "<" => ordering == Ordering::Less,
            ">=" => ordering != Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            _ => false,
        }
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::I16(v) => Some(i64::from(*v)),
        Value::I32(v) => Some(i64::from(*v)),
        Value::I64(v) => Some(*v),
        _ => None,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_i64(a), as_i64(b)) {
        return Some(a.cmp(&b));
    }
    match (a, b) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

pub struct MemoryConnection<'a> {
    db: &'a MemoryDb,
}

impl Drop for MemoryConnection<'_> {
    fn drop(&mut self) {
        self.db.released.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl Connection for MemoryConnection<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.db.run(sql, params).map(|(_, rows)| rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.db.run(sql, params).map(|(affected, _)| affected)
    }
}

impl ConnectionProvider for MemoryDb {
    type Connection<'a> = MemoryConnection<'a>;

    async fn acquire(&self) -> OrmResult<MemoryConnection<'_>> {
        if self.refuse_connections.load(AtomicOrdering::SeqCst) {
            return Err(OrmError::Connection("connection refused".into()));
        }
        self.acquired.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(MemoryConnection { db: self })
    }
}
