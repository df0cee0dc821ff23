//! Satchel CLI.
//!
//! Provides the `satchel` binary with subcommands for working with records
//! in a SQLite-backed store through a persistence context: `put` persists a
//! record (identity or assigned key strategy, depending on whether `--key`
//! is given), `get` loads one, `del` removes one.
//!
//! Every command runs inside a single session, so the same engine drives
//! the CLI and library callers.

use std::process;

use clap::{Parser, Subcommand};

use satchel_core::{FieldValue, KeyStrategy, KindId, KindRegistry, Record, RecordKey};
use satchel_session::Session;
use satchel_store::SqliteStore;

/// Satchel record store tools.
#[derive(Parser)]
#[command(name = "satchel", about = "Satchel record store tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Persist a record and commit.
    Put {
        /// Path to the database file.
        #[arg(short, long)]
        db: String,

        /// Entity kind name.
        #[arg(short, long)]
        kind: String,

        /// Record key. When omitted the store allocates one (identity
        /// strategy); when given the key is used as-is (assigned strategy).
        #[arg(long)]
        key: Option<i64>,

        /// Fields as name=value pairs. Values parse as null, bool, integer,
        /// real, then fall back to text.
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Load a record by kind and key.
    Get {
        /// Path to the database file.
        #[arg(short, long)]
        db: String,

        /// Entity kind name.
        #[arg(short, long)]
        kind: String,

        /// Record key.
        #[arg(long)]
        key: i64,
    },
    /// Delete a record by kind and key.
    Del {
        /// Path to the database file.
        #[arg(short, long)]
        db: String,

        /// Entity kind name.
        #[arg(short, long)]
        kind: String,

        /// Record key.
        #[arg(long)]
        key: i64,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Put {
            db,
            kind,
            key,
            fields,
        } => run_put(&db, &kind, key, &fields),
        Commands::Get { db, kind, key } => run_get(&db, &kind, key),
        Commands::Del { db, kind, key } => run_del(&db, &kind, key),
    };
    process::exit(exit_code);
}

/// Execute the put subcommand.
///
/// Returns exit code: 0 = success, 1 = bad arguments, 3 = store failure.
fn run_put(db_path: &str, kind_name: &str, key: Option<i64>, raw_fields: &[String]) -> i32 {
    let strategy = if key.is_some() {
        KeyStrategy::Assigned
    } else {
        KeyStrategy::Identity
    };
    let (registry, kind) = match one_kind_registry(kind_name, strategy) {
        Ok(pair) => pair,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let mut record = match key {
        Some(key) => Record::with_key(kind, RecordKey(key)),
        None => Record::new(kind),
    };
    for raw in raw_fields {
        match parse_field(raw) {
            Ok((name, value)) => {
                record.set(&name, value);
            }
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return 1;
            }
        }
    }

    let store = match SqliteStore::new(db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };

    let mut session = Session::begin(&registry, store);
    let handle = match session.persist(record) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: persist failed: {}", e);
            return 3;
        }
    };
    let stored = match session.record(handle) {
        Ok(record) => record_json(kind_name, record),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };
    if let Err(e) = session.commit() {
        eprintln!("Error: commit failed: {}", e);
        return 3;
    }

    println!("{}", stored);
    0
}

/// Execute the get subcommand.
///
/// Returns exit code: 0 = found, 1 = not found, 3 = store failure.
fn run_get(db_path: &str, kind_name: &str, key: i64) -> i32 {
    let (registry, kind) = match one_kind_registry(kind_name, KeyStrategy::Assigned) {
        Ok(pair) => pair,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let store = match SqliteStore::new(db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };

    let mut session = Session::begin(&registry, store);
    match session.find(kind, RecordKey(key)) {
        Ok(Some(handle)) => match session.record(handle) {
            Ok(record) => {
                println!("{}", record_json(kind_name, record));
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                3
            }
        },
        Ok(None) => {
            eprintln!("not found: kind={}, key={}", kind_name, key);
            1
        }
        Err(e) => {
            eprintln!("Error: find failed: {}", e);
            3
        }
    }
}

/// Execute the del subcommand.
///
/// Returns exit code: 0 = deleted, 1 = not found, 3 = store failure.
fn run_del(db_path: &str, kind_name: &str, key: i64) -> i32 {
    let (registry, kind) = match one_kind_registry(kind_name, KeyStrategy::Assigned) {
        Ok(pair) => pair,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let store = match SqliteStore::new(db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };

    let mut session = Session::begin(&registry, store);
    let handle = match session.find(kind, RecordKey(key)) {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            eprintln!("not found: kind={}, key={}", kind_name, key);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: find failed: {}", e);
            return 3;
        }
    };

    if let Err(e) = session.remove(handle) {
        eprintln!("Error: remove failed: {}", e);
        return 3;
    }
    if let Err(e) = session.commit() {
        eprintln!("Error: commit failed: {}", e);
        return 3;
    }

    println!("deleted: kind={}, key={}", kind_name, key);
    0
}

/// Builds a registry holding just the kind this invocation works on.
fn one_kind_registry(
    name: &str,
    strategy: KeyStrategy,
) -> Result<(KindRegistry, KindId), String> {
    if name.is_empty() {
        return Err("kind name must not be empty".to_string());
    }
    let mut registry = KindRegistry::new();
    let kind = registry
        .register(name, strategy)
        .map_err(|e| e.to_string())?;
    Ok((registry, kind))
}

/// Parses a `name=value` argument. Values are tried as null, bool, integer,
/// and real before falling back to text.
fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    let (name, raw_value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid field '{}', expected name=value", raw))?;
    if name.is_empty() {
        return Err(format!("invalid field '{}', empty name", raw));
    }

    let value = if raw_value == "null" {
        FieldValue::Null
    } else if let Ok(b) = raw_value.parse::<bool>() {
        FieldValue::Bool(b)
    } else if let Ok(i) = raw_value.parse::<i64>() {
        FieldValue::Int(i)
    } else if let Ok(r) = raw_value.parse::<f64>() {
        FieldValue::Real(r)
    } else {
        FieldValue::Text(raw_value.to_string())
    };

    Ok((name.to_string(), value))
}

/// Renders a record as pretty JSON for stdout.
fn record_json(kind_name: &str, record: &Record) -> String {
    let fields: serde_json::Map<String, serde_json::Value> = record
        .fields()
        .iter()
        .map(|(name, value)| (name.clone(), value_json(value)))
        .collect();
    let json = serde_json::json!({
        "kind": kind_name,
        "key": record.key().map(|k| k.0),
        "fields": fields,
    });
    serde_json::to_string_pretty(&json)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize record: {}\"}}", e))
}

fn value_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Null => serde_json::Value::Null,
        FieldValue::Bool(b) => serde_json::Value::from(*b),
        FieldValue::Int(i) => serde_json::Value::from(*i),
        FieldValue::Real(r) => serde_json::Value::from(*r),
        FieldValue::Text(t) => serde_json::Value::from(t.clone()),
    }
}
