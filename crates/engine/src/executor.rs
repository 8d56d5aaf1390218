use std::path::PathBuf;

use serde::Serialize;

use crate::{
    generate_create_statement, table_schema, ColumnDescriptor, Dataset, DbManager, EngineError,
    EngineResult, LoadConfig, Loader,
};

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Load {
        csv_path: Option<String>,
        table_name: Option<String>,
    },
    Infer {
        csv_path: String,
        table_name: Option<String>,
    },
    Schema {
        table_name: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct InferResult {
    pub status: &'static str,
    pub table: String,
    pub row_count: usize,
    pub coerced_cells: usize,
    pub columns: Vec<ColumnDescriptor>,
    pub ddl: String,
}

/// Runs one command against configuration taken from the environment.
pub fn execute_command(command: &str) -> EngineResult<String> {
    execute_command_with(LoadConfig::from_env()?, command)
}

/// Runs one command on top of `base`; command arguments override it.
pub fn execute_command_with(base: LoadConfig, command: &str) -> EngineResult<String> {
    let parsed = parse_command(command)?;
    match parsed {
        Command::Load {
            csv_path,
            table_name,
        } => {
            let config = apply_overrides(base, csv_path, table_name)?;
            let report = Loader::new(config).run()?;
            Ok(serde_json::to_string(&report)?)
        }
        Command::Infer {
            csv_path,
            table_name,
        } => {
            let config = apply_overrides(base, Some(csv_path), table_name)?;
            let target = config.target()?;
            let dataset = Dataset::read_csv(&config.source_path)?;
            let descriptors = dataset.descriptors();
            let ddl = generate_create_statement(&descriptors, &target)?;
            let result = InferResult {
                status: "ok",
                table: target.to_string(),
                row_count: dataset.row_count(),
                coerced_cells: dataset.coerced_cells(),
                columns: descriptors,
                ddl,
            };
            Ok(serde_json::to_string(&result)?)
        }
        Command::Schema { table_name } => {
            let config = apply_overrides(base, None, table_name)?;
            let target = config.target()?;
            let db = DbManager::connect_with_retry(
                &config.database,
                config.connect_attempts,
                config.connect_delay,
            )?;
            let schema = table_schema(db.connection(), &target)?;
            Ok(serde_json::to_string(&schema)?)
        }
    }
}

fn apply_overrides(
    base: LoadConfig,
    csv_path: Option<String>,
    table_name: Option<String>,
) -> EngineResult<LoadConfig> {
    let mut config = base;
    if let Some(path) = csv_path {
        config = config.with_source_path(PathBuf::from(path));
    }
    if let Some(table) = table_name {
        config = config.with_target(&table)?;
    }
    Ok(config)
}

fn parse_command(command: &str) -> EngineResult<Command> {
    let tokens = tokenize(command)?;
    let Some(name) = tokens.first().map(String::as_str) else {
        return Err(EngineError::InvalidInput("Command cannot be empty".into()));
    };

    match name {
        "load" => parse_load(&tokens),
        "infer" => parse_infer(&tokens),
        "schema" => parse_schema(&tokens),
        _ => Err(EngineError::InvalidInput(format!("Unknown command: {name}"))),
    }
}

fn parse_load(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() > 3 {
        return Err(EngineError::InvalidInput(
            "Usage: load [csv_path] [table_name]".into(),
        ));
    }
    Ok(Command::Load {
        csv_path: tokens.get(1).cloned(),
        table_name: tokens.get(2).cloned(),
    })
}

fn parse_infer(tokens: &[String]) -> EngineResult<Command> {
    if !(tokens.len() == 2 || tokens.len() == 3) {
        return Err(EngineError::InvalidInput(
            "Usage: infer <csv_path> [table_name]".into(),
        ));
    }
    Ok(Command::Infer {
        csv_path: tokens[1].clone(),
        table_name: tokens.get(2).cloned(),
    })
}

fn parse_schema(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() > 2 {
        return Err(EngineError::InvalidInput(
            "Usage: schema [table_name]".into(),
        ));
    }
    Ok(Command::Schema {
        table_name: tokens.get(1).cloned(),
    })
}

/// Splits on whitespace outside quotes. Inside double quotes `\"` and `\\`
/// stand for a literal quote and backslash; single quotes take everything
/// up to the next `'` verbatim.
fn tokenize(command: &str) -> EngineResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(ch) = chars.next() {
        match in_quote {
            Some('"') if ch == '\\' && matches!(chars.peek(), Some('"' | '\\')) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(quote) => {
                if ch == quote {
                    in_quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    in_quote = Some(ch);
                } else if ch.is_whitespace() {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(ch);
                }
            }
        }
    }

    if in_quote.is_some() {
        return Err(EngineError::InvalidInput("Unterminated quoted string".into()));
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
