use std::env;
use std::io::{self, Read};

mod commands;
mod logging;

use csvload_engine::execute_command;
use tracing::warn;

fn main() {
    // Read `.env` before logging starts so it can set RUST_LOG; report problems after.
    let dotenv = dotenvy::dotenv();
    let log_guard = logging::init();
    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "ignoring unreadable .env file");
        }
    }

    let result = run();
    // Flush file logs before exiting; process::exit skips destructors.
    drop(log_guard);
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = env::args().skip(1).collect::<Vec<String>>();
    if args.is_empty() && !stdin_is_terminal() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        args = input.split_whitespace().map(str::to_string).collect();
    }

    if args.is_empty() || commands::help::is_help_request(&args) {
        commands::help::print_help();
        return Ok(());
    }

    if !matches!(args[0].as_str(), "load" | "infer" | "schema") {
        commands::help::print_help();
        return Ok(());
    }

    let command = serialize_command(&args);
    let output = execute_command(&command)?;
    println!("{output}");

    Ok(())
}

fn stdin_is_terminal() -> bool {
    use std::io::IsTerminal;
    io::stdin().is_terminal()
}

/// Joins argv into one command line that the engine tokenizer splits back
/// into the same arguments.
fn serialize_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            let needs_quotes = arg.is_empty()
                || arg
                    .chars()
                    .any(|ch| ch.is_whitespace() || matches!(ch, '"' | '\'' | '\\'));
            if needs_quotes {
                format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::serialize_command;
    use csvload_engine::{execute_command_with, LoadConfig};
    use std::fs;
    use std::time::Duration;

    #[test]
    fn quotes_arguments_with_spaces() {
        let args = vec![
            "load".to_string(),
            "./my data/sales.csv".to_string(),
            "sales".to_string(),
        ];
        assert_eq!(serialize_command(&args), "load \"./my data/sales.csv\" sales");
    }

    #[test]
    fn quotes_arguments_with_quote_characters() {
        let args = vec!["infer".to_string(), "/data/o'brien \"x\".csv".to_string()];
        assert_eq!(
            serialize_command(&args),
            "infer \"/data/o'brien \\\"x\\\".csv\""
        );
    }

    #[test]
    fn serialized_paths_reach_the_engine_intact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("o'brien \"q\" dir\\sub");
        fs::create_dir_all(&nested).expect("create dir");
        let csv_path = nested.join("o'brien.csv");
        fs::write(&csv_path, "Owner,Price\nA Corp,1\n").expect("write csv");

        let args = vec![
            "infer".to_string(),
            csv_path.display().to_string(),
            "owners".to_string(),
        ];
        let config = LoadConfig {
            database: dir.path().join("cli_test.duckdb"),
            connect_attempts: 1,
            connect_delay: Duration::ZERO,
            ..LoadConfig::default()
        };
        let output = execute_command_with(config, &serialize_command(&args)).expect("infer");
        assert!(output.contains("\"table\":\"main.owners\""), "{output}");
        assert!(output.contains("\"row_count\":1"), "{output}");
    }
}
