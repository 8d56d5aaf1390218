pub fn is_help_request(args: &[String]) -> bool {
    matches!(
        args.first().map(String::as_str),
        Some("help" | "-h" | "--help")
    )
}

pub fn print_help() {
    println!("csvload - load a CSV file into a DuckDB table (create if absent, append otherwise)");
    println!();
    println!("usage:");
    println!("  csvload load [csv_path] [[schema.]table]");
    println!("  csvload infer <csv_path> [[schema.]table]");
    println!("  csvload schema [[schema.]table]");
    println!("  csvload help");
    println!();
    println!("environment (a .env file is read first):");
    println!("  CSVLOAD_DATABASE            DuckDB file (default csvload.duckdb)");
    println!("  CSVLOAD_SCHEMA              target schema (default main)");
    println!("  CSVLOAD_TABLE               target table (default nashville_housing)");
    println!("  CSV_PATH                    input file (default data/nashville_housing.csv)");
    println!("  CSVLOAD_CONNECT_ATTEMPTS    connection attempts (default 20)");
    println!("  CSVLOAD_CONNECT_DELAY_SECS  seconds between attempts (default 3)");
    println!("  CSVLOAD_LOG_DIR             also write daily log files here");
    println!("  RUST_LOG                    log filter (default info)");
    println!();
    println!("example:");
    println!("  csvload load ./data/sales.csv staging.sales");
}
