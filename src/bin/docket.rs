use docket::config::{self, Config};
use docket::core::db::format_value;
use docket::{Command, CommandRunner, DocketError, Result};
use rusqlite::types::Value;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str =
    "usage: docket [--config FILE] <database> <exec|scalar|json|tables|documents|functions> [SQL]";

/// Parsed command-line invocation.
#[derive(Debug)]
struct Invocation {
    config: Config,
    action: String,
    sql: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut rest = args;
    let mut config_file = None;
    if rest.first().map(String::as_str) == Some("--config") {
        let path = rest
            .get(1)
            .ok_or_else(|| DocketError::Command("--config needs a file".to_string()))?;
        config_file = Some(path.clone());
        rest = &rest[2..];
    }

    let (database, action, sql) = match rest {
        [database, action] => (database, action, None),
        [database, action, sql] => (database, action, Some(sql.clone())),
        _ => return Err(DocketError::Command(USAGE.to_string())),
    };

    let mut config = match config_file {
        Some(path) => config::load_config(path)?,
        None => Config::for_database(database.clone()),
    };
    config.database.path = database.clone();

    Ok(Invocation {
        config,
        action: action.clone(),
        sql,
    })
}

fn required_sql(invocation: &Invocation) -> Result<&str> {
    invocation
        .sql
        .as_deref()
        .ok_or_else(|| {
            DocketError::Command(format!("'{}' needs a SQL argument", invocation.action))
        })
}

fn run(invocation: &Invocation) -> Result<Vec<String>> {
    let runner = CommandRunner::from_config(&invocation.config);
    match invocation.action.as_str() {
        "exec" => {
            let affected = runner.execute(required_sql(invocation)?)?;
            Ok(vec![format!("{} row(s) affected", affected)])
        }
        "scalar" => {
            let value: Value = runner.query_scalar(required_sql(invocation)?)?;
            Ok(vec![format_value((&value).into())])
        }
        "json" => runner.query_json(&Command::new(required_sql(invocation)?)),
        "tables" => runner.schema_table_names(),
        "documents" => runner.document_tables(),
        "functions" => runner.schema_function_names(),
        other => Err(DocketError::Command(format!("unknown command '{}'\n{}", other, USAGE))),
    }
}

fn main() -> ExitCode {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    info!("Running '{}' against {}", invocation.action, invocation.config.database.path);
    match run(&invocation) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
