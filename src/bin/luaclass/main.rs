//! `luaclass` - run Lua with the class model and library extensions installed.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use luaclass::{EngineConfig, LuaScripting, ScriptError};

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "luaclass", version, about = "Lua with classes")]
struct Cli {
    /// JSON engine configuration
    #[arg(long, global = true, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the given code
    Run {
        #[arg(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
        code: Vec<String>,
    },
    /// Run a script file
    File { path: PathBuf },
    /// Run the configured test script, if there is one
    Test,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::from_path(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: {}", err);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    logging::init(&config.log, cli.format);

    let engine = match LuaScripting::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Run { code } => engine.execute_source(&code.join(" ")).await,
        Command::File { path } => engine.execute_file(path).await,
        Command::Test => run_test_script(&engine).await,
    };
    report(result)
}

async fn run_test_script(engine: &LuaScripting) -> Result<Vec<String>, ScriptError> {
    let dir = &engine.config().script_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ScriptError::Io {
            path: dir.clone(),
            source,
        })?;

    let path = engine.config().test_script_path();
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "no test script");
        return Ok(Vec::new());
    }
    engine.execute_file(path).await
}

fn report(result: Result<Vec<String>, ScriptError>) -> ExitCode {
    match result {
        Ok(values) => {
            tracing::info!("Lua result: {}", values.join(" "));
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.traceback() {
                Some(traceback) => tracing::error!("{}\n{}", err, traceback),
                None => tracing::error!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}
