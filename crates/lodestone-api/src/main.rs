//! Command line front end: resolves one API path against a world directory
//! and prints the response, JSON to stdout or binary bytes raw.

use clap::Parser;
use lodestone_api::{ApiContext, ApiTree, AssetTables, Config, Response, StaticDirectory};
use log::error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "lodestone", about = "Serve Minecraft world data as JSON")]
struct Args {
    /// Configuration file.
    #[arg(long, default_value = "lodestone.toml")]
    config: PathBuf,

    /// Identity presented for member-only endpoints.
    #[arg(long)]
    identity: Option<String>,

    /// Request path, e.g. world/wurstmineberg/dim/overworld/chunk/0/4/0.json
    path: String,
}

fn run(args: &Args) -> lodestone_common::Result<()> {
    let config = Config::load(&args.config)?;
    let context = ApiContext {
        directory: Box::new(StaticDirectory::from_config(&config)),
        tables: AssetTables::load(&config.assets_dir)?,
    };
    let tree = ApiTree::new();
    match tree.dispatch(&context, &args.path, args.identity.as_deref())? {
        Response::Json(value) => {
            let rendered = serde_json::to_string_pretty(&value)
                .map_err(|err| lodestone_common::LodestoneError::FormatError(err.to_string()))?;
            println!("{}", rendered);
        }
        Response::Binary { body, .. } => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{} (status {})", err, err.status());
            eprintln!("error {}: {}", err.status(), err);
            ExitCode::FAILURE
        }
    }
}
