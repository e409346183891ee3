//! Replay a board script and print the final state as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a MoodSync board script")]
struct Args {
    /// Path to the JSON script.
    script: PathBuf,

    /// Print the report on a single line.
    #[arg(long)]
    compact: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    log::info!("Replaying {}", args.script.display());

    let result = std::fs::read_to_string(&args.script)
        .map_err(moodsync_replay::ReplayError::from)
        .and_then(|json| moodsync_replay::Script::from_json(&json))
        .and_then(|script| pollster::block_on(moodsync_replay::run(script)))
        .and_then(|report| {
            let json = if args.compact {
                serde_json::to_string(&report)
            } else {
                serde_json::to_string_pretty(&report)
            };
            json.map_err(Into::into)
        });

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Replay failed: {err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
