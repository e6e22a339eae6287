use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

use cmdtree::EXIT_INTERNAL;
use cmdtree_example::{builder, commands_dir};

/// The level the standard root flags ask for: `-v`/`--verbose` means debug,
/// otherwise the last `--log_level` given. Scanning stops at `--`.
fn requested_level(args: &[OsString]) -> Option<String> {
    let mut level = None;
    let mut verbose = false;
    let mut args = args.iter().skip(1).filter_map(|a| a.to_str());
    while let Some(arg) = args.next() {
        match arg {
            "--" => break,
            "-v" | "--verbose" => verbose = true,
            "--log_level" | "--log-level" => level = args.next().map(str::to_ascii_lowercase),
            _ => {
                if let Some(value) = arg
                    .strip_prefix("--log_level=")
                    .or_else(|| arg.strip_prefix("--log-level="))
                {
                    level = Some(value.to_ascii_lowercase());
                }
            }
        }
    }
    if verbose {
        Some("debug".to_string())
    } else {
        level
    }
}

/// Without a flag, `RUST_LOG` applies and falls back to warnings only.
fn init_tracing(args: &[OsString]) {
    let filter = requested_level(args)
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    init_tracing(&args);

    let commands = std::env::var_os("NOTES_COMMANDS").map_or_else(commands_dir, Into::into);
    let mut app = match builder(commands).build() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_INTERNAL);
        }
    };
    std::process::exit(app.run(args));
}
