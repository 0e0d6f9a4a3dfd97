use std::env;
use std::io;
use std::process;

use anyhow::{bail, Context, Result};
use log::debug;

/// Environment variable holding the `env_logger` filter.
const LOG_ENV: &str = "GREP_LOG";

// Usage: echo <input_text> | grep-lite -E <pattern>
fn main() {
    process::exit(match fallible_main() {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("grep-lite: {:#}", e);
            1
        }
    });
}

fn fallible_main() -> Result<bool> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "off"))
        .try_init()
        .context("failed to install logger")?;

    let mut args = env::args().skip(1);
    if args.next().as_deref() != Some("-E") {
        bail!("Expected first argument to be '-E'");
    }
    let Some(pattern) = args.next() else {
        bail!("Expected a pattern after '-E'");
    };

    let mut input_line = String::new();
    io::stdin()
        .read_line(&mut input_line)
        .context("failed to read input line")?;

    // Trim the line terminator so '$' sees the real end of input
    let trimmed_input = input_line.trim_end_matches(['\n', '\r']);

    let pattern = grep_lite::compile(&pattern).with_context(|| format!("invalid pattern {:?}", pattern))?;
    let matched = pattern.is_match(trimmed_input);
    debug!("match result: {}", matched);
    Ok(matched)
}
