//! File command - fetches a plain file served by the Config Server.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the file command.
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Directory within the config repository
    pub directory: String,

    /// File name (.yml/.yaml files are read as YAML, anything else as JSON)
    pub file: String,

    /// Read from this branch instead of the default one
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Print the file as-is instead of decoding it
    #[arg(long)]
    pub raw: bool,
}

/// Run the file command.
pub async fn run(args: FileArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let location = match &args.branch {
        Some(branch) => format!("{}/{} on branch '{}'", args.directory, args.file, branch),
        None => format!("{}/{}", args.directory, args.file),
    };

    if args.raw {
        let body = match &args.branch {
            Some(branch) => {
                client
                    .get_raw_file_from_branch(branch, &args.directory, &args.file)
                    .await
            }
            None => client.get_raw_file(&args.directory, &args.file).await,
        }
        .with_context(|| format!("failed to load {}", location))?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&body)?;
        stdout.flush()?;
        return Ok(());
    }

    let value: serde_json::Value = match &args.branch {
        Some(branch) => {
            client
                .get_file_from_branch(branch, &args.directory, &args.file)
                .await
        }
        None => client.get_file(&args.directory, &args.file).await,
    }
    .with_context(|| format!("failed to load {}", location))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    Ok(())
}
