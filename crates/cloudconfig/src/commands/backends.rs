//! Backends command - lists the resolved Config Servers without contacting them.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the backends command.
#[derive(Args, Debug)]
pub struct BackendsArgs {}

#[derive(Debug, Serialize)]
struct BackendOutput {
    base_url: String,
    authenticated: bool,
}

/// Run the backends command.
pub async fn run(_args: BackendsArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let backends: Vec<BackendOutput> = client
        .backends()
        .iter()
        .map(|b| BackendOutput {
            base_url: b.base_url().to_string(),
            authenticated: b.is_authenticated(),
        })
        .collect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&backends)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();

    println!();
    println!("{}", style("Config Servers").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    for (i, backend) in backends.iter().enumerate() {
        let auth = if backend.authenticated {
            green.apply_to("oauth2")
        } else {
            dim.apply_to("none")
        };
        println!(
            "  {} {}  {} {}",
            dim.apply_to(format!("{}.", i + 1)),
            backend.base_url,
            dim.apply_to("auth:"),
            auth
        );
    }
    if ctx.verbose {
        println!();
        println!("  {} {:?}", dim.apply_to("Options:"), ctx.options);
    }
    println!();

    Ok(())
}
