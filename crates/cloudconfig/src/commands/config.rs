//! Config command - fetches an application's configuration.

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Application name
    pub application: String,

    /// Profile to activate (repeatable; defaults to "default")
    #[arg(short, long = "profile", value_name = "PROFILE")]
    pub profiles: Vec<String>,

    /// Print only this property (first property source wins)
    #[arg(long, value_name = "KEY")]
    pub property: Option<String>,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let configuration = client
        .get_configuration(&args.application, args.profiles.as_slice())
        .await
        .with_context(|| format!("failed to load configuration for '{}'", args.application))?;

    if let Some(key) = &args.property {
        let value = configuration
            .property(key)
            .with_context(|| format!("property '{}' not found", key))?;
        match value {
            serde_json::Value::String(s) if !ctx.json_output => println!("{}", s),
            other => println!("{}", serde_json::to_string_pretty(other)?),
        }
        return Ok(());
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&configuration)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let cyan = Style::new().cyan();

    println!();
    println!("{}", style(&configuration.name).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    let profiles = configuration.profiles.join(", ");
    println!("  {} {}", dim.apply_to("Profiles:"), profiles);
    if let Some(label) = &configuration.label {
        println!("  {} {}", dim.apply_to("Label:"), label);
    }
    if let Some(version) = &configuration.version {
        println!("  {} {}", dim.apply_to("Version:"), version);
    }

    configuration.handle_property_sources(|source| {
        println!();
        println!("  {}", cyan.apply_to(&source.name));
        let mut keys: Vec<_> = source.source.keys().collect();
        keys.sort();
        for key in keys {
            println!("    {} = {}", key, source.source[key.as_str()]);
        }
    });
    println!();

    Ok(())
}
