//! Config subcommand handlers.

use std::fmt::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, available_profiles};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &gsm_config::Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "poll_interval = {}", cfg.defaults.poll_interval);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "address = \"{}\"", p.address);
        let _ = writeln!(out, "port = {}", p.port);
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref dir) = p.save_dir {
            let _ = writeln!(out, "save_dir = \"{}\"", dir.display());
        }
        if let Some(ref ext) = p.profile_extension {
            let _ = writeln!(out, "profile_extension = \"{ext}\"");
        }
        if let Some(ref query) = p.roster_query {
            let _ = writeln!(out, "roster_query = \"{query}\"");
        }
        if let Some(interval) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {interval}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
        }

        ConfigCommand::Show => {
            let cfg = config::load()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
        }

        ConfigCommand::Profiles => {
            let cfg = config::load()?;
            let active = cfg.active_profile_name(global.profile.as_deref());
            let listing = if cfg.profiles.is_empty() {
                available_profiles(&cfg)
            } else {
                cfg.profiles
                    .iter()
                    .map(|(name, p)| {
                        let marker = if *name == active { "*" } else { " " };
                        format!("{marker} {name}\t{}:{}", p.address, p.port)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            output::print_output(&listing, global.quiet);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redacted_output_hides_plaintext_password() {
        let cfg: gsm_config::Config = toml::from_str(
            "[profiles.island]\naddress = \"10.0.0.5\"\npassword = \"hunter2\"\n",
        )
        .unwrap();
        let out = format_config_redacted(&cfg);
        assert!(out.contains("[profiles.island]"));
        assert!(out.contains("password = \"****\""));
        assert!(!out.contains("hunter2"));
    }
}
