//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = config::resolve_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?.redacted();
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Validate => {
            let path = config::resolve_path(global);
            let cfg = config::load(global)?;
            cfg.validate()?;
            nukio_config::resolve_api_token(&cfg.bridge)?;

            output::print_output(
                &format!("{}: ok, {} lock(s)", path.display(), cfg.locks.len()),
                global.quiet,
            );
            Ok(())
        }
    }
}
