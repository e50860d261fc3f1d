//! `nukio callbacks`: manage the bridge's callback list directly.

use tabled::Tabled;

use nukio_api::Callback;
use nukio_core::Hub;

use crate::cli::{CallbacksArgs, CallbacksCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CallbackRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "URL")]
    url: String,
}

fn row(c: &Callback) -> CallbackRow {
    CallbackRow {
        id: c.id,
        url: c.url.clone(),
    }
}

pub async fn handle(hub: &Hub, args: CallbacksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let bridge = hub.bridge();
    match args.command {
        CallbacksCommand::List => {
            let callbacks = bridge.list_callbacks().await?;
            let out = output::render_list(
                global.output,
                &callbacks,
                row,
                |c| format!("{}\t{}", c.id, c.url),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CallbacksCommand::Add { url } => {
            let parsed = url::Url::parse(&url).map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            })?;
            bridge.add_callback(parsed.as_str()).await?;
            if !global.quiet {
                eprintln!("Callback registered: {parsed}");
            }
            Ok(())
        }

        CallbacksCommand::Remove { id } => {
            bridge.remove_callback(id).await?;
            if !global.quiet {
                eprintln!("Callback {id} removed");
            }
            Ok(())
        }
    }
}
