//! Device identity: show the active one, or replace the stored one.

use serde::Serialize;

use crate::cli::{GlobalOpts, IdentityArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct IdentityView {
    device_id: String,
    source: String,
}

pub fn handle(args: &IdentityArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let fixed = global.device_id.is_some() || config.device_id.is_some();

    let view = if args.reset {
        if fixed {
            return Err(CliError::Validation {
                field: "reset".into(),
                reason: "the identity is fixed by --device-id or device_id in the config".into(),
            });
        }
        let file = config::identity_file(config)?;
        let identity = file.regenerate()?;
        IdentityView {
            device_id: identity.to_string(),
            source: file.path().display().to_string(),
        }
    } else {
        let identity = config::identity_provider(config, global)?.identity()?;
        let source = if fixed {
            "fixed".to_owned()
        } else {
            config::identity_file(config)?.path().display().to_string()
        };
        IdentityView {
            device_id: identity.to_string(),
            source,
        }
    };

    let out = output::render_single(
        global.output,
        &view,
        |v| {
            vec![
                ("Device", v.device_id.clone()),
                ("Source", v.source.clone()),
            ]
        },
        |v| v.device_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
