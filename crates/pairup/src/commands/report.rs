//! Report and karma command handlers.

use pairup_core::{
    ChatCompletion, CoreError, KarmaStatus, PairupClient, ReportReason, ReportReceipt,
};

use crate::cli::{GlobalOpts, ReportArgs};
use crate::error::CliError;
use crate::output;

pub async fn report(
    client: &PairupClient,
    args: ReportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.device_id == client.identity().as_str() {
        return Err(CliError::Validation {
            field: "device_id".into(),
            reason: "you cannot report yourself".into(),
        });
    }

    let receipt = client
        .api()
        .submit_report(&args.device_id, ReportReason::from(args.reason), &args.details)
        .await
        .map_err(CoreError::from)?;

    let out = output::render_single(
        global.output,
        &receipt,
        |r: &ReportReceipt| {
            vec![
                ("Report", r.id.to_string()),
                ("Status", r.status.clone()),
                ("Message", output::or_dash(Some(&r.message))),
            ]
        },
        |r| r.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn karma(client: &PairupClient, global: &GlobalOpts) -> Result<(), CliError> {
    let status = client.api().karma().await.map_err(CoreError::from)?;

    let out = output::render_single(
        global.output,
        &status,
        |k: &KarmaStatus| {
            let mut access = k.access_level.to_string();
            if k.access_level.is_restricted() {
                access.push_str(" (restricted)");
            }
            vec![
                ("Device", k.device_id.clone()),
                ("Karma", k.karma_score.to_string()),
                ("Access", access),
            ]
        },
        |k| k.karma_score.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn complete(client: &PairupClient, global: &GlobalOpts) -> Result<(), CliError> {
    let completion = client.api().complete_chat().await.map_err(CoreError::from)?;

    let out = output::render_single(
        global.output,
        &completion,
        |c: &ChatCompletion| {
            vec![
                ("Success", c.success.to_string()),
                ("Karma", c.new_karma.to_string()),
                ("Message", output::or_dash(Some(&c.message))),
            ]
        },
        |c| c.new_karma.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
