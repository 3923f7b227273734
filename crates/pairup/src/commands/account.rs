//! Account command handlers: register, me, profile, verify.

use pairup_core::{CoreError, PairupClient, UserProfile, VerificationResult};

use crate::cli::{GlobalOpts, ProfileArgs, VerifyArgs};
use crate::error::CliError;
use crate::output;

fn profile_fields(p: &UserProfile) -> Vec<(&'static str, String)> {
    vec![
        ("Device", p.device_id.clone()),
        ("Nickname", output::or_dash(p.nickname.as_deref())),
        ("Bio", output::or_dash(p.bio.as_deref())),
        ("Gender", output::or_dash(p.gender.as_deref())),
        ("Verified", p.is_verified.to_string()),
        ("Karma", p.karma_score.to_string()),
        ("Access", p.access_level.to_string()),
        ("Matches left", p.daily_matches_remaining.to_string()),
    ]
}

fn print_profile(profile: &UserProfile, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, profile, profile_fields, |p| {
        p.device_id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn register(client: &PairupClient, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = client.api().register().await.map_err(CoreError::from)?;
    print_profile(&profile, global)
}

pub async fn me(client: &PairupClient, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = client.api().me().await.map_err(CoreError::from)?;
    print_profile(&profile, global)
}

pub async fn profile(
    client: &PairupClient,
    args: ProfileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.nickname.trim().is_empty() {
        return Err(CliError::Validation {
            field: "nickname".into(),
            reason: "must not be empty".into(),
        });
    }
    let profile = client
        .api()
        .update_profile(&args.nickname, &args.bio)
        .await
        .map_err(CoreError::from)?;
    print_profile(&profile, global)
}

pub async fn verify(
    client: &PairupClient,
    args: VerifyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let file_name = args
        .image
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::Validation {
            field: "image".into(),
            reason: format!("{} is not a file path", args.image.display()),
        })?
        .to_owned();
    let image = tokio::fs::read(&args.image).await?;

    let result = client
        .api()
        .verify_gender(image, &file_name)
        .await
        .map_err(CoreError::from)?;

    let out = output::render_single(
        global.output,
        &result,
        |r: &VerificationResult| {
            vec![
                ("Success", r.success.to_string()),
                ("Gender", output::or_dash(r.gender.as_deref())),
                ("Message", output::or_dash(Some(&r.message))),
            ]
        },
        |r| r.success.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
