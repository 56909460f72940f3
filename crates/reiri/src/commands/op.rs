//! `reiri op`: send a raw operate table and print the controller's reply.

use reiri_core::{Command, Controller, ControllerConfig};

use crate::cli::{GlobalOpts, OpArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    config: ControllerConfig,
    args: OpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let table = match (args.json, args.from_file) {
        (Some(json), _) => util::parse_point_table(&json, "json")?,
        (None, Some(path)) => util::read_point_table(&path)?,
        (None, None) => {
            return Err(CliError::Validation {
                field: "json".into(),
                reason: "pass an operate table or --from-file".into(),
            });
        }
    };

    let reply = Controller::oneshot(config, |c| async move {
        c.execute(Command::Raw(table)).await
    })
    .await?;

    let out = output::render_single(
        &global.output,
        &reply,
        serde_json::Value::to_string,
        serde_json::Value::to_string,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
