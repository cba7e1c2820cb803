//! `gsm exec`: one command, one reply.

use tracing::debug;

use crate::cli::{ExecArgs, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ExecArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.join(" ");
    let session = super::open_session(target);

    debug!(%command, endpoint = %target.profile.params.endpoint(), "executing");
    let outcome = session.execute(command).await;
    session.shutdown().await;
    let result = outcome?;

    let rendered = output::render_single(global.output, &result, |r| r.lines.join("\n"))?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
