//! Operation dispatch
//!
//! One invocation runs exactly one operation. The selector string is
//! validated here, as is the run-tests deployment URL requirement, so
//! no remote call happens for a misconfigured run.

mod deploy;
mod environment;
mod teardown;

pub use deploy::run_deployment_tests;
pub use environment::create_environment;
pub use teardown::delete_environment;

use crate::error::{Error, Result};
use crate::log::ActionLog;
use crate::qawolf::QaWolfApi;
use crate::types::{Operation, OperationContext, OperationOutput};

/// Run one operation against the platform.
pub async fn handle_operation(
    operation: &str,
    ctx: &OperationContext,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<OperationOutput> {
    match operation.parse::<Operation>()? {
        Operation::CreateEnvironment => {
            let environment_id = create_environment(ctx, api, log).await?;
            Ok(OperationOutput {
                environment_id: Some(environment_id),
            })
        }
        Operation::DeleteEnvironment => {
            delete_environment(ctx, api, log).await?;
            Ok(OperationOutput::default())
        }
        Operation::RunTests => {
            let deployment_url = ctx
                .deployment_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| Error::Config("missing deployment url".to_string()))?;
            run_deployment_tests(ctx, deployment_url, api, log).await?;
            Ok(OperationOutput::default())
        }
    }
}
