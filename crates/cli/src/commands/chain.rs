use crate::commands::CommandResult;
use wapprove_core::config::{AppConfig, LoadOptions};
use wapprove_core::workflow::chain::ApprovalChain;
use wapprove_db::repositories::{
    ApproverRepository, DepartmentRepository, SqlApproverRepository, SqlDepartmentRepository,
};
use wapprove_db::connect_with_settings;

pub fn run(department_code: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chain",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chain",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let department = SqlDepartmentRepository::new(pool.clone())
            .find_by_code(department_code)
            .await
            .map_err(|error| ("department_lookup", error.to_string(), 5u8))?
            .ok_or_else(|| {
                (
                    "department_lookup",
                    format!("department `{department_code}` not found"),
                    5u8,
                )
            })?;

        let approvers = SqlApproverRepository::new(pool.clone())
            .list_for_department(department.id)
            .await
            .map_err(|error| ("approver_lookup", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((department, ApprovalChain::from_approvers(&approvers)))
    });

    match result {
        Ok((department, chain)) => {
            let message = if chain.is_empty() {
                format!(
                    "{} ({}): no approver layers configured; requests route straight to purchasing",
                    department.name, department.code
                )
            } else {
                let layers: Vec<String> = chain
                    .layers()
                    .iter()
                    .map(|layer| {
                        format!("  level {}: {}", layer.approval_level, layer.approver_type)
                    })
                    .collect();
                format!("{} ({}):\n{}", department.name, department.code, layers.join("\n"))
            };
            CommandResult::success("chain", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chain", error_class, message, exit_code)
        }
    }
}
