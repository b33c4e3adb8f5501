//! Deterministic demo dataset for local bootstrap and tests: three
//! departments exercising the three chain shapes (two-layer, quorum pair,
//! empty), plus one user per role. Seeding is idempotent — existing rows
//! are matched by department code and user email.

use wapprove_core::domain::approver::{ApproverType, NewApprover};
use wapprove_core::domain::department::{Department, NewDepartment};
use wapprove_core::domain::user::{NewUser, User, UserRole};

use crate::repositories::{
    ApproverRepository, DepartmentRepository, RepositoryError, SqlApproverRepository,
    SqlDepartmentRepository, SqlUserRepository, UserRepository,
};
use crate::DbPool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub departments_created: u32,
    pub users_created: u32,
    pub approvers_created: u32,
}

pub async fn seed(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let departments = SqlDepartmentRepository::new(pool.clone());
    let users = SqlUserRepository::new(pool.clone());
    let approvers = SqlApproverRepository::new(pool.clone());
    let mut summary = SeedSummary::default();

    // FIN: manager at level 1, director at level 2.
    let fin = ensure_department(&departments, "FIN", "Finance", Some(2), &mut summary).await?;
    // OPS: two managers sharing level 1 (a quorum pair).
    let ops = ensure_department(&departments, "OPS", "Operations", Some(1), &mut summary).await?;
    // GA: no approvers; requests route straight to purchasing.
    ensure_department(&departments, "GA", "General Affairs", None, &mut summary).await?;

    ensure_user(
        &users,
        NewUser {
            role: UserRole::Admin,
            name: "Ayu Admin".to_string(),
            email: "admin@wapprove.local".to_string(),
            phone_number: Some("+628110000001".to_string()),
            department_id: None,
        },
        &mut summary,
    )
    .await?;
    ensure_user(
        &users,
        NewUser {
            role: UserRole::Purchasing,
            name: "Putra Purchasing".to_string(),
            email: "purchasing@wapprove.local".to_string(),
            phone_number: Some("+628110000002".to_string()),
            department_id: None,
        },
        &mut summary,
    )
    .await?;
    ensure_user(
        &users,
        NewUser {
            role: UserRole::Staff,
            name: "Sari Staff".to_string(),
            email: "staff.fin@wapprove.local".to_string(),
            phone_number: Some("+628110000003".to_string()),
            department_id: Some(fin.id),
        },
        &mut summary,
    )
    .await?;
    let fin_manager = ensure_user(
        &users,
        NewUser {
            role: UserRole::Manager,
            name: "Mia Manager".to_string(),
            email: "manager.fin@wapprove.local".to_string(),
            phone_number: Some("+628110000004".to_string()),
            department_id: Some(fin.id),
        },
        &mut summary,
    )
    .await?;
    let director = ensure_user(
        &users,
        NewUser {
            role: UserRole::Director,
            name: "Dewi Director".to_string(),
            email: "director@wapprove.local".to_string(),
            phone_number: Some("+628110000005".to_string()),
            department_id: None,
        },
        &mut summary,
    )
    .await?;
    let ops_manager_one = ensure_user(
        &users,
        NewUser {
            role: UserRole::Manager,
            name: "Oki Manager".to_string(),
            email: "manager.ops.1@wapprove.local".to_string(),
            phone_number: Some("+628110000006".to_string()),
            department_id: Some(ops.id),
        },
        &mut summary,
    )
    .await?;
    let ops_manager_two = ensure_user(
        &users,
        NewUser {
            role: UserRole::Manager,
            name: "Rina Manager".to_string(),
            email: "manager.ops.2@wapprove.local".to_string(),
            phone_number: Some("+628110000007".to_string()),
            department_id: Some(ops.id),
        },
        &mut summary,
    )
    .await?;

    ensure_approver(
        &approvers,
        NewApprover {
            user_id: fin_manager.id,
            department_id: fin.id,
            approver_type: ApproverType::Manager,
            approval_level: 1,
        },
        &mut summary,
    )
    .await?;
    ensure_approver(
        &approvers,
        NewApprover {
            user_id: director.id,
            department_id: fin.id,
            approver_type: ApproverType::Director,
            approval_level: 2,
        },
        &mut summary,
    )
    .await?;
    ensure_approver(
        &approvers,
        NewApprover {
            user_id: ops_manager_one.id,
            department_id: ops.id,
            approver_type: ApproverType::Manager,
            approval_level: 1,
        },
        &mut summary,
    )
    .await?;
    ensure_approver(
        &approvers,
        NewApprover {
            user_id: ops_manager_two.id,
            department_id: ops.id,
            approver_type: ApproverType::Manager,
            approval_level: 1,
        },
        &mut summary,
    )
    .await?;

    Ok(summary)
}

async fn ensure_department(
    departments: &SqlDepartmentRepository,
    code: &str,
    name: &str,
    approval_layers: Option<i64>,
    summary: &mut SeedSummary,
) -> Result<Department, RepositoryError> {
    if let Some(existing) = departments.find_by_code(code).await? {
        return Ok(existing);
    }
    summary.departments_created += 1;
    departments
        .insert(NewDepartment { name: name.to_string(), code: code.to_string(), approval_layers })
        .await
}

async fn ensure_user(
    users: &SqlUserRepository,
    new_user: NewUser,
    summary: &mut SeedSummary,
) -> Result<User, RepositoryError> {
    if let Some(existing) = users.find_by_email(&new_user.email).await? {
        return Ok(existing);
    }
    summary.users_created += 1;
    users.insert(new_user).await
}

async fn ensure_approver(
    approvers: &SqlApproverRepository,
    new_approver: NewApprover,
    summary: &mut SeedSummary,
) -> Result<(), RepositoryError> {
    match approvers.insert(new_approver).await {
        Ok(_) => {
            summary.approvers_created += 1;
            Ok(())
        }
        Err(RepositoryError::UniqueViolation(_)) => Ok(()),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::{seed, SeedSummary};
    use crate::repositories::{DepartmentRepository, SqlDepartmentRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = seed(&pool).await.expect("first seed");
        assert_eq!(first.departments_created, 3);
        assert_eq!(first.users_created, 7);
        assert_eq!(first.approvers_created, 4);

        let second = seed(&pool).await.expect("second seed");
        assert_eq!(second, SeedSummary::default());

        let departments = SqlDepartmentRepository::new(pool);
        for code in ["FIN", "OPS", "GA"] {
            assert!(
                departments.find_by_code(code).await.expect("find").is_some(),
                "department `{code}` should exist after seeding"
            );
        }
    }
}
