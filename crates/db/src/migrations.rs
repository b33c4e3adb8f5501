use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "departments",
        "users",
        "approvers",
        "requests",
        "request_items",
        "approval_logs",
        "notifications",
    ];

    async fn table_count(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("query sqlite_master")
        .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 1, "table `{table}` should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 0, "table `{table}` should be removed");
        }
    }

    #[tokio::test]
    async fn duplicate_approved_decisions_are_rejected_by_the_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO departments (id, name, code, is_active, created_at, updated_at)
             VALUES (1, 'Finance', 'FIN', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert department");
        sqlx::query(
            "INSERT INTO users (id, role, name, email, is_active, created_at, updated_at)
             VALUES (1, 'MANAGER', 'Mia', 'mia@example.com', 1,
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert user");
        sqlx::query(
            "INSERT INTO requests (id, user_id, department_id, request_code, description,
                                   total_amount, current_approval_level, status, urgency_level,
                                   request_date, created_at, updated_at)
             VALUES (1, 1, 1, 'REQ-20260101-0001', 'test', '0', 1,
                     'PENDING_MANAGER_APPROVAL', 'MEDIUM', '2026-01-01',
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert request");

        let insert_approval = "INSERT INTO approval_logs
             (request_id, approver_user_id, approval_status, created_at)
             VALUES (1, 1, 'APPROVED', '2026-01-01T00:00:00Z')";
        sqlx::query(insert_approval).execute(&pool).await.expect("first approval");

        let error = sqlx::query(insert_approval)
            .execute(&pool)
            .await
            .expect_err("second APPROVED row for the same (request, user) must fail");
        assert!(error.to_string().contains("UNIQUE"));

        // A rejection row for the same pair is not constrained.
        sqlx::query(
            "INSERT INTO approval_logs
             (request_id, approver_user_id, approval_status, created_at)
             VALUES (1, 1, 'REJECTED', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("rejection row");
    }

    #[tokio::test]
    async fn request_items_are_removed_with_their_request() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO departments (id, name, code, is_active, created_at, updated_at)
             VALUES (1, 'Finance', 'FIN', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert department");
        sqlx::query(
            "INSERT INTO users (id, role, name, email, is_active, created_at, updated_at)
             VALUES (1, 'STAFF', 'Sari', 'sari@example.com', 1,
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert user");
        sqlx::query(
            "INSERT INTO requests (id, user_id, department_id, request_code, description,
                                   total_amount, current_approval_level, status, urgency_level,
                                   request_date, created_at, updated_at)
             VALUES (1, 1, 1, 'REQ-20260101-0001', 'test', '0', 1, 'DRAFT', 'MEDIUM',
                     '2026-01-01', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert request");
        sqlx::query(
            "INSERT INTO request_items (request_id, item_name, quantity, unit_price, total_price,
                                        category, created_at, updated_at)
             VALUES (1, 'toner', 2, '150000', '300000', 'office',
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert item");

        sqlx::query("DELETE FROM requests WHERE id = 1")
            .execute(&pool)
            .await
            .expect("delete request");

        let remaining = sqlx::query("SELECT COUNT(*) AS count FROM request_items")
            .fetch_one(&pool)
            .await
            .expect("count items")
            .get::<i64, _>("count");
        assert_eq!(remaining, 0, "items must cascade with their request");
    }
}
