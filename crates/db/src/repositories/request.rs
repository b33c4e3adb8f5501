use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use wapprove_core::domain::department::DepartmentId;
use wapprove_core::domain::request::{
    DraftUpdate, NewRequest, Request, RequestId, RequestItem, RequestStatus, UrgencyLevel,
};
use wapprove_core::domain::user::UserId;
use wapprove_core::visibility::VisibilityFilter;

use super::{
    decode_err, parse_date, parse_datetime, parse_decimal, parse_status, parse_urgency,
    RepositoryError, RequestRepository,
};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestListFilter {
    pub status: Option<RequestStatus>,
    pub department_id: Option<DepartmentId>,
    pub user_id: Option<UserId>,
    pub urgency_level: Option<UrgencyLevel>,
    pub current_approval_level: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Free-text match over request code and description.
    pub query: Option<String>,
    pub sort_by: RequestSortBy,
    pub sort_order: SortOrder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestSortBy {
    #[default]
    CreatedAt,
    RequestDate,
    TotalAmount,
    RequestCode,
}

impl RequestSortBy {
    fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::RequestDate => "request_date",
            Self::TotalAmount => "total_amount",
            Self::RequestCode => "request_code",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ListMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

const SELECT_COLUMNS: &str = "id, user_id, department_id, request_code, description, status_note, \
     total_amount, current_approval_level, status, urgency_level, request_date, created_at, \
     updated_at";

const ITEM_COLUMNS: &str = "id, request_id, item_name, quantity, unit_price, total_price, \
     category, requested_delivery_date, created_at, updated_at";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<Request, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let user_id: i64 = row.try_get("user_id").map_err(decode_err)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode_err)?;
    let request_code: String = row.try_get("request_code").map_err(decode_err)?;
    let description: String = row.try_get("description").map_err(decode_err)?;
    let status_note: Option<String> = row.try_get("status_note").map_err(decode_err)?;
    let total_amount: String = row.try_get("total_amount").map_err(decode_err)?;
    let current_approval_level: i64 =
        row.try_get("current_approval_level").map_err(decode_err)?;
    let status_str: String = row.try_get("status").map_err(decode_err)?;
    let urgency_str: String = row.try_get("urgency_level").map_err(decode_err)?;
    let request_date: String = row.try_get("request_date").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(Request {
        id: RequestId(id),
        user_id: UserId(user_id),
        department_id: DepartmentId(department_id),
        request_code,
        description,
        status_note,
        total_amount: parse_decimal(&total_amount)?,
        current_approval_level,
        status: parse_status(&status_str)?,
        urgency_level: parse_urgency(&urgency_str)?,
        request_date: parse_date(&request_date)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<RequestItem, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let request_id: i64 = row.try_get("request_id").map_err(decode_err)?;
    let item_name: String = row.try_get("item_name").map_err(decode_err)?;
    let quantity: i64 = row.try_get("quantity").map_err(decode_err)?;
    let unit_price: String = row.try_get("unit_price").map_err(decode_err)?;
    let total_price: String = row.try_get("total_price").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let requested_delivery_date: Option<String> =
        row.try_get("requested_delivery_date").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(RequestItem {
        id,
        request_id: RequestId(request_id),
        item_name,
        quantity,
        unit_price: parse_decimal(&unit_price)?,
        total_price: parse_decimal(&total_price)?,
        category,
        requested_delivery_date: requested_delivery_date
            .as_deref()
            .map(parse_date)
            .transpose()?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &RequestListFilter,
    visibility: &VisibilityFilter,
) {
    builder.push(" WHERE 1 = 1");

    match visibility {
        VisibilityFilter::All => {}
        VisibilityFilter::OwnedBy(user_id) => {
            builder.push(" AND user_id = ").push_bind(user_id.0);
        }
        VisibilityFilter::InDepartment(department_id) => {
            builder.push(" AND department_id = ").push_bind(department_id.0);
        }
        VisibilityFilter::InDepartments(department_ids) => {
            if department_ids.is_empty() {
                builder.push(" AND 1 = 0");
            } else {
                builder.push(" AND department_id IN (");
                let mut separated = builder.separated(", ");
                for department_id in department_ids {
                    separated.push_bind(department_id.0);
                }
                separated.push_unseparated(")");
            }
        }
        VisibilityFilter::Nothing => {
            builder.push(" AND 1 = 0");
        }
    }

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(department_id) = filter.department_id {
        builder.push(" AND department_id = ").push_bind(department_id.0);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.0);
    }
    if let Some(urgency_level) = filter.urgency_level {
        builder.push(" AND urgency_level = ").push_bind(urgency_level.as_str());
    }
    if let Some(level) = filter.current_approval_level {
        builder.push(" AND current_approval_level = ").push_bind(level);
    }
    if let Some(start_date) = filter.start_date {
        builder.push(" AND request_date >= ").push_bind(start_date.to_string());
    }
    if let Some(end_date) = filter.end_date {
        builder.push(" AND request_date <= ").push_bind(end_date.to_string());
    }
    if let Some(query) = &filter.query {
        let pattern = format!("%{query}%");
        builder.push(" AND (request_code LIKE ").push_bind(pattern.clone());
        builder.push(" OR description LIKE ").push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM requests WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_request(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, request_code: &str) -> Result<Option<Request>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM requests WHERE request_code = ?"))
                .bind(request_code)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_request(row)?)),
            None => Ok(None),
        }
    }

    async fn latest_code_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            "SELECT request_code FROM requests
             WHERE request_code LIKE ?
             ORDER BY request_code DESC
             LIMIT 1",
        )
        .bind(format!("{prefix}%"))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row.try_get("request_code").map_err(decode_err)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        new_request: &NewRequest,
        request_code: &str,
        status: RequestStatus,
        current_approval_level: i64,
        total_amount: Decimal,
    ) -> Result<Request, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(&format!(
            "INSERT INTO requests (user_id, department_id, request_code, description,
                                   status_note, total_amount, current_approval_level, status,
                                   urgency_level, request_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(new_request.user_id.0)
        .bind(new_request.department_id.0)
        .bind(request_code)
        .bind(&new_request.description)
        .bind(&new_request.status_note)
        .bind(total_amount.to_string())
        .bind(current_approval_level)
        .bind(status.as_str())
        .bind(new_request.urgency_level.as_str())
        .bind(new_request.request_date.to_string())
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        let request = row_to_request(&row)?;

        for item in &new_request.items {
            sqlx::query(
                "INSERT INTO request_items (request_id, item_name, quantity, unit_price,
                                            total_price, category, requested_delivery_date,
                                            created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(request.id.0)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.unit_price.to_string())
            .bind(item.total_price.to_string())
            .bind(&item.category)
            .bind(item.requested_delivery_date.map(|date| date.to_string()))
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(request)
    }

    async fn items_for(&self, request_id: RequestId) -> Result<Vec<RequestItem>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM request_items WHERE request_id = ? ORDER BY id ASC"
        ))
        .bind(request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn update_draft(
        &self,
        request_id: RequestId,
        update: &DraftUpdate,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("UPDATE requests SET updated_at = ");
        builder.push_bind(now.clone());
        if let Some(description) = &update.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(status_note) = &update.status_note {
            builder.push(", status_note = ").push_bind(status_note);
        }
        if let Some(urgency_level) = update.urgency_level {
            builder.push(", urgency_level = ").push_bind(urgency_level.as_str());
        }
        if let Some(request_date) = update.request_date {
            builder.push(", request_date = ").push_bind(request_date.to_string());
        }
        if let Some(items) = &update.items {
            let total: Decimal = items.iter().map(|item| item.total_price).sum();
            builder.push(", total_amount = ").push_bind(total.to_string());
        }
        builder.push(" WHERE id = ").push_bind(request_id.0);
        builder.build().execute(&mut *tx).await?;

        if let Some(items) = &update.items {
            sqlx::query("DELETE FROM request_items WHERE request_id = ?")
                .bind(request_id.0)
                .execute(&mut *tx)
                .await?;

            for item in items {
                sqlx::query(
                    "INSERT INTO request_items (request_id, item_name, quantity, unit_price,
                                                total_price, category, requested_delivery_date,
                                                created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(request_id.0)
                .bind(&item.item_name)
                .bind(item.quantity)
                .bind(item.unit_price.to_string())
                .bind(item.total_price.to_string())
                .bind(&item.category)
                .bind(item.requested_delivery_date.map(|date| date.to_string()))
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, request_id: RequestId) -> Result<(), RepositoryError> {
        // Items cascade with the request row.
        sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(request_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        current_approval_level: i64,
        status_note: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        match status_note {
            Some(note) => {
                sqlx::query(
                    "UPDATE requests
                     SET status = ?, current_approval_level = ?, status_note = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(status.as_str())
                .bind(current_approval_level)
                .bind(note)
                .bind(&now)
                .bind(request_id.0)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE requests
                     SET status = ?, current_approval_level = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(status.as_str())
                .bind(current_approval_level)
                .bind(&now)
                .bind(request_id.0)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        request_id: RequestId,
        expected_status: RequestStatus,
        expected_level: i64,
        new_status: RequestStatus,
        new_level: i64,
    ) -> Result<bool, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE requests
             SET status = ?, current_approval_level = ?, updated_at = ?
             WHERE id = ? AND status = ? AND current_approval_level = ?",
        )
        .bind(new_status.as_str())
        .bind(new_level)
        .bind(&now)
        .bind(request_id.0)
        .bind(expected_status.as_str())
        .bind(expected_level)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(
        &self,
        filter: &RequestListFilter,
        visibility: &VisibilityFilter,
        page: Page,
    ) -> Result<(Vec<Request>, ListMeta), RepositoryError> {
        let mut count_builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM requests");
        push_filters(&mut count_builder, filter, visibility);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(decode_err)?;

        let page_number = page.page.max(1);
        let per_page = page.per_page.max(1);
        let offset = i64::from(page_number - 1) * i64::from(per_page);

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM requests"));
        push_filters(&mut builder, filter, visibility);
        builder.push(format!(
            " ORDER BY {} {} LIMIT ",
            filter.sort_by.column(),
            filter.sort_order.keyword()
        ));
        builder.push_bind(i64::from(per_page));
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let requests: Vec<Request> =
            rows.iter().map(row_to_request).collect::<Result<_, _>>()?;

        let total = u64::try_from(total).unwrap_or(0);
        let meta = ListMeta {
            page: page_number,
            per_page,
            total,
            total_pages: total.div_ceil(u64::from(per_page)),
        };

        Ok((requests, meta))
    }
}
