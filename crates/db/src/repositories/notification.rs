use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use wapprove_core::domain::notification::{
    NewNotification, Notification, NotificationId, NotificationType,
};
use wapprove_core::domain::request::RequestId;
use wapprove_core::domain::user::UserId;

use super::{decode_err, parse_datetime, NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, request_id, notification_type, message, message_sid, \
     is_sent, sent_at, is_read, read_at, created_at";

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let user_id: i64 = row.try_get("user_id").map_err(decode_err)?;
    let request_id: i64 = row.try_get("request_id").map_err(decode_err)?;
    let type_str: String = row.try_get("notification_type").map_err(decode_err)?;
    let notification_type = NotificationType::parse(&type_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown notification type `{type_str}`"))
    })?;
    let message: String = row.try_get("message").map_err(decode_err)?;
    let message_sid: Option<String> = row.try_get("message_sid").map_err(decode_err)?;
    let is_sent: bool = row.try_get("is_sent").map_err(decode_err)?;
    let sent_at: Option<String> = row.try_get("sent_at").map_err(decode_err)?;
    let is_read: bool = row.try_get("is_read").map_err(decode_err)?;
    let read_at: Option<String> = row.try_get("read_at").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(Notification {
        id: NotificationId(id),
        user_id: UserId(user_id),
        request_id: RequestId(request_id),
        notification_type,
        message,
        message_sid,
        is_sent,
        sent_at: sent_at.as_deref().map(parse_datetime),
        is_read,
        read_at: read_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn record(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let sent_at = notification.is_sent.then(|| now.clone());
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (user_id, request_id, notification_type, message,
                                        message_sid, is_sent, sent_at, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(notification.user_id.0)
        .bind(notification.request_id.0)
        .bind(notification.notification_type.as_str())
        .bind(&notification.message)
        .bind(&notification.message_sid)
        .bind(notification.is_sent)
        .bind(&sent_at)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        row_to_notification(&row)
    }

    async fn find_by_message_sid(
        &self,
        message_sid: &str,
    ) -> Result<Option<Notification>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE message_sid = ?"
        ))
        .bind(message_sid)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_notification(row)?)),
            None => Ok(None),
        }
    }

    async fn mark_sent(&self, id: NotificationId, sent: bool) -> Result<(), RepositoryError> {
        let sent_at = sent.then(|| Utc::now().to_rfc3339());
        sqlx::query("UPDATE notifications SET is_sent = ?, sent_at = ? WHERE id = ?")
            .bind(sent)
            .bind(&sent_at)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE notifications SET is_read = 1, read_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn history(
        &self,
        user_id: Option<UserId>,
        request_id: Option<RequestId>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE 1 = 1"
        ));
        if let Some(user_id) = user_id {
            builder.push(" AND user_id = ").push_bind(user_id.0);
        }
        if let Some(request_id) = request_id {
            builder.push(" AND request_id = ").push_bind(request_id.0);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_notification).collect()
    }
}
