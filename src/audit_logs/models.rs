use crate::common::errors::BusinessResult;
use crate::common::list::{ListParams, Page};
use crate::common::validation::{Checker, ValidationMode};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, Order, PaginatorTrait, QueryOrder, QuerySelect, entity::prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "UPDATED")]
    Updated,
    #[sea_orm(string_value = "DELETED")]
    Deleted,
    #[sea_orm(string_value = "HARD_DELETED")]
    HardDeleted,
    #[sea_orm(string_value = "GROWTH_METRICS_ADDED")]
    GrowthMetricsAdded,
}

/// Append-only trail of sample mutations.
///
/// `sample_id` carries no foreign key so entries outlive a hard-deleted sample.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sample_audit_log")]
#[schema(as = AuditLog)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub log_id: i32,
    pub sample_id: Option<i32>,
    pub action: AuditAction,
    pub performed_at: DateTime<Utc>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub type AuditLog = Model;

/// Appends an entry on `conn`, which is the caller's open transaction for
/// every lifecycle write
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    sample_id: i32,
    action: AuditAction,
    details: Value,
) -> BusinessResult<AuditLog> {
    let entry = ActiveModel {
        sample_id: Set(Some(sample_id)),
        action: Set(action),
        performed_at: Set(Utc::now()),
        details: Set(Some(details)),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    tracing::debug!(sample_id, action = ?action, log_id = entry.log_id, "Audit entry appended");
    Ok(entry)
}

pub const FILTERABLE: [&str; 2] = ["sample_id", "action"];
pub const SORTABLE: [&str; 4] = ["log_id", "sample_id", "action", "performed_at"];

fn column_named(name: &str) -> Option<Column> {
    match name {
        "log_id" => Some(Column::LogId),
        "sample_id" => Some(Column::SampleId),
        "action" => Some(Column::Action),
        "performed_at" => Some(Column::PerformedAt),
        _ => None,
    }
}

/// Entries matching `params`, newest first unless another order is asked for
pub async fn get_all_audit_logs(
    db: &DatabaseConnection,
    params: &ListParams,
) -> BusinessResult<Page<AuditLog>> {
    let mut checker = Checker::new(ValidationMode::FailFast);
    let sample_id = params
        .value("sample_id")
        .and_then(|raw| checker.positive_id(raw, "filter.sample_id"));
    let action = params
        .value("action")
        .and_then(|raw| checker.choice::<AuditAction>(raw, "filter.action"));
    checker.finish(Some(()))?;

    let mut query = Entity::find();
    if let Some(sample_id) = sample_id {
        query = query.filter(Column::SampleId.eq(sample_id));
    }
    if let Some(action) = action {
        query = query.filter(Column::Action.eq(action));
    }
    let total = query.clone().count(db).await?;

    let query = match params
        .sort
        .as_ref()
        .and_then(|(name, order)| Some((column_named(name)?, order)))
    {
        Some((column, order)) => query.order_by(column, order.clone()),
        None => query.order_by(Column::PerformedAt, Order::Desc),
    };
    let items = query
        .order_by_desc(Column::LogId)
        .offset(params.offset)
        .limit(params.limit)
        .all(db)
        .await?;

    Ok(Page {
        items,
        offset: params.offset,
        total,
    })
}

/// Entries for one sample id, including those of a hard-deleted sample
pub async fn get_audit_logs_for_sample(
    db: &DatabaseConnection,
    sample_id: i32,
) -> BusinessResult<Vec<AuditLog>> {
    Ok(Entity::find()
        .filter(Column::SampleId.eq(sample_id))
        .order_by_desc(Column::PerformedAt)
        .order_by_desc(Column::LogId)
        .all(db)
        .await?)
}
