use crate::audit_logs::models::{self as audit, AuditAction};
use crate::common::errors::BusinessResult;
use crate::common::validation::{Checker, Payload, ValidationMode, Violations, field_path};
use crate::locations::models::to_json;
use crate::samples::models as samples;
use crate::samples::services::find_active_sample;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{ActiveValue::Set, QueryOrder, TransactionTrait, entity::prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

const RESOURCE: &str = "Growth metrics";
const BODY: &str = "body";

pub const HEIGHT_RANGE: (i64, i64) = (0, 200);
pub const LEAF_COUNT_RANGE: (i64, i64) = (0, 100_000);
pub const STEM_DIAMETER_RANGE: (i64, i64) = (0, 50);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[sea_orm(string_value = "excellent")]
    Excellent,
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "fair")]
    Fair,
    #[sea_orm(string_value = "poor")]
    Poor,
    #[sea_orm(string_value = "critical")]
    Critical,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "growth_metrics")]
#[schema(as = GrowthMetric)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub growth_id: i32,
    pub sample_id: i32,
    /// Centimetres
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub height: Option<Decimal>,
    pub leaf_count: Option<i32>,
    /// Millimetres
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub stem_diameter: Option<Decimal>,
    pub health_status: Option<HealthStatus>,
    pub measured_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::samples::models::Entity",
        from = "Column::SampleId",
        to = "crate::samples::models::Column::SampleId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Sample,
}

impl Related<crate::samples::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sample.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub type GrowthMetric = Model;

/// One set of measurements. Every value is optional; `measured_at` defaults
/// to the time of recording.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GrowthMeasurement {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub height: Option<Decimal>,
    #[serde(default)]
    pub leaf_count: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub stem_diameter: Option<Decimal>,
    #[serde(default)]
    pub health_status: Option<HealthStatus>,
    #[serde(default)]
    pub measured_at: Option<DateTime<Utc>>,
}

fn optional<T>(
    map: &serde_json::Map<String, Value>,
    key: &str,
    read: impl FnOnce(&Value, &str) -> Option<T>,
) -> Option<Option<T>> {
    match map.get(key) {
        None | Some(Value::Null) => Some(None),
        Some(raw) => read(raw, &field_path("", key)).map(Some),
    }
}

fn decimal_bounds((min, max): (i64, i64)) -> (Decimal, Decimal) {
    (Decimal::from(min), Decimal::from(max))
}

impl Payload for GrowthMeasurement {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, BODY)?;

        let (min, max) = decimal_bounds(HEIGHT_RANGE);
        let height = optional(map, "height", |raw, field| {
            checker.decimal_in_range(raw, field, min, max)
        });
        let leaf_count = optional(map, "leaf_count", |raw, field| {
            checker
                .integer_in_range(raw, field, LEAF_COUNT_RANGE.0, LEAF_COUNT_RANGE.1)
                .and_then(|count| i32::try_from(count).ok())
        });
        let (min, max) = decimal_bounds(STEM_DIAMETER_RANGE);
        let stem_diameter = optional(map, "stem_diameter", |raw, field| {
            checker.decimal_in_range(raw, field, min, max)
        });
        let health_status = optional(map, "health_status", |raw, field| {
            checker.choice::<HealthStatus>(raw, field)
        });
        let measured_at = optional(map, "measured_at", |raw, field| checker.timestamp(raw, field));

        Some(Self {
            height: height?.map(|h| h.round_dp(2)),
            leaf_count: leaf_count?,
            stem_diameter: stem_diameter?.map(|d| d.round_dp(2)),
            health_status: health_status?,
            measured_at: measured_at?,
        })
    }
}

impl From<&Model> for GrowthMeasurement {
    fn from(model: &Model) -> Self {
        Self {
            height: model.height,
            leaf_count: model.leaf_count,
            stem_diameter: model.stem_diameter,
            health_status: model.health_status,
            measured_at: Some(model.measured_at),
        }
    }
}

/// Body of `POST /api/growth-metrics`: a measurement naming its sample
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewGrowthMetric {
    pub sample_id: i32,
    #[serde(flatten)]
    pub measurement: GrowthMeasurement,
}

impl Payload for NewGrowthMetric {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let measurement = GrowthMeasurement::read(value, checker);
        let sample_id = match value.get("sample_id") {
            Some(raw) if !raw.is_null() => checker.positive_id(raw, "sample_id"),
            _ => {
                if value.is_object() {
                    checker.reject("sample_id", "is required");
                }
                None
            }
        };

        Some(Self {
            sample_id: sample_id?,
            measurement: measurement?,
        })
    }
}

/// `measured_at` may not fall on a day before the sample was collected
fn check_after_sampling(
    sample: &samples::Model,
    measured_at: DateTime<Utc>,
) -> BusinessResult<()> {
    let sampling_date = sample.detail()?.sampling_date;
    if measured_at.date_naive() < sampling_date {
        return Err(Violations::single(
            "measured_at",
            format!("cannot be before the sample's sampling date ({sampling_date})"),
        )
        .into());
    }
    Ok(())
}

fn audit_details(metric: &Model) -> Value {
    json!({
        "growth_id": metric.growth_id,
        "height": metric.height.and_then(|h| h.to_f64()),
        "leaf_count": metric.leaf_count,
        "stem_diameter": metric.stem_diameter.and_then(|d| d.to_f64()),
        "health_status": metric.health_status,
    })
}

/// Records a measurement and its `GROWTH_METRICS_ADDED` audit entry atomically
pub async fn create_growth_metric(
    db: &DatabaseConnection,
    sample_id: i32,
    measurement: GrowthMeasurement,
) -> BusinessResult<GrowthMetric> {
    let txn = db.begin().await?;
    let sample = find_active_sample(&txn, sample_id).await?;

    let measured_at = measurement.measured_at.unwrap_or_else(Utc::now);
    check_after_sampling(&sample, measured_at)?;

    let metric = ActiveModel {
        sample_id: Set(sample_id),
        height: Set(measurement.height),
        leaf_count: Set(measurement.leaf_count),
        stem_diameter: Set(measurement.stem_diameter),
        health_status: Set(measurement.health_status),
        measured_at: Set(measured_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    audit::record(
        &txn,
        sample_id,
        AuditAction::GrowthMetricsAdded,
        audit_details(&metric),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        growth_id = metric.growth_id,
        sample_id,
        "Growth measurement recorded"
    );
    Ok(metric)
}

/// Growth measurements of active samples, newest first
pub async fn get_all_growth_metrics(db: &DatabaseConnection) -> BusinessResult<Vec<GrowthMetric>> {
    Ok(Entity::find()
        .inner_join(samples::Entity)
        .filter(samples::Column::IsDeleted.eq(false))
        .order_by_desc(Column::MeasuredAt)
        .order_by_desc(Column::GrowthId)
        .all(db)
        .await?)
}

pub async fn get_growth_metrics_for_sample(
    db: &DatabaseConnection,
    sample_id: i32,
) -> BusinessResult<Vec<GrowthMetric>> {
    Ok(Entity::find()
        .filter(Column::SampleId.eq(sample_id))
        .order_by_desc(Column::MeasuredAt)
        .order_by_desc(Column::GrowthId)
        .all(db)
        .await?)
}

/// A measurement of an active sample; those of soft-deleted samples are hidden
pub async fn get_one_growth_metric(db: &DatabaseConnection, id: i32) -> BusinessResult<GrowthMetric> {
    Entity::find_by_id(id)
        .inner_join(samples::Entity)
        .filter(samples::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))
}

/// Merges the keys present in `changes` onto a stored measurement and
/// validates the result as a whole
pub async fn update_growth_metric(
    db: &DatabaseConnection,
    mode: ValidationMode,
    id: i32,
    changes: &Value,
) -> BusinessResult<GrowthMetric> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))?;

    let Value::Object(changes) = changes else {
        return Err(Violations::single(BODY, "must be a JSON object").into());
    };
    if let Some(raw) = changes.get("sample_id") {
        if raw.as_i64() != Some(i64::from(existing.sample_id)) {
            return Err(
                Violations::single("sample_id", "cannot be changed on a measurement").into(),
            );
        }
    }

    let sample = find_active_sample(&txn, existing.sample_id).await?;

    let mut merged = to_json(&GrowthMeasurement::from(&existing))?;
    if let Value::Object(target) = &mut merged {
        for (key, value) in changes.iter().filter(|(key, _)| key.as_str() != "sample_id") {
            target.insert(key.clone(), value.clone());
        }
    }
    let measurement = GrowthMeasurement::parse(&merged, mode)?;
    let measured_at = measurement.measured_at.unwrap_or(existing.measured_at);
    check_after_sampling(&sample, measured_at)?;

    let mut active: ActiveModel = existing.into();
    active.height = Set(measurement.height);
    active.leaf_count = Set(measurement.leaf_count);
    active.stem_diameter = Set(measurement.stem_diameter);
    active.health_status = Set(measurement.health_status);
    active.measured_at = Set(measured_at);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(growth_id = id, "Growth measurement updated");
    Ok(updated)
}

/// Measurements of a soft-deleted sample stay until the sample is hard-deleted
pub async fn delete_growth_metric(db: &DatabaseConnection, id: i32) -> BusinessResult<()> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))?;
    find_active_sample(&txn, existing.sample_id).await?;

    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(growth_id = id, sample_id = existing.sample_id, "Growth measurement deleted");
    Ok(())
}
