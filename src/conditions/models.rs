use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::validation::{Checker, Payload, ValidationMode, field_path};
use crate::locations::models::to_json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, PaginatorTrait, QueryOrder, TransactionTrait, entity::prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    #[sea_orm(string_value = "clay")]
    Clay,
    #[sea_orm(string_value = "sandy")]
    Sandy,
    #[sea_orm(string_value = "loamy")]
    Loamy,
    #[sea_orm(string_value = "silty")]
    Silty,
    #[sea_orm(string_value = "peaty")]
    Peaty,
    #[sea_orm(string_value = "chalky")]
    Chalky,
    #[sea_orm(string_value = "saline")]
    Saline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SoilComposition {
    #[serde(rename = "pH", with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub ph: Decimal,
    /// Free-form nutrient description, stored as given
    #[schema(value_type = Object)]
    pub nutrients: Value,
    #[serde(rename = "type")]
    pub soil_type: SoilType,
}

/// Environmental parameters recorded at sampling time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionData {
    pub soil_composition: SoilComposition,
    /// Degrees Celsius
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub temperature: Decimal,
    /// Relative humidity in percent
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub humidity: Decimal,
    /// Metres above sea level
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub altitude: Decimal,
}

const CONDITION_DATA: &str = "condition_data";

/// Inclusive bounds for each ranged measurement
pub const PH_RANGE: (i64, i64) = (0, 14);
pub const TEMPERATURE_RANGE: (i64, i64) = (-50, 60);
pub const HUMIDITY_RANGE: (i64, i64) = (0, 100);
pub const ALTITUDE_RANGE: (i64, i64) = (-500, 9000);

fn ranged(
    checker: &mut Checker,
    map: &serde_json::Map<String, Value>,
    parent: &str,
    key: &str,
    (min, max): (i64, i64),
) -> Option<Decimal> {
    let raw = checker.required(map, parent, key)?;
    checker.decimal_in_range(
        raw,
        &field_path(parent, key),
        Decimal::from(min),
        Decimal::from(max),
    )
}

impl Payload for ConditionData {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, CONDITION_DATA)?;

        let soil_path = field_path(CONDITION_DATA, "soil_composition");
        let soil_composition = checker
            .required(map, CONDITION_DATA, "soil_composition")
            .and_then(|raw| read_soil(raw, &soil_path, checker));

        let temperature = ranged(checker, map, CONDITION_DATA, "temperature", TEMPERATURE_RANGE);
        let humidity = ranged(checker, map, CONDITION_DATA, "humidity", HUMIDITY_RANGE);
        let altitude = ranged(checker, map, CONDITION_DATA, "altitude", ALTITUDE_RANGE);

        Some(Self {
            soil_composition: soil_composition?,
            temperature: temperature?,
            humidity: humidity?,
            altitude: altitude?,
        })
    }
}

fn read_soil(value: &Value, path: &str, checker: &mut Checker) -> Option<SoilComposition> {
    let map = checker.object(value, path)?;

    let ph = ranged(checker, map, path, "pH", PH_RANGE);
    let nutrients = checker.required(map, path, "nutrients").cloned();
    let soil_type = checker
        .required(map, path, "type")
        .and_then(|raw| checker.choice::<SoilType>(raw, &field_path(path, "type")));

    Some(SoilComposition {
        ph: ph?,
        nutrients: nutrients?,
        soil_type: soil_type?,
    })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "environmental_conditions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub condition_id: i32,
    pub condition_data: Json,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::samples::models::Entity")]
    Samples,
}

impl Related<crate::samples::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Samples.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Condition {
    pub condition_id: i32,
    pub condition_data: ConditionData,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<Model> for Condition {
    type Error = BusinessError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let condition_data = serde_json::from_value(model.condition_data).map_err(|e| {
            BusinessError::StorageError {
                message: format!("stored condition {} is unreadable: {e}", model.condition_id),
            }
        })?;

        Ok(Self {
            condition_id: model.condition_id,
            condition_data,
            recorded_at: model.recorded_at,
        })
    }
}

#[derive(ToSchema, Deserialize, Serialize, Clone, Debug)]
pub struct ConditionInput {
    #[serde(default)]
    #[schema(value_type = ConditionData)]
    pub condition_data: Value,
}

pub async fn get_all_conditions(db: &DatabaseConnection) -> BusinessResult<Vec<Condition>> {
    Entity::find()
        .order_by_desc(Column::RecordedAt)
        .order_by_desc(Column::ConditionId)
        .all(db)
        .await?
        .into_iter()
        .map(Condition::try_from)
        .collect()
}

pub async fn get_one_condition<C: ConnectionTrait>(db: &C, id: i32) -> BusinessResult<Condition> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("Environmental conditions", id))?
        .try_into()
}

pub async fn create_condition(
    db: &DatabaseConnection,
    mode: ValidationMode,
    input: &ConditionInput,
) -> BusinessResult<Condition> {
    let condition_data = ConditionData::parse(&input.condition_data, mode)?;

    let inserted = ActiveModel {
        condition_data: Set(to_json(&condition_data)?),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(condition_id = inserted.condition_id, "Environmental conditions recorded");
    inserted.try_into()
}

pub async fn update_condition(
    db: &DatabaseConnection,
    mode: ValidationMode,
    id: i32,
    input: &ConditionInput,
) -> BusinessResult<Condition> {
    let condition_data = ConditionData::parse(&input.condition_data, mode)?;

    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("Environmental conditions", id))?;

    let mut active: ActiveModel = existing.into();
    active.condition_data = Set(to_json(&condition_data)?);
    let updated = active.update(db).await?;

    tracing::info!(condition_id = id, "Environmental conditions updated");
    updated.try_into()
}

pub async fn delete_condition(db: &DatabaseConnection, id: i32) -> BusinessResult<()> {
    let txn = db.begin().await?;

    Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!("Environmental conditions", id))?;

    let references = crate::samples::models::Entity::find()
        .filter(crate::samples::models::Column::ConditionId.eq(id))
        .count(&txn)
        .await?;

    if references > 0 {
        tracing::warn!(condition_id = id, references, "Refusing to delete referenced conditions");
        return Err(BusinessError::ReferentialIntegrity {
            resource: "Environmental conditions".to_string(),
            id: id.to_string(),
            referenced_by: format!("{references} plant sample(s)"),
        });
    }

    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(condition_id = id, "Environmental conditions deleted");
    Ok(())
}
