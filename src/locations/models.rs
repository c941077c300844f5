use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::validation::{Checker, Payload, ValidationMode, field_path};
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
pub enum SiteType {
    #[sea_orm(string_value = "forest")]
    Forest,
    #[sea_orm(string_value = "grassland")]
    Grassland,
    #[sea_orm(string_value = "wetland")]
    Wetland,
    #[sea_orm(string_value = "desert")]
    Desert,
    #[sea_orm(string_value = "agricultural")]
    Agricultural,
    #[sea_orm(string_value = "urban")]
    Urban,
    #[sea_orm(string_value = "coastal")]
    Coastal,
    #[sea_orm(string_value = "mountain")]
    Mountain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub latitude: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub longitude: Decimal,
}

/// Where a sample was collected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationData {
    pub coordinates: Coordinates,
    pub region: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_type: Option<SiteType>,
}

const LOCATION_DATA: &str = "location_data";

impl Payload for LocationData {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, LOCATION_DATA)?;

        let coordinates_path = field_path(LOCATION_DATA, "coordinates");
        let coordinates = checker
            .required(map, LOCATION_DATA, "coordinates")
            .and_then(|raw| read_coordinates(raw, &coordinates_path, checker));

        let region = checker
            .required(map, LOCATION_DATA, "region")
            .and_then(|raw| checker.text(raw, &field_path(LOCATION_DATA, "region")));
        let country = checker
            .required(map, LOCATION_DATA, "country")
            .and_then(|raw| checker.text(raw, &field_path(LOCATION_DATA, "country")));

        let site_type = match map.get("site_type") {
            None | Some(Value::Null) => Some(None),
            Some(raw) => checker
                .choice::<SiteType>(raw, &field_path(LOCATION_DATA, "site_type"))
                .map(Some),
        };

        Some(Self {
            coordinates: coordinates?,
            region: region?,
            country: country?,
            site_type: site_type?,
        })
    }
}

fn read_coordinates(value: &Value, path: &str, checker: &mut Checker) -> Option<Coordinates> {
    let map = checker.object(value, path)?;

    let latitude = checker.required(map, path, "latitude").and_then(|raw| {
        checker.decimal_in_range(
            raw,
            &field_path(path, "latitude"),
            Decimal::from(-90),
            Decimal::from(90),
        )
    });
    let longitude = checker.required(map, path, "longitude").and_then(|raw| {
        checker.decimal_in_range(
            raw,
            &field_path(path, "longitude"),
            Decimal::from(-180),
            Decimal::from(180),
        )
    });

    Some(Coordinates {
        latitude: latitude?,
        longitude: longitude?,
    })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sampling_location")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub location_id: i32,
    pub location_data: Json,
    pub created_at: DateTime<Utc>,
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

/// Sampling location as exposed by the API
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Location {
    pub location_id: i32,
    pub location_data: LocationData,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for Location {
    type Error = BusinessError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let location_data = serde_json::from_value(model.location_data).map_err(|e| {
            BusinessError::StorageError {
                message: format!("stored location {} is unreadable: {e}", model.location_id),
            }
        })?;

        Ok(Self {
            location_id: model.location_id,
            location_data,
            created_at: model.created_at,
        })
    }
}

/// Request body for creating or replacing a location
#[derive(ToSchema, Deserialize, Serialize, Clone, Debug)]
pub struct LocationInput {
    #[serde(default)]
    #[schema(value_type = LocationData)]
    pub location_data: Value,
}

pub(crate) fn to_json<T: Serialize>(payload: &T) -> BusinessResult<Json> {
    serde_json::to_value(payload).map_err(|e| BusinessError::StorageError {
        message: format!("payload could not be serialised: {e}"),
    })
}

pub async fn get_all_locations(db: &DatabaseConnection) -> BusinessResult<Vec<Location>> {
    Entity::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::LocationId)
        .all(db)
        .await?
        .into_iter()
        .map(Location::try_from)
        .collect()
}

pub async fn get_one_location<C: ConnectionTrait>(db: &C, id: i32) -> BusinessResult<Location> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("Sampling location", id))?
        .try_into()
}

pub async fn create_location(
    db: &DatabaseConnection,
    mode: ValidationMode,
    input: &LocationInput,
) -> BusinessResult<Location> {
    let location_data = LocationData::parse(&input.location_data, mode)?;

    let inserted = ActiveModel {
        location_data: Set(to_json(&location_data)?),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(location_id = inserted.location_id, "Sampling location created");
    inserted.try_into()
}

pub async fn update_location(
    db: &DatabaseConnection,
    mode: ValidationMode,
    id: i32,
    input: &LocationInput,
) -> BusinessResult<Location> {
    let location_data = LocationData::parse(&input.location_data, mode)?;

    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("Sampling location", id))?;

    let mut active: ActiveModel = existing.into();
    active.location_data = Set(to_json(&location_data)?);
    let updated = active.update(db).await?;

    tracing::info!(location_id = id, "Sampling location updated");
    updated.try_into()
}

/// Deletes a location unless a sample row (soft-deleted or not) still references it
pub async fn delete_location(db: &DatabaseConnection, id: i32) -> BusinessResult<()> {
    let txn = db.begin().await?;

    Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!("Sampling location", id))?;

    let references = crate::samples::models::Entity::find()
        .filter(crate::samples::models::Column::LocationId.eq(id))
        .count(&txn)
        .await?;

    if references > 0 {
        tracing::warn!(location_id = id, references, "Refusing to delete referenced location");
        return Err(BusinessError::ReferentialIntegrity {
            resource: "Sampling location".to_string(),
            id: id.to_string(),
            referenced_by: format!("{references} plant sample(s)"),
        });
    }

    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(location_id = id, "Sampling location deleted");
    Ok(())
}
