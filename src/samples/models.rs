use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::validation::{Checker, Payload, field_path};
use crate::conditions::models::Condition;
use crate::growth_metrics::models::GrowthMetric;
use crate::locations::models::Location;
use crate::sample_researchers::models::ResearcherRole;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

const SAMPLE_DETAIL: &str = "sample_detail";

/// Descriptive payload of a plant sample
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SampleDetail {
    pub species: String,
    pub common_name: String,
    /// Filled with the current date when omitted
    pub sampling_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SampleDetail {
    fn read_date(value: Option<&Value>, checker: &mut Checker) -> Option<NaiveDate> {
        match value {
            None | Some(Value::Null) => Some(checker.today()),
            Some(Value::String(s)) if s.trim().is_empty() => Some(checker.today()),
            Some(raw) => checker.date(raw, &field_path(SAMPLE_DETAIL, "sampling_date")),
        }
    }

    fn read_description(value: Option<&Value>, checker: &mut Checker) -> Option<Option<String>> {
        match value {
            None | Some(Value::Null) => Some(None),
            Some(raw) => checker
                .text(raw, &field_path(SAMPLE_DETAIL, "description"))
                .map(Some),
        }
    }
}

impl Payload for SampleDetail {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, SAMPLE_DETAIL)?;

        let species = checker
            .required(map, SAMPLE_DETAIL, "species")
            .and_then(|raw| checker.non_blank(raw, &field_path(SAMPLE_DETAIL, "species")));
        let common_name = checker
            .required(map, SAMPLE_DETAIL, "common_name")
            .and_then(|raw| checker.text(raw, &field_path(SAMPLE_DETAIL, "common_name")));
        let sampling_date = Self::read_date(map.get("sampling_date"), checker);
        let description = Self::read_description(map.get("description"), checker);

        Some(Self {
            species: species?,
            common_name: common_name?,
            sampling_date: sampling_date?,
            description: description?,
        })
    }

    fn check(&self, checker: &mut Checker) {
        if self.sampling_date > checker.today() {
            checker.reject(
                field_path(SAMPLE_DETAIL, "sampling_date"),
                "cannot be in the future",
            );
        }
    }
}

/// Field-by-field changes to a [`SampleDetail`]; absent keys are kept
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleDetailPatch {
    pub species: Option<String>,
    pub common_name: Option<String>,
    pub sampling_date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
}

impl SampleDetailPatch {
    /// Merges onto `base`; the result still has to pass [`Payload::verify`]
    #[must_use]
    pub fn apply(self, base: SampleDetail) -> SampleDetail {
        SampleDetail {
            species: self.species.unwrap_or(base.species),
            common_name: self.common_name.unwrap_or(base.common_name),
            sampling_date: self.sampling_date.unwrap_or(base.sampling_date),
            description: self.description.unwrap_or(base.description),
        }
    }
}

impl Payload for SampleDetailPatch {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, SAMPLE_DETAIL)?;

        let species = match map.get("species") {
            None => Some(None),
            Some(raw) => checker
                .non_blank(raw, &field_path(SAMPLE_DETAIL, "species"))
                .map(Some),
        };
        let common_name = match map.get("common_name") {
            None => Some(None),
            Some(raw) => checker
                .text(raw, &field_path(SAMPLE_DETAIL, "common_name"))
                .map(Some),
        };
        let sampling_date = match map.get("sampling_date") {
            None => Some(None),
            present => SampleDetail::read_date(present, checker).map(Some),
        };
        let description = match map.get("description") {
            None => Some(None),
            present => SampleDetail::read_description(present, checker).map(Some),
        };

        Some(Self {
            species: species?,
            common_name: common_name?,
            sampling_date: sampling_date?,
            description: description?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "plant_sample")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub sample_id: i32,
    pub sample_detail: Json,
    pub location_id: i32,
    pub condition_id: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Typed view of the stored detail payload
    pub fn detail(&self) -> BusinessResult<SampleDetail> {
        serde_json::from_value(self.sample_detail.clone()).map_err(|e| {
            BusinessError::StorageError {
                message: format!("stored sample {} is unreadable: {e}", self.sample_id),
            }
        })
    }

    /// Species as stored, tolerating a malformed payload
    pub fn species(&self) -> String {
        self.sample_detail
            .get("species")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::locations::models::Entity",
        from = "Column::LocationId",
        to = "crate::locations::models::Column::LocationId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Location,
    #[sea_orm(
        belongs_to = "crate::conditions::models::Entity",
        from = "Column::ConditionId",
        to = "crate::conditions::models::Column::ConditionId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Condition,
    #[sea_orm(has_many = "crate::growth_metrics::models::Entity")]
    GrowthMetrics,
    #[sea_orm(has_many = "crate::sample_researchers::models::Entity")]
    SampleResearchers,
}

impl Related<crate::locations::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<crate::conditions::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Condition.def()
    }
}

impl Related<crate::growth_metrics::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GrowthMetrics.def()
    }
}

impl Related<crate::sample_researchers::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SampleResearchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Request body for creating and updating samples.
///
/// On create both references are required. On update an absent reference
/// keeps the current one, and for `PATCH` an absent `sample_detail` keeps the
/// stored payload.
#[derive(ToSchema, Deserialize, Serialize, Clone, Debug, Default)]
pub struct SampleInput {
    #[serde(default)]
    #[schema(value_type = SampleDetail)]
    pub sample_detail: Value,
    pub location_id: Option<i32>,
    pub condition_id: Option<i32>,
}

#[derive(Deserialize, IntoParams, Debug, Default, Clone)]
#[into_params(parameter_in = Query)]
pub struct SampleFilter {
    pub location_id: Option<i32>,
    pub condition_id: Option<i32>,
    /// Case-insensitive substring of the species name
    pub species: Option<String>,
}

/// Row of the active-sample listing
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SampleSummary {
    pub sample_id: i32,
    pub species: String,
    pub common_name: String,
    pub sampling_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SampleSummary {
    pub fn from_model(model: &Model) -> BusinessResult<Self> {
        let detail = model.detail()?;
        Ok(Self {
            sample_id: model.sample_id,
            species: detail.species,
            common_name: detail.common_name,
            sampling_date: detail.sampling_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Active,
    Deleted,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AssignedResearcher {
    pub researcher_id: i32,
    pub name: String,
    pub email: String,
    pub role: Option<ResearcherRole>,
}

/// Full sample with its location, conditions, researchers and measurements
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Sample {
    pub sample_id: i32,
    pub sample_detail: SampleDetail,
    pub location_id: i32,
    pub location: Location,
    pub condition_id: i32,
    pub condition: Condition,
    pub researchers: Vec<AssignedResearcher>,
    pub growth_measurements: Vec<GrowthMetric>,
    pub status: SampleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a read of a soft-deleted sample returns
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeletedSampleMarker {
    pub message: String,
    pub sample_id: i32,
    pub status: SampleStatus,
}

impl DeletedSampleMarker {
    pub fn new(sample_id: i32) -> Self {
        Self {
            message: "Sample deleted".to_string(),
            sample_id,
            status: SampleStatus::Deleted,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SampleRead {
    Active(Box<Sample>),
    Deleted(DeletedSampleMarker),
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeletedSampleRef {
    pub sample_id: i32,
    pub species: String,
    pub status: SampleStatus,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SoftDeleted {
    pub message: String,
    pub deleted_sample: DeletedSampleRef,
}

/// Response of a soft delete: either the fresh deletion or the earlier one
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum SoftDeleteResponse {
    Deleted(SoftDeleted),
    AlreadyDeleted(DeletedSampleMarker),
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PermanentlyDeletedRef {
    pub sample_id: i32,
    pub species: String,
    pub deletion_type: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HardDeleteResponse {
    pub message: String,
    pub deleted_sample: PermanentlyDeletedRef,
    pub warning: String,
}
