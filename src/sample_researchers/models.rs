use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::common::validation::{Checker, Payload, ValidationMode, Violations};
use crate::researchers::models as researchers;
use crate::samples::models as samples;
use crate::samples::services::find_active_sample;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, QueryOrder, TransactionTrait, entity::prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

const RESOURCE: &str = "Sample researcher link";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ResearcherRole {
    #[sea_orm(string_value = "lead_researcher")]
    LeadResearcher,
    #[sea_orm(string_value = "assistant_researcher")]
    AssistantResearcher,
    #[sea_orm(string_value = "field_technician")]
    FieldTechnician,
    #[sea_orm(string_value = "data_analyst")]
    DataAnalyst,
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sample_researchers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sample_id: i32,
    pub researcher_id: i32,
    pub role: Option<ResearcherRole>,
    pub assigned_at: DateTime<Utc>,
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
    #[sea_orm(
        belongs_to = "crate::researchers::models::Entity",
        from = "Column::ResearcherId",
        to = "crate::researchers::models::Column::ResearcherId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Researcher,
}

impl Related<crate::samples::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sample.def()
    }
}

impl Related<crate::researchers::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Researcher.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A researcher's assignment to a sample, with the researcher's contact
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SampleResearcherLink {
    pub id: i32,
    pub sample_id: i32,
    pub researcher_id: i32,
    pub researcher_name: String,
    pub researcher_email: String,
    pub role: Option<ResearcherRole>,
    pub assigned_at: DateTime<Utc>,
}

impl SampleResearcherLink {
    fn new(link: Model, researcher: researchers::Model) -> Self {
        Self {
            id: link.id,
            sample_id: link.sample_id,
            researcher_id: link.researcher_id,
            researcher_name: researcher.name,
            researcher_email: researcher.email,
            role: link.role,
            assigned_at: link.assigned_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkInput {
    pub sample_id: i32,
    pub researcher_id: i32,
    #[serde(default)]
    pub role: Option<ResearcherRole>,
}

impl Payload for LinkInput {
    fn read(value: &Value, checker: &mut Checker) -> Option<Self> {
        let map = checker.object(value, "body")?;

        let sample_id = checker
            .required(map, "", "sample_id")
            .and_then(|raw| checker.positive_id(raw, "sample_id"));
        let researcher_id = checker
            .required(map, "", "researcher_id")
            .and_then(|raw| checker.positive_id(raw, "researcher_id"));
        let role = match map.get("role") {
            None | Some(Value::Null) => Some(None),
            Some(raw) => checker.choice::<ResearcherRole>(raw, "role").map(Some),
        };

        Some(Self {
            sample_id: sample_id?,
            researcher_id: researcher_id?,
            role: role?,
        })
    }
}

/// Links whose sample is active, in assignment order
pub async fn get_all_links(db: &DatabaseConnection) -> BusinessResult<Vec<SampleResearcherLink>> {
    Ok(Entity::find()
        .inner_join(samples::Entity)
        .filter(samples::Column::IsDeleted.eq(false))
        .find_also_related(researchers::Entity)
        .order_by_asc(Column::Id)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(link, researcher)| {
            researcher.map(|researcher| SampleResearcherLink::new(link, researcher))
        })
        .collect())
}

/// A link of an active sample; those of soft-deleted samples are hidden
pub async fn get_one_link<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> BusinessResult<SampleResearcherLink> {
    let (link, researcher) = Entity::find_by_id(id)
        .inner_join(samples::Entity)
        .filter(samples::Column::IsDeleted.eq(false))
        .find_also_related(researchers::Entity)
        .one(conn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))?;

    let researcher = researcher.ok_or_else(|| BusinessError::StorageError {
        message: format!("link {id} references a missing researcher"),
    })?;
    Ok(SampleResearcherLink::new(link, researcher))
}

/// Assigns a researcher to an active sample; a repeated pair is a duplicate
pub async fn create_link(
    db: &DatabaseConnection,
    mode: ValidationMode,
    body: &Value,
) -> BusinessResult<SampleResearcherLink> {
    let input = LinkInput::parse(body, mode)?;

    let txn = db.begin().await?;
    find_active_sample(&txn, input.sample_id).await?;
    let researcher = researchers::get_one_researcher(&txn, input.researcher_id).await?;

    let link = ActiveModel {
        sample_id: Set(input.sample_id),
        researcher_id: Set(input.researcher_id),
        role: Set(input.role),
        assigned_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| e.to_business_error(RESOURCE))?;
    txn.commit().await?;

    tracing::info!(
        link_id = link.id,
        sample_id = input.sample_id,
        researcher_id = input.researcher_id,
        "Researcher assigned to sample"
    );
    Ok(SampleResearcherLink::new(link, researcher))
}

/// Applies the keys present in `changes`; `role: null` clears the role
pub async fn update_link(
    db: &DatabaseConnection,
    mode: ValidationMode,
    id: i32,
    changes: &Value,
) -> BusinessResult<SampleResearcherLink> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))?;

    find_active_sample(&txn, existing.sample_id).await?;

    let Value::Object(changes) = changes else {
        return Err(Violations::single("body", "must be a JSON object").into());
    };
    let mut merged = json!({
        "sample_id": existing.sample_id,
        "researcher_id": existing.researcher_id,
        "role": existing.role,
    });
    if let Value::Object(target) = &mut merged {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    let input = LinkInput::parse(&merged, mode)?;

    find_active_sample(&txn, input.sample_id).await?;
    let researcher = researchers::get_one_researcher(&txn, input.researcher_id).await?;

    let mut active: ActiveModel = existing.into();
    active.sample_id = Set(input.sample_id);
    active.researcher_id = Set(input.researcher_id);
    active.role = Set(input.role);
    let link = active
        .update(&txn)
        .await
        .map_err(|e| e.to_business_error(RESOURCE))?;
    txn.commit().await?;

    tracing::info!(link_id = id, "Sample researcher link updated");
    Ok(SampleResearcherLink::new(link, researcher))
}

/// Links of a soft-deleted sample stay until the sample is hard-deleted
pub async fn delete_link(db: &DatabaseConnection, id: i32) -> BusinessResult<()> {
    let txn = db.begin().await?;
    let existing = Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, id))?;
    find_active_sample(&txn, existing.sample_id).await?;

    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(link_id = id, sample_id = existing.sample_id, "Sample researcher link removed");
    Ok(())
}
