use super::models::{
    ActiveModel, AssignedResearcher, Column, DeletedSampleMarker, DeletedSampleRef, Entity,
    HardDeleteResponse, Model, PermanentlyDeletedRef, Sample, SampleDetail, SampleDetailPatch,
    SampleFilter, SampleInput, SampleRead, SampleStatus, SampleSummary, SoftDeleteResponse,
    SoftDeleted,
};
use crate::audit_logs::models::{self as audit, AuditAction};
use crate::common::errors::BusinessResult;
use crate::common::validation::{Checker, Payload, ValidationMode};
use crate::locations::models::to_json;
use crate::{
    conditions::models as conditions, growth_metrics::models as growth_metrics,
    locations::models as locations, researchers::models as researchers,
    sample_researchers::models as links,
};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, QueryOrder, TransactionTrait, entity::prelude::*,
    sea_query::Expr,
};
use serde_json::{Value, json};

const RESOURCE: &str = "Plant sample";
const HARD_DELETE_WARNING: &str = "PERMANENT DELETION - All data removed from database";

/// How an update treats the stored detail payload
#[derive(Debug, Clone)]
pub enum DetailChange {
    /// Full replacement, validated like a create
    Replace(Value),
    /// Field-by-field merge onto the stored payload
    Merge(Value),
    Keep,
}

#[derive(Debug, Clone)]
pub struct SampleChanges {
    pub detail: DetailChange,
    pub location_id: Option<i32>,
    pub condition_id: Option<i32>,
}

impl SampleChanges {
    pub fn replace(input: SampleInput) -> Self {
        Self {
            detail: DetailChange::Replace(input.sample_detail),
            location_id: input.location_id,
            condition_id: input.condition_id,
        }
    }

    pub fn merge(input: SampleInput) -> Self {
        let detail = if input.sample_detail.is_null() {
            DetailChange::Keep
        } else {
            DetailChange::Merge(input.sample_detail)
        };
        Self {
            detail,
            location_id: input.location_id,
            condition_id: input.condition_id,
        }
    }
}

/// Atomic state transitions of a plant sample.
///
/// Every transition runs in its own transaction together with its audit
/// entry; any error drops the transaction, which rolls it back.
pub struct SampleLifecycle<'a> {
    db: &'a DatabaseConnection,
    mode: ValidationMode,
}

impl<'a> SampleLifecycle<'a> {
    pub fn new(db: &'a DatabaseConnection, mode: ValidationMode) -> Self {
        Self { db, mode }
    }

    pub async fn create(&self, input: &SampleInput) -> BusinessResult<Model> {
        let mut checker = Checker::new(self.mode);
        let detail = SampleDetail::read(&input.sample_detail, &mut checker);
        if let Some(detail) = &detail {
            if checker.is_clean() {
                detail.check(&mut checker);
            }
        }
        if input.location_id.is_none() {
            checker.reject("location_id", "is required");
        }
        if input.condition_id.is_none() {
            checker.reject("condition_id", "is required");
        }
        let ((detail, location_id), condition_id) =
            checker.finish(detail.zip(input.location_id).zip(input.condition_id))?;

        let txn = self.db.begin().await?;
        ensure_location(&txn, location_id).await?;
        ensure_condition(&txn, condition_id).await?;

        let now = Utc::now();
        let sample = ActiveModel {
            sample_detail: Set(to_json(&detail)?),
            location_id: Set(location_id),
            condition_id: Set(condition_id),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        audit::record(
            &txn,
            sample.sample_id,
            AuditAction::Created,
            json!({ "species": detail.species, "location_id": location_id }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            sample_id = sample.sample_id,
            species = %detail.species,
            "Plant sample created"
        );
        Ok(sample)
    }

    pub async fn update(&self, sample_id: i32, changes: SampleChanges) -> BusinessResult<Model> {
        let txn = self.db.begin().await?;
        let sample = find_sample(&txn, sample_id).await?;
        if sample.is_deleted {
            return Err(crate::invalid_state!(
                RESOURCE,
                sample_id,
                "sample is deleted and cannot be updated"
            ));
        }

        let old_detail = sample.detail()?;
        let new_detail = match changes.detail {
            DetailChange::Replace(value) => SampleDetail::parse(&value, self.mode)?,
            DetailChange::Merge(value) => {
                let merged = SampleDetailPatch::parse(&value, self.mode)?.apply(old_detail.clone());
                merged.verify(self.mode)?;
                merged
            }
            DetailChange::Keep => old_detail.clone(),
        };

        let mut active: ActiveModel = sample.into();
        if let Some(location_id) = changes.location_id {
            ensure_location(&txn, location_id).await?;
            active.location_id = Set(location_id);
        }
        if let Some(condition_id) = changes.condition_id {
            ensure_condition(&txn, condition_id).await?;
            active.condition_id = Set(condition_id);
        }
        active.sample_detail = Set(to_json(&new_detail)?);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        audit::record(
            &txn,
            sample_id,
            AuditAction::Updated,
            json!({ "old_detail": old_detail, "new_detail": new_detail }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(sample_id, "Plant sample updated");
        Ok(updated)
    }

    /// Marks the sample deleted; a repeated call reports the earlier deletion
    /// without logging again
    pub async fn soft_delete(&self, sample_id: i32) -> BusinessResult<SoftDeleteResponse> {
        let txn = self.db.begin().await?;
        let sample = find_sample(&txn, sample_id).await?;

        let now = Utc::now();
        let flipped = Entity::update_many()
            .col_expr(Column::IsDeleted, Expr::value(true))
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::SampleId.eq(sample_id))
            .filter(Column::IsDeleted.eq(false))
            .exec(&txn)
            .await?;

        if flipped.rows_affected == 0 {
            tracing::debug!(sample_id, "Plant sample already soft deleted");
            return Ok(SoftDeleteResponse::AlreadyDeleted(DeletedSampleMarker {
                message: "Sample already deleted".to_string(),
                ..DeletedSampleMarker::new(sample_id)
            }));
        }

        let species = sample.species();
        audit::record(
            &txn,
            sample_id,
            AuditAction::Deleted,
            json!({ "species": species }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(sample_id, species = %species, "Plant sample soft deleted");
        Ok(SoftDeleteResponse::Deleted(SoftDeleted {
            message: format!("Sample {sample_id} soft deleted successfully"),
            deleted_sample: DeletedSampleRef {
                sample_id,
                species,
                status: SampleStatus::Deleted,
            },
        }))
    }

    /// Removes the sample, its growth metrics and researcher links for good.
    /// The audit history is kept.
    pub async fn hard_delete(&self, sample_id: i32) -> BusinessResult<HardDeleteResponse> {
        let txn = self.db.begin().await?;
        let sample = find_sample(&txn, sample_id).await?;
        let species = sample.species();

        audit::record(
            &txn,
            sample_id,
            AuditAction::HardDeleted,
            json!({ "species": species, "warning": HARD_DELETE_WARNING }),
        )
        .await?;

        let metrics = growth_metrics::Entity::delete_many()
            .filter(growth_metrics::Column::SampleId.eq(sample_id))
            .exec(&txn)
            .await?;
        let assignments = links::Entity::delete_many()
            .filter(links::Column::SampleId.eq(sample_id))
            .exec(&txn)
            .await?;
        Entity::delete_by_id(sample_id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            sample_id,
            species = %species,
            growth_metrics = metrics.rows_affected,
            researcher_links = assignments.rows_affected,
            "Plant sample permanently deleted"
        );
        Ok(HardDeleteResponse {
            message: format!("Sample {sample_id} permanently deleted from database"),
            deleted_sample: PermanentlyDeletedRef {
                sample_id,
                species,
                deletion_type: "permanent".to_string(),
            },
            warning: "This action cannot be undone. All data has been permanently removed."
                .to_string(),
        })
    }
}

pub(crate) async fn find_sample<C: ConnectionTrait>(conn: &C, sample_id: i32) -> BusinessResult<Model> {
    Entity::find_by_id(sample_id)
        .one(conn)
        .await?
        .ok_or_else(|| crate::not_found!(RESOURCE, sample_id))
}

/// Loads a sample that may still receive child records
pub(crate) async fn find_active_sample<C: ConnectionTrait>(
    conn: &C,
    sample_id: i32,
) -> BusinessResult<Model> {
    let sample = find_sample(conn, sample_id).await?;
    if sample.is_deleted {
        return Err(crate::invalid_state!(
            RESOURCE,
            sample_id,
            "sample is deleted and cannot receive new records"
        ));
    }
    Ok(sample)
}

async fn ensure_location<C: ConnectionTrait>(conn: &C, location_id: i32) -> BusinessResult<()> {
    locations::Entity::find_by_id(location_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| crate::not_found!("Sampling location", location_id))
}

async fn ensure_condition<C: ConnectionTrait>(conn: &C, condition_id: i32) -> BusinessResult<()> {
    conditions::Entity::find_by_id(condition_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| crate::not_found!("Environmental conditions", condition_id))
}

/// Active samples, newest first
pub async fn list_active_samples(
    db: &DatabaseConnection,
    filter: &SampleFilter,
) -> BusinessResult<Vec<SampleSummary>> {
    let mut query = Entity::find().filter(Column::IsDeleted.eq(false));
    if let Some(location_id) = filter.location_id {
        query = query.filter(Column::LocationId.eq(location_id));
    }
    if let Some(condition_id) = filter.condition_id {
        query = query.filter(Column::ConditionId.eq(condition_id));
    }

    let needle = filter
        .species
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    query
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::SampleId)
        .all(db)
        .await?
        .iter()
        .map(SampleSummary::from_model)
        .filter(|summary| match (&needle, summary) {
            (Some(needle), Ok(summary)) => summary.species.to_lowercase().contains(needle),
            _ => true,
        })
        .collect()
}

/// Detail projection, or the deleted marker for a soft-deleted sample
pub async fn load_sample(db: &DatabaseConnection, sample_id: i32) -> BusinessResult<SampleRead> {
    let sample = find_sample(db, sample_id).await?;
    if sample.is_deleted {
        return Ok(SampleRead::Deleted(DeletedSampleMarker::new(sample_id)));
    }
    Ok(SampleRead::Active(Box::new(project_sample(db, sample).await?)))
}

/// Builds the detail projection of an active sample
pub async fn project_sample<C: ConnectionTrait>(conn: &C, sample: Model) -> BusinessResult<Sample> {
    let location = locations::get_one_location(conn, sample.location_id).await?;
    let condition = conditions::get_one_condition(conn, sample.condition_id).await?;

    let researchers = links::Entity::find()
        .filter(links::Column::SampleId.eq(sample.sample_id))
        .find_also_related(researchers::Entity)
        .order_by_asc(links::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|(link, researcher)| {
            researcher.map(|r| AssignedResearcher {
                researcher_id: r.researcher_id,
                name: r.name,
                email: r.email,
                role: link.role,
            })
        })
        .collect();

    let growth_measurements = growth_metrics::Entity::find()
        .filter(growth_metrics::Column::SampleId.eq(sample.sample_id))
        .order_by_desc(growth_metrics::Column::MeasuredAt)
        .order_by_desc(growth_metrics::Column::GrowthId)
        .all(conn)
        .await?;

    Ok(Sample {
        sample_id: sample.sample_id,
        sample_detail: sample.detail()?,
        location_id: sample.location_id,
        location,
        condition_id: sample.condition_id,
        condition,
        researchers,
        growth_measurements,
        status: SampleStatus::Active,
        created_at: sample.created_at,
        updated_at: sample.updated_at,
    })
}
