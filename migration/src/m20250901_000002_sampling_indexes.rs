use sea_orm_migration::prelude::*;

use crate::m20250901_000001_create_sampling_schema::{
    GrowthMetrics, PlantSample, ResearcherInfo, SampleAuditLog, SampleResearchers,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============ PLANT SAMPLE INDEXES ============
        manager
            .create_index(
                Index::create()
                    .name("idx_sample_location")
                    .table(PlantSample::Table)
                    .col(PlantSample::LocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sample_condition")
                    .table(PlantSample::Table)
                    .col(PlantSample::ConditionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sample_active_created")
                    .table(PlantSample::Table)
                    .col(PlantSample::IsDeleted)
                    .col(PlantSample::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Species lookups go through the JSON payload
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE INDEX IF NOT EXISTS idx_sample_species ON plant_sample ((sample_detail->>'species'))",
                )
                .await?;
        }

        // ============ RESEARCHER INDEXES ============
        manager
            .create_index(
                Index::create()
                    .name("idx_researcher_name")
                    .table(ResearcherInfo::Table)
                    .col(ResearcherInfo::Name)
                    .to_owned(),
            )
            .await?;

        // ============ SAMPLE RESEARCHERS INDEXES ============
        manager
            .create_index(
                Index::create()
                    .name("uq_sample_researchers_pair")
                    .table(SampleResearchers::Table)
                    .col(SampleResearchers::SampleId)
                    .col(SampleResearchers::ResearcherId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sample_res_researcher")
                    .table(SampleResearchers::Table)
                    .col(SampleResearchers::ResearcherId)
                    .to_owned(),
            )
            .await?;

        // ============ GROWTH METRICS INDEXES ============
        manager
            .create_index(
                Index::create()
                    .name("idx_growth_metrics_sample")
                    .table(GrowthMetrics::Table)
                    .col(GrowthMetrics::SampleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_growth_metrics_measured_at")
                    .table(GrowthMetrics::Table)
                    .col(GrowthMetrics::MeasuredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_growth_metrics_health")
                    .table(GrowthMetrics::Table)
                    .col(GrowthMetrics::HealthStatus)
                    .to_owned(),
            )
            .await?;

        // ============ AUDIT LOG INDEXES ============
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_sample")
                    .table(SampleAuditLog::Table)
                    .col(SampleAuditLog::SampleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_performed_at")
                    .table(SampleAuditLog::Table)
                    .col(SampleAuditLog::PerformedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared("DROP INDEX IF EXISTS idx_sample_species")
                .await?;
        }

        let indexes = [
            "idx_sample_location",
            "idx_sample_condition",
            "idx_sample_active_created",
            "idx_researcher_name",
            "uq_sample_researchers_pair",
            "idx_sample_res_researcher",
            "idx_growth_metrics_sample",
            "idx_growth_metrics_measured_at",
            "idx_growth_metrics_health",
            "idx_audit_log_sample",
            "idx_audit_log_performed_at",
        ];

        for name in indexes {
            manager
                .drop_index(Index::drop().name(name).if_exists().to_owned())
                .await?;
        }

        Ok(())
    }
}
