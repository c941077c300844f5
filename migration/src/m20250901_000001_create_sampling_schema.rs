use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SamplingLocation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SamplingLocation::LocationId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SamplingLocation::LocationData).json().not_null())
                    .col(
                        ColumnDef::new(SamplingLocation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EnvironmentalConditions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnvironmentalConditions::ConditionId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnvironmentalConditions::ConditionData)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnvironmentalConditions::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ResearcherInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResearcherInfo::ResearcherId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ResearcherInfo::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(ResearcherInfo::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ResearcherInfo::Phone).string_len(50).null())
                    .col(ColumnDef::new(ResearcherInfo::Affiliation).string_len(255).null())
                    .col(
                        ColumnDef::new(ResearcherInfo::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlantSample::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlantSample::SampleId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlantSample::SampleDetail).json().not_null())
                    .col(ColumnDef::new(PlantSample::LocationId).integer().not_null())
                    .col(ColumnDef::new(PlantSample::ConditionId).integer().not_null())
                    .col(
                        ColumnDef::new(PlantSample::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlantSample::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PlantSample::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlantSample::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plant_sample_location")
                            .from(PlantSample::Table, PlantSample::LocationId)
                            .to(SamplingLocation::Table, SamplingLocation::LocationId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plant_sample_condition")
                            .from(PlantSample::Table, PlantSample::ConditionId)
                            .to(
                                EnvironmentalConditions::Table,
                                EnvironmentalConditions::ConditionId,
                            )
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SampleResearchers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SampleResearchers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SampleResearchers::SampleId).integer().not_null())
                    .col(
                        ColumnDef::new(SampleResearchers::ResearcherId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SampleResearchers::Role).string_len(100).null())
                    .col(
                        ColumnDef::new(SampleResearchers::AssignedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sample_researchers_sample")
                            .from(SampleResearchers::Table, SampleResearchers::SampleId)
                            .to(PlantSample::Table, PlantSample::SampleId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sample_researchers_researcher")
                            .from(SampleResearchers::Table, SampleResearchers::ResearcherId)
                            .to(ResearcherInfo::Table, ResearcherInfo::ResearcherId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GrowthMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GrowthMetrics::GrowthId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GrowthMetrics::SampleId).integer().not_null())
                    .col(ColumnDef::new(GrowthMetrics::Height).decimal_len(10, 2).null())
                    .col(ColumnDef::new(GrowthMetrics::LeafCount).integer().null())
                    .col(
                        ColumnDef::new(GrowthMetrics::StemDiameter)
                            .decimal_len(10, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(GrowthMetrics::HealthStatus).string_len(50).null())
                    .col(
                        ColumnDef::new(GrowthMetrics::MeasuredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_growth_metrics_sample")
                            .from(GrowthMetrics::Table, GrowthMetrics::SampleId)
                            .to(PlantSample::Table, PlantSample::SampleId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // No foreign key on sample_id: audit history must survive hard deletion
        manager
            .create_table(
                Table::create()
                    .table(SampleAuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SampleAuditLog::LogId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SampleAuditLog::SampleId).integer().null())
                    .col(ColumnDef::new(SampleAuditLog::Action).string_len(50).not_null())
                    .col(
                        ColumnDef::new(SampleAuditLog::PerformedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SampleAuditLog::Details).json().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SampleAuditLog::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GrowthMetrics::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SampleResearchers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlantSample::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ResearcherInfo::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(EnvironmentalConditions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SamplingLocation::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum SamplingLocation {
    Table,
    LocationId,
    LocationData,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum EnvironmentalConditions {
    Table,
    ConditionId,
    ConditionData,
    RecordedAt,
}

#[derive(DeriveIden)]
pub(crate) enum ResearcherInfo {
    Table,
    ResearcherId,
    Name,
    Email,
    Phone,
    Affiliation,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum PlantSample {
    Table,
    SampleId,
    SampleDetail,
    LocationId,
    ConditionId,
    IsDeleted,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum SampleResearchers {
    Table,
    Id,
    SampleId,
    ResearcherId,
    Role,
    AssignedAt,
}

#[derive(DeriveIden)]
pub(crate) enum GrowthMetrics {
    Table,
    GrowthId,
    SampleId,
    Height,
    LeafCount,
    StemDiameter,
    HealthStatus,
    MeasuredAt,
}

#[derive(DeriveIden)]
pub(crate) enum SampleAuditLog {
    Table,
    LogId,
    SampleId,
    Action,
    PerformedAt,
    Details,
}
