use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Startup {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PitchRecord {
    Table,
    Id,
    StartupId,
    Stage,
    PitchDate,
    Time,
    PanelistName,
    Feedback,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OneOnOneRecord {
    Table,
    Id,
    StartupId,
    SessionDate,
    Time,
    MentorName,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Achievement {
    Table,
    Id,
    StartupId,
    Kind,
    Title,
    Description,
    Issuer,
    ReferenceNo,
    AchievedOn,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RevenueEntry {
    Table,
    Id,
    StartupId,
    AmountCents,
    Currency,
    Period,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProgressSnapshot {
    Table,
    Id,
    StartupId,
    RecordedOn,
    Summary,
    TeamSize,
    Customers,
    MonthlyRevenueCents,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StartupStageEnum {
    #[sea_orm(iden = "startup_stage")]
    Table,
}

#[derive(DeriveIden)]
enum AchievementKindEnum {
    #[sea_orm(iden = "achievement_kind")]
    Table,
}

const ACHIEVEMENT_KIND_VALUES: &[&str] =
    &["PATENT", "AWARD", "SUCCESS_GOAL", "UPGRADE", "UPDATE"];

fn startup_fk(name: &str, table: impl IntoTableRef, column: impl IntoIden) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Startup::Table, Startup::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_enum_sql = format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'achievement_kind') THEN CREATE TYPE achievement_kind AS ENUM ({}); END IF; END $$;",
            ACHIEVEMENT_KIND_VALUES
                .iter()
                .map(|v| format!("'{}'", v))
                .collect::<Vec<_>>()
                .join(", ")
        );
        manager
            .get_connection()
            .execute_unprepared(&create_enum_sql)
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PitchRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PitchRecord::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(PitchRecord::StartupId).uuid().not_null())
                    .col(
                        ColumnDef::new(PitchRecord::Stage)
                            .custom(StartupStageEnum::Table)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PitchRecord::PitchDate).date().not_null())
                    .col(
                        ColumnDef::new(PitchRecord::Time)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PitchRecord::PanelistName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PitchRecord::Feedback).text().not_null())
                    .col(
                        ColumnDef::new(PitchRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(&mut startup_fk(
                        "fk_pitch_record_startup",
                        PitchRecord::Table,
                        PitchRecord::StartupId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pitch_record_startup")
                    .table(PitchRecord::Table)
                    .col(PitchRecord::StartupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OneOnOneRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OneOnOneRecord::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(OneOnOneRecord::StartupId).uuid().not_null())
                    .col(
                        ColumnDef::new(OneOnOneRecord::SessionDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OneOnOneRecord::Time)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OneOnOneRecord::MentorName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OneOnOneRecord::Notes).text())
                    .col(
                        ColumnDef::new(OneOnOneRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(&mut startup_fk(
                        "fk_one_on_one_record_startup",
                        OneOnOneRecord::Table,
                        OneOnOneRecord::StartupId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_one_on_one_record_startup")
                    .table(OneOnOneRecord::Table)
                    .col(OneOnOneRecord::StartupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Achievement::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Achievement::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Achievement::StartupId).uuid().not_null())
                    .col(
                        ColumnDef::new(Achievement::Kind)
                            .custom(AchievementKindEnum::Table)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Achievement::Title)
                            .string_len(300)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Achievement::Description).text())
                    .col(ColumnDef::new(Achievement::Issuer).string_len(256))
                    .col(ColumnDef::new(Achievement::ReferenceNo).string_len(128))
                    .col(ColumnDef::new(Achievement::AchievedOn).date())
                    .col(
                        ColumnDef::new(Achievement::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(&mut startup_fk(
                        "fk_achievement_startup",
                        Achievement::Table,
                        Achievement::StartupId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_achievement_startup")
                    .table(Achievement::Table)
                    .col(Achievement::StartupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RevenueEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RevenueEntry::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(RevenueEntry::StartupId).uuid().not_null())
                    .col(
                        ColumnDef::new(RevenueEntry::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RevenueEntry::Currency)
                            .string_len(3)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RevenueEntry::Period).date().not_null())
                    .col(ColumnDef::new(RevenueEntry::Note).text())
                    .col(
                        ColumnDef::new(RevenueEntry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(&mut startup_fk(
                        "fk_revenue_entry_startup",
                        RevenueEntry::Table,
                        RevenueEntry::StartupId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_revenue_entry_startup")
                    .table(RevenueEntry::Table)
                    .col(RevenueEntry::StartupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProgressSnapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProgressSnapshot::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(ProgressSnapshot::StartupId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProgressSnapshot::RecordedOn)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProgressSnapshot::Summary).text().not_null())
                    .col(ColumnDef::new(ProgressSnapshot::TeamSize).integer())
                    .col(ColumnDef::new(ProgressSnapshot::Customers).integer())
                    .col(
                        ColumnDef::new(ProgressSnapshot::MonthlyRevenueCents)
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(ProgressSnapshot::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(&mut startup_fk(
                        "fk_progress_snapshot_startup",
                        ProgressSnapshot::Table,
                        ProgressSnapshot::StartupId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_progress_snapshot_startup")
                    .table(ProgressSnapshot::Table)
                    .col(ProgressSnapshot::StartupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProgressSnapshot::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RevenueEntry::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Achievement::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OneOnOneRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PitchRecord::Table).to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS achievement_kind;")
            .await
            .map(|_| ())
    }
}
