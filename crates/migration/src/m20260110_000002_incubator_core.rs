use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Startup {
    Table,
    Id,
    Name,
    Code,
    FounderName,
    Email,
    Phone,
    Sector,
    Description,
    Stage,
    Status,
    RejectedFromStage,
    RegisteredDate,
    OnboardedDate,
    GraduatedDate,
    RejectedDate,
    QuitDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ScheduledMeeting {
    Table,
    Id,
    StartupId,
    Kind,
    MeetingDate,
    TimeSlot,
    Status,
    PanelistName,
    CompletedTime,
    Feedback,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StageHistory {
    Table,
    Id,
    StartupId,
    FromLabel,
    ToLabel,
    Reason,
    PerformedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StartupStageEnum {
    #[sea_orm(iden = "startup_stage")]
    Table,
}

#[derive(DeriveIden)]
enum StartupStatusEnum {
    #[sea_orm(iden = "startup_status")]
    Table,
}

#[derive(DeriveIden)]
enum MeetingKindEnum {
    #[sea_orm(iden = "meeting_kind")]
    Table,
}

#[derive(DeriveIden)]
enum MeetingStatusEnum {
    #[sea_orm(iden = "meeting_status")]
    Table,
}

const STARTUP_STAGE_VALUES: &[&str] =
    &["S0", "S1", "S2", "S3", "ONE_ON_ONE", "GRADUATED", "QUIT"];
const STARTUP_STATUS_VALUES: &[&str] = &[
    "ACTIVE",
    "ONBOARDED",
    "GRADUATED",
    "REJECTED",
    "INACTIVE",
    "QUIT",
];
const MEETING_KIND_VALUES: &[&str] = &["SMC", "FMC", "ONE_ON_ONE"];
const MEETING_STATUS_VALUES: &[&str] = &["SCHEDULED", "COMPLETED"];

fn create_enum_sql(name: &str, values: &[&str]) -> String {
    format!(
        "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = '{}') THEN CREATE TYPE {} AS ENUM ({}); END IF; END $$;",
        name,
        name,
        values
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, values) in [
            ("startup_stage", STARTUP_STAGE_VALUES),
            ("startup_status", STARTUP_STATUS_VALUES),
            ("meeting_kind", MEETING_KIND_VALUES),
            ("meeting_status", MEETING_STATUS_VALUES),
        ] {
            manager
                .get_connection()
                .execute_unprepared(&create_enum_sql(name, values))
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Startup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Startup::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Startup::Name).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Startup::Code)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Startup::FounderName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Startup::Email).string_len(320))
                    .col(ColumnDef::new(Startup::Phone).string_len(64))
                    .col(ColumnDef::new(Startup::Sector).string_len(128))
                    .col(ColumnDef::new(Startup::Description).text())
                    .col(
                        ColumnDef::new(Startup::Stage)
                            .custom(StartupStageEnum::Table)
                            .not_null()
                            .default(Expr::cust("'S0'::startup_stage")),
                    )
                    .col(
                        ColumnDef::new(Startup::Status)
                            .custom(StartupStatusEnum::Table)
                            .not_null()
                            .default(Expr::cust("'ACTIVE'::startup_status")),
                    )
                    .col(
                        ColumnDef::new(Startup::RejectedFromStage)
                            .custom(StartupStageEnum::Table),
                    )
                    .col(ColumnDef::new(Startup::RegisteredDate).date().not_null())
                    .col(ColumnDef::new(Startup::OnboardedDate).date())
                    .col(ColumnDef::new(Startup::GraduatedDate).date())
                    .col(ColumnDef::new(Startup::RejectedDate).date())
                    .col(ColumnDef::new(Startup::QuitDate).date())
                    .col(
                        ColumnDef::new(Startup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Startup::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_startup_stage")
                    .table(Startup::Table)
                    .col(Startup::Stage)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_startup_status")
                    .table(Startup::Table)
                    .col(Startup::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduledMeeting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduledMeeting::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::StartupId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::Kind)
                            .custom(MeetingKindEnum::Table)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::MeetingDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::TimeSlot)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::Status)
                            .custom(MeetingStatusEnum::Table)
                            .not_null()
                            .default(Expr::cust("'SCHEDULED'::meeting_status")),
                    )
                    .col(ColumnDef::new(ScheduledMeeting::PanelistName).string_len(256))
                    .col(ColumnDef::new(ScheduledMeeting::CompletedTime).string_len(32))
                    .col(ColumnDef::new(ScheduledMeeting::Feedback).text())
                    .col(
                        ColumnDef::new(ScheduledMeeting::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(ScheduledMeeting::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_startup")
                            .from(ScheduledMeeting::Table, ScheduledMeeting::StartupId)
                            .to(Startup::Table, Startup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_meeting_startup")
                    .table(ScheduledMeeting::Table)
                    .col(ScheduledMeeting::StartupId)
                    .to_owned(),
            )
            .await?;

        // The store-level guarantee behind the no-double-booking rule: the
        // application-level check alone is a check-then-act race under
        // concurrent bookings for the same slot.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uniq_meeting_slot_scheduled \
                 ON scheduled_meeting (meeting_date, time_slot) \
                 WHERE status = 'SCHEDULED';",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StageHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StageHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(StageHistory::StartupId).uuid().not_null())
                    .col(
                        ColumnDef::new(StageHistory::FromLabel)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StageHistory::ToLabel)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StageHistory::Reason).text())
                    .col(ColumnDef::new(StageHistory::PerformedBy).string_len(256))
                    .col(
                        ColumnDef::new(StageHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stage_history_startup")
                            .from(StageHistory::Table, StageHistory::StartupId)
                            .to(Startup::Table, Startup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stage_history_startup")
                    .table(StageHistory::Table)
                    .col(StageHistory::StartupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stage_history_from")
                    .table(StageHistory::Table)
                    .col(StageHistory::FromLabel)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StageHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScheduledMeeting::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Startup::Table).to_owned())
            .await?;
        for name in [
            "meeting_status",
            "meeting_kind",
            "startup_status",
            "startup_stage",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TYPE IF EXISTS {};", name))
                .await?;
        }
        Ok(())
    }
}
