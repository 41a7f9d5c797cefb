//! Stage/status state machine for startups.
//!
//! Every operation here runs as one database transaction: a meeting is never
//! marked completed without the matching stage update and pitch record, and a
//! status change never lands without its ledger entry.

use chrono::{NaiveDate, Utc};
use entity::scheduled_meeting::{self, Kind as MeetingKind, Status as MeetingStatus};
use entity::startup::{self, Stage, Status};
use entity::{one_on_one_record, pitch_record, stage_history};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, QueryFilter, TransactionTrait,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Ledger label for the synthetic "before registration" state.
pub const REGISTERED_LABEL: &str = "REGISTERED";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("slot {date} {time_slot} is already booked by {startup_name}")]
    SlotConflict {
        date: NaiveDate,
        time_slot: String,
        startup_id: Uuid,
        startup_name: String,
        startup_code: String,
        founder_name: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Db(#[from] DbErr),
}

fn validation(message: impl Into<String>) -> LifecycleError {
    LifecycleError::Validation(message.into())
}

fn required(field: &'static str, value: &str) -> Result<String, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct RegisterStartup {
    pub name: String,
    pub code: String,
    pub founder_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub registered_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct BookMeeting {
    pub startup_id: Uuid,
    pub kind: MeetingKind,
    pub date: NaiveDate,
    pub time_slot: String,
}

#[derive(Debug, Clone)]
pub struct CompletionData {
    pub panelist_name: String,
    pub time: String,
    pub feedback: String,
}

#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub reason: Option<String>,
    pub effective_date: Option<NaiveDate>,
}

/// Creates the startup in stage S0 / status ACTIVE and opens its ledger.
pub async fn register_startup(
    db: &DatabaseConnection,
    input: RegisterStartup,
    performed_by: Option<String>,
) -> Result<startup::Model, LifecycleError> {
    let name = required("name", &input.name)?;
    let code = required("code", &input.code)?;
    let founder_name = required("founderName", &input.founder_name)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let registered_date = input.registered_date.unwrap_or_else(|| Utc::now().date_naive());
    let startup_id = Uuid::new_v4();

    let txn = db.begin().await?;
    // insert + reload instead of the returning insert: sqlite cannot hand
    // back a text Uuid primary key as last_insert_id.
    startup::Entity::insert(startup::ActiveModel {
        id: Set(startup_id),
        name: Set(name),
        code: Set(code),
        founder_name: Set(founder_name),
        email: Set(input.email),
        phone: Set(input.phone),
        sector: Set(input.sector),
        description: Set(input.description),
        stage: Set(Stage::S0),
        status: Set(Status::Active),
        rejected_from_stage: Set(None),
        registered_date: Set(registered_date),
        onboarded_date: Set(None),
        graduated_date: Set(None),
        rejected_date: Set(None),
        quit_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .exec_without_returning(&txn)
    .await?;
    append_history(
        &txn,
        startup_id,
        REGISTERED_LABEL,
        Stage::S0.as_label(),
        Some("registered".into()),
        performed_by,
        now,
    )
    .await?;
    txn.commit().await?;

    let model = startup::Entity::find_by_id(startup_id)
        .one(db)
        .await?
        .ok_or(LifecycleError::NotFound("startup"))?;
    info!(startup = %model.code, "registered startup");
    Ok(model)
}

/// Books a clinic slot. A SCHEDULED meeting already holding the same
/// `(date, time_slot)` pair rejects the booking, naming the holder so the
/// caller can surface a meaningful conflict.
pub async fn book_meeting(
    db: &DatabaseConnection,
    input: BookMeeting,
) -> Result<scheduled_meeting::Model, LifecycleError> {
    let time_slot = required("timeSlot", &input.time_slot)?;

    let txn = db.begin().await?;
    let owner = startup::Entity::find_by_id(input.startup_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::NotFound("startup"))?;
    if let Some(conflict) = find_slot_conflict(&txn, input.date, &time_slot).await? {
        return Err(conflict);
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let meeting_id = Uuid::new_v4();
    let insert = scheduled_meeting::Entity::insert(scheduled_meeting::ActiveModel {
        id: Set(meeting_id),
        startup_id: Set(owner.id),
        kind: Set(input.kind),
        meeting_date: Set(input.date),
        time_slot: Set(time_slot.clone()),
        status: Set(MeetingStatus::Scheduled),
        panelist_name: Set(None),
        completed_time: Set(None),
        feedback: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .exec_without_returning(&txn)
    .await;
    match insert {
        Ok(_) => {}
        // The partial unique index closes the check-then-act window the
        // application-level lookup leaves open under concurrent bookings.
        Err(err) if is_unique_violation(&err) => {
            let conflict = find_slot_conflict(&txn, input.date, &time_slot)
                .await?
                .unwrap_or(LifecycleError::Db(err));
            return Err(conflict);
        }
        Err(err) => return Err(err.into()),
    }
    txn.commit().await?;
    scheduled_meeting::Entity::find_by_id(meeting_id)
        .one(db)
        .await?
        .ok_or(LifecycleError::NotFound("meeting"))
}

async fn find_slot_conflict(
    txn: &DatabaseTransaction,
    date: NaiveDate,
    time_slot: &str,
) -> Result<Option<LifecycleError>, LifecycleError> {
    let existing = scheduled_meeting::Entity::find()
        .filter(scheduled_meeting::Column::MeetingDate.eq(date))
        .filter(scheduled_meeting::Column::TimeSlot.eq(time_slot))
        .filter(scheduled_meeting::Column::Status.eq(MeetingStatus::Scheduled))
        .one(txn)
        .await?;
    let Some(existing) = existing else {
        return Ok(None);
    };
    let holder = startup::Entity::find_by_id(existing.startup_id)
        .one(txn)
        .await?
        .ok_or(LifecycleError::NotFound("startup"))?;
    Ok(Some(LifecycleError::SlotConflict {
        date,
        time_slot: time_slot.to_string(),
        startup_id: holder.id,
        startup_name: holder.name,
        startup_code: holder.code,
        founder_name: holder.founder_name,
    }))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

/// Marks a scheduled meeting done. Completion data is validated before any
/// write; the stage update, history record and meeting flip happen together
/// or not at all.
pub async fn complete_meeting(
    db: &DatabaseConnection,
    meeting_id: Uuid,
    data: CompletionData,
    performed_by: Option<String>,
) -> Result<(scheduled_meeting::Model, startup::Model), LifecycleError> {
    let panelist_name = required("panelistName", &data.panelist_name)?;
    let time = required("time", &data.time)?;
    let feedback = required("feedback", &data.feedback)?;

    let txn = db.begin().await?;
    let meeting = scheduled_meeting::Entity::find_by_id(meeting_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::NotFound("meeting"))?;
    if meeting.status != MeetingStatus::Scheduled {
        return Err(validation("meeting is already completed"));
    }
    let subject = startup::Entity::find_by_id(meeting.startup_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::NotFound("startup"))?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let from_stage = subject.stage;
    let new_stage = match meeting.kind {
        kind if kind.is_pitch() => from_stage.pitch_successor().unwrap_or(from_stage),
        // One-on-one clinics pull the startup out of the pitch chain.
        _ if matches!(from_stage, Stage::S0 | Stage::S1 | Stage::S2 | Stage::S3) => Stage::OneOnOne,
        _ => from_stage,
    };

    if meeting.kind.is_pitch() {
        pitch_record::Entity::insert(pitch_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            startup_id: Set(subject.id),
            stage: Set(new_stage),
            pitch_date: Set(meeting.meeting_date),
            time: Set(time.clone()),
            panelist_name: Set(panelist_name.clone()),
            feedback: Set(feedback.clone()),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await?;
    } else {
        one_on_one_record::Entity::insert(one_on_one_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            startup_id: Set(subject.id),
            session_date: Set(meeting.meeting_date),
            time: Set(time.clone()),
            mentor_name: Set(panelist_name.clone()),
            notes: Set(Some(feedback.clone())),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await?;
    }

    let subject_id = subject.id;
    let mut active: startup::ActiveModel = subject.into();
    if new_stage != from_stage {
        active.stage = Set(new_stage);
    }
    active.updated_at = Set(now);
    let updated_startup = active.update(&txn).await?;

    if new_stage != from_stage {
        append_history(
            &txn,
            subject_id,
            from_stage.as_label(),
            new_stage.as_label(),
            Some(match meeting.kind {
                MeetingKind::Smc => "SMC session completed".into(),
                MeetingKind::Fmc => "FMC session completed".into(),
                MeetingKind::OneOnOne => "one-on-one session completed".into(),
            }),
            performed_by,
            now,
        )
        .await?;
    }

    let mut meeting_active: scheduled_meeting::ActiveModel = meeting.into();
    meeting_active.status = Set(MeetingStatus::Completed);
    meeting_active.panelist_name = Set(Some(panelist_name));
    meeting_active.completed_time = Set(Some(time));
    meeting_active.feedback = Set(Some(feedback));
    meeting_active.updated_at = Set(now);
    let updated_meeting = meeting_active.update(&txn).await?;

    txn.commit().await?;
    info!(
        startup = %updated_startup.code,
        from = from_stage.as_label(),
        to = new_stage.as_label(),
        "completed meeting"
    );
    Ok((updated_meeting, updated_startup))
}

/// "Not Done": the booking is dropped entirely. No stage change, no ledger
/// entry; this is a cancellation, not a failure state.
pub async fn cancel_meeting(
    db: &DatabaseConnection,
    meeting_id: Uuid,
) -> Result<(), LifecycleError> {
    let meeting = scheduled_meeting::Entity::find_by_id(meeting_id)
        .one(db)
        .await?
        .ok_or(LifecycleError::NotFound("meeting"))?;
    if meeting.status != MeetingStatus::Scheduled {
        return Err(validation("only scheduled meetings can be marked not done"));
    }
    scheduled_meeting::Entity::delete_by_id(meeting_id)
        .exec(db)
        .await?;
    Ok(())
}

/// Explicit admin transition: Onboard, Graduate, Reject, Mark Inactive or
/// Mark Quit. Idempotent: re-applying the current status refreshes
/// `updated_at` but appends no ledger entry.
pub async fn change_status(
    db: &DatabaseConnection,
    startup_id: Uuid,
    target: Status,
    change: StatusChange,
    performed_by: Option<String>,
) -> Result<startup::Model, LifecycleError> {
    if target == Status::Active {
        return Err(validation("ACTIVE is the initial status, not a transition target"));
    }

    let txn = db.begin().await?;
    let subject = startup::Entity::find_by_id(startup_id)
        .one(&txn)
        .await?
        .ok_or(LifecycleError::NotFound("startup"))?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    if subject.status == target {
        let mut active: startup::ActiveModel = subject.into();
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        return Ok(updated);
    }

    let from_label = if subject.status == Status::Active {
        subject.stage.as_label()
    } else {
        subject.status.as_label()
    };
    let effective = change.effective_date.unwrap_or_else(|| Utc::now().date_naive());
    let current_stage = subject.stage;

    let mut active: startup::ActiveModel = subject.into();
    active.status = Set(target);
    active.updated_at = Set(now);
    match target {
        Status::Onboarded => active.onboarded_date = Set(Some(effective)),
        Status::Graduated => {
            active.graduated_date = Set(Some(effective));
            active.stage = Set(Stage::Graduated);
        }
        Status::Rejected => {
            active.rejected_date = Set(Some(effective));
            active.rejected_from_stage = Set(Some(current_stage));
        }
        Status::Quit => {
            active.quit_date = Set(Some(effective));
            active.stage = Set(Stage::Quit);
        }
        Status::Inactive | Status::Active => {}
    }
    let updated = active.update(&txn).await?;

    append_history(
        &txn,
        startup_id,
        from_label,
        target.as_label(),
        change.reason,
        performed_by,
        now,
    )
    .await?;
    txn.commit().await?;
    info!(
        startup = %updated.code,
        from = from_label,
        to = target.as_label(),
        "status changed"
    );
    Ok(updated)
}

async fn append_history<C: ConnectionTrait>(
    conn: &C,
    startup_id: Uuid,
    from_label: &str,
    to_label: &str,
    reason: Option<String>,
    performed_by: Option<String>,
    at: DateTimeWithTimeZone,
) -> Result<(), DbErr> {
    stage_history::Entity::insert(stage_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        startup_id: Set(startup_id),
        from_label: Set(from_label.to_string()),
        to_label: Set(to_label.to_string()),
        reason: Set(reason),
        performed_by: Set(performed_by),
        created_at: Set(at),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_successor_advances_one_step_and_stops_at_s3() {
        assert_eq!(Stage::S0.pitch_successor(), Some(Stage::S1));
        assert_eq!(Stage::S1.pitch_successor(), Some(Stage::S2));
        assert_eq!(Stage::S2.pitch_successor(), Some(Stage::S3));
        assert_eq!(Stage::S3.pitch_successor(), None);
        assert_eq!(Stage::OneOnOne.pitch_successor(), None);
        assert_eq!(Stage::Graduated.pitch_successor(), None);
        assert_eq!(Stage::Quit.pitch_successor(), None);
    }

    #[test]
    fn pitch_chain_is_monotone() {
        // Repeatedly applying the successor map never skips or regresses.
        let order = |s: Stage| match s {
            Stage::S0 => 0,
            Stage::S1 => 1,
            Stage::S2 => 2,
            Stage::S3 => 3,
            _ => unreachable!(),
        };
        let mut stage = Stage::S0;
        let mut seen = vec![stage];
        while let Some(next) = stage.pitch_successor() {
            assert_eq!(order(next), order(stage) + 1);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(stage, Stage::S3);
    }

    #[test]
    fn pipeline_membership() {
        for stage in [Stage::S0, Stage::S1, Stage::S2, Stage::S3, Stage::OneOnOne] {
            assert!(stage.in_pipeline());
        }
        assert!(!Stage::Graduated.in_pipeline());
        assert!(!Stage::Quit.in_pipeline());
    }

    #[test]
    fn exited_statuses() {
        assert!(Status::Onboarded.has_exited());
        assert!(Status::Graduated.has_exited());
        assert!(Status::Rejected.has_exited());
        assert!(!Status::Active.has_exited());
        assert!(!Status::Inactive.has_exited());
        assert!(!Status::Quit.has_exited());
    }

    #[test]
    fn required_rejects_blank_fields() {
        assert!(required("feedback", "   ").is_err());
        assert_eq!(required("feedback", " ok ").unwrap(), "ok");
    }
}
