//! On-demand inactivity scan for the dashboard.
//!
//! A pure read-side classification: a startup's `status` is only ever set to
//! INACTIVE by an explicit admin action, never by this scan.

use chrono::{DateTime, Duration, Utc};
use entity::startup;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct InactiveStartup {
    pub startup: startup::Model,
    pub last_activity_at: DateTimeWithTimeZone,
    pub days_since_activity: i64,
}

/// Most recent touch. `updated_at` normally wins; a freshly created row falls
/// back to `created_at`.
pub fn last_activity(model: &startup::Model) -> DateTimeWithTimeZone {
    model.updated_at.max(model.created_at)
}

/// Candidate iff still in the pipeline, not already exited, and untouched for
/// strictly longer than the window. Exactly-on-the-boundary is not inactive.
pub fn is_candidate(model: &startup::Model, now: DateTime<Utc>, window: Duration) -> bool {
    model.stage.in_pipeline()
        && !model.status.has_exited()
        && now.signed_duration_since(last_activity(model)) > window
}

pub fn classify(
    startups: Vec<startup::Model>,
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<InactiveStartup> {
    let window = Duration::days(window_days);
    startups
        .into_iter()
        .filter(|model| is_candidate(model, now, window))
        .map(|model| {
            let last_activity_at = last_activity(&model);
            let days_since_activity = now
                .signed_duration_since(last_activity_at)
                .num_days();
            InactiveStartup {
                startup: model,
                last_activity_at,
                days_since_activity,
            }
        })
        .collect()
}

/// Loads every startup and classifies in memory; the incubator portfolio is
/// small enough that filtering in the store buys nothing.
pub async fn scan(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<Vec<InactiveStartup>, DbErr> {
    let rows = startup::Entity::find().all(db).await?;
    Ok(classify(rows, now, window_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::startup::{Stage, Status};
    use uuid::Uuid;

    fn model(stage: Stage, status: Status, age: Duration) -> startup::Model {
        let now = Utc::now();
        let touched: DateTimeWithTimeZone = (now - age).into();
        startup::Model {
            id: Uuid::new_v4(),
            name: "Acme Robotics".into(),
            code: "ACM-01".into(),
            founder_name: "Jo Founder".into(),
            email: None,
            phone: None,
            sector: None,
            description: None,
            stage,
            status,
            rejected_from_stage: None,
            registered_date: now.date_naive(),
            onboarded_date: None,
            graduated_date: None,
            rejected_date: None,
            quit_date: None,
            created_at: touched,
            updated_at: touched,
        }
    }

    #[test]
    fn exactly_thirty_days_is_not_inactive() {
        let now = Utc::now();
        let subject = model(Stage::S1, Status::Active, Duration::days(30));
        assert!(!is_candidate(&subject, now, Duration::days(30)));
    }

    #[test]
    fn one_second_past_the_window_is_inactive() {
        let now = Utc::now();
        let subject = model(
            Stage::S1,
            Status::Active,
            Duration::days(30) + Duration::seconds(1),
        );
        assert!(is_candidate(&subject, now, Duration::days(30)));
        let flagged = classify(vec![subject], now, 30);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].days_since_activity, 30);
    }

    #[test]
    fn exited_startups_are_never_flagged() {
        let now = Utc::now();
        for status in [Status::Onboarded, Status::Graduated, Status::Rejected] {
            let subject = model(Stage::S2, status, Duration::days(90));
            assert!(!is_candidate(&subject, now, Duration::days(30)));
        }
    }

    #[test]
    fn startups_outside_the_pipeline_are_skipped() {
        let now = Utc::now();
        let subject = model(Stage::Graduated, Status::Quit, Duration::days(90));
        assert!(!is_candidate(&subject, now, Duration::days(30)));
    }

    #[test]
    fn later_created_at_wins_as_last_activity() {
        let now = Utc::now();
        let mut subject = model(Stage::S0, Status::Active, Duration::days(45));
        // Row created after its last update (import scenario): created_at is
        // the activity marker.
        subject.created_at = (now - Duration::days(3)).into();
        assert_eq!(last_activity(&subject), subject.created_at);
        assert!(!is_candidate(&subject, now, Duration::days(30)));
    }

    #[test]
    fn days_since_activity_floors() {
        let now = Utc::now();
        let subject = model(
            Stage::S3,
            Status::Active,
            Duration::days(41) + Duration::hours(23),
        );
        let flagged = classify(vec![subject], now, 30);
        assert_eq!(flagged[0].days_since_activity, 41);
    }
}
