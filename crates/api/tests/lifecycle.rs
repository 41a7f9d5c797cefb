use std::sync::Arc;

use api::auth::{AuthConfig, CurrentUser, UserRole};
use api::schema::{build_schema, AppSchema, InactivityConfig};
use async_graphql::{Request, ServerError, Value as GqlValue, Variables};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use serde_json::{json, Value};
use uuid::Uuid;

struct LifecycleTestEnv {
    schema: async_graphql::Schema<
        api::schema::QueryRoot,
        api::schema::MutationRoot,
        async_graphql::EmptySubscription,
    >,
}

async fn setup_env() -> LifecycleTestEnv {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let auth = Arc::new(AuthConfig {
        jwt_secret: "test-secret".into(),
        local_auth_enabled: true,
        session_ttl_minutes: 15,
    });
    let AppSchema(schema) = build_schema(db, auth, InactivityConfig::default());
    LifecycleTestEnv { schema }
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE startup (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            founder_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            sector TEXT,
            description TEXT,
            stage TEXT NOT NULL DEFAULT 'S0',
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            rejected_from_stage TEXT,
            registered_date TEXT NOT NULL,
            onboarded_date TEXT,
            graduated_date TEXT,
            rejected_date TEXT,
            quit_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE scheduled_meeting (
            id TEXT PRIMARY KEY,
            startup_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            meeting_date TEXT NOT NULL,
            time_slot TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'SCHEDULED',
            panelist_name TEXT,
            completed_time TEXT,
            feedback TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(startup_id) REFERENCES startup(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "CREATE UNIQUE INDEX uniq_meeting_slot_scheduled
         ON scheduled_meeting (meeting_date, time_slot) WHERE status = 'SCHEDULED';",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE stage_history (
            id TEXT PRIMARY KEY,
            startup_id TEXT NOT NULL,
            from_label TEXT NOT NULL,
            to_label TEXT NOT NULL,
            reason TEXT,
            performed_by TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(startup_id) REFERENCES startup(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE pitch_record (
            id TEXT PRIMARY KEY,
            startup_id TEXT NOT NULL,
            stage TEXT NOT NULL,
            pitch_date TEXT NOT NULL,
            time TEXT NOT NULL,
            panelist_name TEXT NOT NULL,
            feedback TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(startup_id) REFERENCES startup(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE one_on_one_record (
            id TEXT PRIMARY KEY,
            startup_id TEXT NOT NULL,
            session_date TEXT NOT NULL,
            time TEXT NOT NULL,
            mentor_name TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(startup_id) REFERENCES startup(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE achievement (
            id TEXT PRIMARY KEY,
            startup_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            issuer TEXT,
            reference_no TEXT,
            achieved_on TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(startup_id) REFERENCES startup(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();
}

const REGISTER: &str = r#"
    mutation Register($input: RegisterStartupInput!) {
        incubator { registerStartup(input: $input) {
            id name code stage status registeredDate
        } }
    }
"#;

const BOOK: &str = r#"
    mutation Book($input: BookMeetingInput!) {
        incubator { bookMeeting(input: $input) { id status kind date timeSlot } }
    }
"#;

const COMPLETE: &str = r#"
    mutation Complete($id: ID!, $input: CompleteMeetingInput!) {
        incubator { completeMeeting(id: $id, input: $input) {
            meeting { id status panelistName feedback }
            startup { id stage status }
        } }
    }
"#;

const HISTORY: &str = r#"
    query History($startupId: ID) {
        incubator { stageHistory(startupId: $startupId) {
            fromLabel toLabel reason
        } }
    }
"#;

async fn register_startup(env: &LifecycleTestEnv, name: &str, code: &str) -> String {
    let resp = exec(
        &env.schema,
        REGISTER,
        json!({ "input": { "name": name, "code": code, "founderName": "Jo Founder" } }),
    )
    .await;
    assert!(
        resp.errors.is_empty(),
        "unexpected errors: {:?}",
        resp.errors
    );
    resp.data.into_json().unwrap()["incubator"]["registerStartup"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn book_meeting(
    env: &LifecycleTestEnv,
    startup_id: &str,
    kind: &str,
    date: &str,
    slot: &str,
) -> String {
    let resp = exec(
        &env.schema,
        BOOK,
        json!({ "input": {
            "startupId": startup_id,
            "kind": kind,
            "date": date,
            "timeSlot": slot
        } }),
    )
    .await;
    assert!(
        resp.errors.is_empty(),
        "unexpected errors: {:?}",
        resp.errors
    );
    resp.data.into_json().unwrap()["incubator"]["bookMeeting"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn complete_meeting(env: &LifecycleTestEnv, meeting_id: &str) -> Value {
    let resp = exec(
        &env.schema,
        COMPLETE,
        json!({ "id": meeting_id, "input": {
            "panelistName": "Panelist P",
            "time": "10:30",
            "feedback": "solid progress"
        } }),
    )
    .await;
    assert!(
        resp.errors.is_empty(),
        "unexpected errors: {:?}",
        resp.errors
    );
    resp.data.into_json().unwrap()["incubator"]["completeMeeting"].clone()
}

async fn history_for(env: &LifecycleTestEnv, startup_id: &str) -> Vec<Value> {
    let resp = exec(&env.schema, HISTORY, json!({ "startupId": startup_id })).await;
    assert!(resp.errors.is_empty());
    resp.data.into_json().unwrap()["incubator"]["stageHistory"]
        .as_array()
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn registration_opens_the_ledger_at_s0() {
    let env = setup_env().await;
    let resp = exec(
        &env.schema,
        REGISTER,
        json!({ "input": {
            "name": "Acme Robotics",
            "code": "ACM-01",
            "founderName": "Jo Founder"
        } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let created = &data["incubator"]["registerStartup"];
    assert_eq!(created["stage"], "S0");
    assert_eq!(created["status"], "ACTIVE");

    let history = history_for(&env, created["id"].as_str().unwrap()).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["fromLabel"], "REGISTERED");
    assert_eq!(history[0]["toLabel"], "S0");
}

#[tokio::test]
async fn registration_rejects_blank_required_fields() {
    let env = setup_env().await;
    let resp = exec(
        &env.schema,
        REGISTER,
        json!({ "input": { "name": "Acme", "code": "   ", "founderName": "Jo" } }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "VALIDATION"));
}

#[tokio::test]
async fn pitch_completion_advances_exactly_one_stage() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;

    let meeting_id = book_meeting(&env, &startup_id, "SMC", "2026-03-02", "10:00").await;
    let payload = complete_meeting(&env, &meeting_id).await;
    assert_eq!(payload["meeting"]["status"], "COMPLETED");
    assert_eq!(payload["startup"]["stage"], "S1");

    let history = history_for(&env, &startup_id).await;
    assert_eq!(history.len(), 2);
    let advance = history
        .iter()
        .find(|entry| entry["toLabel"] == "S1")
        .unwrap();
    assert_eq!(advance["fromLabel"], "S0");
}

#[tokio::test]
async fn stage_advancement_stops_at_s3() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;

    // S0 -> S1 -> S2 -> S3 over three pitch sessions.
    for (date, slot) in [
        ("2026-03-02", "10:00"),
        ("2026-03-09", "10:00"),
        ("2026-03-16", "10:00"),
    ] {
        let meeting_id = book_meeting(&env, &startup_id, "FMC", date, slot).await;
        complete_meeting(&env, &meeting_id).await;
    }

    // A fourth pitch stays at S3 and writes no ledger entry.
    let meeting_id = book_meeting(&env, &startup_id, "FMC", "2026-03-23", "10:00").await;
    let payload = complete_meeting(&env, &meeting_id).await;
    assert_eq!(payload["startup"]["stage"], "S3");
    assert_eq!(payload["meeting"]["status"], "COMPLETED");

    let history = history_for(&env, &startup_id).await;
    // registration + three advancements.
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn one_on_one_completion_moves_out_of_the_pitch_chain() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let first = book_meeting(&env, &startup_id, "SMC", "2026-03-02", "10:00").await;
    complete_meeting(&env, &first).await;

    let clinic = book_meeting(&env, &startup_id, "ONE_ON_ONE", "2026-03-09", "11:00").await;
    let payload = complete_meeting(&env, &clinic).await;
    assert_eq!(payload["startup"]["stage"], "ONE_ON_ONE");

    let history = history_for(&env, &startup_id).await;
    let moved = history
        .iter()
        .find(|entry| entry["toLabel"] == "ONE_ON_ONE")
        .unwrap();
    assert_eq!(moved["fromLabel"], "S1");
}

#[tokio::test]
async fn onboarding_records_the_current_stage_as_origin() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let meeting_id = book_meeting(&env, &startup_id, "SMC", "2026-03-02", "10:00").await;
    complete_meeting(&env, &meeting_id).await;

    let onboard = r#"
        mutation Onboard($id: ID!) {
            incubator { onboardStartup(id: $id) { id stage status onboardedDate } }
        }
    "#;
    let resp = exec(&env.schema, onboard, json!({ "id": startup_id })).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let updated = &data["incubator"]["onboardStartup"];
    assert_eq!(updated["status"], "ONBOARDED");
    assert_eq!(updated["stage"], "S1");
    assert!(updated["onboardedDate"].is_string());

    let history = history_for(&env, &startup_id).await;
    let entry = history
        .iter()
        .find(|e| e["toLabel"] == "ONBOARDED")
        .unwrap();
    assert_eq!(entry["fromLabel"], "S1");
}

#[tokio::test]
async fn reapplying_a_status_appends_no_ledger_entry() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let onboard = r#"
        mutation Onboard($id: ID!) {
            incubator { onboardStartup(id: $id) { id status } }
        }
    "#;
    let resp = exec(&env.schema, onboard, json!({ "id": startup_id })).await;
    assert!(resp.errors.is_empty());
    let before = history_for(&env, &startup_id).await.len();

    let resp = exec(&env.schema, onboard, json!({ "id": startup_id })).await;
    assert!(resp.errors.is_empty());
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["incubator"]["onboardStartup"]["status"], "ONBOARDED");
    assert_eq!(history_for(&env, &startup_id).await.len(), before);
}

#[tokio::test]
async fn rejection_remembers_the_stage_it_came_from() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let meeting_id = book_meeting(&env, &startup_id, "SMC", "2026-03-02", "10:00").await;
    complete_meeting(&env, &meeting_id).await;

    let reject = r#"
        mutation Reject($id: ID!, $input: StatusChangeInput) {
            incubator { rejectStartup(id: $id, input: $input) {
                id stage status rejectedFromStage rejectedDate
            } }
        }
    "#;
    let resp = exec(
        &env.schema,
        reject,
        json!({ "id": startup_id, "input": { "reason": "pivot failed" } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let rejected = &data["incubator"]["rejectStartup"];
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["rejectedFromStage"], "S1");
    // Rejection freezes the stage column; the origin lives in rejectedFromStage.
    assert_eq!(rejected["stage"], "S1");

    let history = history_for(&env, &startup_id).await;
    let entry = history.iter().find(|e| e["toLabel"] == "REJECTED").unwrap();
    assert_eq!(entry["fromLabel"], "S1");
    assert_eq!(entry["reason"], "pivot failed");
}

#[tokio::test]
async fn graduation_moves_the_stage_column_too() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let graduate = r#"
        mutation Graduate($id: ID!) {
            incubator { graduateStartup(id: $id) { id stage status graduatedDate } }
        }
    "#;
    let resp = exec(&env.schema, graduate, json!({ "id": startup_id })).await;
    assert!(resp.errors.is_empty());
    let data = resp.data.into_json().unwrap();
    let graduated = &data["incubator"]["graduateStartup"];
    assert_eq!(graduated["status"], "GRADUATED");
    assert_eq!(graduated["stage"], "GRADUATED");
    assert!(graduated["graduatedDate"].is_string());
}

#[tokio::test]
async fn locked_startups_reject_profile_edits_but_accept_records() {
    let env = setup_env().await;
    let startup_id = register_startup(&env, "Acme Robotics", "ACM-01").await;
    let graduate = r#"
        mutation Graduate($id: ID!) {
            incubator { graduateStartup(id: $id) { id status } }
        }
    "#;
    let resp = exec(&env.schema, graduate, json!({ "id": startup_id })).await;
    assert!(resp.errors.is_empty());

    let update = r#"
        mutation Update($input: UpdateStartupInput!) {
            incubator { updateStartup(input: $input) { id name } }
        }
    "#;
    let resp = exec(
        &env.schema,
        update,
        json!({ "input": { "id": startup_id, "name": "Acme Renamed" } }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "VALIDATION"));

    let record = r#"
        mutation Record($input: NewAchievementInput!) {
            incubator { recordAchievement(input: $input) { id kind title } }
        }
    "#;
    let resp = exec(
        &env.schema,
        record,
        json!({ "input": {
            "startupId": startup_id,
            "kind": "AWARD",
            "title": "Best in cohort"
        } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["incubator"]["recordAchievement"]["kind"], "AWARD");
}

#[tokio::test]
async fn unauthenticated_requests_are_refused() {
    let env = setup_env().await;
    let resp = env
        .schema
        .execute(Request::new(
            r#"query { incubator { startups { id } } }"#,
        ))
        .await;
    assert!(has_error_code(&resp.errors, "UNAUTHENTICATED"));
}

#[tokio::test]
async fn viewers_cannot_register_startups() {
    let env = setup_env().await;
    let request = Request::new(
        r#"
        mutation {
            incubator { registerStartup(input: {
                name: "Acme", code: "ACM-01", founderName: "Jo"
            }) { id } }
        }
        "#,
    )
    .data(CurrentUser {
        user_id: Uuid::new_v4(),
        roles: vec![UserRole::Viewer],
    });
    let resp = env.schema.execute(request).await;
    assert!(has_error_code(&resp.errors, "FORBIDDEN"));
}

fn has_error_code(errors: &[ServerError], code: &str) -> bool {
    errors
        .iter()
        .any(|e| matches_code(e.extensions.as_ref(), code))
}

fn matches_code(values: Option<&async_graphql::ErrorExtensionValues>, code: &str) -> bool {
    match values.and_then(|ext| ext.get("code")) {
        Some(GqlValue::String(s)) => s == code,
        Some(GqlValue::Enum(name)) => name.as_str() == code,
        _ => false,
    }
}

async fn exec(
    schema: &async_graphql::Schema<
        api::schema::QueryRoot,
        api::schema::MutationRoot,
        async_graphql::EmptySubscription,
    >,
    query: &str,
    vars: Value,
) -> async_graphql::Response {
    schema
        .execute(
            Request::new(query)
                .variables(Variables::from_json(vars))
                .data(CurrentUser {
                    user_id: Uuid::new_v4(),
                    roles: vec![UserRole::Owner],
                }),
        )
        .await
}
