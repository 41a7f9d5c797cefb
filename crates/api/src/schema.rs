use crate::auth::{issue_token, AuthConfig, CurrentUser, UserRole, SESSION_COOKIE};
use std::{collections::HashMap, sync::Arc};

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject, ID,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use entity::{
    achievement, one_on_one_record, pitch_record, progress_snapshot, revenue_entry,
    scheduled_meeting, stage_history, startup, user, user_identity, user_role, user_secret,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::info_span;
use uuid::Uuid;

use crate::inactivity;
use crate::lifecycle::{self, LifecycleError};

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

/// Default inactivity window handed to the schema; queries may override per
/// request via the `windowDays` argument.
#[derive(Clone, Copy, Debug)]
pub struct InactivityConfig {
    pub window_days: i64,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            window_days: inactivity::DEFAULT_WINDOW_DAYS,
        }
    }
}

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    inactivity: InactivityConfig,
) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .data(inactivity)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

const MAX_PAGE: i32 = 200;

#[Object]
impl QueryRoot {
    async fn incubator(&self) -> IncubatorQuery {
        IncubatorQuery
    }
}

#[Object]
impl MutationRoot {
    async fn incubator(&self) -> IncubatorMutation {
        IncubatorMutation
    }
}

#[derive(Default)]
pub struct IncubatorQuery;

#[derive(Default)]
pub struct IncubatorMutation;

#[Object]
impl IncubatorQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let viewer = require_viewer(ctx)?;
        let db = database(ctx)?;
        let (model, roles) = load_user_with_roles(db.as_ref(), viewer.user_id).await?;
        let node = UserNode::from_model(model, roles.clone());
        Ok(MePayload {
            user: node,
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        })
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        q: Option<String>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let mut query = user::Entity::find();
        if let Some(filter) = sanitize_optional_filter(q) {
            let pattern = format!("%{}%", filter);
            query = query.filter(
                Condition::any()
                    .add(user::Column::Email.like(pattern.clone()))
                    .add(user::Column::DisplayName.like(pattern)),
            );
        }
        let records = query
            .order_by_asc(user::Column::Email)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let role_map = load_roles_for_users(db.as_ref(), &records).await?;
        Ok(records
            .into_iter()
            .map(|model| {
                let roles = role_map.get(&model.id).cloned().unwrap_or_default();
                UserNode::from_model(model, roles)
            })
            .collect())
    }

    async fn startups(
        &self,
        ctx: &Context<'_>,
        stage: Option<StartupStage>,
        status: Option<StartupStatus>,
        q: Option<String>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<StartupNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let span = info_span!(
            "incubator.startups.list",
            has_stage = stage.is_some(),
            has_status = status.is_some(),
            first = limit
        );
        let _guard = span.enter();

        let mut query = startup::Entity::find();
        if let Some(stage) = stage {
            query = query.filter(startup::Column::Stage.eq(startup::Stage::from(stage)));
        }
        if let Some(status) = status {
            query = query.filter(startup::Column::Status.eq(startup::Status::from(status)));
        }
        if let Some(filter) = sanitize_optional_filter(q) {
            let pattern = format!("%{}%", filter);
            query = query.filter(
                Condition::any()
                    .add(startup::Column::Name.like(pattern.clone()))
                    .add(startup::Column::Code.like(pattern.clone()))
                    .add(startup::Column::FounderName.like(pattern)),
            );
        }
        let rows = query
            .order_by_asc(startup::Column::Name)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(StartupNode::from).collect())
    }

    async fn startup(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<StartupNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&id)?;
        let record = startup::Entity::find_by_id(startup_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(StartupNode::from))
    }

    #[graphql(name = "stageHistory")]
    async fn stage_history(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: Option<ID>,
        #[graphql(name = "fromLabel")] from_label: Option<String>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<StageHistoryNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;

        let mut query = stage_history::Entity::find();
        if let Some(id) = startup_id {
            query = query.filter(stage_history::Column::StartupId.eq(parse_uuid(&id)?));
        }
        if let Some(label) = sanitize_optional_filter(from_label) {
            query = query.filter(stage_history::Column::FromLabel.eq(label.to_uppercase()));
        }
        let rows = query
            .order_by_desc(stage_history::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(StageHistoryNode::from).collect())
    }

    async fn meetings(
        &self,
        ctx: &Context<'_>,
        date: Option<NaiveDate>,
        status: Option<MeetingStatus>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<MeetingNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;

        let mut query = scheduled_meeting::Entity::find();
        if let Some(date) = date {
            query = query.filter(scheduled_meeting::Column::MeetingDate.eq(date));
        }
        if let Some(status) = status {
            query = query.filter(
                scheduled_meeting::Column::Status.eq(scheduled_meeting::Status::from(status)),
            );
        }
        let rows = query
            .order_by_asc(scheduled_meeting::Column::MeetingDate)
            .order_by_asc(scheduled_meeting::Column::TimeSlot)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(MeetingNode::from).collect())
    }

    #[graphql(name = "inactiveStartups")]
    async fn inactive_startups(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "windowDays")] window_days: Option<i32>,
    ) -> async_graphql::Result<Vec<InactiveStartupNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let config = ctx
            .data::<InactivityConfig>()
            .copied()
            .unwrap_or_default();
        let window = match window_days {
            Some(days) if days <= 0 => {
                return Err(validation_error("windowDays must be positive"));
            }
            Some(days) => days as i64,
            None => config.window_days,
        };
        let span = info_span!("incubator.inactiveStartups", window_days = window);
        let _guard = span.enter();
        let flagged = inactivity::scan(db.as_ref(), Utc::now(), window)
            .await
            .map_err(db_error)?;
        Ok(flagged.into_iter().map(InactiveStartupNode::from).collect())
    }

    #[graphql(name = "pitchHistory")]
    async fn pitch_history(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: ID,
    ) -> async_graphql::Result<Vec<PitchRecordNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&startup_id)?;
        let rows = pitch_record::Entity::find()
            .filter(pitch_record::Column::StartupId.eq(id))
            .order_by_desc(pitch_record::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(PitchRecordNode::from).collect())
    }

    #[graphql(name = "oneOnOneHistory")]
    async fn one_on_one_history(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: ID,
    ) -> async_graphql::Result<Vec<OneOnOneRecordNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&startup_id)?;
        let rows = one_on_one_record::Entity::find()
            .filter(one_on_one_record::Column::StartupId.eq(id))
            .order_by_desc(one_on_one_record::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(OneOnOneRecordNode::from).collect())
    }

    async fn achievements(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: ID,
    ) -> async_graphql::Result<Vec<AchievementNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&startup_id)?;
        let rows = achievement::Entity::find()
            .filter(achievement::Column::StartupId.eq(id))
            .order_by_desc(achievement::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AchievementNode::from).collect())
    }

    #[graphql(name = "revenueEntries")]
    async fn revenue_entries(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: ID,
    ) -> async_graphql::Result<Vec<RevenueEntryNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&startup_id)?;
        let rows = revenue_entry::Entity::find()
            .filter(revenue_entry::Column::StartupId.eq(id))
            .order_by_desc(revenue_entry::Column::Period)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(RevenueEntryNode::from).collect())
    }

    #[graphql(name = "progressHistory")]
    async fn progress_history(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "startupId")] startup_id: ID,
    ) -> async_graphql::Result<Vec<ProgressSnapshotNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&startup_id)?;
        let rows = progress_snapshot::Entity::find()
            .filter(progress_snapshot::Column::StartupId.eq(id))
            .order_by_desc(progress_snapshot::Column::RecordedOn)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(ProgressSnapshotNode::from).collect())
    }

    #[graphql(name = "pipelineSummary")]
    async fn pipeline_summary(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<PipelineSummary> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let rows = startup::Entity::find().all(db.as_ref()).await.map_err(db_error)?;
        let mut by_stage: HashMap<&'static str, i32> = HashMap::new();
        let mut active = 0;
        for row in &rows {
            *by_stage.entry(row.stage.as_label()).or_default() += 1;
            if !row.status.has_exited() && row.stage.in_pipeline() {
                active += 1;
            }
        }
        let stages = [
            startup::Stage::S0,
            startup::Stage::S1,
            startup::Stage::S2,
            startup::Stage::S3,
            startup::Stage::OneOnOne,
            startup::Stage::Graduated,
            startup::Stage::Quit,
        ];
        Ok(PipelineSummary {
            total_count: rows.len() as i32,
            in_pipeline_count: active,
            stages: stages
                .into_iter()
                .map(|stage| StageCount {
                    stage: stage.into(),
                    count: by_stage.get(stage.as_label()).copied().unwrap_or(0),
                })
                .collect(),
        })
    }
}

#[Object]
impl IncubatorMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if !auth.local_auth_enabled {
            return Err(error_with_code("FORBIDDEN", "Local authentication is disabled"));
        }
        let db = database(ctx)?;
        let normalized = normalize_email(&email)?;
        let identity = user_identity::Entity::find()
            .filter(user_identity::Column::Provider.eq("local"))
            .filter(user_identity::Column::Subject.eq(normalized.clone()))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(identity) = identity else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        let user = user::Entity::find_by_id(identity.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        if !user.is_active {
            return Ok(AuthPayload::failed("Account disabled"));
        }
        let secret = user_secret::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(secret) = secret else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        let parsed_hash = PasswordHash::new(&secret.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(AuthPayload::failed("Invalid credentials"));
        }
        let roles = load_roles(db.as_ref(), user.id).await?;
        let token = issue_token(user.id, &roles, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        Ok(AuthPayload {
            ok: true,
            user: Some(UserNode::from_model(user, roles)),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let display_name = validate_display_name(&input.display_name)?;
        let roles = parse_roles(&input.roles)?;
        if roles.is_empty() {
            return Err(validation_error("roles must include at least one entry"));
        }
        let password_hash = match input.password.as_deref() {
            Some(password) if password.len() < 8 => {
                return Err(validation_error("password must be at least 8 characters"));
            }
            Some(password) => Some(hash_password(password).map_err(db_error)?),
            None => None,
        };
        let txn = db.begin().await.map_err(db_error)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let user_id = Uuid::new_v4();
        user::Entity::insert(user::ActiveModel {
            id: Set(user_id),
            email: Set(email.clone()),
            display_name: Set(display_name),
            avatar_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
        user_identity::Entity::insert(user_identity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            provider: Set("local".into()),
            subject: Set(email),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
        if let Some(hash) = password_hash {
            user_secret::Entity::insert(user_secret::ActiveModel {
                user_id: Set(user_id),
                password_hash: Set(hash),
                updated_at: Set(now),
            })
            .exec_without_returning(&txn)
            .await
            .map_err(db_error)?;
        }
        insert_roles(&txn, user_id, &roles).await?;
        txn.commit().await.map_err(db_error)?;
        let record = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new user"))?;
        Ok(UserNode::from_model(record, roles))
    }

    async fn update_user(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> async_graphql::Result<UserNode> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let user_id = parse_uuid(&input.id)?;
        let model = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        let mut active: user::ActiveModel = model.into();
        if let Some(display_name) = &input.display_name {
            active.display_name = Set(validate_display_name(display_name)?);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let mut roles = load_roles(db.as_ref(), user_id).await?;
        if let Some(role_values) = input.roles {
            let parsed = parse_roles(&role_values)?;
            let txn = db.begin().await.map_err(db_error)?;
            user_role::Entity::delete_many()
                .filter(user_role::Column::UserId.eq(user_id))
                .exec(&txn)
                .await
                .map_err(db_error)?;
            insert_roles(&txn, user_id, &parsed).await?;
            txn.commit().await.map_err(db_error)?;
            roles = parsed;
        }
        Ok(UserNode::from_model(updated, roles))
    }

    #[graphql(name = "registerStartup")]
    async fn register_startup(
        &self,
        ctx: &Context<'_>,
        input: RegisterStartupInput,
    ) -> async_graphql::Result<StartupNode> {
        let current = require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let span = info_span!("incubator.registerStartup", code = input.code.as_str());
        let _guard = span.enter();
        let model = lifecycle::register_startup(
            db.as_ref(),
            lifecycle::RegisterStartup {
                name: input.name,
                code: input.code,
                founder_name: input.founder_name,
                email: input.email,
                phone: input.phone,
                sector: input.sector,
                description: input.description,
                registered_date: input.registered_date,
            },
            Some(current.user_id.to_string()),
        )
        .await
        .map_err(lifecycle_error)?;
        Ok(model.into())
    }

    #[graphql(name = "updateStartup")]
    async fn update_startup(
        &self,
        ctx: &Context<'_>,
        input: UpdateStartupInput,
    ) -> async_graphql::Result<StartupNode> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&input.id)?;
        let model = startup::Entity::find_by_id(startup_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Startup not found"))?;
        if model.status.is_locked() {
            return Err(validation_error(
                "Graduated and rejected startups are view-only",
            ));
        }
        let mut active: startup::ActiveModel = model.into();
        if let Some(name) = &input.name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(validation_error("name cannot be blank"));
            }
            active.name = Set(trimmed.to_string());
        }
        if let Some(founder_name) = &input.founder_name {
            let trimmed = founder_name.trim();
            if trimmed.is_empty() {
                return Err(validation_error("founderName cannot be blank"));
            }
            active.founder_name = Set(trimmed.to_string());
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.phone.is_some() {
            active.phone = Set(input.phone);
        }
        if input.sector.is_some() {
            active.sector = Set(input.sector);
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteStartup")]
    async fn delete_startup(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&id)?;
        let res = startup::Entity::delete_by_id(startup_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "bookMeeting")]
    async fn book_meeting(
        &self,
        ctx: &Context<'_>,
        input: BookMeetingInput,
    ) -> async_graphql::Result<MeetingNode> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&input.startup_id)?;
        let span = info_span!(
            "incubator.bookMeeting",
            date = %input.date,
            slot = input.time_slot.as_str()
        );
        let _guard = span.enter();
        let model = lifecycle::book_meeting(
            db.as_ref(),
            lifecycle::BookMeeting {
                startup_id,
                kind: input.kind.into(),
                date: input.date,
                time_slot: input.time_slot,
            },
        )
        .await
        .map_err(lifecycle_error)?;
        Ok(model.into())
    }

    #[graphql(name = "completeMeeting")]
    async fn complete_meeting(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: CompleteMeetingInput,
    ) -> async_graphql::Result<MeetingCompletionPayload> {
        let current = require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let meeting_id = parse_uuid(&id)?;
        let (meeting, subject) = lifecycle::complete_meeting(
            db.as_ref(),
            meeting_id,
            lifecycle::CompletionData {
                panelist_name: input.panelist_name,
                time: input.time,
                feedback: input.feedback,
            },
            Some(current.user_id.to_string()),
        )
        .await
        .map_err(lifecycle_error)?;
        Ok(MeetingCompletionPayload {
            meeting: meeting.into(),
            startup: subject.into(),
        })
    }

    #[graphql(name = "markMeetingNotDone")]
    async fn mark_meeting_not_done(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<bool> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let meeting_id = parse_uuid(&id)?;
        lifecycle::cancel_meeting(db.as_ref(), meeting_id)
            .await
            .map_err(lifecycle_error)?;
        Ok(true)
    }

    #[graphql(name = "onboardStartup")]
    async fn onboard_startup(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: Option<StatusChangeInput>,
    ) -> async_graphql::Result<StartupNode> {
        apply_status(ctx, id, startup::Status::Onboarded, input).await
    }

    #[graphql(name = "graduateStartup")]
    async fn graduate_startup(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: Option<StatusChangeInput>,
    ) -> async_graphql::Result<StartupNode> {
        apply_status(ctx, id, startup::Status::Graduated, input).await
    }

    #[graphql(name = "rejectStartup")]
    async fn reject_startup(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: Option<StatusChangeInput>,
    ) -> async_graphql::Result<StartupNode> {
        apply_status(ctx, id, startup::Status::Rejected, input).await
    }

    #[graphql(name = "markStartupInactive")]
    async fn mark_startup_inactive(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: Option<StatusChangeInput>,
    ) -> async_graphql::Result<StartupNode> {
        apply_status(ctx, id, startup::Status::Inactive, input).await
    }

    #[graphql(name = "markStartupQuit")]
    async fn mark_startup_quit(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: Option<StatusChangeInput>,
    ) -> async_graphql::Result<StartupNode> {
        apply_status(ctx, id, startup::Status::Quit, input).await
    }

    #[graphql(name = "recordAchievement")]
    async fn record_achievement(
        &self,
        ctx: &Context<'_>,
        input: NewAchievementInput,
    ) -> async_graphql::Result<AchievementNode> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&input.startup_id)?;
        ensure_startup_exists(db.as_ref(), startup_id).await?;
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(validation_error("title is required"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record_id = Uuid::new_v4();
        let txn = db.begin().await.map_err(db_error)?;
        achievement::Entity::insert(achievement::ActiveModel {
            id: Set(record_id),
            startup_id: Set(startup_id),
            kind: Set(input.kind.into()),
            title: Set(title),
            description: Set(input.description),
            issuer: Set(input.issuer),
            reference_no: Set(input.reference_no),
            achieved_on: Set(input.achieved_on),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
        touch_startup(&txn, startup_id).await?;
        txn.commit().await.map_err(db_error)?;
        let model = achievement::Entity::find_by_id(record_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new achievement"))?;
        Ok(model.into())
    }

    #[graphql(name = "recordRevenue")]
    async fn record_revenue(
        &self,
        ctx: &Context<'_>,
        input: NewRevenueInput,
    ) -> async_graphql::Result<RevenueEntryNode> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&input.startup_id)?;
        ensure_startup_exists(db.as_ref(), startup_id).await?;
        if input.amount_cents < 0 {
            return Err(validation_error("amountCents cannot be negative"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record_id = Uuid::new_v4();
        let txn = db.begin().await.map_err(db_error)?;
        revenue_entry::Entity::insert(revenue_entry::ActiveModel {
            id: Set(record_id),
            startup_id: Set(startup_id),
            amount_cents: Set(input.amount_cents),
            currency: Set(input.currency.unwrap_or_else(|| "USD".into())),
            period: Set(input.period),
            note: Set(input.note),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
        touch_startup(&txn, startup_id).await?;
        txn.commit().await.map_err(db_error)?;
        let model = revenue_entry::Entity::find_by_id(record_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new revenue entry"))?;
        Ok(model.into())
    }

    #[graphql(name = "recordProgress")]
    async fn record_progress(
        &self,
        ctx: &Context<'_>,
        input: NewProgressInput,
    ) -> async_graphql::Result<ProgressSnapshotNode> {
        require_role(ctx, UserRole::Mentor)?;
        let db = database(ctx)?;
        let startup_id = parse_uuid(&input.startup_id)?;
        ensure_startup_exists(db.as_ref(), startup_id).await?;
        let summary = input.summary.trim().to_string();
        if summary.is_empty() {
            return Err(validation_error("summary is required"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record_id = Uuid::new_v4();
        let txn = db.begin().await.map_err(db_error)?;
        progress_snapshot::Entity::insert(progress_snapshot::ActiveModel {
            id: Set(record_id),
            startup_id: Set(startup_id),
            recorded_on: Set(input.recorded_on.unwrap_or_else(|| Utc::now().date_naive())),
            summary: Set(summary),
            team_size: Set(input.team_size),
            customers: Set(input.customers),
            monthly_revenue_cents: Set(input.monthly_revenue_cents),
            created_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
        touch_startup(&txn, startup_id).await?;
        txn.commit().await.map_err(db_error)?;
        let model = progress_snapshot::Entity::find_by_id(record_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new progress snapshot"))?;
        Ok(model.into())
    }

    /// Destructive: wipes every incubator table. User accounts survive.
    #[graphql(name = "clearAllData")]
    async fn clear_all_data(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        require_role(ctx, UserRole::Owner)?;
        let db = database(ctx)?;
        let txn = db.begin().await.map_err(db_error)?;
        scheduled_meeting::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        stage_history::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        pitch_record::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        one_on_one_record::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        achievement::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        revenue_entry::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        progress_snapshot::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        startup::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }
}

async fn apply_status(
    ctx: &Context<'_>,
    id: ID,
    target: startup::Status,
    input: Option<StatusChangeInput>,
) -> async_graphql::Result<StartupNode> {
    let current = require_role(ctx, UserRole::Mentor)?;
    let db = database(ctx)?;
    let startup_id = parse_uuid(&id)?;
    let input = input.unwrap_or_default();
    let span = info_span!("incubator.statusChange", to = target.as_label());
    let _guard = span.enter();
    let model = lifecycle::change_status(
        db.as_ref(),
        startup_id,
        target,
        lifecycle::StatusChange {
            reason: sanitize_optional_filter(input.reason),
            effective_date: input.effective_date,
        },
        Some(current.user_id.to_string()),
    )
    .await
    .map_err(lifecycle_error)?;
    Ok(model.into())
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum StartupStage {
    S0,
    S1,
    S2,
    S3,
    OneOnOne,
    Graduated,
    Quit,
}

impl From<startup::Stage> for StartupStage {
    fn from(value: startup::Stage) -> Self {
        match value {
            startup::Stage::S0 => StartupStage::S0,
            startup::Stage::S1 => StartupStage::S1,
            startup::Stage::S2 => StartupStage::S2,
            startup::Stage::S3 => StartupStage::S3,
            startup::Stage::OneOnOne => StartupStage::OneOnOne,
            startup::Stage::Graduated => StartupStage::Graduated,
            startup::Stage::Quit => StartupStage::Quit,
        }
    }
}

impl From<StartupStage> for startup::Stage {
    fn from(value: StartupStage) -> Self {
        match value {
            StartupStage::S0 => startup::Stage::S0,
            StartupStage::S1 => startup::Stage::S1,
            StartupStage::S2 => startup::Stage::S2,
            StartupStage::S3 => startup::Stage::S3,
            StartupStage::OneOnOne => startup::Stage::OneOnOne,
            StartupStage::Graduated => startup::Stage::Graduated,
            StartupStage::Quit => startup::Stage::Quit,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum StartupStatus {
    Active,
    Onboarded,
    Graduated,
    Rejected,
    Inactive,
    Quit,
}

impl From<startup::Status> for StartupStatus {
    fn from(value: startup::Status) -> Self {
        match value {
            startup::Status::Active => StartupStatus::Active,
            startup::Status::Onboarded => StartupStatus::Onboarded,
            startup::Status::Graduated => StartupStatus::Graduated,
            startup::Status::Rejected => StartupStatus::Rejected,
            startup::Status::Inactive => StartupStatus::Inactive,
            startup::Status::Quit => StartupStatus::Quit,
        }
    }
}

impl From<StartupStatus> for startup::Status {
    fn from(value: StartupStatus) -> Self {
        match value {
            StartupStatus::Active => startup::Status::Active,
            StartupStatus::Onboarded => startup::Status::Onboarded,
            StartupStatus::Graduated => startup::Status::Graduated,
            StartupStatus::Rejected => startup::Status::Rejected,
            StartupStatus::Inactive => startup::Status::Inactive,
            StartupStatus::Quit => startup::Status::Quit,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum MeetingKind {
    Smc,
    Fmc,
    OneOnOne,
}

impl From<scheduled_meeting::Kind> for MeetingKind {
    fn from(value: scheduled_meeting::Kind) -> Self {
        match value {
            scheduled_meeting::Kind::Smc => MeetingKind::Smc,
            scheduled_meeting::Kind::Fmc => MeetingKind::Fmc,
            scheduled_meeting::Kind::OneOnOne => MeetingKind::OneOnOne,
        }
    }
}

impl From<MeetingKind> for scheduled_meeting::Kind {
    fn from(value: MeetingKind) -> Self {
        match value {
            MeetingKind::Smc => scheduled_meeting::Kind::Smc,
            MeetingKind::Fmc => scheduled_meeting::Kind::Fmc,
            MeetingKind::OneOnOne => scheduled_meeting::Kind::OneOnOne,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum MeetingStatus {
    Scheduled,
    Completed,
}

impl From<scheduled_meeting::Status> for MeetingStatus {
    fn from(value: scheduled_meeting::Status) -> Self {
        match value {
            scheduled_meeting::Status::Scheduled => MeetingStatus::Scheduled,
            scheduled_meeting::Status::Completed => MeetingStatus::Completed,
        }
    }
}

impl From<MeetingStatus> for scheduled_meeting::Status {
    fn from(value: MeetingStatus) -> Self {
        match value {
            MeetingStatus::Scheduled => scheduled_meeting::Status::Scheduled,
            MeetingStatus::Completed => scheduled_meeting::Status::Completed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AchievementKind {
    Patent,
    Award,
    SuccessGoal,
    Upgrade,
    Update,
}

impl From<achievement::Kind> for AchievementKind {
    fn from(value: achievement::Kind) -> Self {
        match value {
            achievement::Kind::Patent => AchievementKind::Patent,
            achievement::Kind::Award => AchievementKind::Award,
            achievement::Kind::SuccessGoal => AchievementKind::SuccessGoal,
            achievement::Kind::Upgrade => AchievementKind::Upgrade,
            achievement::Kind::Update => AchievementKind::Update,
        }
    }
}

impl From<AchievementKind> for achievement::Kind {
    fn from(value: AchievementKind) -> Self {
        match value {
            AchievementKind::Patent => achievement::Kind::Patent,
            AchievementKind::Award => achievement::Kind::Award,
            AchievementKind::SuccessGoal => achievement::Kind::SuccessGoal,
            AchievementKind::Upgrade => achievement::Kind::Upgrade,
            AchievementKind::Update => achievement::Kind::Update,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Startup")]
pub struct StartupNode {
    pub id: ID,
    pub name: String,
    pub code: String,
    #[graphql(name = "founderName")]
    pub founder_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub stage: StartupStage,
    pub status: StartupStatus,
    #[graphql(name = "rejectedFromStage")]
    pub rejected_from_stage: Option<StartupStage>,
    #[graphql(name = "registeredDate")]
    pub registered_date: NaiveDate,
    #[graphql(name = "onboardedDate")]
    pub onboarded_date: Option<NaiveDate>,
    #[graphql(name = "graduatedDate")]
    pub graduated_date: Option<NaiveDate>,
    #[graphql(name = "rejectedDate")]
    pub rejected_date: Option<NaiveDate>,
    #[graphql(name = "quitDate")]
    pub quit_date: Option<NaiveDate>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<startup::Model> for StartupNode {
    fn from(model: startup::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            code: model.code,
            founder_name: model.founder_name,
            email: model.email,
            phone: model.phone,
            sector: model.sector,
            description: model.description,
            stage: model.stage.into(),
            status: model.status.into(),
            rejected_from_stage: model.rejected_from_stage.map(Into::into),
            registered_date: model.registered_date,
            onboarded_date: model.onboarded_date,
            graduated_date: model.graduated_date,
            rejected_date: model.rejected_date,
            quit_date: model.quit_date,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "StageHistoryEntry")]
pub struct StageHistoryNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    #[graphql(name = "fromLabel")]
    pub from_label: String,
    #[graphql(name = "toLabel")]
    pub to_label: String,
    pub reason: Option<String>,
    #[graphql(name = "performedBy")]
    pub performed_by: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<stage_history::Model> for StageHistoryNode {
    fn from(model: stage_history::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            from_label: model.from_label,
            to_label: model.to_label,
            reason: model.reason,
            performed_by: model.performed_by,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Meeting")]
pub struct MeetingNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub kind: MeetingKind,
    pub date: NaiveDate,
    #[graphql(name = "timeSlot")]
    pub time_slot: String,
    pub status: MeetingStatus,
    #[graphql(name = "panelistName")]
    pub panelist_name: Option<String>,
    #[graphql(name = "completedTime")]
    pub completed_time: Option<String>,
    pub feedback: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<scheduled_meeting::Model> for MeetingNode {
    fn from(model: scheduled_meeting::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            kind: model.kind.into(),
            date: model.meeting_date,
            time_slot: model.time_slot,
            status: model.status.into(),
            panelist_name: model.panelist_name,
            completed_time: model.completed_time,
            feedback: model.feedback,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MeetingCompletionPayload {
    pub meeting: MeetingNode,
    pub startup: StartupNode,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PitchRecord")]
pub struct PitchRecordNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub stage: StartupStage,
    pub date: NaiveDate,
    pub time: String,
    #[graphql(name = "panelistName")]
    pub panelist_name: String,
    pub feedback: String,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<pitch_record::Model> for PitchRecordNode {
    fn from(model: pitch_record::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            stage: model.stage.into(),
            date: model.pitch_date,
            time: model.time,
            panelist_name: model.panelist_name,
            feedback: model.feedback,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "OneOnOneRecord")]
pub struct OneOnOneRecordNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub date: NaiveDate,
    pub time: String,
    #[graphql(name = "mentorName")]
    pub mentor_name: String,
    pub notes: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<one_on_one_record::Model> for OneOnOneRecordNode {
    fn from(model: one_on_one_record::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            date: model.session_date,
            time: model.time,
            mentor_name: model.mentor_name,
            notes: model.notes,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Achievement")]
pub struct AchievementNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub kind: AchievementKind,
    pub title: String,
    pub description: Option<String>,
    pub issuer: Option<String>,
    #[graphql(name = "referenceNo")]
    pub reference_no: Option<String>,
    #[graphql(name = "achievedOn")]
    pub achieved_on: Option<NaiveDate>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<achievement::Model> for AchievementNode {
    fn from(model: achievement::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            kind: model.kind.into(),
            title: model.title,
            description: model.description,
            issuer: model.issuer,
            reference_no: model.reference_no,
            achieved_on: model.achieved_on,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "RevenueEntry")]
pub struct RevenueEntryNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    #[graphql(name = "amountCents")]
    pub amount_cents: i64,
    pub currency: String,
    pub period: NaiveDate,
    pub note: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<revenue_entry::Model> for RevenueEntryNode {
    fn from(model: revenue_entry::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            amount_cents: model.amount_cents,
            currency: model.currency,
            period: model.period,
            note: model.note,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "ProgressSnapshot")]
pub struct ProgressSnapshotNode {
    pub id: ID,
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    #[graphql(name = "recordedOn")]
    pub recorded_on: NaiveDate,
    pub summary: String,
    #[graphql(name = "teamSize")]
    pub team_size: Option<i32>,
    pub customers: Option<i32>,
    #[graphql(name = "monthlyRevenueCents")]
    pub monthly_revenue_cents: Option<i64>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<progress_snapshot::Model> for ProgressSnapshotNode {
    fn from(model: progress_snapshot::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            startup_id: ID::from(model.startup_id.to_string()),
            recorded_on: model.recorded_on,
            summary: model.summary,
            team_size: model.team_size,
            customers: model.customers,
            monthly_revenue_cents: model.monthly_revenue_cents,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "InactiveStartup")]
pub struct InactiveStartupNode {
    pub startup: StartupNode,
    #[graphql(name = "lastActivityAt")]
    pub last_activity_at: DateTime<Utc>,
    #[graphql(name = "daysSinceActivity")]
    pub days_since_activity: i32,
}

impl From<inactivity::InactiveStartup> for InactiveStartupNode {
    fn from(value: inactivity::InactiveStartup) -> Self {
        Self {
            startup: value.startup.into(),
            last_activity_at: value.last_activity_at.into(),
            days_since_activity: value.days_since_activity as i32,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct StageCount {
    pub stage: StartupStage,
    pub count: i32,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PipelineSummary {
    #[graphql(name = "totalCount")]
    pub total_count: i32,
    #[graphql(name = "inPipelineCount")]
    pub in_pipeline_count: i32,
    pub stages: Vec<StageCount>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    #[graphql(name = "avatarUrl")]
    pub avatar_url: Option<String>,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    pub roles: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UserNode {
    fn from_model(model: user::Model, roles: Vec<UserRole>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
            is_active: model.is_active,
            roles: roles.into_iter().map(|r| r.as_str().to_string()).collect(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, SimpleObject, Default)]
pub struct AuthPayload {
    pub ok: bool,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn failed(message: &str) -> Self {
        Self {
            ok: false,
            user: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewUserInput {
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub roles: Vec<String>,
    /// Initial login password; without one the account cannot log in until
    /// an admin sets it.
    pub password: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateUserInput {
    pub id: ID,
    #[graphql(name = "displayName")]
    pub display_name: Option<String>,
    pub roles: Option<Vec<String>>,
    #[graphql(name = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, InputObject)]
pub struct RegisterStartupInput {
    pub name: String,
    pub code: String,
    #[graphql(name = "founderName")]
    pub founder_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    #[graphql(name = "registeredDate")]
    pub registered_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateStartupInput {
    pub id: ID,
    pub name: Option<String>,
    #[graphql(name = "founderName")]
    pub founder_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct BookMeetingInput {
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub kind: MeetingKind,
    pub date: NaiveDate,
    #[graphql(name = "timeSlot")]
    pub time_slot: String,
}

#[derive(Clone, Debug, InputObject)]
pub struct CompleteMeetingInput {
    #[graphql(name = "panelistName")]
    pub panelist_name: String,
    pub time: String,
    pub feedback: String,
}

#[derive(Clone, Debug, InputObject, Default)]
pub struct StatusChangeInput {
    pub reason: Option<String>,
    #[graphql(name = "effectiveDate")]
    pub effective_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewAchievementInput {
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    pub kind: AchievementKind,
    pub title: String,
    pub description: Option<String>,
    pub issuer: Option<String>,
    #[graphql(name = "referenceNo")]
    pub reference_no: Option<String>,
    #[graphql(name = "achievedOn")]
    pub achieved_on: Option<NaiveDate>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewRevenueInput {
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    #[graphql(name = "amountCents")]
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub period: NaiveDate,
    pub note: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewProgressInput {
    #[graphql(name = "startupId")]
    pub startup_id: ID,
    #[graphql(name = "recordedOn")]
    pub recorded_on: Option<NaiveDate>,
    pub summary: String,
    #[graphql(name = "teamSize")]
    pub team_size: Option<i32>,
    pub customers: Option<i32>,
    #[graphql(name = "monthlyRevenueCents")]
    pub monthly_revenue_cents: Option<i64>,
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn current_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data::<CurrentUser>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Login required"))
}

fn require_role(ctx: &Context<'_>, role: UserRole) -> async_graphql::Result<CurrentUser> {
    let user = current_user(ctx)?;
    if user.has_role(role) {
        Ok(user)
    } else {
        Err(error_with_code("FORBIDDEN", "Insufficient permissions"))
    }
}

fn require_viewer(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    require_role(ctx, UserRole::Viewer)
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn lifecycle_error(err: LifecycleError) -> Error {
    match err {
        LifecycleError::Validation(message) => validation_error(message),
        LifecycleError::SlotConflict {
            ref startup_id,
            ref startup_name,
            ref startup_code,
            ref founder_name,
            ..
        } => {
            let (id, name, code, founder) = (
                startup_id.to_string(),
                startup_name.clone(),
                startup_code.clone(),
                founder_name.clone(),
            );
            Error::new(err.to_string()).extend_with(move |_, e| {
                e.set("code", "CONFLICT");
                e.set("conflictingStartupId", id.clone());
                e.set("conflictingStartupName", name.clone());
                e.set("conflictingStartupCode", code.clone());
                e.set("conflictingFounderName", founder.clone());
            })
        }
        LifecycleError::NotFound(what) => {
            error_with_code("NOT_FOUND", format!("{} not found", what))
        }
        LifecycleError::Db(err) => db_error(err),
    }
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_email(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("Invalid email address"));
    }
    Ok(trimmed)
}

fn validate_display_name(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error("displayName is required"));
    }
    if trimmed.chars().count() > 100 {
        return Err(validation_error("displayName must be <= 100 characters"));
    }
    Ok(trimmed.to_string())
}

fn parse_roles(values: &[String]) -> async_graphql::Result<Vec<UserRole>> {
    let mut roles = Vec::new();
    for value in values {
        let upper = value.trim().to_uppercase();
        let role = UserRole::from_str(&upper)
            .ok_or_else(|| validation_error(format!("Unknown role {}", value)))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

async fn load_roles(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> async_graphql::Result<Vec<UserRole>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .map(|row| match row.role {
            user_role::Role::Owner => UserRole::Owner,
            user_role::Role::Admin => UserRole::Admin,
            user_role::Role::Mentor => UserRole::Mentor,
            user_role::Role::Viewer => UserRole::Viewer,
        })
        .collect())
}

async fn load_roles_for_users(
    db: &DatabaseConnection,
    users: &[user::Model],
) -> async_graphql::Result<HashMap<Uuid, Vec<UserRole>>> {
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.is_in(ids))
        .all(db)
        .await
        .map_err(db_error)?;
    let mut map: HashMap<Uuid, Vec<UserRole>> = HashMap::new();
    for row in rows {
        let role = match row.role {
            user_role::Role::Owner => UserRole::Owner,
            user_role::Role::Admin => UserRole::Admin,
            user_role::Role::Mentor => UserRole::Mentor,
            user_role::Role::Viewer => UserRole::Viewer,
        };
        map.entry(row.user_id).or_default().push(role);
    }
    Ok(map)
}

async fn insert_roles<C>(conn: &C, user_id: Uuid, roles: &[UserRole]) -> async_graphql::Result<()>
where
    C: ConnectionTrait,
{
    for role in roles {
        user_role::Entity::insert(user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(match role {
                UserRole::Owner => user_role::Role::Owner,
                UserRole::Admin => user_role::Role::Admin,
                UserRole::Mentor => user_role::Role::Mentor,
                UserRole::Viewer => user_role::Role::Viewer,
            }),
        })
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

async fn load_user_with_roles(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> async_graphql::Result<(user::Model, Vec<UserRole>)> {
    let model = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("UNAUTHENTICATED", "User not found"))?;
    if !model.is_active {
        return Err(error_with_code("FORBIDDEN", "Account disabled"));
    }
    let roles = load_roles(db, user_id).await?;
    Ok((model, roles))
}

async fn ensure_startup_exists(
    db: &DatabaseConnection,
    startup_id: Uuid,
) -> async_graphql::Result<()> {
    startup::Entity::find_by_id(startup_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("NOT_FOUND", "Startup not found"))?;
    Ok(())
}

// Achievement/revenue/progress additions count as activity for the
// inactivity scan; the bump commits in the same transaction as the record.
async fn touch_startup<C>(conn: &C, startup_id: Uuid) -> async_graphql::Result<()>
where
    C: ConnectionTrait,
{
    let model = startup::Entity::find_by_id(startup_id)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("NOT_FOUND", "Startup not found"))?;
    let mut active: startup::ActiveModel = model.into();
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(db_error)?;
    Ok(())
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let max_age = (ttl_minutes.max(0) * 60).to_string();
    let cookie = if ttl_minutes < 0 {
        format!(
            "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE
        )
    } else {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token, max_age
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}

#[derive(Debug, Clone)]
pub struct SeededIncubatorRecords {
    pub users: Vec<user::Model>,
    pub startups: Vec<startup::Model>,
    pub meetings: Vec<scheduled_meeting::Model>,
}

impl SeededIncubatorRecords {
    pub fn user_email(&self, email: &str) -> Option<&user::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn startup_coded(&self, code: &str) -> Option<&startup::Model> {
        self.startups.iter().find(|s| s.code == code)
    }
}

pub async fn seed_incubator_demo(
    db: &DatabaseConnection,
) -> Result<SeededIncubatorRecords, DbErr> {
    let owner = insert_seed_user(
        db,
        "owner@incubator.test",
        "Owner One",
        &[user_role::Role::Owner, user_role::Role::Admin],
        "ownerpass",
    )
    .await?;
    let admin = insert_seed_user(
        db,
        "admin@incubator.test",
        "Admin Ada",
        &[user_role::Role::Admin],
        "adminpass",
    )
    .await?;
    let mentor = insert_seed_user(
        db,
        "mentor@incubator.test",
        "Mentor Mia",
        &[user_role::Role::Mentor],
        "mentorpass",
    )
    .await?;

    let aerolift = insert_seed_startup(
        db,
        "AeroLift Drones",
        "AER-01",
        "Priya Raman",
        startup::Stage::S1,
        startup::Status::Active,
        days_ago(90),
    )
    .await?;
    let medsense = insert_seed_startup(
        db,
        "MedSense Diagnostics",
        "MED-02",
        "Daniel Okafor",
        startup::Stage::S3,
        startup::Status::Active,
        days_ago(14),
    )
    .await?;
    let farmnet = insert_seed_startup(
        db,
        "FarmNet Analytics",
        "FRM-03",
        "Lena Fischer",
        startup::Stage::OneOnOne,
        startup::Status::Onboarded,
        days_ago(120),
    )
    .await?;
    let quantleap = insert_seed_startup(
        db,
        "QuantLeap Systems",
        "QNT-04",
        "Marco Silva",
        startup::Stage::Graduated,
        startup::Status::Graduated,
        days_ago(365),
    )
    .await?;
    let stalled = insert_seed_startup(
        db,
        "Stalled Ventures",
        "STL-05",
        "Sam Park",
        // Stale on purpose: shows up in the inactivity scan out of the box.
        startup::Stage::S0,
        startup::Status::Active,
        days_ago(45),
    )
    .await?;

    let booked_at: DateTimeWithTimeZone = Utc::now().into();
    let smc = insert_seed_meeting(
        db,
        aerolift.id,
        scheduled_meeting::Kind::Smc,
        "10:00",
        booked_at,
    )
    .await?;
    let one_on_one = insert_seed_meeting(
        db,
        medsense.id,
        scheduled_meeting::Kind::OneOnOne,
        "11:00",
        booked_at,
    )
    .await?;

    Ok(SeededIncubatorRecords {
        users: vec![owner, admin, mentor],
        startups: vec![aerolift, medsense, farmnet, quantleap, stalled],
        meetings: vec![smc, one_on_one],
    })
}

async fn insert_seed_meeting(
    db: &DatabaseConnection,
    startup_id: Uuid,
    kind: scheduled_meeting::Kind,
    time_slot: &str,
    booked_at: DateTimeWithTimeZone,
) -> Result<scheduled_meeting::Model, DbErr> {
    let id = Uuid::new_v4();
    scheduled_meeting::Entity::insert(scheduled_meeting::ActiveModel {
        id: Set(id),
        startup_id: Set(startup_id),
        kind: Set(kind),
        meeting_date: Set((Utc::now() + Duration::days(7)).date_naive()),
        time_slot: Set(time_slot.into()),
        status: Set(scheduled_meeting::Status::Scheduled),
        panelist_name: Set(None),
        completed_time: Set(None),
        feedback: Set(None),
        created_at: Set(booked_at),
        updated_at: Set(booked_at),
    })
    .exec_without_returning(db)
    .await?;
    scheduled_meeting::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("seed meeting".into()))
}

async fn insert_seed_startup(
    db: &DatabaseConnection,
    name: &str,
    code: &str,
    founder: &str,
    stage: startup::Stage,
    status: startup::Status,
    touched: DateTimeWithTimeZone,
) -> Result<startup::Model, DbErr> {
    let id = Uuid::new_v4();
    startup::Entity::insert(startup::ActiveModel {
        id: Set(id),
        name: Set(name.into()),
        code: Set(code.into()),
        founder_name: Set(founder.into()),
        email: Set(None),
        phone: Set(None),
        sector: Set(None),
        description: Set(None),
        stage: Set(stage),
        status: Set(status),
        rejected_from_stage: Set(None),
        registered_date: Set(touched.date_naive()),
        onboarded_date: Set(match status {
            startup::Status::Onboarded => Some(touched.date_naive()),
            _ => None,
        }),
        graduated_date: Set(match status {
            startup::Status::Graduated => Some(touched.date_naive()),
            _ => None,
        }),
        rejected_date: Set(None),
        quit_date: Set(None),
        created_at: Set(touched),
        updated_at: Set(touched),
    })
    .exec_without_returning(db)
    .await?;
    startup::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("seed startup".into()))
}

async fn insert_seed_user(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
    roles: &[user_role::Role],
    password: &str,
) -> Result<user::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let user_id = Uuid::new_v4();
    user::Entity::insert(user::ActiveModel {
        id: Set(user_id),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .exec_without_returning(db)
    .await?;
    user_identity::Entity::insert(user_identity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        provider: Set("local".into()),
        subject: Set(email.to_string()),
        created_at: Set(now),
    })
    .exec_without_returning(db)
    .await?;
    user_secret::Entity::insert(user_secret::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(hash_password(password)?),
        updated_at: Set(now),
    })
    .exec_without_returning(db)
    .await?;
    for role in roles {
        user_role::Entity::insert(user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(*role),
        })
        .exec_without_returning(db)
        .await?;
    }
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("seed user".into()))
}

fn hash_password(password: &str) -> Result<String, DbErr> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DbErr::Custom(format!("hash error: {}", err)))
}

fn days_ago(days: i64) -> DateTimeWithTimeZone {
    (Utc::now() - Duration::days(days)).into()
}
