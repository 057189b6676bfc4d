use crate::entities::{jobs, prelude::*};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

impl JobState {
    /// States in which a job still occupies its singleton slot.
    pub const LIVE: [Self; 3] = [Self::Waiting, Self::Active, Self::Delayed];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Delayed => "delayed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn live_strs() -> Vec<&'static str> {
        Self::LIVE.iter().map(Self::as_str).collect()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "delayed" => Ok(Self::Delayed),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i32,
    pub queue: String,
    pub name: String,
    pub singleton_key: Option<String>,
    pub payload: serde_json::Value,
    pub state: JobState,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: String,
    pub locked_until: Option<String>,
    pub last_error: Option<String>,
}

impl From<jobs::Model> for JobRecord {
    fn from(model: jobs::Model) -> Self {
        Self {
            id: model.id,
            queue: model.queue,
            name: model.name,
            singleton_key: model.singleton_key,
            payload: serde_json::from_str(&model.payload).unwrap_or(serde_json::Value::Null),
            state: model.state.parse().unwrap_or(JobState::Failed),
            attempts: model.attempts,
            max_attempts: model.max_attempts,
            run_at: model.run_at,
            locked_until: model.locked_until,
            last_error: model.last_error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub queue: String,
    pub name: String,
    pub singleton_key: Option<String>,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
    pub run_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    pub failed: u64,
}

pub struct JobRepository {
    conn: DatabaseConnection,
}

impl JobRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a job in the `waiting` state.
    ///
    /// Returns `None` when the partial unique index rejects it because a
    /// live job with the same singleton key already exists.
    pub async fn insert(&self, job: &NewJob) -> Result<Option<i32>> {
        let now = crate::db::now_timestamp();
        let active_model = jobs::ActiveModel {
            queue: Set(job.queue.clone()),
            name: Set(job.name.clone()),
            singleton_key: Set(job.singleton_key.clone()),
            payload: Set(job.payload.to_string()),
            state: Set(JobState::Waiting.as_str().to_string()),
            attempts: Set(0),
            max_attempts: Set(job.max_attempts),
            run_at: Set(crate::db::timestamp(job.run_at)),
            locked_until: Set(None),
            last_error: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match Jobs::insert(active_model).exec(&self.conn).await {
            Ok(result) => Ok(Some(result.last_insert_id)),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, id: i32) -> Result<Option<JobRecord>> {
        let row = Jobs::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(JobRecord::from))
    }

    /// The waiting, active or delayed job holding `singleton_key`, if any.
    pub async fn find_live_singleton(
        &self,
        queue: &str,
        singleton_key: &str,
    ) -> Result<Option<JobRecord>> {
        let row = Jobs::find()
            .filter(jobs::Column::Queue.eq(queue))
            .filter(jobs::Column::SingletonKey.eq(singleton_key))
            .filter(jobs::Column::State.is_in(JobState::live_strs()))
            .one(&self.conn)
            .await?;

        Ok(row.map(JobRecord::from))
    }

    pub async fn counts(&self, queue: &str) -> Result<JobCounts> {
        let mut counts = JobCounts::default();
        for state in [
            JobState::Waiting,
            JobState::Active,
            JobState::Delayed,
            JobState::Completed,
            JobState::Failed,
        ] {
            let n = Jobs::find()
                .filter(jobs::Column::Queue.eq(queue))
                .filter(jobs::Column::State.eq(state.as_str()))
                .count(&self.conn)
                .await?;
            match state {
                JobState::Waiting => counts.waiting = n,
                JobState::Active => counts.active = n,
                JobState::Delayed => counts.delayed = n,
                JobState::Completed => counts.completed = n,
                JobState::Failed => counts.failed = n,
            }
        }
        Ok(counts)
    }

    /// Deletes every job in the queue regardless of state.
    pub async fn clear_queue(&self, queue: &str) -> Result<u64> {
        let result = Jobs::delete_many()
            .filter(jobs::Column::Queue.eq(queue))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Claims the oldest due job in `queue`.
    ///
    /// The state change is a compare-and-set on the row's previous state, so
    /// two workers racing for the same row cannot both win it.
    pub async fn claim_next(
        &self,
        queue: &str,
        now: DateTime<Utc>,
        lease: chrono::Duration,
    ) -> Result<Option<JobRecord>> {
        let now_str = crate::db::timestamp(now);

        loop {
            let candidate = Jobs::find()
                .filter(jobs::Column::Queue.eq(queue))
                .filter(
                    jobs::Column::State
                        .is_in([JobState::Waiting.as_str(), JobState::Delayed.as_str()]),
                )
                .filter(jobs::Column::RunAt.lte(now_str.as_str()))
                .order_by_asc(jobs::Column::RunAt)
                .order_by_asc(jobs::Column::Id)
                .one(&self.conn)
                .await?;

            let Some(candidate) = candidate else {
                return Ok(None);
            };

            let result = Jobs::update_many()
                .col_expr(jobs::Column::State, Expr::value(JobState::Active.as_str()))
                .col_expr(
                    jobs::Column::Attempts,
                    Expr::col(jobs::Column::Attempts).add(1),
                )
                .col_expr(
                    jobs::Column::LockedUntil,
                    Expr::value(crate::db::timestamp(now + lease)),
                )
                .col_expr(jobs::Column::UpdatedAt, Expr::value(now_str.clone()))
                .filter(jobs::Column::Id.eq(candidate.id))
                .filter(jobs::Column::State.eq(candidate.state.as_str()))
                .exec(&self.conn)
                .await?;

            if result.rows_affected == 1 {
                return Ok(self.get(candidate.id).await?);
            }
        }
    }

    pub async fn complete(&self, id: i32) -> Result<()> {
        Jobs::update_many()
            .col_expr(
                jobs::Column::State,
                Expr::value(JobState::Completed.as_str()),
            )
            .col_expr(jobs::Column::LockedUntil, Expr::value(Option::<String>::None))
            .col_expr(
                jobs::Column::UpdatedAt,
                Expr::value(crate::db::now_timestamp()),
            )
            .filter(jobs::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Records a failed attempt. The job is re-queued as `delayed` until
    /// `retry_at`, or marked `failed` once its attempts are used up.
    pub async fn fail(&self, id: i32, error: &str, retry_at: DateTime<Utc>) -> Result<JobState> {
        let Some(job) = Jobs::find_by_id(id).one(&self.conn).await? else {
            return Ok(JobState::Failed);
        };

        let next_state = if job.attempts >= job.max_attempts {
            JobState::Failed
        } else {
            JobState::Delayed
        };

        Jobs::update_many()
            .col_expr(jobs::Column::State, Expr::value(next_state.as_str()))
            .col_expr(jobs::Column::LastError, Expr::value(error.to_string()))
            .col_expr(jobs::Column::LockedUntil, Expr::value(Option::<String>::None))
            .col_expr(jobs::Column::RunAt, Expr::value(crate::db::timestamp(retry_at)))
            .col_expr(
                jobs::Column::UpdatedAt,
                Expr::value(crate::db::now_timestamp()),
            )
            .filter(jobs::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(next_state)
    }

    /// Returns active jobs whose lease ran out to `waiting`.
    pub async fn recover_expired_leases(&self, now: DateTime<Utc>) -> Result<u64> {
        let now_str = crate::db::timestamp(now);
        let result = Jobs::update_many()
            .col_expr(jobs::Column::State, Expr::value(JobState::Waiting.as_str()))
            .col_expr(jobs::Column::LockedUntil, Expr::value(Option::<String>::None))
            .col_expr(jobs::Column::UpdatedAt, Expr::value(now_str.clone()))
            .filter(jobs::Column::State.eq(JobState::Active.as_str()))
            .filter(jobs::Column::LockedUntil.lt(now_str.as_str()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
