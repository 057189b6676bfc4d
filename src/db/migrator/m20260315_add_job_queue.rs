use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Jobs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let conn = manager.get_connection();

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_jobs_queue_state_run_at ON jobs(queue, state, run_at)",
        )
        .await?;

        // At most one live job per singleton key and queue.
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_live_singleton ON jobs(queue, singleton_key) \
             WHERE singleton_key IS NOT NULL AND state IN ('waiting', 'active', 'delayed')",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_jobs_live_singleton")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_jobs_queue_state_run_at")
            .await?;

        manager
            .drop_table(Table::drop().table(Jobs).if_exists().to_owned())
            .await
    }
}
