use eyre::Result;
use sqlx::query;

use crate::AppState;

impl AppState {
    pub async fn reset(&self) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        query("DROP SCHEMA public CASCADE")
            .execute(&mut *transaction)
            .await?;
        query("CREATE SCHEMA public")
            .execute(&mut *transaction)
            .await?;
        let _ = query("GRANT ALL ON SCHEMA public TO postgres")
            .execute(&mut *transaction)
            .await; // ok if this fails
        query("GRANT ALL ON SCHEMA public TO public")
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(())
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}
