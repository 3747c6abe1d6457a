use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{RedemptionStore, StoreResult, UserStore};
use crate::redemption::{ApproveStatus, RedemptionFilter, RedemptionRecord};
use crate::users::UserRecord;

const USER_COLUMNS: &str =
    "id, name, email, role, external_address, address, tel, password_hash, refresh_token";

const REDEMPTION_COLUMNS: &str = "tx_hash, name, company, email, telephone, tax_id, price, \
     redeem_id, redeem_date, wallet_address, approved_status, amount, cert_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RedemptionRow {
    tx_hash: String,
    name: String,
    company: String,
    email: String,
    telephone: String,
    tax_id: String,
    price: String,
    redeem_id: i64,
    redeem_date: i64,
    wallet_address: String,
    approved_status: String,
    amount: i64,
    cert_id: i64,
}

impl From<RedemptionRow> for RedemptionRecord {
    fn from(row: RedemptionRow) -> Self {
        Self {
            tx_hash: row.tx_hash,
            name: row.name,
            company: row.company,
            email: row.email,
            telephone: row.telephone,
            tax_id: row.tax_id,
            price: row.price,
            redeem_id: row.redeem_id,
            redeem_date: row.redeem_date,
            wallet_address: row.wallet_address,
            approve_status: ApproveStatus::parse(&row.approved_status),
            amount: row.amount,
            cert_id: row.cert_id,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, external_address, address, tel, password_hash, refresh_token)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(&user.external_address)
        .bind(&user.address)
        .bind(&user.tel)
        .bind(&user.password_hash)
        .bind(user.refresh_token.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_refresh_credential(
        &self,
        id: Uuid,
        credential: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id)
            .bind(credential)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, refresh_token = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn swap_refresh_credential(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RedemptionStore for PgStore {
    async fn find_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<RedemptionRecord>> {
        let row = sqlx::query_as::<_, RedemptionRow>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE tx_hash = $1"
        ))
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RedemptionRecord::from))
    }

    async fn find_by_redeem_id(&self, redeem_id: i64) -> StoreResult<Option<RedemptionRecord>> {
        let row = sqlx::query_as::<_, RedemptionRow>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE redeem_id = $1 ORDER BY tx_hash LIMIT 1"
        ))
        .bind(redeem_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RedemptionRecord::from))
    }

    async fn insert(&self, record: &RedemptionRecord) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO redemptions ({REDEMPTION_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(&record.tx_hash)
        .bind(&record.name)
        .bind(&record.company)
        .bind(&record.email)
        .bind(&record.telephone)
        .bind(&record.tax_id)
        .bind(&record.price)
        .bind(record.redeem_id)
        .bind(record.redeem_date)
        .bind(&record.wallet_address)
        .bind(record.approve_status.as_str())
        .bind(record.amount)
        .bind(record.cert_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, record: &RedemptionRecord) -> StoreResult<u64> {
        // The row-comparison guard makes an identical write report zero rows.
        let result = sqlx::query(
            "UPDATE redemptions
             SET name = $2, company = $3, email = $4, telephone = $5, tax_id = $6, price = $7,
                 redeem_id = $8, redeem_date = $9, wallet_address = $10, approved_status = $11,
                 amount = $12, cert_id = $13
             WHERE tx_hash = $1
               AND (name, company, email, telephone, tax_id, price, redeem_id, redeem_date,
                    wallet_address, approved_status, amount, cert_id)
                   IS DISTINCT FROM ($2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&record.tx_hash)
        .bind(&record.name)
        .bind(&record.company)
        .bind(&record.email)
        .bind(&record.telephone)
        .bind(&record.tax_id)
        .bind(&record.price)
        .bind(record.redeem_id)
        .bind(record.redeem_date)
        .bind(&record.wallet_address)
        .bind(record.approve_status.as_str())
        .bind(record.amount)
        .bind(record.cert_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_status(&self, tx_hash: &str, status: &ApproveStatus) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE redemptions SET approved_status = $2
             WHERE tx_hash = $1 AND approved_status IS DISTINCT FROM $2",
        )
        .bind(tx_hash)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list(&self, filter: &RedemptionFilter) -> StoreResult<Vec<RedemptionRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE TRUE"
        ));

        if !filter.statuses.is_empty() {
            builder.push(" AND approved_status = ANY(");
            builder.push_bind(filter.statuses.clone());
            builder.push(")");
        }
        if let Some(name) = &filter.name {
            builder.push(" AND name = ");
            builder.push_bind(name.clone());
        }
        if let Some(email) = &filter.email {
            builder.push(" AND email = ");
            builder.push_bind(email.clone());
        }
        if !filter.redeem_ids.is_empty() {
            builder.push(" AND redeem_id = ANY(");
            builder.push_bind(filter.redeem_ids.clone());
            builder.push(")");
        }
        match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => {
                builder.push(" AND redeem_date >= ");
                builder.push_bind(start);
                builder.push(" AND redeem_date < ");
                builder.push_bind(end);
            }
            (Some(start), None) => {
                builder.push(" AND redeem_date >= ");
                builder.push_bind(start);
            }
            (None, Some(end)) => {
                builder.push(" AND redeem_date <= ");
                builder.push_bind(end);
            }
            (None, None) => {}
        }
        if let Some(wallet) = &filter.wallet_address {
            builder.push(" AND wallet_address = ");
            builder.push_bind(wallet.clone());
        }
        builder.push(" ORDER BY tx_hash");

        let rows = builder
            .build_query_as::<RedemptionRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RedemptionRecord::from).collect())
    }
}
