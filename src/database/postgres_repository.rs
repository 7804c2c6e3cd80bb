use sqlx::PgPool;

/// Store backed by PostgreSQL. Every call checks a connection out of the
/// pool and returns it when the query future completes or is dropped.
#[derive(Clone)]
pub struct PostgresRepository {
    pub pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
