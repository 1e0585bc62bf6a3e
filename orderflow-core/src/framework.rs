use sqlx::PgPool;

/// Executes the SQL commands defined next to each entity.
///
/// Every query is a `kanau::processor::Processor` implementation on this type,
/// so callers only ever see typed commands and results.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
