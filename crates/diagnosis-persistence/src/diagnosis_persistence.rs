use crate::config::DbConfig;
use crate::schema;
use crate::schema::diagnosis::dsl as diag_dsl;
use crate::schema::message::dsl as msg_dsl;
use chrono::{DateTime, Utc};
use diagnosis_domain::{Diagnosis, DiagnosisRepository, DomainError, Message, MessageOp, NewMessage, Stage, Transition};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info, warn};
use std::sync::Arc;

#[cfg(feature = "pg")]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/postgres");
#[cfg(not(feature = "pg"))]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/sqlite");
#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
#[cfg(feature = "pg")]
type DbBackend = diesel::pg::Pg;
#[cfg(not(feature = "pg"))]
type DbBackend = diesel::sqlite::Sqlite;
type DbPool = Pool<ConnectionManager<DbConn>>;

/// Pragmas aplicados a cada conexión SQLite nueva del pool.
#[cfg(not(feature = "pg"))]
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

#[cfg(not(feature = "pg"))]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    diesel::sql_query("PRAGMA foreign_keys = ON;").execute(conn).map_err(diesel::r2d2::Error::QueryError)?;
    diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(conn).map_err(diesel::r2d2::Error::QueryError)?;
    Ok(())
  }
}

#[cfg(not(feature = "pg"))]
#[derive(QueryableByName)]
struct JournalMode {
  #[diesel(sql_type = diesel::sql_types::Text)]
  journal_mode: String,
}

/// Pide WAL y devuelve el modo de journal efectivo. Las bases en memoria
/// responden `memory` sin error.
#[cfg(not(feature = "pg"))]
fn enable_wal(conn: &mut SqliteConnection) -> Result<String, DieselError> {
  diesel::sql_query("PRAGMA journal_mode = WAL;").get_result::<JournalMode>(conn).map(|r| r.journal_mode)
}

/// Repo Diesel que implementa `DiagnosisRepository`.
pub struct DieselDiagnosisRepository {
  pool: Arc<DbPool>,
}

impl DieselDiagnosisRepository {
  /// Crea el pool y aplica las migraciones embebidas pendientes.
  pub fn new(config: &DbConfig) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<DbConn>::new(config.database_url.as_str());
    let builder = Pool::builder().max_size(config.pool_size);
    #[cfg(not(feature = "pg"))]
    let builder = builder.connection_customizer(Box::new(SqlitePragmas));
    let pool = builder.build(manager)
                      .map_err(|e| DomainError::ExternalError(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    let repo = DieselDiagnosisRepository { pool: Arc::new(pool) };
    let mut c = repo.conn()?;
    #[cfg(not(feature = "pg"))]
    {
      match enable_wal(&mut c) {
        Ok(mode) if mode.eq_ignore_ascii_case("wal") => debug!("journal_mode = wal"),
        Ok(mode) => warn!("journal_mode stays '{}' on {}; WAL not available", mode, config.database_url),
        Err(e) => warn!("could not enable WAL journal mode on {}: {}", config.database_url, e),
      }
    }
    let applied = c.run_pending_migrations(MIGRATIONS)
                   .map_err(|e| DomainError::ExternalError(format!("migrations: {}", e)))?;
    if !applied.is_empty() {
      info!("applied {} pending migration(s)", applied.len());
    }
    drop(c);
    Ok(repo)
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.pool.get().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))
  }
}

// Diesel row structs para las tablas de diagnóstico
#[derive(Debug, Queryable)]
struct DiagnosisRow {
  pub id: i32,
  pub user_id: i32,
  pub current_operation: String,
  pub validation: Option<String>,
  pub score: Option<String>,
  pub note: Option<String>,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::diagnosis)]
struct NewDiagnosisRow<'a> {
  pub user_id: i32,
  pub current_operation: &'a str,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}

/// Campos `None` no se tocan en el UPDATE.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = schema::diagnosis)]
struct DiagnosisChangeset<'a> {
  pub current_operation: &'a str,
  pub validation: Option<&'a str>,
  pub score: Option<&'a str>,
  pub note: Option<&'a str>,
  pub updated_at_ts: i64,
}

#[derive(Debug, Queryable)]
struct MessageRow {
  pub id: i32,
  pub diagnosis_block: i32,
  pub role: String,
  pub message_type: String,
  pub text: String,
  pub order_number: i32,
  pub has_validation: bool,
  pub has_skip: bool,
  pub timestamp_ts: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::message)]
struct NewMessageRow<'a> {
  pub diagnosis_block: i32,
  pub role: &'a str,
  pub message_type: &'a str,
  pub text: &'a str,
  pub order_number: i32,
  pub has_validation: bool,
  pub has_skip: bool,
  pub timestamp_ts: i64,
}

impl<'a> NewMessageRow<'a> {
  fn from_new(diagnosis_block: i32, m: &'a NewMessage, timestamp_ts: i64) -> Self {
    Self { diagnosis_block,
           role: m.role.as_str(),
           message_type: m.message_type.as_str(),
           text: &m.text,
           order_number: m.order_number,
           has_validation: m.has_validation,
           has_skip: m.has_skip,
           timestamp_ts }
  }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, DomainError> {
  DateTime::from_timestamp_millis(ms).ok_or_else(|| DomainError::SerializationError(format!("timestamp fuera de rango: {}", ms)))
}

impl DiagnosisRow {
  fn into_domain(self) -> Result<Diagnosis, DomainError> {
    let validation = match self.validation {
      Some(v) => Some(v.parse().map_err(|e: DomainError| DomainError::SerializationError(e.to_string()))?),
      None => None,
    };
    Ok(Diagnosis { id: self.id,
                   user_id: self.user_id,
                   current_operation: self.current_operation
                                          .parse()
                                          .map_err(|e: DomainError| DomainError::SerializationError(e.to_string()))?,
                   validation,
                   score: self.score,
                   note: self.note,
                   created_at: from_millis(self.created_at_ts)?,
                   updated_at: from_millis(self.updated_at_ts)? })
  }
}

impl MessageRow {
  fn into_domain(self) -> Result<Message, DomainError> {
    let bad = |e: DomainError| DomainError::SerializationError(e.to_string());
    Ok(Message { id: self.id,
                 diagnosis_block: self.diagnosis_block,
                 role: self.role.parse().map_err(bad)?,
                 message_type: self.message_type.parse().map_err(bad)?,
                 text: self.text,
                 order_number: self.order_number,
                 has_validation: self.has_validation,
                 has_skip: self.has_skip,
                 timestamp: from_millis(self.timestamp_ts)? })
  }
}

/// Error interno de las transacciones: Diesel exige `From<DieselError>` y
/// además hay que poder abortar con un error de dominio.
#[derive(Debug)]
enum TxError {
  Db(DieselError),
  Domain(DomainError),
}

impl From<DieselError> for TxError {
  fn from(e: DieselError) -> Self {
    TxError::Db(e)
  }
}

impl From<TxError> for DomainError {
  fn from(e: TxError) -> Self {
    match e {
      TxError::Db(e) => db_error(e),
      TxError::Domain(e) => e,
    }
  }
}

fn db_error(e: DieselError) -> DomainError {
  DomainError::ExternalError(format!("db: {}", e))
}

fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(db_error)
}

/// Transacción de escritura. En SQLite se abre con `BEGIN IMMEDIATE` para
/// tomar el lock de escritura antes de la primera lectura; una transacción
/// diferida que lee y luego escribe falla con `SQLITE_BUSY` sin esperar al
/// `busy_timeout`.
fn write_tx<T, E, F>(conn: &mut DbConn, f: F) -> Result<T, E>
  where F: FnOnce(&mut DbConn) -> Result<T, E>,
        E: From<DieselError>
{
  #[cfg(not(feature = "pg"))]
  {
    conn.immediate_transaction(f)
  }
  #[cfg(feature = "pg")]
  {
    conn.transaction(f)
  }
}

fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

fn in_progress_query(user_id: i32) -> schema::diagnosis::BoxedQuery<'static, DbBackend> {
  diag_dsl::diagnosis.filter(diag_dsl::user_id.eq(user_id))
                     .filter(diag_dsl::current_operation.ne(Stage::Finished.as_str()))
                     .order(diag_dsl::id.asc())
                     .into_boxed()
}

fn rows_into_domain(rows: Vec<DiagnosisRow>) -> Result<Vec<Diagnosis>, DomainError> {
  rows.into_iter().map(DiagnosisRow::into_domain).collect()
}

impl DiagnosisRepository for DieselDiagnosisRepository {
  fn list_finished(&self, user_id: i32) -> Result<Vec<Diagnosis>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(diag_dsl::diagnosis.filter(diag_dsl::user_id.eq(user_id))
                                             .filter(diag_dsl::current_operation.eq(Stage::Finished.as_str()))
                                             .order(diag_dsl::id.asc())
                                             .load::<DiagnosisRow>(&mut conn))?;
    debug!("user {} has {} finished diagnoses", user_id, rows.len());
    rows_into_domain(rows)
  }

  fn find_in_progress(&self, user_id: i32) -> Result<Option<Diagnosis>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(in_progress_query(user_id).first::<DiagnosisRow>(&mut conn).optional())?;
    row.map(DiagnosisRow::into_domain).transpose()
  }

  fn get_or_create_in_progress(&self, user_id: i32) -> Result<(Diagnosis, bool), DomainError> {
    let mut conn = self.conn()?;
    // Check-and-insert en una sola transacción. En SQLite el lock inmediato
    // serializa a los creadores; en Postgres el índice único parcial cubre la
    // carrera y el perdedor relee la fila ganadora.
    let res = write_tx::<(DiagnosisRow, bool), DieselError, _>(&mut conn, |conn| {
                    if let Some(row) = in_progress_query(user_id).first::<DiagnosisRow>(conn).optional()? {
                      return Ok((row, false));
                    }
                    let now = now_millis();
                    let new_row = NewDiagnosisRow { user_id,
                                                    current_operation: Stage::Validation.as_str(),
                                                    created_at_ts: now,
                                                    updated_at_ts: now };
                    let row = diesel::insert_into(diag_dsl::diagnosis).values(&new_row)
                                                                       .get_result::<DiagnosisRow>(conn)?;
                    Ok((row, true))
                  });
    match res {
      Ok((row, created)) => {
        if created {
          info!("created diagnosis {} for user {}", row.id, user_id);
        }
        Ok((row.into_domain()?, created))
      }
      Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
        warn!("concurrent diagnosis creation for user {}; reusing the winner", user_id);
        let row = map_db_err(in_progress_query(user_id).first::<DiagnosisRow>(&mut conn))?;
        Ok((row.into_domain()?, false))
      }
      Err(e) => Err(db_error(e)),
    }
  }

  fn get_diagnosis(&self, user_id: i32, diagnosis_id: i32) -> Result<Option<Diagnosis>, DomainError> {
    let mut conn = self.conn()?;
    let row = map_db_err(diag_dsl::diagnosis.filter(diag_dsl::id.eq(diagnosis_id))
                                            .filter(diag_dsl::user_id.eq(user_id))
                                            .first::<DiagnosisRow>(&mut conn)
                                            .optional())?;
    row.map(DiagnosisRow::into_domain).transpose()
  }

  fn list_messages(&self, diagnosis_id: i32) -> Result<Vec<Message>, DomainError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(msg_dsl::message.filter(msg_dsl::diagnosis_block.eq(diagnosis_id))
                                          .order((msg_dsl::order_number.asc(), msg_dsl::id.asc()))
                                          .load::<MessageRow>(&mut conn))?;
    rows.into_iter().map(MessageRow::into_domain).collect()
  }

  fn insert_message(&self, diagnosis_id: i32, message: NewMessage) -> Result<Message, DomainError> {
    let mut conn = self.conn()?;
    let res = write_tx::<MessageRow, TxError, _>(&mut conn, |conn| {
                    let exists = diag_dsl::diagnosis.find(diagnosis_id)
                                                    .select(diag_dsl::id)
                                                    .first::<i32>(conn)
                                                    .optional()?;
                    if exists.is_none() {
                      return Err(TxError::Domain(DomainError::NotFound(format!("diagnosis {}", diagnosis_id))));
                    }
                    let row = NewMessageRow::from_new(diagnosis_id, &message, now_millis());
                    Ok(diesel::insert_into(msg_dsl::message).values(&row).get_result::<MessageRow>(conn)?)
                  })?;
    res.into_domain()
  }

  fn apply_transition(&self, user_id: i32, diagnosis_id: i32, transition: &Transition) -> Result<Diagnosis, DomainError> {
    let mut conn = self.conn()?;
    let row = write_tx::<DiagnosisRow, TxError, _>(&mut conn, |conn| {
                    let now = now_millis();
                    let changeset = DiagnosisChangeset { current_operation: transition.to.as_str(),
                                                         validation: transition.changes.validation.map(|v| v.as_str()),
                                                         score: transition.changes.score.as_deref(),
                                                         note: transition.changes.note.as_deref(),
                                                         updated_at_ts: now };
                    // compare-and-set sobre la etapa esperada
                    let affected =
                      diesel::update(diag_dsl::diagnosis.filter(diag_dsl::id.eq(diagnosis_id))
                                                        .filter(diag_dsl::user_id.eq(user_id))
                                                        .filter(diag_dsl::current_operation.eq(transition.from.as_str())))
                        .set(&changeset)
                        .execute(conn)?;
                    if affected == 0 {
                      let stored = diag_dsl::diagnosis.filter(diag_dsl::id.eq(diagnosis_id))
                                                      .filter(diag_dsl::user_id.eq(user_id))
                                                      .select(diag_dsl::current_operation)
                                                      .first::<String>(conn)
                                                      .optional()?;
                      let err = match stored {
                        None => DomainError::NotFound(format!("diagnosis {} of user {}", diagnosis_id, user_id)),
                        Some(stage) => DomainError::Conflict(format!("diagnosis {} is in {}, expected {}",
                                                                     diagnosis_id, stage, transition.from)),
                      };
                      return Err(TxError::Domain(err));
                    }
                    for op in &transition.message_ops {
                      match op {
                        MessageOp::ClearValidation { message_id } => {
                          diesel::update(msg_dsl::message.filter(msg_dsl::id.eq(*message_id))
                                                         .filter(msg_dsl::diagnosis_block.eq(diagnosis_id)))
                            .set(msg_dsl::has_validation.eq(false))
                            .execute(conn)?;
                        }
                        MessageOp::Append(m) => {
                          let row = NewMessageRow::from_new(diagnosis_id, m, now);
                          diesel::insert_into(msg_dsl::message).values(&row).execute(conn)?;
                        }
                        MessageOp::ClearFlags => {
                          diesel::update(msg_dsl::message.filter(msg_dsl::diagnosis_block.eq(diagnosis_id)))
                            .set((msg_dsl::has_validation.eq(false), msg_dsl::has_skip.eq(false)))
                            .execute(conn)?;
                        }
                      }
                    }
                    Ok(diag_dsl::diagnosis.find(diagnosis_id).first::<DiagnosisRow>(conn)?)
                  })?;
    info!("diagnosis {} moved {} -> {}", diagnosis_id, transition.from, transition.to);
    row.into_domain()
  }
}

/// Crear repo desde las variables de entorno. Exige `DIAG_DB_URL` o
/// `DATABASE_URL` acorde al backend compilado.
pub fn new_from_env() -> Result<DieselDiagnosisRepository, DomainError> {
  let config = DbConfig::from_env()?;
  config.check_backend()?;
  DieselDiagnosisRepository::new(&config)
}

/// Variante indulgente para demos: sin URL usa SQLite en memoria compartida.
#[cfg(not(feature = "pg"))]
pub fn new_from_env_or_memory() -> Result<DieselDiagnosisRepository, DomainError> {
  let config = DbConfig::from_env_or_memory()?;
  config.check_backend()?;
  DieselDiagnosisRepository::new(&config)
}
