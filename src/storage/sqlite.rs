//! SQLite-backed trade store

use async_trait::async_trait;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;

use crate::errors::{RelayError, RelayResult};
use crate::types::{ExecutedTrade, IntentStatus, PaymentStatus, Side, TradeIntent};

use super::store::TradeStore;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS trade_intents (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL CHECK (side IN ('buy', 'sell')),
    size TEXT NOT NULL,
    leverage INTEGER NOT NULL DEFAULT 1,
    expected_payment_amount TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'paid', 'executed')),
    payment_request_id TEXT,
    paid_payment_id TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS executed_trades (
    id TEXT PRIMARY KEY,
    trade_intent_id TEXT NOT NULL REFERENCES trade_intents(id),
    payment_id TEXT NOT NULL,
    payment_status TEXT NOT NULL CHECK (payment_status IN ('paid', 'failed')),
    tx_hash TEXT NOT NULL,
    execution_price TEXT NOT NULL,
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_executed_trades_completed_at
    ON executed_trades(completed_at DESC);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating database directory {parent:?}"))?;
                }
            }
        }

        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        conn.execute_batch(SCHEMA).context("applying schema")?;

        info!("💾 Trade store ready at {}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_poisoned() -> RelayError {
        RelayError::internal("database lock poisoned")
    }

    fn db_err(message: &str, e: impl Into<anyhow::Error>) -> RelayError {
        RelayError::storage(message, e)
    }
}

fn parse_decimal(s: &str, what: &str) -> RelayResult<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| RelayError::storage(format!("corrupt {what} value {s}"), e))
}

fn parse_timestamp(s: &str, what: &str) -> RelayResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RelayError::storage(format!("corrupt {what} timestamp {s}"), e))
}

struct IntentRow {
    id: String,
    user_address: String,
    agent_id: String,
    symbol: String,
    side: String,
    size: String,
    leverage: i64,
    expected_payment_amount: String,
    status: String,
    payment_request_id: Option<String>,
    paid_payment_id: Option<String>,
    created_at: String,
}

impl IntentRow {
    fn into_intent(self) -> RelayResult<TradeIntent> {
        Ok(TradeIntent {
            side: Side::parse(&self.side)
                .ok_or_else(|| RelayError::internal(format!("corrupt side {}", self.side)))?,
            size: parse_decimal(&self.size, "size")?,
            status: IntentStatus::parse(&self.status)
                .ok_or_else(|| RelayError::internal(format!("corrupt status {}", self.status)))?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            id: self.id,
            user_address: self.user_address,
            agent_id: self.agent_id,
            symbol: self.symbol,
            leverage: self.leverage as u32,
            expected_payment_amount: self.expected_payment_amount,
            payment_request_id: self.payment_request_id,
            paid_payment_id: self.paid_payment_id,
        })
    }
}

fn intent_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<IntentRow> {
    Ok(IntentRow {
        id: row.get(offset)?,
        user_address: row.get(offset + 1)?,
        agent_id: row.get(offset + 2)?,
        symbol: row.get(offset + 3)?,
        side: row.get(offset + 4)?,
        size: row.get(offset + 5)?,
        leverage: row.get(offset + 6)?,
        expected_payment_amount: row.get(offset + 7)?,
        status: row.get(offset + 8)?,
        payment_request_id: row.get(offset + 9)?,
        paid_payment_id: row.get(offset + 10)?,
        created_at: row.get(offset + 11)?,
    })
}

struct TradeRow {
    id: String,
    trade_intent_id: String,
    payment_id: String,
    payment_status: String,
    tx_hash: String,
    execution_price: String,
    completed_at: String,
}

impl TradeRow {
    fn into_trade(self) -> RelayResult<ExecutedTrade> {
        Ok(ExecutedTrade {
            payment_status: PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
                RelayError::internal(format!("corrupt payment_status {}", self.payment_status))
            })?,
            execution_price: parse_decimal(&self.execution_price, "execution_price")?,
            completed_at: parse_timestamp(&self.completed_at, "completed_at")?,
            id: self.id,
            trade_intent_id: self.trade_intent_id,
            payment_id: self.payment_id,
            tx_hash: self.tx_hash,
            status: IntentStatus::Executed,
        })
    }
}

fn trade_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TradeRow> {
    Ok(TradeRow {
        id: row.get(0)?,
        trade_intent_id: row.get(1)?,
        payment_id: row.get(2)?,
        payment_status: row.get(3)?,
        tx_hash: row.get(4)?,
        execution_price: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

const INTENT_COLUMNS: &str = "id, user_address, agent_id, symbol, side, size, leverage, \
     expected_payment_amount, status, payment_request_id, paid_payment_id, created_at";

#[async_trait]
impl TradeStore for SqliteStore {
    async fn insert_intent(&self, intent: &TradeIntent) -> RelayResult<()> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        conn.execute(
            "INSERT INTO trade_intents (id, user_address, agent_id, symbol, side, size, leverage, \
             expected_payment_amount, status, payment_request_id, paid_payment_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                intent.id,
                intent.user_address,
                intent.agent_id,
                intent.symbol,
                intent.side.as_str(),
                intent.size.to_string(),
                intent.leverage as i64,
                intent.expected_payment_amount,
                intent.status.as_str(),
                intent.payment_request_id,
                intent.paid_payment_id,
                intent.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Self::db_err("failed to insert trade intent", e))?;
        Ok(())
    }

    async fn get_intent(&self, id: &str) -> RelayResult<Option<TradeIntent>> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        let row = conn
            .query_row(
                &format!("SELECT {INTENT_COLUMNS} FROM trade_intents WHERE id = ?1"),
                params![id],
                |row| intent_row(row, 0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(Self::db_err("failed to load trade intent", other)),
            })?;

        row.map(IntentRow::into_intent).transpose()
    }

    async fn transition_status(
        &self,
        id: &str,
        from: IntentStatus,
        to: IntentStatus,
        payment_id: Option<&str>,
    ) -> RelayResult<bool> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        // Conditional update is the atomicity guarantee: only one concurrent
        // caller can observe status == from.
        let changed = conn
            .execute(
                "UPDATE trade_intents \
                 SET status = ?1, paid_payment_id = COALESCE(?2, paid_payment_id) \
                 WHERE id = ?3 AND status = ?4",
                params![to.as_str(), payment_id, id, from.as_str()],
            )
            .map_err(|e| Self::db_err("failed to transition intent status", e))?;
        Ok(changed == 1)
    }

    async fn insert_trade(&self, trade: &ExecutedTrade) -> RelayResult<()> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        conn.execute(
            "INSERT INTO executed_trades (id, trade_intent_id, payment_id, payment_status, \
             tx_hash, execution_price, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                trade.id,
                trade.trade_intent_id,
                trade.payment_id,
                trade.payment_status.as_str(),
                trade.tx_hash,
                trade.execution_price.to_string(),
                trade.completed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Self::db_err("failed to insert executed trade", e))?;
        Ok(())
    }

    async fn record_execution(&self, trade: &ExecutedTrade) -> RelayResult<bool> {
        let mut conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        let tx = conn
            .transaction()
            .map_err(|e| Self::db_err("failed to begin execution transaction", e))?;

        let changed = tx
            .execute(
                "UPDATE trade_intents SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![
                    IntentStatus::Executed.as_str(),
                    trade.trade_intent_id,
                    IntentStatus::Paid.as_str(),
                ],
            )
            .map_err(|e| Self::db_err("failed to mark intent executed", e))?;
        if changed != 1 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO executed_trades (id, trade_intent_id, payment_id, payment_status, \
             tx_hash, execution_price, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                trade.id,
                trade.trade_intent_id,
                trade.payment_id,
                trade.payment_status.as_str(),
                trade.tx_hash,
                trade.execution_price.to_string(),
                trade.completed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Self::db_err("failed to insert executed trade", e))?;

        tx.commit()
            .map_err(|e| Self::db_err("failed to commit execution transaction", e))?;
        Ok(true)
    }

    async fn recent_trades(
        &self,
        limit: usize,
    ) -> RelayResult<Vec<(ExecutedTrade, Option<TradeIntent>)>> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT t.id, t.trade_intent_id, t.payment_id, t.payment_status, t.tx_hash, \
                 t.execution_price, t.completed_at, \
                 i.id, i.user_address, i.agent_id, i.symbol, i.side, i.size, i.leverage, \
                 i.expected_payment_amount, i.status, i.payment_request_id, i.paid_payment_id, \
                 i.created_at \
                 FROM executed_trades t \
                 LEFT JOIN trade_intents i ON i.id = t.trade_intent_id \
                 ORDER BY t.completed_at DESC LIMIT ?1"
            ))
            .map_err(|e| Self::db_err("failed to prepare trade listing", e))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let trade = trade_row(row)?;
                let intent_id: Option<String> = row.get(7)?;
                let intent = if intent_id.is_some() {
                    Some(intent_row(row, 7)?)
                } else {
                    None
                };
                Ok((trade, intent))
            })
            .map_err(|e| Self::db_err("failed to list executed trades", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Self::db_err("failed to read trade rows", e))?;

        rows.into_iter()
            .map(|(trade, intent)| {
                Ok((
                    trade.into_trade()?,
                    intent.map(IntentRow::into_intent).transpose()?,
                ))
            })
            .collect()
    }

    async fn ping(&self) -> RelayResult<()> {
        let conn = self.conn.lock().map_err(|_| Self::lock_poisoned())?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Self::db_err("database ping failed", e))?;
        Ok(())
    }
}
