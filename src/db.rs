use crate::entities::{Courier, CourierPatch, CourierType, Order};
use crate::store::{CompletionFilter, EntityStore};
use crate::temporal::{parse_timestamp, store_timestamp};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

const ORDER_COLUMNS: &str = "id, weight, region, delivery_hours, courier_id, assigned, completed,
                             assign_time, complete_time";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Couriers Table (list fields stored as JSON text)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS couriers (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL,
            regions TEXT NOT NULL,
            working_hours TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Orders Table (lifecycle columns written by assignment.rs only)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY,
            weight REAL NOT NULL,
            region INTEGER NOT NULL,
            delivery_hours TEXT NOT NULL,
            courier_id INTEGER REFERENCES couriers(id),
            assigned INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            assign_time TEXT,
            complete_time TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_assigned ON orders(assigned)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_courier ON orders(courier_id)",
        [],
    )?;

    Ok(())
}

/// SQLite-backed entity store. One connection, one writer.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn).context("Failed to set up schema")?;
        Ok(SqliteStore { conn })
    }

    fn ids(&self, sql: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn orders_where(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM orders WHERE {} ORDER BY id",
            ORDER_COLUMNS, clause
        ))?;
        let orders = stmt
            .query_map(params, order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| {
        parse_timestamp(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn courier_from_row(row: &Row<'_>) -> rusqlite::Result<Courier> {
    let type_str: String = row.get(1)?;
    let courier_type = type_str
        .parse::<CourierType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Courier {
        id: row.get(0)?,
        courier_type,
        regions: json_column(row, 2)?,
        working_hours: json_column(row, 3)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        weight: row.get(1)?,
        region: row.get(2)?,
        delivery_hours: json_column(row, 3)?,
        courier_id: row.get(4)?,
        assigned: row.get(5)?,
        completed: row.get(6)?,
        assign_time: timestamp_column(row, 7)?,
        complete_time: timestamp_column(row, 8)?,
    })
}

// ============================================================================
// EntityStore
// ============================================================================

impl EntityStore for SqliteStore {
    fn courier_by_id(&self, id: i64) -> Result<Option<Courier>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, type, regions, working_hours FROM couriers WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], courier_from_row)?;
        let courier = rows.next().transpose()?;
        Ok(courier)
    }

    fn order_by_id(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.orders_where("id = ?1", params![id])?.into_iter().next())
    }

    fn courier_ids(&self) -> Result<Vec<i64>> {
        self.ids("SELECT id FROM couriers ORDER BY id")
    }

    fn order_ids(&self) -> Result<Vec<i64>> {
        self.ids("SELECT id FROM orders ORDER BY id")
    }

    fn free_orders(&self) -> Result<Vec<Order>> {
        self.orders_where("assigned = 0 AND completed = 0", [])
    }

    fn assigned_orders(&self, courier_id: i64, filter: CompletionFilter) -> Result<Vec<Order>> {
        let clause = match filter {
            CompletionFilter::Any => "courier_id = ?1 AND assigned = 1",
            CompletionFilter::Completed => "courier_id = ?1 AND assigned = 1 AND completed = 1",
            CompletionFilter::Incomplete => "courier_id = ?1 AND assigned = 1 AND completed = 0",
        };
        self.orders_where(clause, params![courier_id])
    }

    fn insert_couriers(&mut self, couriers: &[Courier]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO couriers (id, type, regions, working_hours) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for courier in couriers {
                stmt.execute(params![
                    courier.id,
                    courier.courier_type.as_str(),
                    serde_json::to_string(&courier.regions)?,
                    serde_json::to_string(&courier.working_hours)?,
                ])
                .with_context(|| format!("Failed to insert courier {}", courier.id))?;
            }
        }
        tx.commit()?;

        tracing::info!(count = couriers.len(), "couriers inserted");
        Ok(())
    }

    fn insert_orders(&mut self, orders: &[Order]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO orders (id, weight, region, delivery_hours) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for order in orders {
                stmt.execute(params![
                    order.id,
                    order.weight,
                    order.region,
                    serde_json::to_string(&order.delivery_hours)?,
                ])
                .with_context(|| format!("Failed to insert order {}", order.id))?;
            }
        }
        tx.commit()?;

        tracing::info!(count = orders.len(), "orders inserted");
        Ok(())
    }

    fn update_courier(&mut self, id: i64, patch: &CourierPatch) -> Result<()> {
        let tx = self.conn.transaction()?;

        if tx.query_row("SELECT COUNT(*) FROM couriers WHERE id = ?1", params![id], |row| {
            row.get::<_, i64>(0)
        })? == 0
        {
            bail!("courier {} does not exist", id);
        }

        if let Some(courier_type) = patch.courier_type {
            tx.execute(
                "UPDATE couriers SET type = ?1 WHERE id = ?2",
                params![courier_type.as_str(), id],
            )?;
        }
        if let Some(regions) = &patch.regions {
            tx.execute(
                "UPDATE couriers SET regions = ?1 WHERE id = ?2",
                params![serde_json::to_string(regions)?, id],
            )?;
        }
        if let Some(working_hours) = &patch.working_hours {
            tx.execute(
                "UPDATE couriers SET working_hours = ?1 WHERE id = ?2",
                params![serde_json::to_string(working_hours)?, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn assign_orders(
        &mut self,
        courier_id: i64,
        order_ids: &[i64],
        assign_time: DateTime<Utc>,
    ) -> Result<()> {
        let stamp = store_timestamp(&assign_time);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE orders
                 SET assigned = 1, courier_id = ?1, assign_time = ?2
                 WHERE id = ?3 AND assigned = 0 AND completed = 0",
            )?;
            for order_id in order_ids {
                if stmt.execute(params![courier_id, stamp, order_id])? != 1 {
                    // Dropping `tx` rolls back the whole batch
                    bail!("order {} is no longer free", order_id);
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn dismiss_orders(&mut self, order_ids: &[i64]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE orders
                 SET assigned = 0, courier_id = NULL, assign_time = NULL
                 WHERE id = ?1 AND completed = 0",
            )?;
            for order_id in order_ids {
                if stmt.execute(params![order_id])? != 1 {
                    bail!("order {} cannot be dismissed", order_id);
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn complete_order(&mut self, order_id: i64, complete_time: DateTime<Utc>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE orders SET completed = 1, complete_time = ?1
             WHERE id = ?2 AND assigned = 1 AND completed = 0",
            params![store_timestamp(&complete_time), order_id],
        )?;

        if changed != 1 {
            bail!("order {} cannot be completed", order_id);
        }
        Ok(())
    }
}
