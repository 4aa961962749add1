//! SQLite implementation of IMirrorRepository
//!
//! This module provides the concrete SQLite-based implementation of the
//! mirror repository port defined in panelsync-core. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                   |
//! |----------------|----------|--------------------------------------------|
//! | MirrorId       | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | Email          | TEXT     | String via `.as_str()` / `Email::new()`    |
//! | panel ids      | INTEGER  | i64                                        |
//! | bool flags     | INTEGER  | 0/1                                        |
//! | DateTime<Utc>  | TEXT     | RFC 3339 with fixed microsecond precision  |
//!
//! Upserts for panel-keyed entities use `ON CONFLICT(panel_id) DO UPDATE`
//! so a row's local id survives refreshes; users upsert on their local id
//! because the upserter resolves identity (panel id OR email) first.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use panelsync_core::domain::mirror::{
    Allocation, Egg, Location, Nest, Node, Server, ServerDatabase, User,
};
use panelsync_core::domain::newtypes::{Email, MirrorId};
use panelsync_core::ports::mirror_repository::{IMirrorRepository, MirrorCounts};

use crate::StoreError;

/// SQLite-based implementation of the mirror repository port
///
/// Provides persistent storage for all mirrored panel entities. All
/// operations go through a connection pool; each upsert is atomic at the
/// row level.
pub struct SqliteMirrorRepository {
    pool: SqlitePool,
}

impl SqliteMirrorRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Formats a timestamp with fixed microsecond precision so that stored
/// values sort lexicographically in chronological order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a DateTime<Utc> from an RFC 3339 string
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{s}': {e}"))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
pub(crate) fn parse_optional_datetime(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Parse a MirrorId from its stored string form
fn parse_mirror_id(s: &str) -> Result<MirrorId, StoreError> {
    MirrorId::from_str(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid MirrorId '{s}': {e}")))
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn location_from_row(row: &SqliteRow) -> Result<Location, StoreError> {
    Ok(Location {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        short_code: row.get("short_code"),
        description: row.get("description"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn node_from_row(row: &SqliteRow) -> Result<Node, StoreError> {
    Ok(Node {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        location_panel_id: row.get("location_panel_id"),
        name: row.get("name"),
        fqdn: row.get("fqdn"),
        scheme: row.get("scheme"),
        memory_mb: row.get("memory_mb"),
        disk_mb: row.get("disk_mb"),
        maintenance_mode: row.get("maintenance_mode"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn allocation_from_row(row: &SqliteRow) -> Result<Allocation, StoreError> {
    Ok(Allocation {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        node_panel_id: row.get("node_panel_id"),
        ip: row.get("ip"),
        port: row.get("port"),
        alias: row.get("alias"),
        assigned: row.get("assigned"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn nest_from_row(row: &SqliteRow) -> Result<Nest, StoreError> {
    Ok(Nest {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        name: row.get("name"),
        description: row.get("description"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn egg_from_row(row: &SqliteRow) -> Result<Egg, StoreError> {
    Ok(Egg {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        nest_panel_id: row.get("nest_panel_id"),
        name: row.get("name"),
        docker_image: row.get("docker_image"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn server_from_row(row: &SqliteRow) -> Result<Server, StoreError> {
    Ok(Server {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        uuid: row.get("uuid"),
        name: row.get("name"),
        description: row.get("description"),
        suspended: row.get("suspended"),
        owner_panel_id: row.get("owner_panel_id"),
        node_panel_id: row.get("node_panel_id"),
        egg_panel_id: row.get("egg_panel_id"),
        allocation_panel_id: row.get("allocation_panel_id"),
        memory_mb: row.get("memory_mb"),
        disk_mb: row.get("disk_mb"),
        cpu_pct: row.get("cpu_pct"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn server_database_from_row(row: &SqliteRow) -> Result<ServerDatabase, StoreError> {
    Ok(ServerDatabase {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        server_panel_id: row.get("server_panel_id"),
        database_name: row.get("database_name"),
        username: row.get("username"),
        remote_host: row.get("remote_host"),
        last_synced_at: parse_datetime(&row.get::<String, _>("last_synced_at"))?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let email_str: String = row.get("email");
    let email = Email::new(email_str.clone())
        .map_err(|e| StoreError::SerializationError(format!("Invalid Email '{email_str}': {e}")))?;

    Ok(User {
        id: parse_mirror_id(&row.get::<String, _>("id"))?,
        panel_id: row.get("panel_id"),
        email,
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        root_admin: row.get("root_admin"),
        password_hash: row.get("password_hash"),
        is_migrated: row.get("is_migrated"),
        last_synced_at: parse_optional_datetime(row.get("last_synced_at"))?,
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
    })
}

// ============================================================================
// IMirrorRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IMirrorRepository for SqliteMirrorRepository {
    // --- Locations ---

    async fn find_location_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query("SELECT * FROM locations WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(location_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_location(&self, location: &Location) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, panel_id, short_code, description, last_synced_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                short_code = excluded.short_code,
                description = excluded.description,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(location.id.to_string())
        .bind(location.panel_id)
        .bind(&location.short_code)
        .bind(&location.description)
        .bind(fmt_ts(location.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- Nodes ---

    async fn find_node_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Node>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(node_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_node(&self, node: &Node) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nodes (
                id, panel_id, location_panel_id, name, fqdn, scheme,
                memory_mb, disk_mb, maintenance_mode, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                location_panel_id = excluded.location_panel_id,
                name = excluded.name,
                fqdn = excluded.fqdn,
                scheme = excluded.scheme,
                memory_mb = excluded.memory_mb,
                disk_mb = excluded.disk_mb,
                maintenance_mode = excluded.maintenance_mode,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.panel_id)
        .bind(node.location_panel_id)
        .bind(&node.name)
        .bind(&node.fqdn)
        .bind(&node.scheme)
        .bind(node.memory_mb)
        .bind(node.disk_mb)
        .bind(node.maintenance_mode)
        .bind(fmt_ts(node.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn node_panel_ids(&self) -> anyhow::Result<Vec<i64>> {
        let rows = sqlx::query("SELECT panel_id FROM nodes ORDER BY panel_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(rows.iter().map(|r| r.get("panel_id")).collect())
    }

    // --- Allocations ---

    async fn find_allocation_by_panel_id(
        &self,
        panel_id: i64,
    ) -> anyhow::Result<Option<Allocation>> {
        let row = sqlx::query("SELECT * FROM allocations WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(allocation_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_allocation(&self, allocation: &Allocation) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO allocations (
                id, panel_id, node_panel_id, ip, port, alias, assigned, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                node_panel_id = excluded.node_panel_id,
                ip = excluded.ip,
                port = excluded.port,
                alias = excluded.alias,
                assigned = excluded.assigned,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(allocation.id.to_string())
        .bind(allocation.panel_id)
        .bind(allocation.node_panel_id)
        .bind(&allocation.ip)
        .bind(allocation.port)
        .bind(&allocation.alias)
        .bind(allocation.assigned)
        .bind(fmt_ts(allocation.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- Nests and eggs ---

    async fn find_nest_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Nest>> {
        let row = sqlx::query("SELECT * FROM nests WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(nest_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_nest(&self, nest: &Nest) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nests (id, panel_id, name, description, last_synced_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(nest.id.to_string())
        .bind(nest.panel_id)
        .bind(&nest.name)
        .bind(&nest.description)
        .bind(fmt_ts(nest.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn find_egg_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Egg>> {
        let row = sqlx::query("SELECT * FROM eggs WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(egg_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_egg(&self, egg: &Egg) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO eggs (id, panel_id, nest_panel_id, name, docker_image, last_synced_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                nest_panel_id = excluded.nest_panel_id,
                name = excluded.name,
                docker_image = excluded.docker_image,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(egg.id.to_string())
        .bind(egg.panel_id)
        .bind(egg.nest_panel_id)
        .bind(&egg.name)
        .bind(&egg.docker_image)
        .bind(fmt_ts(egg.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- Servers ---

    async fn find_server_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Server>> {
        let row = sqlx::query("SELECT * FROM servers WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(server_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_server(&self, server: &Server) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO servers (
                id, panel_id, uuid, name, description, suspended,
                owner_panel_id, node_panel_id, egg_panel_id, allocation_panel_id,
                memory_mb, disk_mb, cpu_pct, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                uuid = excluded.uuid,
                name = excluded.name,
                description = excluded.description,
                suspended = excluded.suspended,
                owner_panel_id = excluded.owner_panel_id,
                node_panel_id = excluded.node_panel_id,
                egg_panel_id = excluded.egg_panel_id,
                allocation_panel_id = excluded.allocation_panel_id,
                memory_mb = excluded.memory_mb,
                disk_mb = excluded.disk_mb,
                cpu_pct = excluded.cpu_pct,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(server.id.to_string())
        .bind(server.panel_id)
        .bind(&server.uuid)
        .bind(&server.name)
        .bind(&server.description)
        .bind(server.suspended)
        .bind(server.owner_panel_id)
        .bind(server.node_panel_id)
        .bind(server.egg_panel_id)
        .bind(server.allocation_panel_id)
        .bind(server.memory_mb)
        .bind(server.disk_mb)
        .bind(server.cpu_pct)
        .bind(fmt_ts(server.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn server_panel_ids(&self) -> anyhow::Result<Vec<i64>> {
        let rows = sqlx::query("SELECT panel_id FROM servers ORDER BY panel_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(rows.iter().map(|r| r.get("panel_id")).collect())
    }

    // --- Server databases ---

    async fn find_server_database_by_panel_id(
        &self,
        panel_id: i64,
    ) -> anyhow::Result<Option<ServerDatabase>> {
        let row = sqlx::query("SELECT * FROM server_databases WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref()
            .map(server_database_from_row)
            .transpose()
            .map_err(Into::into)
    }

    async fn upsert_server_database(&self, database: &ServerDatabase) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO server_databases (
                id, panel_id, server_panel_id, database_name, username, remote_host, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_id) DO UPDATE SET
                server_panel_id = excluded.server_panel_id,
                database_name = excluded.database_name,
                username = excluded.username,
                remote_host = excluded.remote_host,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(database.id.to_string())
        .bind(database.panel_id)
        .bind(database.server_panel_id)
        .bind(&database.database_name)
        .bind(&database.username)
        .bind(&database.remote_host)
        .bind(fmt_ts(database.last_synced_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- Users ---

    async fn find_user_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE panel_id = ?")
            .bind(panel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }

    async fn find_user_by_email(&self, email: &Email) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, panel_id, email, username, first_name, last_name,
                root_admin, password_hash, is_migrated, last_synced_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                panel_id = excluded.panel_id,
                email = excluded.email,
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                root_admin = excluded.root_admin,
                password_hash = excluded.password_hash,
                is_migrated = excluded.is_migrated,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.panel_id)
        .bind(user.email.as_str())
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.root_admin)
        .bind(&user.password_hash)
        .bind(user.is_migrated)
        .bind(user.last_synced_at.map(fmt_ts))
        .bind(fmt_ts(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    // --- Aggregates ---

    async fn count_entities(&self) -> anyhow::Result<MirrorCounts> {
        // One transaction so the counts are mutually consistent rather
        // than a torn read across tables mid-write.
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        async fn count(
            tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
            sql: &str,
        ) -> Result<u64, StoreError> {
            let row = sqlx::query(sql).fetch_one(&mut **tx).await?;
            let n: i64 = row.get(0);
            Ok(n as u64)
        }

        let counts = MirrorCounts {
            locations: count(&mut tx, "SELECT COUNT(*) FROM locations").await?,
            nodes: count(&mut tx, "SELECT COUNT(*) FROM nodes").await?,
            allocations: count(&mut tx, "SELECT COUNT(*) FROM allocations").await?,
            nests: count(&mut tx, "SELECT COUNT(*) FROM nests").await?,
            eggs: count(&mut tx, "SELECT COUNT(*) FROM eggs").await?,
            servers: count(&mut tx, "SELECT COUNT(*) FROM servers").await?,
            server_databases: count(&mut tx, "SELECT COUNT(*) FROM server_databases").await?,
            users: count(&mut tx, "SELECT COUNT(*) FROM users").await?,
        };

        tx.commit().await.map_err(StoreError::from)?;

        Ok(counts)
    }
}
