use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::models::{GroupSnapshot, QuotaId, QuotaStatus};
use crate::universe::QuotaUniverse;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS groups (
    name          TEXT PRIMARY KEY,
    total         INTEGER NOT NULL,
    imported_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quotas (
    group_name    TEXT NOT NULL,
    quota         INTEGER NOT NULL,
    status        TEXT NOT NULL CHECK (status IN ('contemplated', 'owned', 'available')),
    PRIMARY KEY (group_name, quota)
);

CREATE TABLE IF NOT EXISTS bids (
    group_name    TEXT NOT NULL,
    quota         INTEGER NOT NULL,
    PRIMARY KEY (group_name, quota)
);
";

/// A group as stored: the validated universe plus its annotations.
#[derive(Debug, Clone)]
pub struct StoredGroup {
    pub name: String,
    pub imported_at: String,
    pub universe: QuotaUniverse,
    pub bids: Vec<QuotaId>,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub name: String,
    pub total: QuotaId,
    pub imported_at: String,
    pub contemplated: u32,
    pub owned: u32,
    pub available: u32,
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("consorcio.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Não foi possível criar o diretório {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Não foi possível abrir a base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Falha na migração")?;
    Ok(())
}

/// Validates `snapshot` and replaces any stored group with the same name.
pub fn save_group(conn: &Connection, snapshot: &GroupSnapshot) -> Result<QuotaUniverse> {
    let universe = snapshot
        .universe()
        .with_context(|| format!("Grupo '{}' inválido", snapshot.name))?;

    if let Some(&bid) = snapshot.bids.iter().find(|&&b| b == 0 || b > universe.total()) {
        bail!(
            "Lance na cota {} fora dos limites (1-{})",
            bid,
            universe.total()
        );
    }

    let tx = conn.unchecked_transaction()
        .context("Não foi possível iniciar a transação")?;

    delete_rows(&tx, &snapshot.name)?;

    let imported_at = chrono::Local::now().to_rfc3339();
    tx.execute(
        "INSERT INTO groups (name, total, imported_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![snapshot.name, universe.total(), imported_at],
    ).context("Falha ao gravar o grupo")?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO quotas (group_name, quota, status) VALUES (?1, ?2, ?3)"
        )?;
        for id in universe.ids() {
            if let Some(status) = universe.status(id) {
                stmt.execute(rusqlite::params![snapshot.name, id, status.as_str()])?;
            }
        }

        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO bids (group_name, quota) VALUES (?1, ?2)"
        )?;
        for &bid in &snapshot.bids {
            stmt.execute(rusqlite::params![snapshot.name, bid])?;
        }
    }

    tx.commit().context("Falha no commit")?;
    log::info!(
        "grupo {} gravado: {} cotas, {} lances",
        snapshot.name,
        universe.total(),
        snapshot.bids.len()
    );
    Ok(universe)
}

/// Loads a group and re-validates its partition.
pub fn load_group(conn: &Connection, name: &str) -> Result<Option<StoredGroup>> {
    let header: Option<(QuotaId, String)> = conn
        .query_row(
            "SELECT total, imported_at FROM groups WHERE name = ?1",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((total, imported_at)) = header else {
        return Ok(None);
    };

    let mut contemplated = Vec::new();
    let mut owned = Vec::new();
    let mut available = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT quota, status FROM quotas WHERE group_name = ?1 ORDER BY quota"
    )?;
    let rows = stmt.query_map([name], |row| {
        Ok((row.get::<_, QuotaId>(0)?, row.get::<_, String>(1)?))
    })?.collect::<Result<Vec<_>, _>>()?;

    for (quota, raw) in rows {
        match QuotaStatus::parse(&raw) {
            Some(QuotaStatus::Contemplated) => contemplated.push(quota),
            Some(QuotaStatus::Owned) => owned.push(quota),
            Some(QuotaStatus::Available) => available.push(quota),
            None => bail!("Status desconhecido '{}' para a cota {}", raw, quota),
        }
    }

    let universe = QuotaUniverse::new(total, contemplated, owned, available)
        .with_context(|| format!("Grupo '{}' corrompido na base", name))?;

    let mut stmt = conn.prepare(
        "SELECT quota FROM bids WHERE group_name = ?1 ORDER BY quota"
    )?;
    let bids = stmt
        .query_map([name], |row| row.get::<_, QuotaId>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(StoredGroup {
        name: name.to_string(),
        imported_at,
        universe,
        bids,
    }))
}

pub fn list_groups(conn: &Connection) -> Result<Vec<GroupSummary>> {
    let mut stmt = conn.prepare(
        "SELECT g.name, g.total, g.imported_at,
                COALESCE(SUM(q.status = 'contemplated'), 0),
                COALESCE(SUM(q.status = 'owned'), 0),
                COALESCE(SUM(q.status = 'available'), 0)
         FROM groups g LEFT JOIN quotas q ON q.group_name = g.name
         GROUP BY g.name, g.total, g.imported_at
         ORDER BY g.name"
    )?;
    let groups = stmt.query_map([], |row| {
        Ok(GroupSummary {
            name: row.get(0)?,
            total: row.get(1)?,
            imported_at: row.get(2)?,
            contemplated: row.get(3)?,
            owned: row.get(4)?,
            available: row.get(5)?,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

pub fn count_groups(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))?;
    Ok(count)
}

pub fn delete_group(conn: &Connection, name: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()
        .context("Não foi possível iniciar a transação")?;
    let removed = delete_rows(&tx, name)?;
    tx.commit().context("Falha no commit")?;
    Ok(removed)
}

fn delete_rows(conn: &Connection, name: &str) -> Result<bool> {
    conn.execute("DELETE FROM quotas WHERE group_name = ?1", [name])?;
    conn.execute("DELETE FROM bids WHERE group_name = ?1", [name])?;
    let changed = conn.execute("DELETE FROM groups WHERE name = ?1", [name])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_snapshot(name: &str) -> GroupSnapshot {
        GroupSnapshot {
            name: name.to_string(),
            total: 20,
            contemplated: vec![1, 2, 3, 10],
            available: vec![5, 6, 15, 20],
            bids: vec![7],
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_save_and_load() {
        let conn = memory_db();
        let saved = save_group(&conn, &test_snapshot("6032")).unwrap();
        assert_eq!(count_groups(&conn).unwrap(), 1);

        let stored = load_group(&conn, "6032").unwrap().unwrap();
        assert_eq!(stored.universe, saved);
        assert_eq!(stored.bids, vec![7]);
        assert!(!stored.imported_at.is_empty());
    }

    #[test]
    fn test_load_missing_group() {
        let conn = memory_db();
        assert!(load_group(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_existing() {
        let conn = memory_db();
        save_group(&conn, &test_snapshot("6032")).unwrap();

        let mut updated = test_snapshot("6032");
        updated.available = vec![5];
        updated.bids = Vec::new();
        save_group(&conn, &updated).unwrap();

        assert_eq!(count_groups(&conn).unwrap(), 1);
        let stored = load_group(&conn, "6032").unwrap().unwrap();
        assert_eq!(stored.universe.available().len(), 1);
        assert!(stored.bids.is_empty());
    }

    #[test]
    fn test_save_rejects_invalid_partition() {
        let conn = memory_db();
        let mut bad = test_snapshot("6032");
        bad.available.push(10);
        assert!(save_group(&conn, &bad).is_err());
        assert_eq!(count_groups(&conn).unwrap(), 0);
    }

    #[test]
    fn test_save_rejects_bid_out_of_range() {
        let conn = memory_db();
        let mut bad = test_snapshot("6032");
        bad.bids.push(21);
        assert!(save_group(&conn, &bad).is_err());
    }

    #[test]
    fn test_load_detects_uncovered_quota() {
        let conn = memory_db();
        save_group(&conn, &test_snapshot("6032")).unwrap();
        conn.execute("DELETE FROM quotas WHERE group_name = '6032' AND quota = 4", [])
            .unwrap();
        assert!(load_group(&conn, "6032").is_err());
    }

    #[test]
    fn test_list_and_delete() {
        let conn = memory_db();
        save_group(&conn, &test_snapshot("6034")).unwrap();
        save_group(&conn, &test_snapshot("6032")).unwrap();

        let groups = list_groups(&conn).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "6032");
        assert_eq!(groups[0].total, 20);
        assert_eq!(groups[0].contemplated, 4);
        assert_eq!(groups[0].available, 4);
        assert_eq!(groups[0].owned, 12);

        assert!(delete_group(&conn, "6032").unwrap());
        assert!(!delete_group(&conn, "6032").unwrap());
        assert_eq!(count_groups(&conn).unwrap(), 1);
    }
}
