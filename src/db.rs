use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS groups (
            id          INTEGER PRIMARY KEY,
            period      TEXT NOT NULL,
            year        TEXT NOT NULL,
            name        TEXT NOT NULL,
            date_range  TEXT,
            url         TEXT UNIQUE NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY,
            group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            source_id   TEXT NOT NULL,
            title       TEXT NOT NULL,
            url         TEXT NOT NULL,
            event_date  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(group_id, source_id)
        );
        CREATE INDEX IF NOT EXISTS idx_events_group ON events(group_id);
        ",
    )?;
    Ok(())
}

// ── Rows ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub id: i64,
    pub period: String,
    pub year: String,
    pub name: String,
    pub date_range: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub id: i64,
    pub group_id: i64,
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub event_date: Option<String>,
}

pub struct NewGroup {
    pub period: String,
    pub year: String,
    pub name: String,
    pub date_range: Option<String>,
    pub url: String,
}

pub struct NewEvent {
    pub group_id: i64,
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub event_date: Option<String>,
}

fn group_from_row(row: &rusqlite::Row) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        period: row.get(1)?,
        year: row.get(2)?,
        name: row.get(3)?,
        date_range: row.get(4)?,
        url: row.get(5)?,
    })
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        source_id: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
        event_date: row.get(5)?,
    })
}

const GROUP_COLS: &str = "id, period, year, name, date_range, url";
const EVENT_COLS: &str = "id, group_id, source_id, title, url, event_date";

// ── Natural-key store ──

/// Insert-if-absent persistence keyed by natural keys: group URL, and
/// (group, source event id) for events.
pub trait Store {
    fn find_group_by_url(&self, url: &str) -> rusqlite::Result<Option<GroupRow>>;
    fn insert_group(&self, group: &NewGroup) -> rusqlite::Result<GroupRow>;
    fn find_event(&self, group_id: i64, source_id: &str) -> rusqlite::Result<Option<EventRow>>;
    fn insert_event(&self, event: &NewEvent) -> rusqlite::Result<EventRow>;
    fn group(&self, id: i64) -> rusqlite::Result<Option<GroupRow>>;
    /// All group ids, ascending.
    fn group_ids(&self) -> rusqlite::Result<Vec<i64>>;
}

impl Store for Connection {
    fn find_group_by_url(&self, url: &str) -> rusqlite::Result<Option<GroupRow>> {
        self.query_row(
            &format!("SELECT {} FROM groups WHERE url = ?1", GROUP_COLS),
            [url],
            group_from_row,
        )
        .optional()
    }

    fn insert_group(&self, g: &NewGroup) -> rusqlite::Result<GroupRow> {
        self.execute(
            "INSERT INTO groups (period, year, name, date_range, url) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![g.period, g.year, g.name, g.date_range, g.url],
        )?;
        Ok(GroupRow {
            id: self.last_insert_rowid(),
            period: g.period.clone(),
            year: g.year.clone(),
            name: g.name.clone(),
            date_range: g.date_range.clone(),
            url: g.url.clone(),
        })
    }

    fn find_event(&self, group_id: i64, source_id: &str) -> rusqlite::Result<Option<EventRow>> {
        self.query_row(
            &format!(
                "SELECT {} FROM events WHERE group_id = ?1 AND source_id = ?2",
                EVENT_COLS
            ),
            rusqlite::params![group_id, source_id],
            event_from_row,
        )
        .optional()
    }

    fn insert_event(&self, e: &NewEvent) -> rusqlite::Result<EventRow> {
        self.execute(
            "INSERT INTO events (group_id, source_id, title, url, event_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![e.group_id, e.source_id, e.title, e.url, e.event_date],
        )?;
        Ok(EventRow {
            id: self.last_insert_rowid(),
            group_id: e.group_id,
            source_id: e.source_id.clone(),
            title: e.title.clone(),
            url: e.url.clone(),
            event_date: e.event_date.clone(),
        })
    }

    fn group(&self, id: i64) -> rusqlite::Result<Option<GroupRow>> {
        self.query_row(
            &format!("SELECT {} FROM groups WHERE id = ?1", GROUP_COLS),
            [id],
            group_from_row,
        )
        .optional()
    }

    fn group_ids(&self) -> rusqlite::Result<Vec<i64>> {
        let mut stmt = self.prepare("SELECT id FROM groups ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ── Listing ──

/// Groups in calendar order: year, then month, then name.
pub fn list_groups(conn: &Connection, limit: usize) -> Result<Vec<GroupRow>> {
    let sql = format!(
        "SELECT {} FROM groups
         ORDER BY year ASC,
                  CASE period
                      WHEN 'January' THEN 1 WHEN 'February' THEN 2 WHEN 'March' THEN 3
                      WHEN 'April' THEN 4 WHEN 'May' THEN 5 WHEN 'June' THEN 6
                      WHEN 'July' THEN 7 WHEN 'August' THEN 8 WHEN 'September' THEN 9
                      WHEN 'October' THEN 10 WHEN 'November' THEN 11 WHEN 'December' THEN 12
                      ELSE 13
                  END ASC,
                  name ASC
         LIMIT {}",
        GROUP_COLS, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], group_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_events(conn: &Connection, group_id: i64) -> Result<Vec<EventRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE group_id = ?1
         ORDER BY CAST(source_id AS INTEGER), source_id",
        EVENT_COLS
    ))?;
    let rows = stmt
        .query_map([group_id], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub groups: usize,
    pub events: usize,
    pub empty_groups: usize,
}

pub struct GroupCount {
    pub id: i64,
    pub name: String,
    pub year: String,
    pub events: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let groups: usize = conn.query_row("SELECT COUNT(*) FROM groups", [], |r| r.get(0))?;
    let events: usize = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
    let empty_groups: usize = conn.query_row(
        "SELECT COUNT(*) FROM groups g
         WHERE NOT EXISTS (SELECT 1 FROM events e WHERE e.group_id = g.id)",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        groups,
        events,
        empty_groups,
    })
}

pub fn group_counts(conn: &Connection, limit: usize) -> Result<Vec<GroupCount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT g.id, g.name, g.year, COUNT(e.id)
         FROM groups g
         LEFT JOIN events e ON e.group_id = g.id
         GROUP BY g.id, g.name, g.year
         ORDER BY g.year DESC, g.name ASC
         LIMIT {}",
        limit
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(GroupCount {
                id: row.get(0)?,
                name: row.get(1)?,
                year: row.get(2)?,
                events: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Clearing ──

pub fn clear_events(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM events", [])?)
}

/// Delete every group; events go with them.
pub fn clear_groups(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM groups", [])?)
}

#[cfg(test)]
pub(crate) fn open_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    init_schema(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_group(name: &str, period: &str, year: &str, url: &str) -> NewGroup {
        NewGroup {
            period: period.into(),
            year: year.into(),
            name: name.into(),
            date_range: None,
            url: url.into(),
        }
    }

    fn new_event(group_id: i64, source_id: &str) -> NewEvent {
        NewEvent {
            group_id,
            source_id: source_id.into(),
            title: format!("Match {}", source_id),
            url: format!("https://x.test/live-cricket-scores/{}/m", source_id),
            event_date: None,
        }
    }

    #[test]
    fn group_lookup_by_url() {
        let conn = open_memory();
        assert!(conn.find_group_by_url("https://x.test/a").unwrap().is_none());
        let g = conn
            .insert_group(&new_group("A Series", "March", "2024", "https://x.test/a"))
            .unwrap();
        let found = conn.find_group_by_url("https://x.test/a").unwrap().unwrap();
        assert_eq!(found, g);
        assert_eq!(conn.group(g.id).unwrap(), Some(g));
    }

    #[test]
    fn group_url_unique() {
        let conn = open_memory();
        conn.insert_group(&new_group("A", "March", "2024", "https://x.test/a")).unwrap();
        assert!(conn
            .insert_group(&new_group("B", "April", "2024", "https://x.test/a"))
            .is_err());
        // same name in another period is fine
        conn.insert_group(&new_group("A", "April", "2025", "https://x.test/b")).unwrap();
    }

    #[test]
    fn event_key_is_group_and_source_id() {
        let conn = open_memory();
        let a = conn.insert_group(&new_group("A", "March", "2024", "https://x.test/a")).unwrap();
        let b = conn.insert_group(&new_group("B", "March", "2024", "https://x.test/b")).unwrap();
        conn.insert_event(&new_event(a.id, "100")).unwrap();
        assert!(conn.insert_event(&new_event(a.id, "100")).is_err());
        conn.insert_event(&new_event(b.id, "100")).unwrap();
        assert!(conn.find_event(a.id, "100").unwrap().is_some());
        assert!(conn.find_event(a.id, "101").unwrap().is_none());
    }

    #[test]
    fn deleting_groups_cascades() {
        let conn = open_memory();
        let a = conn.insert_group(&new_group("A", "March", "2024", "https://x.test/a")).unwrap();
        conn.insert_event(&new_event(a.id, "1")).unwrap();
        conn.insert_event(&new_event(a.id, "2")).unwrap();
        assert_eq!(clear_groups(&conn).unwrap(), 1);
        let s = get_stats(&conn).unwrap();
        assert_eq!((s.groups, s.events), (0, 0));
    }

    #[test]
    fn group_ids_ascending() {
        let conn = open_memory();
        for i in 0..3 {
            conn.insert_group(&new_group("G", "May", "2024", &format!("https://x.test/{}", i)))
                .unwrap();
        }
        assert_eq!(conn.group_ids().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn listing_orders_by_calendar() {
        let conn = open_memory();
        conn.insert_group(&new_group("Zed", "March", "2024", "https://x.test/1")).unwrap();
        conn.insert_group(&new_group("Alpha", "November", "2023", "https://x.test/2")).unwrap();
        conn.insert_group(&new_group("Beta", "January", "2024", "https://x.test/3")).unwrap();
        let names: Vec<_> = list_groups(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Zed"]);
    }

    #[test]
    fn events_listed_by_numeric_source_id() {
        let conn = open_memory();
        let a = conn.insert_group(&new_group("A", "March", "2024", "https://x.test/a")).unwrap();
        for id in ["100", "20", "3"] {
            conn.insert_event(&new_event(a.id, id)).unwrap();
        }
        let ids: Vec<_> = list_events(&conn, a.id)
            .unwrap()
            .into_iter()
            .map(|e| e.source_id)
            .collect();
        assert_eq!(ids, vec!["3", "20", "100"]);
    }

    #[test]
    fn stats_and_counts() {
        let conn = open_memory();
        let a = conn.insert_group(&new_group("A", "March", "2024", "https://x.test/a")).unwrap();
        conn.insert_group(&new_group("B", "March", "2024", "https://x.test/b")).unwrap();
        conn.insert_event(&new_event(a.id, "1")).unwrap();
        let s = get_stats(&conn).unwrap();
        assert_eq!((s.groups, s.events, s.empty_groups), (2, 1, 1));
        let counts = group_counts(&conn, 10).unwrap();
        assert_eq!(counts[0].name, "A");
        assert_eq!(counts[0].events, 1);
        assert_eq!(clear_events(&conn).unwrap(), 1);
    }
}
