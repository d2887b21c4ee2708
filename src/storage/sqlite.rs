use crate::config::{CategoryConfig, dynamic_condition};
use crate::model::{StorageError, Target};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use std::time::Duration;

/// Read-only access to the table listing the pages to watch.
pub struct TargetSource {
    conn: Connection,
}

/// Column positions of the four target fields in a result row.
struct ColumnIndices {
    name: usize,
    url: usize,
    css: usize,
    class: usize,
}

impl TargetSource {
    /// Opens the category database read-only.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Builds the row query for a category, including the month filter.
    pub fn query_for(category: &CategoryConfig, current_month: u32) -> String {
        let condition = category
            .dynamic_months
            .as_ref()
            .map(|months| dynamic_condition(months, current_month))
            .unwrap_or_default();
        format!("SELECT * FROM {} {}", category.table, condition)
            .trim_end()
            .to_string()
    }

    /// Loads every target row for `category`, in table order.
    pub fn load_targets(
        &self,
        category: &CategoryConfig,
        current_month: u32,
    ) -> Result<Vec<Target>, StorageError> {
        let sql = Self::query_for(category, current_month);
        let mut stmt = self.conn.prepare(&sql)?;

        let column_names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let position = |wanted: &str| {
            column_names
                .iter()
                .position(|c| c == wanted)
                .ok_or_else(|| StorageError::MissingColumn(wanted.to_string()))
        };
        let columns = ColumnIndices {
            name: position(&category.columns.name)?,
            url: position(&category.columns.url)?,
            css: position(&category.columns.css)?,
            class: position(&category.columns.class)?,
        };

        let rows = stmt.query_map([], |row| Self::map_target(row, &columns))?;
        let mut targets = Vec::new();
        for target in rows {
            targets.push(target?);
        }

        Ok(targets)
    }

    /// Closes the connection, reporting any error.
    pub fn close(self) -> Result<(), StorageError> {
        self.conn.close().map_err(|(_, e)| StorageError::Database(e))
    }

    fn map_target(row: &Row, columns: &ColumnIndices) -> Result<Target, rusqlite::Error> {
        Ok(Target {
            name: row.get::<_, Option<String>>(columns.name)?.unwrap_or_default(),
            url: row.get::<_, Option<String>>(columns.url)?.unwrap_or_default(),
            css_selector: row.get(columns.css)?,
            class_name: row.get(columns.class)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnMap, DynamicMonths};

    fn category(dynamic: Option<Vec<i32>>) -> CategoryConfig {
        CategoryConfig {
            db_path: "unused.db".into(),
            table: "foundation".into(),
            columns: ColumnMap {
                name: "기관명".into(),
                url: "url".into(),
                css: "css".into(),
                class: "class".into(),
            },
            dynamic_months: dynamic.map(|offset| DynamicMonths { offset }),
        }
    }

    fn seeded() -> TargetSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE foundation (
                id INTEGER PRIMARY KEY,
                기관명 TEXT,
                url TEXT,
                css TEXT,
                class TEXT,
                m03 TEXT,
                m04 TEXT
            );
            INSERT INTO foundation (기관명, url, css, class, m03, m04) VALUES
                ('A재단', 'https://a.or.kr', 'td.subject a', NULL, 'O', NULL),
                ('B재단', 'https://b.or.kr', NULL, 'title', NULL, 'O'),
                ('C재단', NULL, NULL, NULL, NULL, NULL);
            ",
        )
        .unwrap();
        TargetSource::from_connection(conn)
    }

    #[test]
    fn loads_all_rows_in_order() {
        let targets = seeded().load_targets(&category(None), 3).unwrap();

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].name, "A재단");
        assert_eq!(targets[0].css_selector.as_deref(), Some("td.subject a"));
        assert_eq!(targets[1].class_name.as_deref(), Some("title"));
        assert_eq!(targets[2].url, "");
        assert!(!targets[2].is_valid());
    }

    #[test]
    fn month_filter_limits_rows() {
        let targets = seeded().load_targets(&category(Some(vec![1])), 3).unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "B재단");
    }

    #[test]
    fn missing_column_is_reported() {
        let mut category = category(None);
        category.columns.class = "class_name".into();

        let err = seeded().load_targets(&category, 3).unwrap_err();
        assert!(matches!(err, StorageError::MissingColumn(ref c) if c == "class_name"));
    }

    #[test]
    fn query_without_filter_has_no_where() {
        assert_eq!(TargetSource::query_for(&category(None), 5), "SELECT * FROM foundation");
    }
}
