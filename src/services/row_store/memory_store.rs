use super::{CompareOp, GroupCount, Predicate, RowAggregateQuery};
use crate::utils::{PlannerError, PlannerResult};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One event-log row: column name -> value
pub type Row = HashMap<String, String>;

/// In-memory row store.
///
/// Evaluates structured predicates directly; `Predicate::Raw` is rejected since
/// there is no SQL engine behind it. A row lacking a referenced column never
/// matches a comparison on it, and is left out of groupings on that column.
pub struct MemoryRowStore {
    rows: RwLock<Vec<Row>>,
    indicator_column: String,
    neutralization_column: String,
}

impl MemoryRowStore {
    pub fn new(indicator_column: impl Into<String>, neutralization_column: impl Into<String>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            indicator_column: indicator_column.into(),
            neutralization_column: neutralization_column.into(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = RwLock::new(rows);
        self
    }

    /// Loads rows from a JSON array of flat objects. Non-string scalars are
    /// stored in their JSON text form.
    pub fn from_json_file(
        path: impl AsRef<Path>,
        indicator_column: impl Into<String>,
        neutralization_column: impl Into<String>,
    ) -> PlannerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::collaborator("load_rows", format!("{}: {}", path.display(), e)))?;
        let objects: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&content).map_err(|e| PlannerError::collaborator("load_rows", e))?;

        let rows: Vec<Row> = objects
            .into_iter()
            .map(|object| {
                object
                    .into_iter()
                    .filter_map(|(column, value)| match value {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some((column, s)),
                        other => Some((column, other.to_string())),
                    })
                    .collect()
            })
            .collect();

        tracing::info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Self::new(indicator_column, neutralization_column).with_rows(rows))
    }

    /// Snapshot of the current rows, neutralization flags included
    pub fn snapshot(&self) -> PlannerResult<Vec<Row>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> PlannerResult<RwLockReadGuard<'_, Vec<Row>>> {
        self.rows
            .read()
            .map_err(|_| PlannerError::collaborator("read", "row store lock poisoned"))
    }

    fn write(&self) -> PlannerResult<RwLockWriteGuard<'_, Vec<Row>>> {
        self.rows
            .write()
            .map_err(|_| PlannerError::collaborator("write", "row store lock poisoned"))
    }

    fn count_matching(&self, predicate: &Predicate, operation: &'static str) -> PlannerResult<u64> {
        let rows = self.read()?;
        let mut count = 0u64;
        for row in rows.iter() {
            if matches(row, predicate, operation)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn matches(row: &Row, predicate: &Predicate, operation: &'static str) -> PlannerResult<bool> {
    Ok(match predicate {
        Predicate::True => true,
        Predicate::Compare { column, op, value } => match row.get(column) {
            Some(actual) => compare_holds(*op, actual, value),
            None => false,
        },
        Predicate::And(parts) => {
            for part in parts {
                if !matches(row, part, operation)? {
                    return Ok(false);
                }
            }
            true
        },
        Predicate::Not(inner) => !matches(row, inner, operation)?,
        Predicate::Raw(sql) => {
            return Err(PlannerError::collaborator(
                operation,
                format!("raw SQL predicate not supported by the in-memory store: {}", sql),
            ));
        },
    })
}

/// Equality is exact text, matching how rows are grouped and cleared.
/// Ordering is numeric when both sides parse as numbers, lexicographic otherwise.
fn compare_holds(op: CompareOp, actual: &str, expected: &str) -> bool {
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Lt => order_values(actual, expected) == Ordering::Less,
        CompareOp::Le => order_values(actual, expected) != Ordering::Greater,
        CompareOp::Gt => order_values(actual, expected) == Ordering::Greater,
        CompareOp::Ge => order_values(actual, expected) != Ordering::Less,
    }
}

fn order_values(actual: &str, expected: &str) -> Ordering {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.total_cmp(&b),
        _ => actual.cmp(expected),
    }
}

#[async_trait]
impl RowAggregateQuery for MemoryRowStore {
    async fn count_rows(&self, predicate: &Predicate) -> PlannerResult<u64> {
        self.count_matching(predicate, "count_rows")
    }

    async fn count_outliers(&self, outlier: &Predicate, base: &Predicate) -> PlannerResult<u64> {
        let predicate = base.clone().and(outlier.clone());
        self.count_matching(&predicate, "count_outliers")
    }

    async fn group_outlier_counts(
        &self,
        attributes: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<Vec<GroupCount>> {
        let predicate = base.clone().and(outlier.clone());
        let rows = self.read()?;

        let mut groups: Vec<GroupCount> = Vec::new();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        for row in rows.iter() {
            if !matches(row, &predicate, "group_outlier_counts")? {
                continue;
            }
            let values: Option<Vec<String>> =
                attributes.iter().map(|attr| row.get(attr).cloned()).collect();
            let Some(values) = values else {
                continue;
            };
            match index.get(&values) {
                Some(&slot) => groups[slot].count += 1,
                None => {
                    index.insert(values.clone(), groups.len());
                    groups.push(GroupCount { count: 1, values });
                },
            }
        }
        Ok(groups)
    }

    async fn count_inliers_matching(
        &self,
        names: &[String],
        values: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<u64> {
        if names.len() != values.len() {
            return Err(PlannerError::collaborator(
                "count_inliers_matching",
                format!("{} attribute names but {} values", names.len(), values.len()),
            ));
        }
        let predicate = Predicate::all_equal(
            names.iter().map(String::as_str).zip(values.iter().map(String::as_str)),
        )
        .and(base.clone())
        .and(outlier.clone().negate());
        self.count_matching(&predicate, "count_inliers_matching")
    }

    async fn distinct_values(&self, attribute: &str) -> PlannerResult<Vec<String>> {
        let rows = self.read()?;
        let values = rows.iter().filter_map(|row| row.get(attribute).cloned()).collect();
        Ok(crate::utils::unique_ordered(values))
    }

    async fn reset_neutralization(&self) -> PlannerResult<()> {
        let mut rows = self.write()?;
        for row in rows.iter_mut() {
            let flag = row.get(&self.indicator_column).cloned().unwrap_or_else(|| "0".to_string());
            row.insert(self.neutralization_column.clone(), flag);
        }
        tracing::debug!(
            "Reset {} to {} on {} rows",
            self.neutralization_column,
            self.indicator_column,
            rows.len()
        );
        Ok(())
    }

    async fn clear_neutralization(&self, attribute: &str, value: &str) -> PlannerResult<()> {
        let mut rows = self.write()?;
        let mut cleared = 0usize;
        for row in rows.iter_mut() {
            if row.get(attribute).map(String::as_str) == Some(value) {
                row.insert(self.neutralization_column.clone(), "0".to_string());
                cleared += 1;
            }
        }
        tracing::debug!("Cleared {} on {} rows where {} = {}", self.neutralization_column, cleared, attribute, value);
        Ok(())
    }
}
