//! Group-by aggregation of run records.
//!
//! Rows of the combined table are grouped by exact equality on every key
//! column at once, and the requested fitness columns are averaged per group.

use crate::config::AggregateSpec;
use crate::error::AggregateError;
use crate::models::{
    AggregatedRow, AggregatedTable, CombinedTable, FitnessColumn, KeyValue, RunRecord, GENERATION,
};
use std::collections::BTreeMap;
use tracing::debug;

/// A resolved group-key column.
#[derive(Debug, Clone, Copy)]
enum KeyColumn {
    Generation,
    Field(usize),
}

impl KeyColumn {
    fn resolve(table: &CombinedTable, name: &str) -> Result<Self, AggregateError> {
        if name == GENERATION {
            return Ok(KeyColumn::Generation);
        }
        table
            .field_index(name)
            .map(KeyColumn::Field)
            .ok_or_else(|| AggregateError::UnknownColumn(name.to_string()))
    }

    fn value(&self, table: &CombinedTable, row: &RunRecord) -> KeyValue {
        match self {
            KeyColumn::Generation => KeyValue::Int(row.gen),
            KeyColumn::Field(i) => KeyValue::Text(table.metadata(row, *i).to_string()),
        }
    }
}

fn resolve_value_column(table: &CombinedTable, name: &str) -> Result<FitnessColumn, AggregateError> {
    if let Some(column) = FitnessColumn::from_name(name) {
        return Ok(column);
    }
    if name == GENERATION || name == "none" || table.field_index(name).is_some() {
        return Err(AggregateError::NotNumeric(name.to_string()));
    }
    Err(AggregateError::UnknownColumn(name.to_string()))
}

#[derive(Default)]
struct Accumulator {
    sums: Vec<f64>,
    count: usize,
}

/// Group `table` by `group_by` and average each `columns` source per group.
///
/// Output rows are ordered by key: generations numerically, metadata values
/// lexically.
pub fn aggregate(
    table: &CombinedTable,
    group_by: &[String],
    columns: &[AggregateSpec],
) -> Result<AggregatedTable, AggregateError> {
    if group_by.is_empty() {
        return Err(AggregateError::NoGroupColumns);
    }
    if columns.is_empty() {
        return Err(AggregateError::NoAggregates);
    }

    let keys = group_by
        .iter()
        .map(|name| KeyColumn::resolve(table, name))
        .collect::<Result<Vec<_>, _>>()?;
    let sources = columns
        .iter()
        .map(|spec| resolve_value_column(table, &spec.source))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: BTreeMap<Vec<KeyValue>, Accumulator> = BTreeMap::new();
    for row in &table.rows {
        let key: Vec<KeyValue> = keys.iter().map(|k| k.value(table, row)).collect();
        let acc = groups.entry(key).or_insert_with(|| Accumulator {
            sums: vec![0.0; sources.len()],
            count: 0,
        });
        for (sum, source) in acc.sums.iter_mut().zip(&sources) {
            *sum += row.value(*source);
        }
        acc.count += 1;
    }

    debug!("Grouped {} rows into {} groups", table.len(), groups.len());

    let rows = groups
        .into_iter()
        .map(|(key, acc)| AggregatedRow {
            key,
            values: acc.sums.iter().map(|s| s / acc.count as f64).collect(),
            count: acc.count,
        })
        .collect();

    Ok(AggregatedTable {
        key_columns: group_by.to_vec(),
        value_columns: columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    })
}

/// Keep only the rows whose key `column` renders as `value`.
pub fn filter_eq(
    table: &AggregatedTable,
    column: &str,
    value: &str,
) -> Result<AggregatedTable, AggregateError> {
    let index = table
        .key_index(column)
        .ok_or_else(|| AggregateError::UnknownColumn(column.to_string()))?;

    Ok(AggregatedTable {
        key_columns: table.key_columns.clone(),
        value_columns: table.value_columns.clone(),
        rows: table
            .rows
            .iter()
            .filter(|row| row.key[index].to_string() == value)
            .cloned()
            .collect(),
    })
}

/// Distinct values of a key column, in ascending order.
pub fn distinct_keys(table: &AggregatedTable, column: &str) -> Result<Vec<KeyValue>, AggregateError> {
    let index = table
        .key_index(column)
        .ok_or_else(|| AggregateError::UnknownColumn(column.to_string()))?;

    let mut values: Vec<KeyValue> = table.rows.iter().map(|r| r.key[index].clone()).collect();
    values.sort();
    values.dedup();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunSource;

    fn record(gen: u64, max: f64, avg: f64) -> RunRecord {
        RunRecord {
            source: 0,
            gen,
            max,
            min: 0.0,
            avg,
            med: 0.0,
            none: String::new(),
        }
    }

    fn source(name: &str, metadata: &[&str]) -> RunSource {
        RunSource {
            file_name: name.to_string(),
            metadata: metadata.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn eval_table() -> CombinedTable {
        let mut table = CombinedTable::new(vec![
            "alg".to_string(),
            "popSize".to_string(),
            "run".to_string(),
        ]);
        table.push_run(
            source("eval_cosyne_50_run1.csv", &["cosyne", "50", "1"]),
            vec![record(0, 10.0, 1.0), record(1, 20.0, 2.0), record(2, 30.0, 3.0)],
        );
        table.push_run(
            source("eval_cosyne_50_run2.csv", &["cosyne", "50", "2"]),
            vec![record(0, 12.0, 3.0), record(1, 18.0, 4.0), record(2, 36.0, 5.0)],
        );
        table.push_run(
            source("eval_easyea_50_run1.csv", &["easyea", "50", "1"]),
            vec![record(0, 100.0, 7.0), record(1, 200.0, 8.0)],
        );
        table
    }

    fn group_by() -> Vec<String> {
        vec!["gen".to_string(), "alg".to_string(), "popSize".to_string()]
    }

    #[test]
    fn test_mean_per_group() {
        let table = eval_table();
        let aggregated = aggregate(
            &table,
            &group_by(),
            &[AggregateSpec::new("max", "max_mean"), AggregateSpec::new("avg", "avg_mean")],
        )
        .unwrap();

        assert_eq!(aggregated.value_columns, vec!["max_mean", "avg_mean"]);
        assert_eq!(aggregated.len(), 5);

        let cosyne = filter_eq(&aggregated, "alg", "cosyne").unwrap();
        let max_means: Vec<f64> = cosyne.rows.iter().map(|r| r.values[0]).collect();
        let avg_means: Vec<f64> = cosyne.rows.iter().map(|r| r.values[1]).collect();
        assert_eq!(max_means, vec![11.0, 19.0, 33.0]);
        assert_eq!(avg_means, vec![2.0, 3.0, 4.0]);
        assert!(cosyne.rows.iter().all(|r| r.count == 2));

        let easyea = filter_eq(&aggregated, "alg", "easyea").unwrap();
        assert_eq!(easyea.len(), 2);
        assert_eq!(easyea.rows[1].values[0], 200.0);
        assert_eq!(easyea.rows[1].count, 1);
    }

    #[test]
    fn test_rows_are_ordered_by_key() {
        let aggregated =
            aggregate(&eval_table(), &group_by(), &[AggregateSpec::new("max", "max_mean")]).unwrap();

        let keys: Vec<String> = aggregated
            .rows
            .iter()
            .map(|r| format!("{}/{}", r.key[0], r.key[1]))
            .collect();
        assert_eq!(
            keys,
            vec!["0/cosyne", "0/easyea", "1/cosyne", "1/easyea", "2/cosyne"]
        );
    }

    #[test]
    fn test_generation_orders_numerically() {
        let mut table = CombinedTable::new(vec!["alg".to_string()]);
        table.push_run(
            source("a", &["x"]),
            vec![record(10, 1.0, 0.0), record(9, 2.0, 0.0), record(100, 3.0, 0.0)],
        );
        let aggregated = aggregate(
            &table,
            &["gen".to_string()],
            &[AggregateSpec::new("max", "max_mean")],
        )
        .unwrap();

        let gens: Vec<KeyValue> = aggregated.rows.iter().map(|r| r.key[0].clone()).collect();
        assert_eq!(gens, vec![KeyValue::Int(9), KeyValue::Int(10), KeyValue::Int(100)]);
    }

    #[test]
    fn test_grouping_by_run_keeps_runs_apart() {
        let aggregated = aggregate(
            &eval_table(),
            &["gen".to_string(), "alg".to_string(), "run".to_string()],
            &[AggregateSpec::new("max", "max_mean")],
        )
        .unwrap();
        assert_eq!(aggregated.len(), 8);
        assert!(aggregated.rows.iter().all(|r| r.count == 1));
    }

    #[test]
    fn test_empty_table() {
        let table = CombinedTable::new(vec!["alg".to_string(), "popSize".to_string()]);
        let aggregated =
            aggregate(&table, &group_by(), &[AggregateSpec::new("max", "max_mean")]).unwrap();
        assert!(aggregated.is_empty());
        assert_eq!(aggregated.key_columns, group_by());
    }

    #[test]
    fn test_unknown_columns() {
        let table = eval_table();
        let specs = [AggregateSpec::new("max", "max_mean")];

        assert!(matches!(
            aggregate(&table, &["mprob".to_string()], &specs),
            Err(AggregateError::UnknownColumn(c)) if c == "mprob"
        ));
        assert!(matches!(
            aggregate(&table, &group_by(), &[AggregateSpec::new("fitness", "f")]),
            Err(AggregateError::UnknownColumn(_))
        ));
        assert!(matches!(
            aggregate(&table, &group_by(), &[AggregateSpec::new("none", "n")]),
            Err(AggregateError::NotNumeric(_))
        ));
        assert!(matches!(
            aggregate(&table, &group_by(), &[AggregateSpec::new("alg", "a")]),
            Err(AggregateError::NotNumeric(_))
        ));
        assert!(matches!(
            aggregate(&table, &[], &specs),
            Err(AggregateError::NoGroupColumns)
        ));
        assert!(matches!(
            aggregate(&table, &group_by(), &[]),
            Err(AggregateError::NoAggregates)
        ));
    }

    #[test]
    fn test_filter_unknown_column() {
        let aggregated =
            aggregate(&eval_table(), &group_by(), &[AggregateSpec::new("max", "max_mean")]).unwrap();
        assert!(filter_eq(&aggregated, "mprob", "0.3").is_err());
        assert!(filter_eq(&aggregated, "alg", "missing").unwrap().is_empty());
    }

    #[test]
    fn test_distinct_keys() {
        let aggregated =
            aggregate(&eval_table(), &group_by(), &[AggregateSpec::new("max", "max_mean")]).unwrap();
        let algs = distinct_keys(&aggregated, "alg").unwrap();
        assert_eq!(
            algs,
            vec![KeyValue::Text("cosyne".into()), KeyValue::Text("easyea".into())]
        );
        let gens = distinct_keys(&aggregated, "gen").unwrap();
        assert_eq!(gens.len(), 3);
    }
}
