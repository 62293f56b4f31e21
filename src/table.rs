use chrono::NaiveDateTime;

/// Concrete type a column is committed to after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Numeric,
    Temporal,
}

/// Cell storage for one column. Absent cells are `None`, which is distinct
/// from a present-but-unparseable value once conversion has happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Text(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
    Temporal(Vec<Option<NaiveDateTime>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(values) => values.len(),
            ColumnValues::Numeric(values) => values.len(),
            ColumnValues::Temporal(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ColumnValues::Text(_) => ValueKind::Text,
            ColumnValues::Numeric(_) => ValueKind::Numeric,
            ColumnValues::Temporal(_) => ValueKind::Temporal,
        }
    }

    pub fn truncate(&mut self, len: usize) {
        match self {
            ColumnValues::Text(values) => values.truncate(len),
            ColumnValues::Numeric(values) => values.truncate(len),
            ColumnValues::Temporal(values) => values.truncate(len),
        }
    }

    /// String form of one cell, `None` when the cell is absent. Used when
    /// writing datasets back out as delimited text.
    pub fn render(&self, row: usize) -> Option<String> {
        match self {
            ColumnValues::Text(values) => values[row].clone(),
            ColumnValues::Numeric(values) => values[row].map(|number| number.to_string()),
            ColumnValues::Temporal(values) => {
                values[row].map(|timestamp| timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Column {
        Column {
            name: name.into(),
            values,
        }
    }
}

/// An ordered collection of equal-length columns. Column order is insertion
/// order and is preserved through transformation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new() -> Dataset {
        Dataset { columns: vec![] }
    }

    pub fn push_column(&mut self, column: Column) {
        debug_assert!(
            self.columns.is_empty() || column.values.len() == self.row_count(),
            "all columns must have the same row count"
        );
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |column| column.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Keep at most the first `len` rows of every column.
    pub fn head(&mut self, len: usize) {
        for column in &mut self.columns {
            column.values.truncate(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut dataset = Dataset::new();
        dataset.push_column(Column::new(
            "name",
            ColumnValues::Text(vec![Some("a".into()), None, Some("c".into())]),
        ));
        dataset.push_column(Column::new(
            "amount",
            ColumnValues::Numeric(vec![Some(1.0), Some(2.0), None]),
        ));
        dataset
    }

    #[test]
    fn row_and_column_counts() {
        let dataset = sample();
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column_count(), 2);
        assert!(!dataset.is_empty());
        assert!(Dataset::new().is_empty());
    }

    #[test]
    fn head_truncates_every_column() {
        let mut dataset = sample();
        dataset.head(1);
        assert_eq!(dataset.row_count(), 1);
        for column in dataset.columns() {
            assert_eq!(column.values.len(), 1);
        }

        let mut dataset = sample();
        dataset.head(10);
        assert_eq!(dataset.row_count(), 3);
    }

    #[test]
    fn column_lookup_by_name() {
        let dataset = sample();
        assert_eq!(
            dataset.column("amount").unwrap().values.kind(),
            ValueKind::Numeric
        );
        assert!(dataset.column("missing").is_none());
    }

    #[test]
    fn render_cells() {
        let dataset = sample();
        assert_eq!(dataset.columns()[0].values.render(0), Some("a".into()));
        assert_eq!(dataset.columns()[0].values.render(1), None);
        assert_eq!(dataset.columns()[1].values.render(0), Some("1".into()));
    }
}
