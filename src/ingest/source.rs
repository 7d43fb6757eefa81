use arrow::{
    array::{Array, ArrayRef, RecordBatch},
    compute::{cast_with_options, concat_batches},
    csv::{ReaderBuilder, reader::Format},
    datatypes::{DataType, Field, Schema, TimeUnit},
    error::ArrowError,
};
use std::{
    collections::HashSet,
    fs::File,
    io::Seek,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::TablesmithError,
    ingest::{KeyColumn, LoaderConfig, strict_cast},
    types::ColumnDef,
};

// =================================================
// Tabular Source
// =================================================

/// A delimited file held in memory as a single record batch, with the
/// column kinds fixed at parse time.
#[derive(Debug, Clone)]
pub struct TabularSource {
    pub path: Option<PathBuf>,
    batch: RecordBatch,
    columns: Vec<ColumnDef>,
}

impl TabularSource {
    /// The `from_csv` function reads a delimited file with Arrow, inferring the column types
    /// and loading every row.
    ///
    /// Arguments:
    ///
    /// * `path`: location of the delimited file.
    /// * `config`: reader settings (header, delimiter, inference sample and batch size).
    ///
    /// Returns:
    ///
    /// A `TabularSource` on success, or a validation error when the file is missing,
    /// malformed or has no data rows.
    pub fn from_csv(
        path: impl AsRef<Path>,
        config: &LoaderConfig,
    ) -> Result<Self, TablesmithError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(TablesmithError::Validation(format!(
                "source file not found: {}",
                path.display()
            )));
        }

        let mut file = File::open(path)?;

        // 1. Infer schema from file
        let (schema, sampled) = Format::default()
            .with_header(config.has_header)
            .with_delimiter(config.delimiter)
            .infer_schema(&mut file, config.infer_rows)
            .map_err(malformed)?;

        log::debug!(
            "Inferred {} columns from {} records of {}",
            schema.fields().len(),
            sampled,
            path.display()
        );

        if schema.fields().is_empty() {
            return Err(TablesmithError::Validation("source is empty".into()));
        }

        file.rewind()?;

        // 2. Read all rows with the inferred schema
        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(config.has_header)
            .with_delimiter(config.delimiter)
            .with_batch_size(config.batch_size)
            .build(file)
            .map_err(malformed)?;

        let batches = reader
            .collect::<Result<Vec<RecordBatch>, ArrowError>>()
            .map_err(malformed)?;

        let batch = concat_batches(&schema, &batches)?;

        let mut source = Self::from_batch(batch)?;
        source.path = Some(path.to_path_buf());

        Ok(source)
    }

    /// The `from_batch` function wraps an in-memory record batch, checking that it is
    /// non-empty with unique column names and normalizing temporal columns.
    pub fn from_batch(batch: RecordBatch) -> Result<Self, TablesmithError> {
        if batch.num_columns() == 0 || batch.num_rows() == 0 {
            return Err(TablesmithError::Validation("source is empty".into()));
        }

        let mut seen = HashSet::new();

        for field in batch.schema().fields() {
            if field.name().trim().is_empty() {
                return Err(TablesmithError::Validation(
                    "source has a column without a name".into(),
                ));
            }

            if !seen.insert(field.name().clone()) {
                return Err(TablesmithError::Validation(format!(
                    "source has duplicate column name: {}",
                    field.name()
                )));
            }
        }

        let batch = normalize_temporal(batch)?;

        let columns = batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(ordinal, field)| ColumnDef::from_field(ordinal, field))
            .collect();

        Ok(Self {
            path: None,
            batch,
            columns,
        })
    }

    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Table name suggested by the file stem
    pub fn name_hint(&self) -> Option<&str> {
        self.path
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
    }

    /// The `column_defs` function builds the column descriptors for a new table, marking the
    /// requested key column.
    ///
    /// Arguments:
    ///
    /// * `key_column`: which column, if any, receives the primary key constraint.
    ///
    /// Returns:
    ///
    /// The descriptors in source order, or a validation error when a named key column does not
    /// exist in the source.
    pub fn column_defs(&self, key_column: &KeyColumn) -> Result<Vec<ColumnDef>, TablesmithError> {
        let mut columns = self.columns.clone();

        match key_column {
            KeyColumn::None => {}
            KeyColumn::First => {
                if let Some(first) = columns.first_mut() {
                    first.is_primary_key = true;
                }
            }
            KeyColumn::Named(name) => {
                let column = columns.iter_mut().find(|c| c.name == *name).ok_or_else(|| {
                    TablesmithError::Validation(format!(
                        "key column {} not found in source",
                        name
                    ))
                })?;

                column.is_primary_key = true;
            }
        }

        Ok(columns)
    }
}

fn malformed(e: ArrowError) -> TablesmithError {
    TablesmithError::Validation(format!("malformed source: {}", e))
}

/// Casts timestamps to nanosecond precision and Date64 to Date32 so that every temporal
/// column carries one of the two temporal kinds. A timestamp column holding a value outside
/// the nanosecond range is kept as text instead.
fn normalize_temporal(batch: RecordBatch) -> Result<RecordBatch, TablesmithError> {
    let schema = batch.schema();

    let needs_cast = |dt: &DataType| -> Option<DataType> {
        match dt {
            DataType::Timestamp(TimeUnit::Nanosecond, _) => None,
            DataType::Timestamp(_, tz) => Some(DataType::Timestamp(TimeUnit::Nanosecond, tz.clone())),
            DataType::Date64 => Some(DataType::Date32),
            _ => None,
        }
    };

    if !schema.fields().iter().any(|f| needs_cast(f.data_type()).is_some()) {
        return Ok(batch);
    }

    let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let Some(dest) = needs_cast(field.data_type()) else {
            columns.push(column.clone());
            fields.push(field.as_ref().clone());
            continue;
        };

        match cast_with_options(column.as_ref(), &dest, &strict_cast()) {
            Ok(converted) => {
                columns.push(converted);
                fields.push(Field::new(field.name(), dest, field.is_nullable()));
            }
            Err(e) if matches!(field.data_type(), DataType::Timestamp(..)) => {
                log::warn!(
                    "Column {} has timestamps outside the nanosecond range, keeping it as text: {}",
                    field.name(),
                    e
                );

                columns.push(cast_with_options(
                    column.as_ref(),
                    &DataType::Utf8,
                    &strict_cast(),
                )?);
                fields.push(Field::new(field.name(), DataType::Utf8, field.is_nullable()));
            }
            Err(e) => return Err(malformed(e)),
        }
    }

    debug_assert!(columns.iter().all(|c| c.len() == batch.num_rows()));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::array::{Int64Array, TimestampSecondArray};

    use super::*;
    use crate::ingest::inference::{SampledKind, StoreType};

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "people.csv",
            "id,name,age,salary,active,joined,seen\n\
             1,Alice,25,50000.0,true,2021-03-01,2021-03-01T10:00:00\n\
             2,Bob,30,60000.5,false,2022-07-15,2022-07-15T08:30:00\n",
        );

        let source = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap();

        assert_eq!(source.row_count(), 2);
        assert_eq!(source.column_count(), 7);
        assert_eq!(source.name_hint(), Some("people"));

        let kinds: Vec<_> = source
            .columns()
            .iter()
            .map(|c| c.sampled_kind.clone().unwrap())
            .collect();

        assert_eq!(
            kinds,
            vec![
                SampledKind::Int64,
                SampledKind::Object,
                SampledKind::Int64,
                SampledKind::Float64,
                SampledKind::Bool,
                SampledKind::Date,
                SampledKind::DateTimeNs,
            ]
        );
        assert_eq!(source.columns()[1].store_type, StoreType::bounded_string());
    }

    #[test]
    fn test_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "empty.csv", "col1,col2,col3\n");

        let err = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().to_lowercase().contains("empty"));
    }

    #[test]
    fn test_zero_byte_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "blank.csv", "");

        let err = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_file() {
        let err = TabularSource::from_csv("./does/not/exist.csv", &LoaderConfig::default())
            .unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "dup.csv", "a,a\n1,2\n");

        let err = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap_err();

        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_custom_delimiter_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "raw.tsv", "1;x\n2;y\n3;z\n");

        let config = LoaderConfig::builder()
            .has_header(false)
            .delimiter(b';')
            .build();

        let source = TabularSource::from_csv(&path, &config).unwrap();

        assert_eq!(source.row_count(), 3);
        assert_eq!(source.column_count(), 2);
    }

    #[test]
    fn test_timestamps_normalized_to_nanoseconds() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("at", DataType::Timestamp(TimeUnit::Second, None), true),
        ]));

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(TimestampSecondArray::from(vec![Some(0), None])),
            ],
        )
        .unwrap();

        let source = TabularSource::from_batch(batch).unwrap();

        assert_eq!(
            source.batch().schema().field(1).data_type(),
            &DataType::Timestamp(TimeUnit::Nanosecond, None)
        );
        assert_eq!(source.columns()[1].store_type, StoreType::DateTime);
    }

    #[test]
    fn test_out_of_range_timestamps_kept_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "events.csv",
            "id,at\n1,2300-01-01T00:00:00\n2,1600-06-01T00:00:00\n3,2021-01-01T00:00:00\n",
        );

        let source = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap();

        assert_eq!(source.columns()[1].sampled_kind, Some(SampledKind::Object));
        assert_eq!(source.columns()[1].store_type, StoreType::bounded_string());

        let at = source.batch().column(1);
        assert_eq!(at.null_count(), 0);

        let values = at.as_any().downcast_ref::<arrow::array::StringArray>().unwrap();
        assert!(values.value(0).starts_with("2300-01-01"));
        assert!(values.value(1).starts_with("1600-06-01"));
    }

    #[test]
    fn test_in_range_timestamps_stay_temporal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "events.csv",
            "id,at\n1,2021-01-01T00:00:00\n2,1999-12-31T23:59:59\n",
        );

        let source = TabularSource::from_csv(&path, &LoaderConfig::default()).unwrap();

        assert_eq!(source.columns()[1].store_type, StoreType::DateTime);
        assert_eq!(source.batch().column(1).null_count(), 0);
    }

    #[test]
    fn test_key_column_selection() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("code", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![7])),
            ],
        )
        .unwrap();
        let source = TabularSource::from_batch(batch).unwrap();

        let none = source.column_defs(&KeyColumn::None).unwrap();
        assert!(none.iter().all(|c| !c.is_primary_key));

        let first = source.column_defs(&KeyColumn::First).unwrap();
        assert!(first[0].is_primary_key);

        let named = source.column_defs(&KeyColumn::Named("code".into())).unwrap();
        assert!(named[1].is_primary_key && !named[0].is_primary_key);

        assert!(
            source
                .column_defs(&KeyColumn::Named("missing".into()))
                .unwrap_err()
                .is_validation()
        );
    }
}
