use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use log_parser::{CountTable, LogRecord, ParseFailure};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Column buffers for successful records
pub struct RecordBuilder {
    date_time: Vec<String>,
    service_name: Vec<String>,
    log_level: Vec<String>,
    message: Vec<String>,
}

impl RecordBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            date_time: Vec::with_capacity(capacity),
            service_name: Vec::with_capacity(capacity),
            log_level: Vec::with_capacity(capacity),
            message: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: &LogRecord) {
        self.date_time.push(record.timestamp().to_string());
        self.service_name.push(record.service_name().to_string());
        self.log_level.push(record.log_level().as_str().to_string());
        self.message.push(record.message().to_string());
    }

    pub fn build_batch(self) -> Result<RecordBatch, arrow::error::ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(self.date_time)),
            Arc::new(StringArray::from(self.service_name)),
            Arc::new(StringArray::from(self.log_level)),
            Arc::new(StringArray::from(self.message)),
        ];

        RecordBatch::try_new(record_schema(), columns)
    }
}

pub fn record_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("date_time", DataType::Utf8, false),
        Field::new("service_name", DataType::Utf8, false),
        Field::new("log_level", DataType::Utf8, false),
        Field::new("message", DataType::Utf8, false),
    ]))
}

pub fn failure_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("raw_line", DataType::Utf8, false),
        Field::new("error_detail", DataType::Utf8, false),
    ]))
}

pub fn count_schema(key_name: &str) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(key_name, DataType::Utf8, false),
        Field::new("count", DataType::UInt64, false),
    ]))
}

pub fn records_batch<'a>(
    records: impl IntoIterator<Item = &'a LogRecord>,
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let records = records.into_iter();
    let mut builder = RecordBuilder::with_capacity(records.size_hint().0);
    for record in records {
        builder.push(record);
    }
    builder.build_batch()
}

pub fn failures_batch(failures: &[ParseFailure]) -> Result<RecordBatch, arrow::error::ArrowError> {
    let raw: Vec<&str> = failures.iter().map(|f| f.raw_line.as_str()).collect();
    let detail: Vec<&str> = failures.iter().map(|f| f.error_detail.as_str()).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(raw)),
        Arc::new(StringArray::from(detail)),
    ];
    RecordBatch::try_new(failure_schema(), columns)
}

/// Two-column `key, count` table, rows in the table's first-seen order
pub fn counts_batch(key_name: &str, table: &CountTable) -> Result<RecordBatch, arrow::error::ArrowError> {
    let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
    let counts: Vec<u64> = table.iter().map(|(_, c)| c as u64).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(keys)),
        Arc::new(UInt64Array::from(counts)),
    ];
    RecordBatch::try_new(count_schema(key_name), columns)
}

pub fn write_arrow_table(
    batch: &RecordBatch,
    path: &Path,
) -> Result<(), arrow::error::ArrowError> {
    let file = File::create(path)?;
    let mut writer = StreamWriter::try_new(file, &batch.schema())?;
    writer.write(batch)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use arrow::ipc::reader::StreamReader;
    use log_parser::{DashedLineParser, Parser};

    fn read_back(path: &Path) -> RecordBatch {
        let file = File::open(path).unwrap();
        let mut reader = StreamReader::try_new(file, None).unwrap();
        reader.next().unwrap().unwrap()
    }

    #[test]
    fn test_records_table() {
        let outcome = DashedLineParser.parse("2024-01-01 10:00:00 - ServiceA - ERROR - disk full");
        let record = outcome.as_record().unwrap();

        let batch = records_batch([record, record]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "date_time");

        let levels = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(levels.value(0), "ERROR");
    }

    #[test]
    fn test_counts_table_written_and_read() {
        let mut table = CountTable::new();
        table.add("ServiceB", 3);
        table.add("ServiceA", 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.arrow");
        write_arrow_table(&counts_batch("service_name", &table).unwrap(), &path).unwrap();

        let batch = read_back(&path);
        let keys = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        let counts = batch.column(1).as_any().downcast_ref::<UInt64Array>().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.value(0), "ServiceB");
        assert_eq!(counts.value(0), 3);
    }

    #[test]
    fn test_empty_failures_table() {
        let batch = failures_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
    }
}
