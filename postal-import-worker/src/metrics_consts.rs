pub const PAGES_FETCHED: &str = "postal_import_pages_fetched";
pub const RECORDS_PROCESSED: &str = "postal_import_records_processed";
pub const RECORDS_DROPPED: &str = "postal_import_records_dropped";
pub const RECORDS_WRITTEN: &str = "postal_import_records_written";
pub const BATCH_CHUNKS_WRITTEN: &str = "postal_import_batch_chunks_written";
pub const BATCH_WRITE_FAILURES: &str = "postal_import_batch_write_failures";
