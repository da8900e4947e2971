use redb::TableDefinition;

/// Download counts: artifact file name -> count
pub const DOWNLOAD_COUNTS: TableDefinition<&str, u64> = TableDefinition::new("download_counts");
