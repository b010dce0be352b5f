use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Stream every row of the table, one JSON object per line
    Stream,

    /// Stream the table in fixed-size batches
    Batches {
        #[arg(long, help = "Rows per batch (defaults to ROWSTREAM_BATCH_SIZE)")]
        size: Option<usize>,

        #[arg(long, help = "Only keep users strictly older than this")]
        min_age: Option<i64>,

        #[arg(long, help = "Only keep users strictly younger than this")]
        max_age: Option<i64>,
    },

    /// Fetch the table page by page with LIMIT/OFFSET
    Paginate {
        #[arg(long, help = "Rows per page (defaults to ROWSTREAM_PAGE_SIZE)")]
        page_size: Option<usize>,

        #[arg(long, default_value_t = 0, help = "Offset to resume from")]
        offset: usize,
    },

    /// Average the age column without loading the table into memory
    AverageAge,

    /// Run a full scan and an age-filtered scan at the same time
    Concurrent {
        #[arg(long, default_value_t = 40)]
        min_age: i64,
    },

    /// Create the users table and load users from a CSV file (name,email,age)
    Seed {
        #[arg(long, help = "CSV file path")]
        csv: String,
    },

    /// Check that the configured store answers a trivial query
    TestConn,
}
