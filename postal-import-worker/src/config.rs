use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    // Required: the importer fails fast before any network activity when the
    // destination URL is missing
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,

    #[envconfig(
        from = "CATALOG_BASE_URL",
        default = "https://public.opendatasoft.com/api/records/1.0/search/"
    )]
    pub catalog_base_url: String,

    #[envconfig(from = "CATALOG_TIMEOUT_SECONDS", default = "30")]
    pub catalog_timeout_seconds: u64,

    // Connecting directly to postgres, not via a pooler, so keep this low
    #[envconfig(default = "4")]
    pub max_pg_connections: u32,

    // Cooperative throttle between page fetches, to respect the catalog's
    // rate limits
    #[envconfig(from = "REQUEST_DELAY_MS", default = "350")]
    pub default_request_delay_ms: u64,
}
