mod catalog_sqlite_tests {
    use rdbscan::catalog::SqliteCatalog;
    use rdbscan::{
        CatalogRegistry, ConnectionParams, ExtractionPlan, IncrementalKind, PlanAssembler, PlanError, ReadRequest,
        SourceKind, SplitScheme, WatermarkBoundary,
    };
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    const URL: &str = "jdbc:sqlite::memory:";

    // 1_700_000_000_000 ms is 2023-11-14 22:13:20 UTC
    const BOUNDARY_MS: i64 = 1_700_000_000_000;

    async fn fixture() -> (CatalogRegistry, SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in [
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, amount REAL, status TEXT, updated_at DATETIME)",
            "INSERT INTO orders VALUES \
                (1, 10.0, 'OK', '2023-11-14 22:13:20'), \
                (2, 20.0, 'OK', '2023-11-15 08:00:00'), \
                (3, 30.0, 'OK', '2023-11-13 09:00:00'), \
                (4, 5.0, 'VOID', '2023-11-16 00:00:00')",
            "CREATE TABLE events (seq INTEGER, note TEXT)",
            "INSERT INTO events VALUES (-3, 'negative'), (NULL, 'null'), (4, 'positive')",
        ] {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        let mut registry = CatalogRegistry::new();
        registry.register(Box::new(SqliteCatalog::new().with_pool(URL, pool.clone())));
        (registry, pool)
    }

    fn request(incremental: &str) -> ReadRequest {
        ReadRequest::builder(SourceKind::SQLite, "orders")
            .columns(["id", "amount"])
            .filter("status = 'OK'")
            .parallelism(2)
            .split_key("id")
            .incremental_column(incremental)
            .start_watermark(BOUNDARY_MS)
            .connection(ConnectionParams::new(URL))
            .build()
            .unwrap()
    }

    /// Rows returned by all partition scans together.
    async fn scanned_rows(pool: &SqlitePool, plan: &ExtractionPlan) -> usize {
        let mut rows = 0;
        for task in plan.scan_tasks() {
            rows += sqlx::query(task.sql).fetch_all(pool).await.unwrap().len();
        }
        rows
    }

    #[tokio::test]
    async fn resolves_type_from_catalog() {
        let (registry, _pool) = fixture().await;
        let plan = PlanAssembler::new(&registry).assemble(&request("updated_at")).await.unwrap();

        let incremental = plan.incremental().unwrap();
        assert_eq!(incremental.native_type, "DATETIME");
        assert_eq!(incremental.kind, IncrementalKind::Temporal);
        assert!(incremental.injected);
        assert_eq!(plan.projection().len(), 3);
        assert_eq!(
            plan.partition_query(1),
            Some(
                "SELECT id, amount, updated_at FROM orders WHERE status = 'OK' \
                 AND julianday(updated_at) > julianday('2023-11-14 22:13:20.000') AND (id % 2)=1"
            )
        );
    }

    #[tokio::test]
    async fn watermark_boundary_row_follows_policy() {
        let (registry, pool) = fixture().await;
        let assembler = PlanAssembler::new(&registry);

        let exclusive = assembler.assemble(&request("updated_at")).await.unwrap();
        assert_eq!(scanned_rows(&pool, &exclusive).await, 1);

        let inclusive = ReadRequest::builder(SourceKind::SQLite, "orders")
            .columns(["id", "amount"])
            .filter("status = 'OK'")
            .parallelism(2)
            .split_key("id")
            .incremental_column("updated_at")
            .start_watermark(BOUNDARY_MS)
            .watermark_boundary(WatermarkBoundary::Inclusive)
            .connection(ConnectionParams::new(URL))
            .build()
            .unwrap();
        let inclusive = assembler.assemble(&inclusive).await.unwrap();
        assert_eq!(scanned_rows(&pool, &inclusive).await, 2);
    }

    #[tokio::test]
    async fn commented_filter_reads_each_row_once() {
        let (registry, pool) = fixture().await;
        let request = ReadRequest::builder(SourceKind::SQLite, "orders")
            .columns(["id"])
            .filter("status='OK' -- only settled orders")
            .parallelism(2)
            .split_key("id")
            .connection(ConnectionParams::new(URL))
            .build()
            .unwrap();
        let plan = PlanAssembler::new(&registry).assemble(&request).await.unwrap();
        assert_eq!(scanned_rows(&pool, &plan).await, 3);
    }

    #[tokio::test]
    async fn modulo_split_skips_null_and_negative_keys() {
        let (registry, pool) = fixture().await;
        let assembler = PlanAssembler::new(&registry);
        let events = |scheme: SplitScheme| {
            ReadRequest::builder(SourceKind::SQLite, "events")
                .columns(["seq", "note"])
                .parallelism(2)
                .split_key("seq")
                .split_scheme(scheme)
                .connection(ConnectionParams::new(URL))
                .build()
                .unwrap()
        };

        let modulo = assembler.assemble(&events(SplitScheme::Modulo)).await.unwrap();
        assert_eq!(scanned_rows(&pool, &modulo).await, 1);

        let range = assembler
            .assemble(&events(SplitScheme::Range { lower: 0, upper: 10 }))
            .await
            .unwrap();
        assert_eq!(scanned_rows(&pool, &range).await, 3);
    }

    #[tokio::test]
    async fn unknown_column_is_reported() {
        let (registry, _pool) = fixture().await;
        let err = PlanAssembler::new(&registry).assemble(&request("deleted_at")).await.unwrap_err();
        assert!(matches!(err, PlanError::IncrementalColumnNotFound { .. }));
    }

    #[tokio::test]
    async fn text_column_cannot_be_incremental() {
        let (registry, _pool) = fixture().await;
        let err = PlanAssembler::new(&registry).assemble(&request("status")).await.unwrap_err();
        assert!(matches!(err, PlanError::Configuration(_)));
    }
}
