mod config_tests {
    use rdbscan::{JobConfig, PlanError, SourceKind, SplitScheme, WatermarkBoundary};

    const MYSQL_JOB: &str = r#"{
        "name": "mysqlreader",
        "channel": 2,
        "parameter": {
            "username": "etl",
            "password": "secret",
            "connection": [{ "jdbcUrl": ["jdbc:mysql://db:3306/shop"], "table": ["orders"] }],
            "column": ["id", { "name": "amount", "type": "decimal(10,2)" }],
            "where": "status='OK'",
            "splitPk": "id",
            "increColumn": "updated_at",
            "startLocation": "100",
            "fetchSize": 500
        }
    }"#;

    #[test]
    fn reads_plugin_style_job() {
        let request = JobConfig::from_json_str(MYSQL_JOB).unwrap().into_read_request().unwrap();
        assert_eq!(request.source_kind(), SourceKind::MySQL);
        assert_eq!(request.table(), "orders");
        assert_eq!(request.parallelism(), 2);
        assert_eq!(request.columns().len(), 2);
        assert_eq!(request.columns()[1].declared_type(), Some("decimal(10,2)"));
        assert_eq!(request.filter(), "status='OK'");
        assert_eq!(request.split_key(), Some("id"));
        assert_eq!(request.split_scheme(), SplitScheme::Modulo);
        assert_eq!(request.incremental_column(), Some("updated_at"));
        assert_eq!(request.start_watermark(), Some(100));
        assert_eq!(request.watermark_boundary(), WatermarkBoundary::Exclusive);
        assert_eq!(request.fetch_size(), 500);
        assert_eq!(request.query_timeout_secs(), 0);
        assert_eq!(request.connection().username.as_deref(), Some("etl"));
        assert!(request.connection().url.contains("useCursorFetch=true"));
    }

    #[test]
    fn range_split_and_inclusive_boundary() {
        let job = r#"{
            "name": "postgresqlreader",
            "channel": 4,
            "parameter": {
                "connection": [{ "jdbcUrl": ["jdbc:postgresql://db/shop"], "table": ["public.orders"] }],
                "column": ["id"],
                "splitPk": "id",
                "splitRange": { "lower": 1, "upper": 10001 },
                "increColumn": "id",
                "startLocation": 77,
                "watermarkBoundary": "inclusive",
                "queryTimeOut": 30
            }
        }"#;
        let request = JobConfig::from_json_str(job).unwrap().into_read_request().unwrap();
        assert_eq!(request.source_kind(), SourceKind::PostgreSQL);
        assert_eq!(request.split_scheme(), SplitScheme::Range { lower: 1, upper: 10001 });
        assert_eq!(request.start_watermark(), Some(77));
        assert_eq!(request.watermark_boundary(), WatermarkBoundary::Inclusive);
        assert_eq!(request.query_timeout_secs(), 30);
    }

    #[test]
    fn channel_defaults_to_one() {
        let job = r#"{
            "name": "sqlite",
            "parameter": {
                "connection": [{ "jdbcUrl": ["jdbc:sqlite:/data/shop.db"], "table": ["orders"] }],
                "column": ["id"]
            }
        }"#;
        let request = JobConfig::from_json_str(job).unwrap().into_read_request().unwrap();
        assert_eq!(request.parallelism(), 1);
        assert_eq!(request.start_watermark(), None);
    }

    #[test]
    fn rejects_bad_jobs() {
        let unknown = MYSQL_JOB.replace("mysqlreader", "db2reader");
        assert!(matches!(
            JobConfig::from_json_str(&unknown).unwrap().into_read_request(),
            Err(PlanError::UnsupportedDialect(_))
        ));

        let no_tables = MYSQL_JOB.replace(r#""table": ["orders"]"#, r#""table": []"#);
        assert!(matches!(
            JobConfig::from_json_str(&no_tables).unwrap().into_read_request(),
            Err(PlanError::Configuration(_))
        ));

        let zero_channel = MYSQL_JOB.replace(r#""channel": 2"#, r#""channel": 0"#);
        assert!(matches!(
            JobConfig::from_json_str(&zero_channel).unwrap().into_read_request(),
            Err(PlanError::Configuration(_))
        ));

        let bad_watermark = MYSQL_JOB.replace(r#""startLocation": "100""#, r#""startLocation": "soon""#);
        assert!(JobConfig::from_json_str(&bad_watermark).unwrap().into_read_request().is_err());

        assert!(matches!(JobConfig::from_json_str("{ not json"), Err(PlanError::Configuration(_))));
    }

    #[test]
    fn missing_job_file() {
        let err = JobConfig::from_path("/nonexistent/rdbscan-job.json").unwrap_err();
        assert!(err.to_string().contains("cannot read job file"));
    }
}
