//! End-to-end import runs against the in-memory document store

use async_trait::async_trait;
use bson::{Bson, doc};
use mongo_json_importer::storage::StorageResult;
use mongo_json_importer::{
    DataFile, DatabaseConnector, EntityRegistry, FileLister, ImportConfig, ImportError, Importer,
    MemoryConnector, MemoryStore, ResourceDirLister, StorageError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const URI: &str = "memory://localhost/seed";

fn fixtures(files: &[(&str, &str)]) -> TempDir {
    let root = tempdir().unwrap();
    let data = root.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    for (name, content) in files {
        std::fs::write(data.join(name), content).unwrap();
    }
    root
}

fn importer(
    store: &MemoryStore,
    root: &Path,
    registry: EntityRegistry,
) -> Importer<MemoryConnector, ResourceDirLister, EntityRegistry> {
    Importer::new(store.connector(), ResourceDirLister::single(root), registry)
}

fn shop_registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry
        .declare("shop::models::User", Some("users"))
        .declare("shop::models::Order", Some("orders"))
        .declare("shop::models::Product", Some("products"))
        .declare("shop::models::AuditLog", None);
    registry
}

mod permissive {
    use super::*;

    #[tokio::test]
    async fn test_every_object_becomes_a_document() {
        let root = fixtures(&[
            (
                "users.json",
                r#"[
                    {"name": "Alice", "age": 31, "admin": true, "tags": ["a", "b"]},
                    {"name": "Bob", "age": 27, "admin": false, "manager": null},
                    {"name": "Carol", "address": {"city": "Ghent", "zip": "9000"}}
                ]"#,
            ),
            ("orders.json", r#"[{"total": 12.5}, {"total": 3}]"#),
        ]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let report = importer.run(&ImportConfig::new(URI)).await.unwrap();

        assert_eq!(report.database, "seed");
        assert_eq!(report.inserted("users"), Some(3));
        assert_eq!(report.inserted("orders"), Some(2));
        assert_eq!(report.total_documents(), 5);

        let users = store.documents("seed", "users").await;
        assert_eq!(users.len(), 3);
        assert_eq!(
            users[0],
            doc! { "name": "Alice", "age": 31_i64, "admin": true, "tags": ["a", "b"] }
        );
        assert_eq!(users[1].get("manager"), Some(&Bson::Null));
        assert_eq!(
            users[2].get_document("address").unwrap(),
            &doc! { "city": "Ghent", "zip": "9000" }
        );

        let orders = store.documents("seed", "orders").await;
        assert_eq!(orders[0].get("total"), Some(&Bson::Double(12.5)));
        assert_eq!(orders[1].get("total"), Some(&Bson::Int64(3)));
    }

    #[tokio::test]
    async fn test_zero_files_is_a_successful_noop() {
        let root = fixtures(&[]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let report = importer.run(&ImportConfig::new(URI)).await.unwrap();

        assert_eq!(report.collection_count(), 0);
        assert!(store.collection_names("seed").await.is_empty());
        assert_eq!(store.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_array_touches_collection() {
        let root = fixtures(&[("empty.json", "[]")]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let report = importer.run(&ImportConfig::new(URI)).await.unwrap();

        assert_eq!(report.inserted("empty"), Some(0));
        assert_eq!(store.collection_names("seed").await, vec!["empty"]);
        assert_eq!(store.count("seed", "empty").await, 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_merged() {
        let root = fixtures(&[("tags.json", r#"[{"t": "x"}, {"t": "x"}, {"t": "x"}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        importer.run(&ImportConfig::new(URI)).await.unwrap();
        assert_eq!(store.count("seed", "tags").await, 3);
    }

    #[tokio::test]
    async fn test_second_run_doubles_documents() {
        let root = fixtures(&[
            ("users.json", r#"[{"n": 1}, {"n": 2}]"#),
            ("orders.json", r#"[{"n": 1}]"#),
        ]);
        let store = MemoryStore::new();
        let config = ImportConfig::new(URI);

        importer(&store, root.path(), EntityRegistry::new())
            .run(&config)
            .await
            .unwrap();
        importer(&store, root.path(), EntityRegistry::new())
            .run(&config)
            .await
            .unwrap();

        assert_eq!(store.count("seed", "users").await, 4);
        assert_eq!(store.count("seed", "orders").await, 2);
        assert_eq!(store.connect_count().await, 2);
        assert_eq!(store.close_count().await, 2);
    }

    #[tokio::test]
    async fn test_same_importer_can_run_twice() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());
        let config = ImportConfig::new(URI);

        importer.run(&config).await.unwrap();
        importer.run(&config).await.unwrap();

        assert_eq!(store.count("seed", "users").await, 2);
        assert_eq!(store.open_clients().await, 0);
    }

    #[tokio::test]
    async fn test_database_override_wins_over_uri() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let report = importer
            .run(&ImportConfig::new(URI).with_database_name("other"))
            .await
            .unwrap();

        assert_eq!(report.database, "other");
        assert_eq!(store.count("other", "users").await, 1);
        assert_eq!(store.count("seed", "users").await, 0);
    }

    #[tokio::test]
    async fn test_database_override_is_used_verbatim() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let report = importer
            .run(&ImportConfig::new(URI).with_database_name(" padded "))
            .await
            .unwrap();

        assert_eq!(report.database, " padded ");
        assert_eq!(store.count(" padded ", "users").await, 1);
    }
}

mod strict {
    use super::*;

    #[tokio::test]
    async fn test_only_declared_collections_are_imported() {
        let root = fixtures(&[
            ("users.json", r#"[{"n": 1}]"#),
            ("orders.json", r#"[{"n": 1}]"#),
            ("logs.json", r#"[{"n": 1}]"#),
            ("AuditLog.json", r#"[{"n": 1}]"#),
        ]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), shop_registry());

        let report = importer
            .run(&ImportConfig::new(URI).with_strict_namespace("shop::models"))
            .await
            .unwrap();

        assert_eq!(
            report.collections.keys().collect::<Vec<_>>(),
            vec!["orders", "users"]
        );
        assert_eq!(store.collection_names("seed").await, vec!["orders", "users"]);
    }

    #[tokio::test]
    async fn test_collection_match_is_case_sensitive() {
        let root = fixtures(&[("Users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), shop_registry());

        let report = importer
            .run(&ImportConfig::new(URI).with_strict_namespace("shop::models"))
            .await
            .unwrap();

        assert_eq!(report.collection_count(), 0);
        assert!(store.collection_names("seed").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_namespace_imports_nothing() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#), ("orders.json", "[]")]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), shop_registry());

        let report = importer
            .run(&ImportConfig::new(URI).with_strict_mode(true))
            .await
            .unwrap();

        assert_eq!(report.collection_count(), 0);
        assert!(store.collection_names("seed").await.is_empty());
        assert_eq!(store.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_blank_or_unknown_namespace_imports_nothing() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);

        for namespace in ["", "   ", "no::such::module", "not a path"] {
            let store = MemoryStore::new();
            let mut importer = importer(&store, root.path(), shop_registry());

            let report = importer
                .run(&ImportConfig::new(URI).with_strict_namespace(namespace))
                .await
                .unwrap();

            assert_eq!(report.collection_count(), 0, "namespace {:?}", namespace);
            assert!(store.collection_names("seed").await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_permissive_ignores_registry() {
        let root = fixtures(&[("logs.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), shop_registry());

        let config = ImportConfig::new(URI)
            .with_strict_namespace("shop::models")
            .with_strict_mode(false);
        let report = importer.run(&config).await.unwrap();

        assert_eq!(report.inserted("logs"), Some(1));
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_top_level_object_aborts_run() {
        let root = fixtures(&[
            ("a_users.json", r#"[{"n": 1}, {"n": 2}]"#),
            ("b_broken.json", r#"{"n": 1}"#),
            ("c_orders.json", r#"[{"n": 1}]"#),
        ]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        assert!(matches!(err, ImportError::Content { .. }));
        assert!(err.to_string().contains("b_broken.json"));
        // Earlier file keeps its documents, later file is never touched
        assert_eq!(store.count("seed", "a_users").await, 2);
        assert!(
            !store
                .collection_names("seed")
                .await
                .contains(&"c_orders".to_string())
        );
        assert_eq!(store.open_clients().await, 0);
        assert_eq!(store.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_non_object_element_writes_nothing_from_that_file() {
        let root = fixtures(&[("mixed.json", r#"[{"n": 1}, "oops", {"n": 3}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        assert_eq!(err.category(), "content");
        assert_eq!(store.count("seed", "mixed").await, 0);
        assert_eq!(store.close_count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_content_error() {
        let root = fixtures(&[("users.json", r#"[{"n": 1},"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();
        assert!(matches!(err, ImportError::Content { .. }));
        assert_eq!(store.open_clients().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_write_aborts_run() {
        let root = fixtures(&[
            ("a.json", r#"[{"n": 1}]"#),
            ("b.json", r#"[{"n": 1}, {"n": 2}]"#),
            ("c.json", r#"[{"n": 1}]"#),
        ]);
        let store = MemoryStore::new();
        store.reject_writes_to("b").await;
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        match &err {
            ImportError::Write { collection, .. } => assert_eq!(collection, "b"),
            other => panic!("expected write error, got {other:?}"),
        }
        assert_eq!(store.count("seed", "a").await, 1);
        assert_eq!(store.count("seed", "c").await, 0);
        assert_eq!(store.close_count().await, 1);
        assert_eq!(store.open_clients().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_connection_error() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::unreachable();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        assert!(matches!(err, ImportError::Connection(_)));
        assert_eq!(store.connect_count().await, 0);
        assert_eq!(store.close_count().await, 0);
        assert!(!importer.connector().is_connected());
    }

    #[tokio::test]
    async fn test_missing_database_name_is_configuration_error() {
        let root = fixtures(&[("users.json", r#"[{"n": 1}]"#)]);
        let store = MemoryStore::new();
        let mut importer = importer(&store, root.path(), EntityRegistry::new());

        let err = importer
            .run(&ImportConfig::new("memory://localhost:27017"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "configuration");
        assert_eq!(store.open_clients().await, 0);
    }

    struct BrokenLister;

    #[async_trait]
    impl FileLister for BrokenLister {
        async fn list_files(&self, _extension: &str) -> StorageResult<BTreeMap<String, DataFile>> {
            Err(StorageError::ListFailed {
                dir: PathBuf::from("/fixtures/data"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[tokio::test]
    async fn test_listing_failure_closes_connection() {
        let store = MemoryStore::new();
        let mut importer = Importer::new(store.connector(), BrokenLister, EntityRegistry::new());

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        assert!(matches!(err, ImportError::FileAccess(_)));
        assert!(err.to_string().contains("/fixtures/data"));
        assert_eq!(store.connect_count().await, 1);
        assert_eq!(store.close_count().await, 1);
        assert_eq!(store.open_clients().await, 0);
    }

    struct VanishingLister(PathBuf);

    #[async_trait]
    impl FileLister for VanishingLister {
        async fn list_files(&self, _extension: &str) -> StorageResult<BTreeMap<String, DataFile>> {
            let mut files = BTreeMap::new();
            files.insert(
                "ghost".to_string(),
                DataFile::new("ghost", self.0.join("ghost.json")),
            );
            Ok(files)
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_is_file_access_error() {
        let root = tempdir().unwrap();
        let store = MemoryStore::new();
        let mut importer = Importer::new(
            store.connector(),
            VanishingLister(root.path().to_path_buf()),
            EntityRegistry::new(),
        );

        let err = importer.run(&ImportConfig::new(URI)).await.unwrap_err();

        assert_eq!(err.category(), "file_access");
        assert!(err.to_string().contains("ghost.json"));
        assert_eq!(store.close_count().await, 1);
    }
}
