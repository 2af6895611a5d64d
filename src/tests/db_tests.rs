#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use crate::catalog::{CatalogStore, SaveSummary, SqliteCatalog};
    use crate::db;
    use crate::types::NewPhoto;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_db(&pool).await.unwrap();
        pool
    }

    fn new_photo(path: &str) -> NewPhoto {
        NewPhoto {
            file_path: path.to_string(),
            title: "x".to_string(),
            description: String::new(),
            folder: "trip".to_string(),
            location: "unspecified".to_string(),
            date: Utc.with_ymd_and_hms(2023, 7, 14, 18, 30, 0).unwrap(),
            file_size_kb: 1.25,
            exif_data: Some(r#"{"sizeBytes":1280}"#.to_string()),
            rating: 0.0,
        }
    }

    #[tokio::test]
    async fn test_init_db() {
        let pool = setup_test_db().await;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(tables.contains(&"photos".to_string()));

        let indexes: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='photos'")
                .fetch_all(&pool)
                .await
                .unwrap();
        for name in ["idx_photos_file_path", "idx_photos_folder", "idx_photos_date"] {
            assert!(indexes.contains(&name.to_string()), "missing index {}", name);
        }

        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('photos')")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert!(columns.contains(&"rating".to_string()));
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent() {
        let pool = setup_test_db().await;
        db::init_db(&pool).await.unwrap();
        db::init_db(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_path_is_unique() {
        let pool = setup_test_db().await;
        let insert = "INSERT INTO photos (file_path, title, folder, date) VALUES (?1, 'x', 'f', '2024-01-01T00:00:00Z')";

        sqlx::query(insert).bind("/p/a.jpg").execute(&pool).await.unwrap();
        let dup = sqlx::query(insert).bind("/p/a.jpg").execute(&pool).await;

        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_catalog_changes_are_staged_until_saved() {
        let pool = setup_test_db().await;
        let catalog = SqliteCatalog::new(pool.clone());

        catalog.add_batch(vec![new_photo("/p/a.jpg"), new_photo("/p/b.jpg")]).await.unwrap();
        assert!(catalog.enumerate_all().await.unwrap().is_empty());

        let summary = catalog.save_changes().await.unwrap();
        assert_eq!(summary, SaveSummary { removed: 0, added: 2 });

        let found = catalog.find_by_path("/p/a.jpg").await.unwrap().unwrap();
        assert_eq!(found.folder, "trip");
        assert_eq!(found.file_size_kb, 1.25);
        assert_eq!(found.date, Utc.with_ymd_and_hms(2023, 7, 14, 18, 30, 0).unwrap());
        assert_eq!(found.exif_data.as_deref(), Some(r#"{"sizeBytes":1280}"#));
        assert!(catalog.find_by_path("/p/missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_without_changes() {
        let pool = setup_test_db().await;
        let catalog = SqliteCatalog::new(pool);
        assert_eq!(catalog.save_changes().await.unwrap(), SaveSummary::default());
    }

    #[tokio::test]
    async fn test_removals_commit_before_additions() {
        let pool = setup_test_db().await;
        let catalog = SqliteCatalog::new(pool.clone());
        catalog.add_batch(vec![new_photo("/p/a.jpg")]).await.unwrap();
        catalog.save_changes().await.unwrap();
        let old = catalog.find_by_path("/p/a.jpg").await.unwrap().unwrap();

        // Same path retired and re-added in one batch: only works if the delete runs first.
        let mut replacement = new_photo("/p/a.jpg");
        replacement.title = "replacement".into();
        catalog.add_batch(vec![replacement]).await.unwrap();
        catalog.remove_batch(vec![old.clone()]).await.unwrap();
        let summary = catalog.save_changes().await.unwrap();

        assert_eq!(summary, SaveSummary { removed: 1, added: 1 });
        let now = catalog.find_by_path("/p/a.jpg").await.unwrap().unwrap();
        assert_eq!(now.title, "replacement");
        assert_ne!(now.id, old.id);
    }

    #[tokio::test]
    async fn test_existing_path_is_not_duplicated() {
        let pool = setup_test_db().await;
        let catalog = SqliteCatalog::new(pool.clone());
        catalog.add_batch(vec![new_photo("/p/a.jpg")]).await.unwrap();
        catalog.save_changes().await.unwrap();

        catalog.add_batch(vec![new_photo("/p/a.jpg"), new_photo("/p/b.jpg")]).await.unwrap();
        let summary = catalog.save_changes().await.unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(catalog.enumerate_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_large_batches_are_chunked() {
        let pool = setup_test_db().await;
        let catalog = SqliteCatalog::new(pool.clone());
        let photos: Vec<NewPhoto> = (0..1500).map(|i| new_photo(&format!("/p/{i:04}.jpg"))).collect();

        catalog.add_batch(photos).await.unwrap();
        assert_eq!(catalog.save_changes().await.unwrap().added, 1500);

        let all = catalog.enumerate_all().await.unwrap();
        catalog.remove_batch(all).await.unwrap();
        assert_eq!(catalog.save_changes().await.unwrap().removed, 1500);
    }

    #[tokio::test]
    async fn test_unparseable_date_falls_back_to_epoch() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO photos (file_path, title, folder, date) VALUES ('/p/odd.jpg', 'odd', 'f', 'last tuesday')")
            .execute(&pool)
            .await
            .unwrap();
        let catalog = SqliteCatalog::new(pool);

        let photo = catalog.find_by_path("/p/odd.jpg").await.unwrap().unwrap();

        assert_eq!(photo.date.timestamp(), 0);
        assert_eq!(photo.rating, 0.0);
    }
}
