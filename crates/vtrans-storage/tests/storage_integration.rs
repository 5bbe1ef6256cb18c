//! Object storage integration tests.
//!
//! These hit a real bucket and are ignored by default. Set `STORAGE_BUCKET`,
//! `STORAGE_ACCESS_KEY_ID` and `STORAGE_SECRET_ACCESS_KEY` (plus
//! `STORAGE_ENDPOINT_URL` for a non-GCS endpoint) and run with `--ignored`.

use vtrans_storage::StorageClient;

#[tokio::test]
#[ignore = "requires object storage credentials"]
async fn test_storage_connectivity() {
    dotenvy::dotenv().ok();

    let client = StorageClient::from_env()
        .await
        .expect("Failed to create storage client");

    client
        .check_connectivity()
        .await
        .expect("Bucket should be reachable");
}

#[tokio::test]
#[ignore = "requires object storage credentials"]
async fn test_upload_exists_delete_cycle() {
    dotenvy::dotenv().ok();

    let client = StorageClient::from_env()
        .await
        .expect("Failed to create storage client");

    let key = format!("itest/{}-lifecycle.bin", uuid::Uuid::new_v4());

    client
        .upload_bytes(b"integration test payload".to_vec(), &key, "application/octet-stream")
        .await
        .expect("Failed to upload object");

    assert!(client.exists(&key).await.expect("Failed to check object"));

    client
        .delete_object(&key)
        .await
        .expect("Failed to delete object");

    assert!(!client.exists(&key).await.expect("Failed to check object"));

    // A second delete of the same key must also succeed.
    client
        .delete_object(&key)
        .await
        .expect("Repeat delete should be idempotent");
}
