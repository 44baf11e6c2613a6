use bucketflow_core::{
    AdvancedGetOptions, CustomerKey, GetObjectOptions, ListObjectsOptions, RemoveObjectsOptions,
    ServerSide, StatObjectOptions, TransferConfig,
};

#[test]
fn replication_proxy_header_from_public_api() {
    let mut opts = GetObjectOptions::new();
    opts.internal.replication_proxy_request = Some("true".to_string());

    let headers = opts.header();
    assert_eq!(headers.get("X-Minio-Source-Proxy-Request"), Some("true"));
}

#[test]
fn replication_proxy_header_survives_user_override() {
    let mut opts = StatObjectOptions::new();
    opts.set("x-minio-source-proxy-request", "false");
    opts.internal = AdvancedGetOptions {
        replication_proxy_request: Some("true".to_string()),
    };
    opts.server_side_encryption = Some(ServerSide::CustomerKey(CustomerKey::new(&[7u8; 32]).unwrap()));

    let headers = opts.header();
    assert_eq!(headers.get("X-Minio-Source-Proxy-Request"), Some("true"));
    assert_eq!(
        headers.get("X-Amz-Server-Side-Encryption-Customer-Algorithm"),
        Some("AES256")
    );
}

#[test]
fn transfer_config_sizes_listing_and_removal() {
    let transfer: TransferConfig = toml::from_str(
        r#"
list_page_size = 50
delete_batch_size = 20
"#,
    )
    .unwrap();

    assert_eq!(ListObjectsOptions::from_config("photos/", &transfer).max_keys, 50);
    assert_eq!(RemoveObjectsOptions::from(&transfer).batch_size, 20);
}
