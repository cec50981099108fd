use flapjack_sync::{
    IndexMetadata, Indexer, PendingChanges, Record, SearchClient, StaticLoader, SyncError,
    SyncSubscriber, TransactionHooks,
};
use flapjack_sync_http::HttpSearchClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpSearchClient {
    HttpSearchClient::with_host(&server.uri(), "APPID", "secret")
        .poll_interval(Duration::from_millis(1))
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn task(id: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "taskID": id }))
}

#[tokio::test]
async fn test_save_objects_posts_batch_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .and(header("x-algolia-application-id", "APPID"))
        .and(header("x-algolia-api-key", "secret"))
        .and(body_json(json!({"requests": [
            {"action": "updateObject", "body": {"objectID": "a", "name": "Laptop"}}
        ]})))
        .respond_with(task(11))
        .expect(1)
        .mount(&server)
        .await;

    let index = client(&server).init_index("products");
    let task_id = index
        .save_objects(vec![record(json!({"objectID": "a", "name": "Laptop"}))])
        .await
        .unwrap();

    assert_eq!(task_id, 11);
}

#[tokio::test]
async fn test_delete_and_partial_update_actions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .and(body_json(json!({"requests": [
            {"action": "deleteObject", "body": {"objectID": "a"}}
        ]})))
        .respond_with(task(1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .and(body_json(json!({"requests": [
            {"action": "partialUpdateObject", "body": {"objectID": "b", "price": 5}}
        ]})))
        .respond_with(task(2))
        .expect(1)
        .mount(&server)
        .await;

    let index = client(&server).init_index("products");
    assert_eq!(index.delete_objects(vec!["a".to_string()]).await.unwrap(), 1);
    assert_eq!(
        index
            .partial_update_objects(vec![record(json!({"objectID": "b", "price": 5}))])
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_missing_index_settings_are_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/missing/settings"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Index does not exist"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hitsPerPage": 20})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.init_index("missing").get_settings().await.unwrap(), None);
    assert_eq!(
        client.init_index("products").get_settings().await.unwrap(),
        Some(record(json!({"hitsPerPage": 20})))
    );
}

#[tokio::test]
async fn test_server_error_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/1/indexes/products/settings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .init_index("products")
        .set_settings(record(json!({"hitsPerPage": 5})))
        .await
        .unwrap_err();

    match err {
        SyncError::Remote(msg) => assert!(msg.contains("500")),
        other => panic!("expected a remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_task_polls_until_published() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/task/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "notPublished"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/task/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "published"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .init_index("products")
        .wait_task(9)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_task_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/task/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "error": "disk full"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .init_index("products")
        .wait_task(3)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_search_sends_query_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/query"))
        .and(body_json(json!({"hitsPerPage": 2, "query": "laptop"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"objectID": "a", "name": "Laptop"}],
            "nbHits": 1,
            "page": 0,
            "nbPages": 1,
            "hitsPerPage": 2,
            "query": "laptop",
            "processingTimeMS": 1
        })))
        .mount(&server)
        .await;

    let resp = client(&server)
        .init_index("products")
        .search("laptop", &record(json!({"hitsPerPage": 2})))
        .await
        .unwrap();

    assert_eq!(resp.nb_hits, 1);
    assert_eq!(resp.hits[0]["name"], "Laptop");
    assert_eq!(resp.extra["processingTimeMS"], 1);
}

#[tokio::test]
async fn test_index_level_operations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products__TEMP/operation"))
        .and(body_json(json!({"operation": "move", "destination": "products"})))
        .respond_with(task(5))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/1/indexes/old"))
        .respond_with(task(6))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .respond_with(task(7))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.move_index("products__TEMP", "products").await.unwrap(), 5);
    assert_eq!(client.delete_index("old").await.unwrap(), 6);
    assert_eq!(client.init_index("products").clear_objects().await.unwrap(), 7);
}

#[tokio::test]
async fn test_pipeline_over_http() {
    struct Product;
    impl flapjack_sync::Entity for Product {
        fn class_name(&self) -> &str {
            "shop::Product"
        }
        fn field(&self, name: &str) -> Option<flapjack_sync::FieldValue> {
            match name {
                "id" => Some(1.into()),
                "name" => Some("Laptop".into()),
                _ => None,
            }
        }
    }

    let server = MockServer::start().await;
    let object_id = flapjack_sync::serialize_primary_key(&record(json!({"id": 1}))).unwrap();
    Mock::given(method("POST"))
        .and(path("/1/indexes/Product_prod/batch"))
        .and(body_json(json!({"requests": [
            {"action": "updateObject", "body": {"name": "Laptop", "objectID": object_id}}
        ]})))
        .respond_with(task(21))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/Product_prod/task/21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "published"})))
        .expect(1)
        .mount(&server)
        .await;

    let loader = StaticLoader::new().with(IndexMetadata::new("shop::Product").property("name"));
    let indexer = Indexer::new(Arc::new(client(&server)), Arc::new(loader), "prod");
    let mut sync = SyncSubscriber::new(indexer);

    sync.on_before_commit(&PendingChanges::new().insert(Arc::new(Product)))
        .unwrap();
    sync.on_after_commit().await.unwrap();
    sync.wait_for_tasks().await.unwrap();
}
