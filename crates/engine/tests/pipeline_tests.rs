use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::{Value, json};
use sift_engine::{ActionExecutor, BackendError, ExecutionInput, FetchPlan, Pipeline, PipelineOptions};
use sift_registry::{SchemaRegistry, SiftConfig};
use sift_types::{ActionSpec, ClientRequest, ErrorKind, NamingConvention, PageMeta, RawPage, RawValue, Response, record_from_map};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::from_manifest_files(&[fixture_path("blog.yaml")], NamingConvention::CamelCase).expect("load blog fixture"))
}

/// Executor that counts calls, records what it was given and replays a fixed result.
struct RecordingExecutor {
    calls: AtomicUsize,
    seen: Mutex<Vec<(FetchPlan, ExecutionInput)>>,
    result: Result<RawValue, BackendError>,
}

impl RecordingExecutor {
    fn returning(raw: RawValue) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            result: Ok(raw),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_plan(&self) -> Value {
        let seen = self.seen.lock().expect("lock");
        serde_json::to_value(&seen.last().expect("executor was called").0).expect("serialize plan")
    }

    fn last_input(&self) -> ExecutionInput {
        self.seen.lock().expect("lock").last().expect("executor was called").1.clone()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(&self, _action: &ActionSpec, plan: &FetchPlan, input: &ExecutionInput) -> Result<RawValue, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().expect("lock").push((plan.clone(), input.clone()));
        self.result.clone()
    }
}

fn pipeline(executor: &Arc<RecordingExecutor>) -> Pipeline {
    Pipeline::with_options(registry(), executor.clone(), PipelineOptions::from(&SiftConfig::default()))
}

fn record(value: Value) -> RawValue {
    RawValue::Record(record_from_map(value.as_object().cloned().unwrap_or_default()))
}

fn request(value: Value) -> ClientRequest {
    serde_json::from_value(value).expect("client request")
}

fn data(response: &Response) -> &Value {
    assert!(response.success, "expected success, got {:?}", response.errors);
    response.data.as_ref().expect("response data")
}

#[tokio::test]
async fn nested_relation_is_projected_exactly() {
    let executor = RecordingExecutor::returning(record(json!({
        "id": "1",
        "title": "T",
        "user": {"id": "u1", "name": "Bob", "email": "bob@example.com"},
        "created_at": "2024-01-01T00:00:00Z"
    })));
    let pipeline = pipeline(&executor);

    let response = pipeline
        .run(&request(json!({"action": "getPost", "fields": ["id", "title", {"user": ["id", "name"]}]})))
        .await;

    assert_eq!(data(&response), &json!({"id": "1", "title": "T", "user": {"id": "u1", "name": "Bob"}}));
    assert_eq!(
        executor.last_plan(),
        json!({"select": ["id", "title"], "load": [{"field": "user", "plan": {"select": ["id", "name"], "load": []}}]})
    );
}

#[tokio::test]
async fn nesting_under_a_primitive_fails_before_execution() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let response = pipeline(&executor).run(&request(json!({"action": "getPost", "fields": [{"title": ["x"]}]}))).await;

    assert_eq!(response.error_kind(), Some(ErrorKind::PrimitiveCannotNest));
    assert_eq!(response.errors.as_ref().map(|errors| errors[0].path.clone()), Some(vec!["title".to_string()]));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn union_output_holds_only_the_active_member() {
    let executor = RecordingExecutor::returning(record(json!({
        "content": {"type": "text", "value": {"text": "hi", "formatting": "md"}}
    })));
    let pipeline = pipeline(&executor);

    let response = pipeline
        .run(&request(json!({
            "action": "getPost",
            "fields": [{"content": ["note", {"text": ["text", "formatting"]}, {"link": ["url"]}]}]
        })))
        .await;

    assert_eq!(data(&response), &json!({"content": {"text": {"text": "hi", "formatting": "md"}}}));
}

#[tokio::test]
async fn union_members_use_their_stored_tag() {
    let executor = RecordingExecutor::returning(record(json!({
        "content": {"type": "hyperlink", "value": {"url": "https://example.com", "text": "site"}}
    })));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "getPost", "fields": [{"content": [{"link": ["url"]}]}]})))
        .await;
    assert_eq!(data(&response), &json!({"content": {"link": {"url": "https://example.com"}}}));
}

#[tokio::test]
async fn tagged_map_union_lists_keep_one_entry_per_element() {
    let executor = RecordingExecutor::returning(record(json!({
        "attachments": [
            {"kind": "image", "url": "a.png", "width": 640},
            {"kind": "file", "url": "b.pdf", "size_bytes": 1024}
        ]
    })));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "getPost", "fields": [{"attachments": [{"image": ["url", "width"]}]}]})))
        .await;
    assert_eq!(data(&response), &json!({"attachments": [{"image": {"url": "a.png", "width": 640}}, {}]}));
    assert_eq!(
        executor.last_plan(),
        json!({"select": [], "load": [{"field": "attachments", "plan": {"select": ["url", "width", "kind"], "load": []}}]})
    );
}

#[tokio::test]
async fn invalid_calculation_argument_names_the_argument() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let response = pipeline(&executor)
        .run(&request(json!({
            "action": "getPost",
            "fields": [{"self": {"args": {"prefix": 5}, "fields": ["id", "title"]}}]
        })))
        .await;

    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));
    let error = &response.errors.as_ref().expect("errors")[0];
    assert!(error.message.contains("prefix"), "message was: {}", error.message);
    assert_eq!(error.path, vec!["self".to_string(), "prefix".to_string()]);
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn structured_calculation_carries_arguments_into_the_plan() {
    let executor = RecordingExecutor::returning(record(json!({
        "self": {"id": "1", "title": "x: T"},
        "excerpt": "short"
    })));
    let response = pipeline(&executor)
        .run(&request(json!({
            "action": "getPost",
            "fields": [{"self": {"args": {"prefix": "x"}, "fields": ["id", "title"]}}, "excerpt"]
        })))
        .await;

    assert_eq!(data(&response), &json!({"self": {"id": "1", "title": "x: T"}, "excerpt": "short"}));
    assert_eq!(
        executor.last_plan(),
        json!({
            "select": [],
            "load": [
                {"field": "self", "arguments": {"prefix": "x"}, "plan": {"select": ["id", "title"], "load": []}},
                {"field": "excerpt", "arguments": {"max_length": 80}}
            ]
        })
    );
}

#[tokio::test]
async fn paginated_results_keep_envelope_metadata() {
    let executor = RecordingExecutor::returning(RawValue::Page(RawPage {
        records: vec![
            record_from_map(json!({"id": "1", "title": "A", "status": "draft"}).as_object().cloned().unwrap_or_default()),
            record_from_map(json!({"id": "2", "title": "B", "status": "published"}).as_object().cloned().unwrap_or_default()),
        ],
        meta: PageMeta::Offset {
            limit: 2,
            offset: 0,
            has_more: true,
            count: None,
        },
    }));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "listPosts", "fields": ["id", "title"], "page": {"limit": 2}})))
        .await;

    assert_eq!(
        data(&response),
        &json!({"results": [{"id": "1", "title": "A"}, {"id": "2", "title": "B"}], "limit": 2, "offset": 0, "hasMore": true})
    );
    assert_eq!(executor.last_input().page.and_then(|page| page.limit), Some(2));
}

#[tokio::test]
async fn keyset_pages_render_cursors() {
    let executor = RecordingExecutor::returning(RawValue::Page(RawPage {
        records: Vec::new(),
        meta: PageMeta::Keyset {
            limit: 20,
            after: Some("c1".into()),
            before: None,
            has_more: false,
            count: None,
            previous_page: Some("c0".into()),
            next_page: None,
        },
    }));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "listPosts", "fields": ["id"], "page": {"after": "c1"}})))
        .await;
    assert_eq!(
        data(&response),
        &json!({"results": [], "limit": 20, "after": "c1", "hasMore": false, "previousPage": "c0"})
    );
}

#[tokio::test]
async fn output_keys_equal_requested_keys() {
    let executor = RecordingExecutor::returning(record(json!({
        "id": "1",
        "title": "T",
        "created_at": "2024-01-01T00:00:00Z",
        "status": "draft",
        "comment_count": 4,
        "tags": ["rust"]
    })));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "getPost", "fields": ["createdAt", "commentCount", "tags"]})))
        .await;

    let keys: Vec<_> = data(&response).as_object().expect("object").keys().cloned().collect();
    assert_eq!(keys, vec!["createdAt", "commentCount", "tags"]);
}

#[tokio::test]
async fn unknown_nested_field_rejects_the_whole_request() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let response = pipeline(&executor)
        .run(&request(json!({
            "action": "listRecentPosts",
            "fields": ["id", {"comments": ["body", {"author": ["nickname"]}]}]
        })))
        .await;

    assert_eq!(response.error_kind(), Some(ErrorKind::UnknownField));
    assert_eq!(
        response.errors.as_ref().map(|errors| errors[0].path.clone()),
        Some(vec!["comments".to_string(), "author".to_string(), "nickname".to_string()])
    );
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn empty_collections_stay_arrays_and_unfetched_ones_are_null() {
    let executor = RecordingExecutor::returning(RawValue::RecordList(vec![
        record_from_map(json!({"id": "1", "comments": [], "commenter_names": []}).as_object().cloned().unwrap_or_default()),
        record_from_map(json!({"id": "2"}).as_object().cloned().unwrap_or_default()),
    ]));
    let response = pipeline(&executor)
        .run(&request(json!({"action": "listRecentPosts", "fields": ["id", {"comments": ["body"]}, "commenterNames"]})))
        .await;

    assert_eq!(
        data(&response),
        &json!([
            {"id": "1", "comments": [], "commenterNames": []},
            {"id": "2", "comments": null, "commenterNames": null}
        ])
    );
}

#[tokio::test]
async fn embedded_transforms_reshape_values() {
    let executor = RecordingExecutor::returning(record(json!({
        "location": {"label": "HQ", "coordinates": [52.52, 13.405]},
        "attachments": [{"kind": "file", "url": "b.pdf", "size_bytes": 1024}]
    })));
    let response = pipeline(&executor)
        .run(&request(json!({
            "action": "getPost",
            "fields": [{"location": ["label", "coordinates"]}, {"attachments": [{"file": ["sizeBytes"]}]}]
        })))
        .await;
    assert_eq!(
        data(&response),
        &json!({
            "location": {"label": "HQ", "coordinates": {"latitude": 52.52, "longitude": 13.405}},
            "attachments": [{"file": {"sizeBytes": "1024"}}]
        })
    );
}

#[tokio::test]
async fn denied_loads_are_rejected_for_the_action() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let response = pipeline(&executor)
        .run(&request(json!({"action": "listPosts", "fields": [{"user": [{"posts": ["id"]}]}]})))
        .await;
    assert_eq!(response.error_kind(), Some(ErrorKind::LoadDenied));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn create_input_is_cast_to_source_names() {
    let executor = RecordingExecutor::returning(record(json!({"id": "9", "status": "draft"})));
    let pipeline = pipeline(&executor);

    let response = pipeline
        .run(&request(json!({"action": "createPost", "input": {"title": "Hello"}, "fields": ["id", "status"]})))
        .await;
    assert_eq!(data(&response), &json!({"id": "9", "status": "draft"}));
    assert_eq!(Value::Object(executor.last_input().input), json!({"title": "Hello", "status": "draft"}));

    let response = pipeline
        .run(&request(json!({"action": "createPost", "input": {"title": null}, "fields": ["id"]})))
        .await;
    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));
    assert_eq!(response.errors.as_ref().map(|errors| errors[0].path.clone()), Some(vec!["input".to_string(), "title".to_string()]));
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn destroy_and_passthrough_actions() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let response = pipeline(&executor).run(&request(json!({"action": "destroyPost", "identity": "1"}))).await;
    assert_eq!(data(&response), &json!({}));
    assert_eq!(executor.last_input().identity, Some(json!("1")));

    let executor = RecordingExecutor::returning(RawValue::Map(json!({"drafts": 3, "published": 7})));
    let response = pipeline(&executor).run(&request(json!({"action": "postStats"}))).await;
    assert_eq!(data(&response), &json!({"drafts": 3, "published": 7}));
}

#[tokio::test]
async fn repeated_runs_produce_identical_responses() {
    let executor = RecordingExecutor::returning(record(json!({
        "id": "1",
        "content": {"type": "note", "value": "plain"},
        "comments": [{"body": "first", "author": {"name": "Ann"}}]
    })));
    let pipeline = pipeline(&executor);
    let client_request = request(json!({
        "action": "getPost",
        "fields": ["id", {"content": ["note"]}, {"comments": ["body", {"author": ["name"]}]}]
    }));

    let first = pipeline.run(&client_request).await;
    let second = pipeline.run(&client_request).await;
    assert_eq!(first, second);
    assert_eq!(
        data(&first),
        &json!({"id": "1", "content": {"note": "plain"}, "comments": [{"body": "first", "author": {"name": "Ann"}}]})
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_pipeline() {
    let executor = RecordingExecutor::returning(record(json!({"id": "1", "title": "T", "user": {"id": "u1", "name": "Bob"}})));
    let pipeline = Arc::new(pipeline(&executor));

    let mut handles = Vec::new();
    for index in 0..16 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            let fields = if index % 2 == 0 { json!(["id"]) } else { json!(["title", {"user": ["name"]}]) };
            let response = pipeline.run(&request(json!({"action": "getPost", "fields": fields}))).await;
            (index, response)
        }));
    }

    for handle in handles {
        let (index, response) = handle.await.expect("task");
        let expected = if index % 2 == 0 { json!({"id": "1"}) } else { json!({"title": "T", "user": {"name": "Bob"}}) };
        assert_eq!(data(&response), &expected);
    }
    assert_eq!(executor.calls(), 16);
}

#[test]
fn validation_never_reaches_the_executor() {
    let executor = RecordingExecutor::returning(RawValue::Empty);
    let pipeline = pipeline(&executor);
    assert!(pipeline.validate(&request(json!({"action": "getPost", "fields": ["id"]}))).success);
    let response = pipeline.validate(&request(json!({"action": "getPost", "fields": [{"content": ["video"]}]})));
    assert_eq!(response.error_kind(), Some(ErrorKind::UnknownUnionMember));
    assert_eq!(executor.calls(), 0);
}
