//! Non-string parameter types survive client → router → handler.

use bytes::Bytes;
use http::{Request, StatusCode};
use rest_contracts::prelude::*;
use rest_contracts_test::InProcessTransport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Page {
    page: u32,
    tags: Vec<String>,
    draft: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Issue {
    year: u16,
    number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Filter {
    min_score: f64,
    ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u8>,
}

#[tokio::test]
async fn test_numeric_boolean_and_list_query_values_round_trip() {
    let api = Api::get()
        .query_parameters::<Page>()
        .returns::<Page>()
        .path("/typed/pages")
        .unwrap();

    let mut router = ApiRouter::new();
    router.implement(&api, |request: ApiRequest<QueryOnly<Get, Page>>| async move {
        Ok(Reply::ok(request.params))
    });
    let call = InProcessTransport::new(router).client_factory().request_fn(&api);

    for page in [
        Page {
            page: 2,
            tags: vec!["a".into()],
            draft: true,
        },
        Page {
            page: 0,
            tags: vec!["a".into(), "b".into()],
            draft: false,
        },
    ] {
        assert_eq!(call.call(&page).await.unwrap(), page);
    }
}

#[tokio::test]
async fn test_numeric_path_and_query_values_round_trip() {
    let api = Api::get()
        .path_parameters::<Issue>()
        .query_parameters::<Filter>()
        .returns::<(Issue, Filter)>()
        .path("/typed/issues/:year/:number")
        .unwrap();

    let mut router = ApiRouter::new();
    router.implement(
        &api,
        |request: ApiRequest<PathAndQuery<Get, Issue, Filter>>| async move {
            Ok(Reply::ok(request.params))
        },
    );
    let call = InProcessTransport::new(router).client_factory().request_fn(&api);

    let issue = Issue {
        year: 2024,
        number: 17,
    };
    let filter = Filter {
        min_score: 0.75,
        ids: vec![9],
        limit: Some(3),
    };
    let (echoed_issue, echoed_filter) = call.call((&issue, &filter)).await.unwrap();
    assert_eq!(echoed_issue, issue);
    assert_eq!(echoed_filter, filter);
}

#[tokio::test]
async fn test_unparseable_number_is_bad_request() {
    let api = Api::get()
        .query_parameters::<Page>()
        .returns::<Page>()
        .path("/typed/strict")
        .unwrap();

    let mut router = ApiRouter::new();
    router.implement(&api, |request: ApiRequest<QueryOnly<Get, Page>>| async move {
        Ok(Reply::ok(request.params))
    });

    let response = router
        .handle(
            Request::get("/typed/strict?page=two&tags=a&draft=")
                .body(Bytes::new())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert!(body["message"].as_str().unwrap().contains("two"), "{body}");
}
