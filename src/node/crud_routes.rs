use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::http_server::AppState;
use crate::collections::{CrudError, ListParams};

/// Query parameters for the list endpoint, mirroring the REST contract
/// (`sortBy`/`sortOrder` arrive camel-cased).
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    sort_order: Option<String>,
}

impl From<ListQuery> for ListParams {
    fn from(query: ListQuery) -> Self {
        ListParams {
            page: query.page,
            limit: query.limit,
            search: query.search,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
        }
    }
}

/// Map a CRUD failure onto the REST status contract: not-found is 404,
/// everything else (validation included) surfaces as a generic server
/// error with the message in the envelope.
fn crud_error_response(error: &CrudError) -> HttpResponse {
    match error {
        CrudError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "error": msg })),
        other => {
            HttpResponse::InternalServerError().json(json!({ "error": other.to_string() }))
        }
    }
}

pub async fn create_record(
    path: web::Path<String>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> impl Responder {
    let collection = path.into_inner();
    let payload = match body.into_inner() {
        Value::Object(map) => map,
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Record body must be a JSON object" }))
        }
    };

    match state.node.crud().create(&collection, payload) {
        Ok(record) => {
            let id = record.get("id").cloned().unwrap_or(Value::Null);
            HttpResponse::Ok().json(json!({ "success": true, "data": record, "id": id }))
        }
        Err(e) => {
            log::error!("Failed to create record in '{}': {}", collection, e);
            crud_error_response(&e)
        }
    }
}

pub async fn list_records(
    path: web::Path<String>,
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let collection = path.into_inner();
    let params: ListParams = query.into_inner().into();

    match state.node.crud().list(&collection, &params) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            log::error!("Failed to list '{}': {}", collection, e);
            crud_error_response(&e)
        }
    }
}

pub async fn get_record(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (collection, id) = path.into_inner();
    match state.node.crud().get_by_id(&collection, &id) {
        Ok(record) => HttpResponse::Ok().json(json!({ "success": true, "data": record })),
        Err(e) => crud_error_response(&e),
    }
}

pub async fn update_record(
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (collection, id) = path.into_inner();
    let payload = match body.into_inner() {
        Value::Object(map) => map,
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Record body must be a JSON object" }))
        }
    };

    match state.node.crud().update(&collection, &id, payload) {
        Ok(record) => HttpResponse::Ok().json(json!({ "success": true, "data": record })),
        Err(e) => {
            log::error!("Failed to update record '{}' in '{}': {}", id, collection, e);
            crud_error_response(&e)
        }
    }
}

pub async fn delete_record(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (collection, id) = path.into_inner();
    match state.node.crud().delete(&collection, &id) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Record '{}' deleted", id)
        })),
        Err(e) => crud_error_response(&e),
    }
}

pub async fn collection_stats(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let collection = path.into_inner();
    match state.node.crud().stats(&collection) {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => crud_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeConfig, RecordBaseNode};
    use crate::schema::types::{FieldDefinition, FieldType, TableDefinition};
    use actix_web::{test, Responder};
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn state_with_products() -> (tempfile::TempDir, web::Data<AppState>) {
        let dir = tempdir().unwrap();
        let node = RecordBaseNode::new(NodeConfig::new(dir.path().to_path_buf())).unwrap();
        node.schema_store()
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        node.schema_store()
            .create_field(
                FieldDefinition::new("products", "name", FieldType::String, "Name").required(),
            )
            .unwrap();
        let state = web::Data::new(AppState {
            node: Arc::new(node),
        });
        (dir, state)
    }

    #[tokio::test]
    async fn create_rejects_non_object_body() {
        let (_dir, state) = state_with_products().await;
        let req = test::TestRequest::post().to_http_request();
        let resp = create_record(
            web::Path::from("products".to_string()),
            web::Json(serde_json::json!([1, 2, 3])),
            state,
        )
        .await
        .respond_to(&req);
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn validation_failure_maps_to_server_error() {
        let (_dir, state) = state_with_products().await;
        let req = test::TestRequest::post().to_http_request();
        let resp = create_record(
            web::Path::from("products".to_string()),
            web::Json(serde_json::json!({})),
            state,
        )
        .await
        .respond_to(&req);
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn missing_record_maps_to_not_found() {
        let (_dir, state) = state_with_products().await;
        let req = test::TestRequest::get().to_http_request();
        let resp = get_record(
            web::Path::from(("products".to_string(), "nope".to_string())),
            state,
        )
        .await
        .respond_to(&req);
        assert_eq!(resp.status(), 404);
    }
}
