use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use super::http_server::AppState;
use crate::schema::types::{
    FieldDefinition, PermissionDefinition, RelationshipDefinition, SchemaError, TableDefinition,
};

fn schema_error_response(error: &SchemaError) -> HttpResponse {
    match error {
        SchemaError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "error": msg })),
        other => {
            HttpResponse::InternalServerError().json(json!({ "error": other.to_string() }))
        }
    }
}

// ========== COMPILED SCHEMA ==========

/// Serve the published artifact; if no cycle has run yet, compile once
/// so early readers see the current definitions.
pub async fn get_compiled_schema(state: web::Data<AppState>) -> impl Responder {
    let reconciler = state.node.reconciler();
    if reconciler.current().await.is_none() {
        if let Err(e) = reconciler.force_update().await {
            log::error!("On-demand schema compilation failed: {}", e);
            return schema_error_response(&e);
        }
    }
    HttpResponse::Ok().json(reconciler.current().await.unwrap_or_default())
}

pub async fn get_compiled_table(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let collection = path.into_inner();
    let reconciler = state.node.reconciler();
    if reconciler.current().await.is_none() {
        if let Err(e) = reconciler.force_update().await {
            log::error!("On-demand schema compilation failed: {}", e);
            return schema_error_response(&e);
        }
    }
    let document = reconciler.current().await.unwrap_or_default();
    match document.get(&collection) {
        Some(table) => HttpResponse::Ok().json(table),
        None => HttpResponse::NotFound()
            .json(json!({ "error": format!("Schema for '{}' not found", collection) })),
    }
}

// ========== TABLES ==========

pub async fn create_table(
    body: web::Json<TableDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.node.schema_store().create_table(body.into_inner()) {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => {
            log::error!("Failed to create table: {}", e);
            schema_error_response(&e)
        }
    }
}

pub async fn list_tables(state: web::Data<AppState>) -> impl Responder {
    match state.node.schema_store().list_tables() {
        Ok(tables) => HttpResponse::Ok().json(json!({ "success": true, "data": tables })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn update_table(
    path: web::Path<String>,
    body: web::Json<TableDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    let name = path.into_inner();
    match state
        .node
        .schema_store()
        .update_table(&name, body.into_inner())
    {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn delete_table(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let name = path.into_inner();
    match state.node.schema_store().delete_table(&name) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Table '{}' deleted", name)
        })),
        Err(e) => schema_error_response(&e),
    }
}

// ========== FIELDS ==========

pub async fn create_field(
    path: web::Path<String>,
    body: web::Json<FieldDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    let mut def = body.into_inner();
    def.table_name = path.into_inner();
    match state.node.schema_store().create_field(def) {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => {
            log::error!("Failed to create field: {}", e);
            schema_error_response(&e)
        }
    }
}

pub async fn list_fields(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let name = path.into_inner();
    match state.node.schema_store().list_fields(&name) {
        Ok(fields) => HttpResponse::Ok().json(json!({ "success": true, "data": fields })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn update_field(
    path: web::Path<(String, String)>,
    body: web::Json<FieldDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (table, field) = path.into_inner();
    match state
        .node
        .schema_store()
        .update_field(&table, &field, body.into_inner())
    {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn delete_field(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (table, field) = path.into_inner();
    match state.node.schema_store().delete_field(&table, &field) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Field '{}' deleted from '{}'", field, table)
        })),
        Err(e) => schema_error_response(&e),
    }
}

// ========== PERMISSIONS ==========

pub async fn set_permission(
    path: web::Path<(String, String)>,
    body: web::Json<PermissionDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (table, role) = path.into_inner();
    let mut def = body.into_inner();
    def.table_name = table;
    def.role = role;
    match state.node.schema_store().set_permission(def) {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn list_permissions(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let name = path.into_inner();
    match state.node.schema_store().list_permissions_for(&name) {
        Ok(perms) => HttpResponse::Ok().json(json!({ "success": true, "data": perms })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn delete_permission(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> impl Responder {
    let (table, role) = path.into_inner();
    match state.node.schema_store().delete_permission(&table, &role) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Permission for role '{}' deleted from '{}'", role, table)
        })),
        Err(e) => schema_error_response(&e),
    }
}

// ========== RELATIONSHIPS ==========

pub async fn create_relationship(
    body: web::Json<RelationshipDefinition>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state
        .node
        .schema_store()
        .create_relationship(body.into_inner())
    {
        Ok(def) => HttpResponse::Ok().json(json!({ "success": true, "data": def })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn list_relationships(state: web::Data<AppState>) -> impl Responder {
    match state.node.schema_store().list_relationships() {
        Ok(rels) => HttpResponse::Ok().json(json!({ "success": true, "data": rels })),
        Err(e) => schema_error_response(&e),
    }
}

pub async fn delete_relationship(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner();
    match state.node.schema_store().delete_relationship(&id) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Relationship '{}' deleted", id)
        })),
        Err(e) => schema_error_response(&e),
    }
}
