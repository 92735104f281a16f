use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use super::http_server::AppState;

pub async fn start_reconciler(state: web::Data<AppState>) -> impl Responder {
    state.node.reconciler().start().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Schema reconciler started"
    }))
}

pub async fn stop_reconciler(state: web::Data<AppState>) -> impl Responder {
    state.node.reconciler().stop().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Schema reconciler stopped"
    }))
}

pub async fn force_update(state: web::Data<AppState>) -> impl Responder {
    match state.node.reconciler().force_update().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Schema update completed"
        })),
        Err(e) => {
            log::error!("Forced schema update failed: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}

pub async fn reconciler_status(state: web::Data<AppState>) -> impl Responder {
    let status = state.node.reconciler().status().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "isRunning": status.is_running,
            "lastUpdate": status.last_update,
            "updateInterval": status.update_interval_secs,
            "nextUpdate": status.next_update,
        }
    }))
}
