use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer as ActixHttpServer};
use log::info;

use super::{cron_routes, crud_routes, schema_routes, RecordBaseNode};
use crate::error::{RecordBaseError, RecordBaseResult};

/// Shared application state for the HTTP server.
pub struct AppState {
    /// The RecordBase node
    pub node: Arc<RecordBaseNode>,
}

/// HTTP server for a RecordBase node.
///
/// Exposes the generic per-collection CRUD surface, the schema
/// management endpoints, the compiled schema document and the
/// reconciler controls as a REST API.
pub struct RecordBaseHttpServer {
    node: Arc<RecordBaseNode>,
    bind_address: String,
}

impl RecordBaseHttpServer {
    pub fn new(node: Arc<RecordBaseNode>, bind_address: &str) -> Self {
        Self {
            node,
            bind_address: bind_address.to_string(),
        }
    }

    /// Run the HTTP server until the process is stopped.
    ///
    /// Route registration order matters: the literal `/schema`,
    /// `/tables`, `/relationships` and `/cron` resources must precede
    /// the generic `/{collection}` routes, and `/{collection}/stats`
    /// must precede `/{collection}/{id}`.
    pub async fn run(&self) -> RecordBaseResult<()> {
        info!("HTTP server running on {}", self.bind_address);

        let app_state = web::Data::new(AppState {
            node: self.node.clone(),
        });

        let server = ActixHttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new().wrap(cors).app_data(app_state.clone()).service(
                web::scope("/api")
                    // Compiled schema document
                    .route("/schema", web::get().to(schema_routes::get_compiled_schema))
                    .route(
                        "/schema/{collection}",
                        web::get().to(schema_routes::get_compiled_table),
                    )
                    // Schema management: tables and fields
                    .route("/tables", web::post().to(schema_routes::create_table))
                    .route("/tables", web::get().to(schema_routes::list_tables))
                    .route("/tables/{name}", web::put().to(schema_routes::update_table))
                    .route(
                        "/tables/{name}",
                        web::delete().to(schema_routes::delete_table),
                    )
                    .route(
                        "/tables/{name}/fields",
                        web::post().to(schema_routes::create_field),
                    )
                    .route(
                        "/tables/{name}/fields",
                        web::get().to(schema_routes::list_fields),
                    )
                    .route(
                        "/tables/{name}/fields/{field}",
                        web::put().to(schema_routes::update_field),
                    )
                    .route(
                        "/tables/{name}/fields/{field}",
                        web::delete().to(schema_routes::delete_field),
                    )
                    // Schema management: permissions and relationships
                    .route(
                        "/tables/{name}/permissions",
                        web::get().to(schema_routes::list_permissions),
                    )
                    .route(
                        "/tables/{name}/permissions/{role}",
                        web::put().to(schema_routes::set_permission),
                    )
                    .route(
                        "/tables/{name}/permissions/{role}",
                        web::delete().to(schema_routes::delete_permission),
                    )
                    .route(
                        "/relationships",
                        web::post().to(schema_routes::create_relationship),
                    )
                    .route(
                        "/relationships",
                        web::get().to(schema_routes::list_relationships),
                    )
                    .route(
                        "/relationships/{id}",
                        web::delete().to(schema_routes::delete_relationship),
                    )
                    // Reconciler controls
                    .service(
                        web::scope("/cron")
                            .route("/start", web::post().to(cron_routes::start_reconciler))
                            .route("/stop", web::post().to(cron_routes::stop_reconciler))
                            .route(
                                "/force-update",
                                web::post().to(cron_routes::force_update),
                            )
                            .route("/status", web::get().to(cron_routes::reconciler_status)),
                    )
                    // Generic collection CRUD, most general last
                    .route(
                        "/{collection}/stats",
                        web::get().to(crud_routes::collection_stats),
                    )
                    .route("/{collection}", web::post().to(crud_routes::create_record))
                    .route("/{collection}", web::get().to(crud_routes::list_records))
                    .route(
                        "/{collection}/{id}",
                        web::get().to(crud_routes::get_record),
                    )
                    .route(
                        "/{collection}/{id}",
                        web::put().to(crud_routes::update_record),
                    )
                    .route(
                        "/{collection}/{id}",
                        web::delete().to(crud_routes::delete_record),
                    ),
            )
        })
        .bind(&self.bind_address)
        .map_err(|e| RecordBaseError::Server(format!("Failed to bind HTTP server: {}", e)))?
        .run();

        server
            .await
            .map_err(|e| RecordBaseError::Server(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}
