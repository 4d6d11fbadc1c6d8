use actix_web::{web, App, HttpServer, HttpResponse, Result, HttpRequest, middleware};
use serde::Deserialize;
use tracing::{error, info};
use crate::error::OptimizeError;
use crate::lineup::{OptimizationRequest, OptimizationResponse, Optimizer};
use crate::parser::parse_pool;
use crate::provider::{Slate, SlateStore};

pub struct AppState {
    pub slates: SlateStore,
    pub optimizer: Optimizer,
    pub admin_password: String,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    games: Option<u32>,
}

/// Uploads carry the admin password in `X-Admin-Password`
fn authorized(req: &HttpRequest, state: &AppState) -> bool {
    req.headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .map(|p| p == state.admin_password)
        .unwrap_or(false)
}

// Pool CSV upload endpoint
async fn upload_pool(
    req: HttpRequest,
    scope: web::Path<String>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !authorized(&req, &state) {
        return Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    match parse_pool(&body[..]) {
        Ok(players) => {
            let count = players.len();
            let slate = Slate::new(players, query.games);
            let games = slate.games;
            if let Err(e) = state.slates.insert(&scope, slate) {
                error!(scope = %scope, error = %e, "failed to store slate");
                return Ok(HttpResponse::InternalServerError().json(serde_json::json!({"success": false, "error": "Failed to store pool"})));
            }
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!("Loaded {} players across {} games", count, games)
            })))
        }
        Err(e) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": format!("Failed to process CSV: {}", e)
        }))),
    }
}

// Pool summary endpoint
async fn get_pool(
    scope: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.slates.summary(&scope) {
        Ok(Some(summary)) => Ok(HttpResponse::Ok().json(summary)),
        Ok(None) => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No pool loaded for this scope"}))),
        Err(e) => {
            error!(scope = %scope, error = %e, "failed to read slate");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({"error": "Pool unavailable"})))
        }
    }
}

// Optimization endpoint; the search runs on the blocking pool
async fn optimize(
    req: web::Json<OptimizationRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = req.into_inner();
    info!(scope = %request.pool_scope_id, "optimization requested");

    let worker_state = state.clone();
    let response = web::block(move || worker_state.optimizer.run(&request, &worker_state.slates))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "optimization worker failed");
            OptimizationResponse::failure(&OptimizeError::UpstreamData(e.to_string()))
        });

    Ok(HttpResponse::Ok().json(response))
}

/// Registers the API routes on an app; shared by the server and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/optimize", web::post().to(optimize))
        .service(
            web::resource("/api/pool/{scope}")
                .route(web::get().to(get_pool))
                .route(web::post().to(upload_pool)),
        );
}

pub async fn start_server(port: u16, optimizer: Optimizer, admin_password: String) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        slates: SlateStore::new(),
        optimizer,
        admin_password,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use crate::config::OptimizerConfig;

    const POOL: &str = "\
id,name,team,position,salary,fppg
1,Catcher One,NYY,C,3000,8.0
2,Short Stop,BOS,SS,3500,9.0
3,Catcher Two,BOS,C,2500,6.0
";

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState {
            slates: SlateStore::new(),
            optimizer: Optimizer::new(OptimizerConfig::default()),
            admin_password: "secret".to_string(),
        })
    }

    #[actix_web::test]
    async fn upload_requires_password() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/pool/main")
            .set_payload(POOL)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn upload_checks_header_password() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/pool/main")
            .insert_header(("X-Admin-Password", "guess"))
            .set_payload(POOL)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({"password": "secret"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn upload_then_optimize() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/pool/main?games=1")
            .insert_header(("X-Admin-Password", "secret"))
            .set_payload(POOL)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/optimize")
            .set_json(serde_json::json!({
                "poolScopeId": "main",
                "slotRequirements": ["C", "SS"],
                "salaryCap": 7000
            }))
            .to_request();
        let body: OptimizationResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.success, "{}", body.message);
        assert_eq!(body.total_salary, Some(6500));
        let ids: Vec<String> = body.assignment.unwrap().into_iter().map(|a| a.player_id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[actix_web::test]
    async fn unknown_scope_is_generic_failure() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/optimize")
            .set_json(serde_json::json!({"poolScopeId": "nowhere"}))
            .to_request();
        let body: OptimizationResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!body.success);
        assert_eq!(body.error_kind.as_deref(), Some("UpstreamDataError"));

        let req = test::TestRequest::get().uri("/api/pool/nowhere").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
