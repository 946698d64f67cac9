use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use springwheel::prelude::*;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use validator::Validate;

const WIDGET_NOT_FOUND: ErrorCode = ErrorCode::new(40401, 404);

#[derive(Debug, Deserialize, Validate)]
struct NewWidget {
    #[validate(length(min = 1, max = 40, message = "must not be blank"))]
    name: String,
    #[validate(range(min = 1, max = 1000))]
    quantity: u32,
    #[validate(email)]
    owner: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Widget {
    id: u64,
    name: String,
    quantity: u32,
}

#[derive(Clone, Default)]
struct AppState {
    widgets: Arc<RwLock<BTreeMap<u64, Widget>>>,
    next_id: Arc<AtomicU64>,
}

struct WidgetController;
struct ReportController;

async fn create_widget(
    State(state): State<AppState>,
    Extension(args): Extension<ResolvedArguments>,
) -> Result<(StatusCode, Json<Widget>), WheelError> {
    let new = args
        .get::<NewWidget>("widget")
        .ok_or_else(|| anyhow::anyhow!("widget argument was not resolved"))?;
    let widget = Widget {
        id: state.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        name: new.name.clone(),
        quantity: new.quantity,
    };
    state.widgets.write().await.insert(widget.id, widget.clone());
    Ok((StatusCode::CREATED, Json(widget)))
}

async fn show_widget(
    State(state): State<AppState>,
    Extension(args): Extension<ResolvedArguments>,
) -> Result<Json<Widget>, WheelError> {
    let id = *args
        .get::<u64>("id")
        .ok_or_else(|| anyhow::anyhow!("id argument was not resolved"))?;
    state
        .widgets
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiException::new(WIDGET_NOT_FOUND, format!("widget {} not found", id)).into())
}

async fn search_widgets(
    State(state): State<AppState>,
    Extension(args): Extension<ResolvedArguments>,
) -> Json<Vec<Widget>> {
    let needle = args.get::<String>("q").cloned().unwrap_or_default();
    let widgets = state.widgets.read().await;
    Json(
        widgets
            .values()
            .filter(|widget| widget.name.contains(&needle))
            .cloned()
            .collect(),
    )
}

async fn export_report() -> Result<String, WheelError> {
    Err(anyhow::anyhow!("export backend unavailable").into())
}

fn router(config: &WebConfig) -> springwheel::Result<Router> {
    let binders = InitBinderRegistry::new().advice(|binder: &mut DataBinder| {
        binder.trim_strings(true);
    });
    let validation = ValidationInterceptor::from_config(ResolverRegistry::with_defaults(), binders, config);
    let interceptors = InterceptorRegistry::new()
        .add(LoggingInterceptor)
        .add(validation);

    let create = HandlerMethod::of::<WidgetController>("create")
        .param(MethodParameter::body::<NewWidget>("widget"))
        .param_check();
    let show = HandlerMethod::of::<WidgetController>("show")
        .param(MethodParameter::path::<u64>("id"))
        .param_check();
    let search = HandlerMethod::of::<WidgetController>("search")
        .param(
            MethodParameter::query::<String>("q")
                .optional()
                .constraint(ParameterConstraint::length(2, 40)),
        )
        .param_check();
    let export = HandlerMethod::of::<ReportController>("export");

    Ok(Router::new()
        .route(
            "/widgets",
            post(create_widget).layer(interceptors.layer(create)?),
        )
        .route(
            "/widgets/search",
            get(search_widgets).layer(interceptors.layer(search)?),
        )
        .route(
            "/widgets/{id}",
            get(show_widget).layer(interceptors.layer(show)?),
        )
        .route(
            "/reports/export",
            get(export_report).layer(interceptors.layer(export)?),
        )
        .with_state(AppState::default())
        .layer(ExceptionLayer::from_config(HttpExceptionFilter, config)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = ConfigService::new();
    let config = WebConfig::from_service(&settings);
    let app = router(&config)?;

    let host = settings.get("SPRINGWHEEL_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = settings.get_or("SPRINGWHEEL_PORT", 3000u16);
    let addr = format!("{}:{}", host, port);

    tracing::info!("widget server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
