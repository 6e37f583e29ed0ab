use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use action_token_cell::handlers::ActionState;
use action_token_cell::{ActionTokenRegistry, SupabaseActionTokenStore};
use appointment_cell::handlers::AppointmentState;
use appointment_cell::{
    AppointmentLifecycleService, HttpMailNotifier, ReminderDispatch, SupabaseAppointmentStore,
    SupabaseContactStore,
};
use reminder_cell::{
    RedisJobScheduler, ReminderCoordinator, ReminderWorker, SupabaseReminderStore, WorkerConfig,
    REMINDER_QUEUE,
};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::time::{parse_zone, SystemClock};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Atelier Booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    let reference_tz = parse_zone(&config.reference_timezone).unwrap_or_else(|_| {
        warn!(
            "Unknown reference timezone '{}', falling back to Europe/Paris",
            config.reference_timezone
        );
        chrono_tz::Europe::Paris
    });

    // Shared collaborators
    let supabase = Arc::new(SupabaseClient::new(&config));
    let clock = Arc::new(SystemClock);

    let contact_store = Arc::new(SupabaseContactStore::new(supabase.clone()));
    let appointment_store = Arc::new(SupabaseAppointmentStore::new(supabase.clone()));
    let reminder_store = Arc::new(SupabaseReminderStore::new(supabase.clone()));
    let token_store = Arc::new(SupabaseActionTokenStore::new(supabase.clone()));

    // Durable delayed-job scheduler; the reminder invariant depends on it
    let scheduler = Arc::new(
        RedisJobScheduler::new(&config)
            .await
            .expect("Redis job scheduler is required"),
    );

    let coordinator = Arc::new(ReminderCoordinator::new(
        scheduler.clone(),
        reminder_store.clone(),
        clock.clone(),
    ));

    let notifier = Arc::new(HttpMailNotifier::new(&config));
    let dispatch = Arc::new(ReminderDispatch::new(
        appointment_store.clone(),
        reminder_store.clone(),
        notifier.clone(),
        clock.clone(),
        reference_tz,
    ));

    let registry = Arc::new(ActionTokenRegistry::new(token_store, clock.clone()));

    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        &config,
        appointment_store,
        contact_store,
        coordinator,
        dispatch.clone(),
        notifier,
        registry.clone(),
        clock,
    ));

    // Reminder worker consuming due jobs
    let mut worker = ReminderWorker::new(scheduler, WorkerConfig::default());
    worker.register(REMINDER_QUEUE, dispatch);
    let worker = Arc::new(worker);
    tokio::spawn({
        let worker = worker.clone();
        async move {
            if let Err(e) = worker.start().await {
                tracing::error!("Reminder worker stopped: {}", e);
            }
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Route states
    let appointment_state = Arc::new(AppointmentState {
        config: config.clone(),
        lifecycle: lifecycle.clone(),
    });
    let action_state = Arc::new(ActionState {
        config: config.clone(),
        registry,
        lifecycle,
    });

    // Build the application router
    let app = router::create_router(appointment_state, action_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
