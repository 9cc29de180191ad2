use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ims_auth::SigningKey;
use ims_config::Config;
use ims_directory::yaml::YamlDirectory;
use ims_events::NotificationBus;
use ims_store::memory::InMemoryStore;

#[tokio::main]
async fn main() {
    ims_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let admins: HashSet<String> = std::env::var("IMS_ADMINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let bus = Arc::new(NotificationBus::new());
    let store: Arc<dyn ims_store::Store> = Arc::new(InMemoryStore::new(bus.clone()));

    let directory = match std::env::var("IMS_PERSONNEL_FILE") {
        Ok(path) => {
            Arc::new(YamlDirectory::new(path, Duration::from_secs(60))) as Arc<dyn ims_directory::PersonnelDirectory>
        }
        Err(_) => {
            tracing::warn!("IMS_PERSONNEL_FILE not set; starting with an empty directory");
            Arc::new(ims_directory::in_memory::InMemoryDirectory::new())
        }
    };

    let mut config = Config::new(
        store,
        directory,
        Arc::new(SigningKey::hs256(jwt_secret)),
        bus,
        "0.0.0.0",
        8080,
        admins,
    );
    if let Ok(master_key) = std::env::var("IMS_MASTER_KEY") {
        config = config.with_master_key(master_key);
    }
    let config = Arc::new(config);

    let app = ims_api::app::build_app(config.clone());

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .expect("failed to bind listen address");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
