pub mod art;
pub mod calendar;
pub mod clients;
pub mod common;
pub mod dashboard;
pub mod documents;
pub mod finance;
pub mod goals;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod reports;
pub mod users;

use crate::{
    cache::QueryCache,
    config::AppConfig,
    db::DbPool,
    services::{
        art::ArtService, calendar::CalendarService, client_import::ClientImportService,
        clients::ClientService, dashboards::DashboardService, documents::DocumentService,
        finance::FinanceService, goals::GoalService, inventory::InventoryService,
        order_workflow::OrderWorkflowService, orders::OrderService, reports::ReportService,
        storage::FileStorage, users::UserService,
    },
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub clients: Arc<ClientService>,
    pub client_import: Arc<ClientImportService>,
    pub orders: Arc<OrderService>,
    pub workflow: Arc<OrderWorkflowService>,
    pub art: Arc<ArtService>,
    pub documents: Arc<DocumentService>,
    pub inventory: Arc<InventoryService>,
    pub finance: Arc<FinanceService>,
    pub goals: Arc<GoalService>,
    pub reports: Arc<ReportService>,
    pub dashboards: Arc<DashboardService>,
    pub calendar: Arc<CalendarService>,
    pub cache: QueryCache,
}

impl AppServices {
    /// Wire every service over one pool, one query cache and one upload root.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let cache = QueryCache::in_memory(Duration::from_secs(config.dashboard_cache_ttl_secs));
        let storage = FileStorage::new(&config.upload_dir, config.max_upload_bytes);
        let max_page = config.max_page_size;

        let clients = ClientService::new(db_pool.clone(), max_page);
        let workflow = OrderWorkflowService::new(db_pool.clone(), cache.clone());
        let finance = FinanceService::new(db_pool.clone(), cache.clone(), max_page);

        Self {
            users: Arc::new(UserService::new(db_pool.clone())),
            client_import: Arc::new(ClientImportService::new(clients.clone())),
            clients: Arc::new(clients),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                cache.clone(),
                storage.clone(),
                max_page,
            )),
            art: Arc::new(ArtService::new(
                db_pool.clone(),
                storage.clone(),
                workflow.clone(),
            )),
            workflow: Arc::new(workflow),
            documents: Arc::new(DocumentService::new(db_pool.clone(), storage)),
            inventory: Arc::new(InventoryService::new(db_pool.clone(), cache.clone(), max_page)),
            goals: Arc::new(GoalService::new(db_pool.clone(), cache.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone(), cache.clone())),
            dashboards: Arc::new(DashboardService::new(
                db_pool.clone(),
                cache.clone(),
                finance.clone(),
            )),
            finance: Arc::new(finance),
            calendar: Arc::new(CalendarService::new(db_pool)),
            cache,
        }
    }
}
