use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use vansales_core::WarehousePool;
use vansales_warehouse::DataManager;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub data_manager: Arc<DataManager>,
    pub warehouse_pool: WarehousePool,
}
