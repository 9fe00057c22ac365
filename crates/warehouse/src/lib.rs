pub mod csv_fallback;
pub mod manager;
pub mod repository;
pub mod snapshot;
pub mod types;

pub use manager::DataManager;
pub use repository::{PostgresWarehouseRepository, WarehouseRepository, MAX_HISTORY_DAYS};
pub use snapshot::{
    CustomerHistorySnapshot, DemandForecastSnapshot, DemandHistorySnapshot, JourneyPlanSnapshot, Snapshots,
    SnapshotRowCounts,
};
pub use types::{CustomerId, ForecastRow, Item, ItemId, JourneyEntry, LoadingStatus, RouteId, SalesFact};
