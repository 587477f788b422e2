//! 設定管理
//!
//! デフォルト値 → TOMLファイル → 環境変数の順に重ねて読み込む。

pub mod loader;
pub mod types;

pub use loader::{sample_config, write_sample_config, ConfigLoader, BIND_ADDR_ENV, ENV_PREFIX};
pub use types::{AppConfig, HistoryConfig, ServerConfig};
