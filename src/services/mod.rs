pub mod api_client;
pub mod ceparium;

pub use api_client::ApiClient;
pub use ceparium::CepariumService;
