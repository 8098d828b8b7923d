pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{is_data_uri, is_network_url, local_path_for, normalize_base_url, resolve_url};
