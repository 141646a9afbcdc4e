pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod routes;
pub mod state;
pub mod url_ext;

pub mod crypto {
    pub mod aes;
    pub mod protector;
}

pub mod models {
    pub mod account;
    pub mod feature_toggle;
}

pub mod pocket {
    pub mod client;
    pub mod error;
    pub mod models;

    pub use error::PocketError;
}

pub mod repositories {
    pub mod account;
}

pub mod services {
    pub mod pocket;
}

pub mod handlers {
    pub mod pocket;
    pub mod toggles;
}

pub mod middleware_layer {
    pub mod https;
    pub mod rate_limit;
}

pub mod validation {
    pub mod params;
}
