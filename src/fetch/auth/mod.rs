mod api_key;

pub use api_key::{ApiKey, ApiKeyError, WEATHER_KEY_HEADER};
