use geoweather_core::{Address, LookupResult};
use serde::Serialize;

/// `{ "code": "bad_request", "message": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub hit: bool,
    pub age: Option<u64>,
}

/// Shape printed to stdout for every lookup.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    /// `null` on success.
    pub errors: Option<Vec<ErrorBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheInfo>,
}

pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
pub const BAD_REQUEST: &str = "bad_request";

impl Envelope<Vec<Address>> {
    /// Address search never fails; nothing found is an empty list.
    pub fn addresses(addresses: Vec<Address>) -> Self {
        Self { data: Some(addresses), errors: None, cache: None }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn from_lookup(result: LookupResult<T>) -> Self {
        let cache = Some(CacheInfo { hit: result.cache_hit, age: result.cache_age });
        match result.data {
            Some(data) => Self { data: Some(data), errors: None, cache },
            None => Self {
                data: None,
                errors: Some(vec![ErrorBody {
                    code: INTERNAL_SERVER_ERROR,
                    message: result.error.unwrap_or_else(|| "Service unavailable".to_string()),
                }]),
                cache,
            },
        }
    }

    pub fn invalid(message: String) -> Self {
        Self { data: None, errors: Some(vec![ErrorBody { code: BAD_REQUEST, message }]), cache: None }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }
}
