//! Request and response models for the store server API

mod requests;
mod responses;

pub use requests::{validate_key, ExpireQuery, KeyQuery, PopQuery, PushQuery, SetQuery};
pub use responses::{
    ErrorResponse, ExpireResponse, HealthResponse, PushResponse, RemoveResponse, StatsResponse,
    WriteResponse,
};
