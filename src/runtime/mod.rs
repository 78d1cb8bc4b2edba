//! Request/response surface for transport adapters.

pub mod api;

pub use api::{
    parse_duration, parse_request, DistributionResponse, EnqueueRequest, ErrorResponse,
    OkResponse, ReprioritizeResponse,
};
