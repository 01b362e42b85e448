//! Resolver module: one candidate in, one outcome out
//!
//! This module contains:
//! - The transport boundary (`Transport`) and its reqwest implementation
//! - The response classifier state machine
//! - Destination extraction from the warning interstitial

mod classifier;
mod extractor;
mod transport;

pub use classifier::{Resolution, ResponseClassifier};
pub use extractor::{Extraction, InterstitialExtractor};
pub use transport::{build_http_client, HttpResponse, ReqwestTransport, Transport, TransportError};
