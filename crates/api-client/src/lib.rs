use crate::error::{Fault, SimulationFailure};
use crate::request::{build_request, BuiltRequest, DEFAULT_TIMEOUT, SIMULATE_PATH};
use crate::stream::StreamingCall;
use async_trait::async_trait;
use configuration::VaultConfig;
use core_types::SimulationRequest;
use std::time::Duration;

mod auth;
pub mod error;
pub mod request;
pub mod responses;
pub mod stream;
// --- Public API ---
pub use auth::{format_timeout, AUTH_TOKEN_HEADER, TIMEOUT_HEADER};
pub use responses::{Balance, ResponseRecord, SimulationResult};

/// The interface for submitting simulations.
/// Scenario code is written against this trait so that the concrete client can be
/// swapped for a fake in tests.
#[async_trait]
pub trait SimulationApi: Send + Sync {
    /// Runs a simulation and returns every record the service streamed back,
    /// in emission order.
    async fn simulate_contracts(
        &self,
        request: &SimulationRequest,
    ) -> Result<Vec<ResponseRecord>, SimulationFailure>;
}

/// Client for the core API's contract simulation endpoint.
///
/// Holds nothing but the base URL, token, and timeout hint, so one instance can
/// be cloned and used from several tasks at once; each call opens its own
/// connection. No deadline is enforced locally.
#[derive(Clone)]
pub struct VaultClient {
    client: reqwest::Client,
    core_api_url: String,
    auth_token: String,
    timeout: Duration,
}

impl VaultClient {
    /// Creates a client. Both values are required; trailing slashes on the URL are dropped.
    pub fn new(core_api_url: &str, auth_token: &str) -> Result<Self, Fault> {
        let core_api_url = core_api_url.trim().trim_end_matches('/');
        if core_api_url.is_empty() {
            return Err(Fault::Configuration("core_api_url is required".to_string()));
        }
        if auth_token.trim().is_empty() {
            return Err(Fault::Configuration("auth_token is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Fault::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            core_api_url: core_api_url.to_string(),
            auth_token: auth_token.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Creates a client from a loaded configuration, validating it first.
    pub fn from_config(config: &VaultConfig) -> Result<Self, Fault> {
        config
            .validate()
            .map_err(|e| Fault::Configuration(e.to_string()))?;
        Ok(Self::new(&config.core_api_url, &config.auth_token)?.with_timeout(config.timeout()))
    }

    /// Sets the advisory timeout sent to the server with each call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn core_api_url(&self) -> &str {
        &self.core_api_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same as [`SimulationApi::simulate_contracts`] with a one-off timeout hint.
    pub async fn simulate_contracts_with_timeout(
        &self,
        request: &SimulationRequest,
        timeout: Duration,
    ) -> Result<Vec<ResponseRecord>, SimulationFailure> {
        let built = build_request(request, &self.auth_token, timeout)?;
        tracing::info!(
            contracts = request.smart_contracts.len(),
            instructions = request.instructions.len(),
            start = %built.body.start_timestamp,
            end = %built.body.end_timestamp,
            "Submitting simulation."
        );
        let records = self.send(built).await?;
        tracing::info!(records = records.len(), "Simulation finished.");
        Ok(records)
    }

    /// Sends a built request and reads the streamed response.
    pub async fn send(&self, built: BuiltRequest<'_>) -> Result<Vec<ResponseRecord>, SimulationFailure> {
        let url = format!("{}{}", self.core_api_url, SIMULATE_PATH);
        let mut call = StreamingCall::new();
        call.connecting();

        let response = match self
            .client
            .post(&url)
            .headers(built.headers)
            .json(&built.body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(call.fail(Fault::Transport(e))),
        };

        let status = response.status();
        tracing::debug!(%status, %url, "Simulation response headers received.");
        call.read(status, response.bytes_stream()).await
    }
}

#[async_trait]
impl SimulationApi for VaultClient {
    async fn simulate_contracts(
        &self,
        request: &SimulationRequest,
    ) -> Result<Vec<ResponseRecord>, SimulationFailure> {
        self.simulate_contracts_with_timeout(request, self.timeout).await
    }
}
