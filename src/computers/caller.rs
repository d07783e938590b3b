//! Contract-call indirection
//!
//! Every on-chain read goes through a `ContractCaller`: an `eth_call` against
//! a JSON-RPC endpoint in production, a canned table in tests.

use alloy_primitives::{Address, Bytes};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use alloy_transport::{RpcError, TransportError, TransportErrorKind};
use eyre::{eyre, Report, Result};
use std::future::Future;
use tracing::trace;

use crate::retry::{is_rate_limit_message, RateLimited, RetryPolicy};

pub trait ContractCaller: Send + Sync {
    /// Execute a read-only call and return the raw return data
    fn call(&self, to: Address, calldata: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Encode `call`, send it to `to` and decode the typed return value
pub async fn read<C, T>(caller: &C, to: Address, call: T) -> Result<T::Return>
where
    C: ContractCaller,
    T: SolCall,
{
    let output = caller.call(to, call.abi_encode()).await?;
    T::abi_decode_returns(&output)
        .map_err(|e| eyre!("Failed to decode {} from {}: {}", T::SIGNATURE, to, e))
}

// ============================================
// RPC CALLER
// ============================================

/// `eth_call` over HTTP, retried when the endpoint rate limits us
#[derive(Clone)]
pub struct RpcCaller {
    provider: DynProvider,
    rpc_url: String,
    retry: RetryPolicy,
}

impl RpcCaller {
    pub fn new(rpc_url: &str, retry: RetryPolicy) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.parse()?)
            .erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            retry,
        })
    }
}

impl ContractCaller for RpcCaller {
    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let input = Bytes::from(calldata);

        self.retry
            .run(|attempt| {
                let tx = TransactionRequest::default()
                    .to(to)
                    .input(input.clone().into());
                async move {
                    trace!("eth_call {} on {} (attempt {})", to, self.rpc_url, attempt);
                    let result = self
                        .provider
                        .call(tx)
                        .await
                        .map_err(|e| classify_transport_error(&self.rpc_url, e))?;
                    Ok(result.to_vec())
                }
            })
            .await
    }
}

/// Turn a transport failure into `RateLimited` when the endpoint refused us
fn classify_transport_error(rpc_url: &str, err: TransportError) -> Report {
    let limited = match &err {
        RpcError::Transport(TransportErrorKind::HttpError(http)) => http.status == 429,
        RpcError::ErrorResp(payload) => {
            payload.code == 429 || is_rate_limit_message(&payload.message)
        }
        other => is_rate_limit_message(&other.to_string()),
    };

    if limited {
        Report::new(RateLimited::new(rpc_url.to_string()))
    } else {
        eyre!("eth_call failed: {}", err)
    }
}

// ============================================
// TEST DOUBLE
// ============================================
