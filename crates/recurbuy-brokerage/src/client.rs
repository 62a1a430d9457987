//! REST client for the brokerage API.
//!
//! Every request carries `Authorization: Bearer <token>` with a token minted for
//! exactly that method and path (see [`RequestSigner`]).

use std::time::Duration;

use recurbuy_core::{AccountBalance, MarketBuyOrder};
use reqwest::{Client, Method, Url};
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, BrokerageGateway, OrderAck};
use crate::signer::RequestSigner;
use crate::wire::{AccountsResponse, CreateOrderRequest, CreateOrderResponse};

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.coinbase.com/api/v3/brokerage";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Accounts page size.
const ACCOUNTS_PAGE_LIMIT: u32 = 250;

/// Upper bound on followed account pages.
const MAX_ACCOUNT_PAGES: usize = 20;

/// Brokerage REST client.
pub struct BrokerageClient {
    client: Client,
    base_url: Url,
    signer: RequestSigner,
}

impl BrokerageClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - API base including the path prefix (e.g. [`DEFAULT_API_BASE`])
    /// * `signer` - per-request token signer
    /// * `timeout` - transport timeout per request
    pub fn new(base_url: &str, signer: RequestSigner, timeout: Duration) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.host_str().is_none() {
            return Err(GatewayError::InvalidBaseUrl(format!(
                "{base_url}: missing host"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            signer,
        })
    }

    /// Full URL of `endpoint` below the base path.
    fn endpoint_url(&self, endpoint: &str) -> GatewayResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| GatewayError::InvalidBaseUrl(format!("{joined}: {e}")))
    }

    /// `"<host>[:port]<path>"` as bound into the token's `uri` claim. Query excluded.
    fn host_path(url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{host}:{port}{}", url.path()),
            None => format!("{host}{}", url.path()),
        }
    }

    /// Mint a token and build an authorized request. Fails before any I/O.
    fn authorized(&self, method: Method, url: Url) -> GatewayResult<reqwest::RequestBuilder> {
        let token = self.signer.mint(method.as_str(), &Self::host_path(&url))?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> GatewayResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Follow account pages until `currency` is found.
    pub async fn fetch_available_balance(&self, currency: &str) -> GatewayResult<AccountBalance> {
        let mut cursor: Option<String> = None;

        for page in 0..MAX_ACCOUNT_PAGES {
            let mut url = self.endpoint_url("accounts")?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("limit", &ACCOUNTS_PAGE_LIMIT.to_string());
                if let Some(cursor) = cursor.as_deref() {
                    query.append_pair("cursor", cursor);
                }
            }

            let request = self.authorized(Method::GET, url)?;
            let response = self.send_checked(request).await?;
            let body: AccountsResponse = response.json().await.map_err(|e| {
                GatewayError::InvalidResponse(format!("Failed to parse accounts: {e}"))
            })?;

            debug!(page, accounts = body.accounts.len(), "Accounts page received");

            if let Some(account) = body
                .accounts
                .iter()
                .find(|a| a.currency.eq_ignore_ascii_case(currency))
            {
                return Ok(AccountBalance {
                    currency: account.currency.clone(),
                    available: account.available_balance.value,
                });
            }

            match body.cursor.filter(|c| body.has_next && !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        warn!(currency, "Currency not present in brokerage accounts");
        Err(GatewayError::CurrencyNotFound(currency.to_string()))
    }

    /// Submit one market IOC buy.
    pub async fn create_market_buy(&self, order: &MarketBuyOrder) -> GatewayResult<OrderAck> {
        let url = self.endpoint_url("orders")?;
        let payload = CreateOrderRequest::from(order);
        let request = self.authorized(Method::POST, url)?.json(&payload);

        let response = self.send_checked(request).await?;
        let body: CreateOrderResponse = response.json().await.map_err(|e| {
            GatewayError::InvalidResponse(format!("Failed to parse order response: {e}"))
        })?;

        if !body.success {
            let rejection = body.error_response.unwrap_or_default();
            warn!(
                product_id = %order.product_id,
                client_order_id = %order.client_order_id,
                error = %rejection.error,
                "Order rejected by brokerage"
            );
            return Err(GatewayError::OrderRejected(rejection));
        }

        let order_id = body.order_id();
        info!(
            product_id = %order.product_id,
            client_order_id = %order.client_order_id,
            order_id = ?order_id,
            quote_size = %order.quote_size,
            "Order accepted"
        );

        Ok(OrderAck {
            client_order_id: order.client_order_id.clone(),
            order_id,
        })
    }
}

impl BrokerageGateway for BrokerageClient {
    fn available_balance<'a>(
        &'a self,
        currency: &'a str,
    ) -> BoxFuture<'a, GatewayResult<AccountBalance>> {
        Box::pin(self.fetch_available_balance(currency))
    }

    fn place_market_buy<'a>(
        &'a self,
        order: &'a MarketBuyOrder,
    ) -> BoxFuture<'a, GatewayResult<OrderAck>> {
        Box::pin(self.create_market_buy(order))
    }
}
