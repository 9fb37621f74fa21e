//! Option chain endpoint.

use url::Url;

use crate::chain::OptionChain;
use crate::client::SessionClient;
use crate::error::Result;
use crate::types::enums::Underlying;
use crate::types::response::ChainResponse;

impl SessionClient {
    /// Fetch and validate the raw option chain response for `symbol`.
    ///
    /// **Endpoint:** `GET /api/option-chain-indices?symbol={symbol}`
    pub async fn fetch_option_chain_response(&mut self, symbol: &str) -> Result<ChainResponse> {
        let url = Url::parse_with_params(&self.config().option_chain_url, &[("symbol", symbol)])?;
        let body = self.fetch(url.as_str()).await?;
        ChainResponse::from_slice(symbol, &body)
    }

    /// Fetch the chain of one expiry.
    ///
    /// The strike step comes from [`Underlying`] for known indices and is
    /// inferred from the listed strikes otherwise.
    pub async fn fetch_option_chain(
        &mut self,
        symbol: &str,
        expiry_date: &str,
    ) -> Result<OptionChain> {
        let response = self.fetch_option_chain_response(symbol).await?;
        let mut chain = response.get_expiry_view(symbol, expiry_date)?;
        let step = Underlying::from_symbol(symbol)
            .map(Underlying::strike_step)
            .or_else(|| chain.infer_strike_step());
        match step {
            Some(step) => chain.set_strike_step(step),
            None => tracing::warn!(symbol, "no strike step known or inferable"),
        }
        Ok(chain)
    }

    /// Fetch the chain of one expiry of a known index.
    pub async fn fetch_index_chain(
        &mut self,
        underlying: Underlying,
        expiry_date: &str,
    ) -> Result<OptionChain> {
        self.fetch_option_chain(underlying.symbol(), expiry_date).await
    }
}
