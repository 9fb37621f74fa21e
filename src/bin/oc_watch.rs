//! Poll an NSE option chain and print the ranked strike window around ATM.
//!
//! # Usage
//!
//! ```sh
//! export NSE_SYMBOL="BANKNIFTY"        # default BANKNIFTY
//! export NSE_EXPIRY="01-Jun-2023"      # required
//! export NSE_WINDOW=16                 # strikes around ATM, default 16
//! export NSE_POLL_SECS=180             # default 180
//! export NSE_PARTICIPANT_DATE=2023-06-01   # optional: print participant OI once
//! cargo run --bin oc_watch --features cli
//! ```

use std::env;
use std::time::Duration;

use chrono::NaiveDate;
use nse_chain::client::{SessionClient, SessionConfig};
use nse_chain::ranking::{RankedView, RankingEngine};
use nse_chain::types::participants::find_client;
use nse_chain::types::ClientType;
use tokio_util::sync::CancellationToken;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> nse_chain::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let symbol = env::var("NSE_SYMBOL").unwrap_or_else(|_| "BANKNIFTY".to_owned());
    let expiry = env::var("NSE_EXPIRY").expect("set NSE_EXPIRY (e.g. 01-Jun-2023) before running");
    let window: usize = env_or("NSE_WINDOW", 16);
    let poll = Duration::from_secs(env_or("NSE_POLL_SECS", 180));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let mut client = SessionClient::with_cancellation(SessionConfig::default(), cancel.clone())?;

    if let Some(date) = env::var("NSE_PARTICIPANT_DATE")
        .ok()
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
    {
        let records = client.fetch_participant_oi(date).await?;
        for kind in [ClientType::Fii, ClientType::Dii, ClientType::Pro, ClientType::Client] {
            if let Some(r) = find_client(&records, kind) {
                println!(
                    "{:<8} fut idx net {:>10}  opt idx call net {:>10}  put net {:>10}",
                    kind.label(),
                    r.net_future_index_position(),
                    r.net_option_index_call_position(),
                    r.net_option_index_put_position()
                );
            }
        }
    }

    let engine = RankingEngine::default();
    while !cancel.is_cancelled() {
        match client.fetch_option_chain(&symbol, &expiry).await {
            Ok(chain) => {
                println!("==============================================");
                println!("Symbol            {}  {}", chain.symbol(), chain.timestamp());
                println!("Underlying Value  {:.2}", chain.underlying_value());
                println!("ATM Strike        {}", chain.atm_strike());
                println!("Total PCR         {:.3}", chain.pcr());
                println!("Total CE OI       {}", chain.total_call_oi());
                println!("Total PE OI       {}", chain.total_put_oi());
                println!("==============================================");
                let strikes = chain.atm_strikes(window);
                let view = engine.ranked_view(&chain.derive_sub_chain(&strikes), &strikes);
                print_table(&view);
            }
            Err(err) => tracing::error!(%err, %symbol, "cycle failed"),
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(poll) => {}
        }
    }

    println!("Done.");
    Ok(())
}

fn print_table(view: &RankedView) {
    print!(
        "{:>10} {:>10} {:>10} {:>10} | {:>8} | ",
        "CE LTP", "CE OI", "CE chgOI", "CE vol", "strike"
    );
    print!(
        "{:>10} {:>10} {:>10} {:>10} | ",
        "PE vol", "PE chgOI", "PE OI", "PE LTP"
    );
    println!(
        "{:>6} {:>6} {:>6} | {:>6} {:>6}",
        "PCR", "PCRv", "PCRc", "CE_R", "PE_R"
    );
    for row in &view.rows {
        let ce = row.call.unwrap_or_default();
        let pe = row.put.unwrap_or_default();
        let atm = if row.strike == view.atm_strike { '*' } else { ' ' };
        let mark = |w: f64| if view.is_top_ranked(w) { "+" } else { " " };
        print!(
            "{:>10.2} {:>10} {:>10} {:>10} |{}{:>7} | ",
            ce.last_price,
            ce.open_interest,
            ce.change_in_open_interest,
            ce.traded_volume,
            atm,
            row.strike,
        );
        print!(
            "{:>10} {:>10} {:>10} {:>10.2} | ",
            pe.traded_volume, pe.change_in_open_interest, pe.open_interest, pe.last_price,
        );
        println!(
            "{:>6.2} {:>6.2} {:>6.2} | {:>5.1}{} {:>5.1}{}",
            row.pcr_oi,
            row.pcr_volume,
            row.pcr_change_oi,
            row.call_ranks.weighted,
            mark(row.call_ranks.weighted),
            row.put_ranks.weighted,
            mark(row.put_ranks.weighted),
        );
    }
    println!();
    for (side, totals) in [("CE", view.call_totals), ("PE", view.put_totals)] {
        println!(
            "Window {side} OI {:>12}  chgOI {:>10}  vol {:>12}",
            totals.oi, totals.change_oi, totals.volume
        );
    }
    println!(
        "PCR OI {:.3}  PCR volume {:.3}  PCR change OI {:.3}",
        view.pcr_oi, view.pcr_volume, view.pcr_change_oi
    );
}
