pub mod assemble;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod decode;
pub mod error;
pub mod history;
pub mod log;
pub mod market;
pub mod net;
pub mod providers;
pub mod ui;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::MarketError;
use crate::history::{HistoryResponse, ValueKind};
use crate::market::{Domain, MarketData};

/// CLI-independent command representation.
pub enum AppCommand {
    History {
        items: Vec<String>,
        start: NaiveDate,
        end: Option<NaiveDate>,
        currency: Option<String>,
        volume: bool,
        metals: bool,
    },
    Rate {
        code: String,
    },
    Coins {
        filter: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Market history starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let market = MarketData::from_config(&config)?;

    match command {
        AppCommand::History {
            items,
            start,
            end,
            currency,
            volume,
            metals,
        } => {
            let end = end.unwrap_or_else(|| Utc::now().date_naive());
            run_history(&market, &config, items, start, end, currency, volume, metals).await
        }
        AppCommand::Rate { code } => run_rate(&market, &code).await,
        AppCommand::Coins { filter } => run_coins(&market, filter.as_deref()).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_history(
    market: &MarketData,
    config: &AppConfig,
    items: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    currency: Option<String>,
    volume: bool,
    metals: bool,
) -> Result<()> {
    if end < start {
        anyhow::bail!("End date {end} is before start date {start}");
    }

    let domain = if metals { Domain::Metal } else { Domain::Crypto };
    let items = if items.is_empty() {
        match domain {
            Domain::Crypto => config.cryptocurrencies.clone(),
            Domain::Metal => config.metals.clone(),
        }
    } else {
        items
    };
    let currency = currency.unwrap_or_else(|| config.currency.clone());
    let kind = if volume {
        ValueKind::Volume
    } else {
        ValueKind::Price
    };

    let progress = ui::new_progress_bar(items.len() as u64);
    let mut response = HistoryResponse::default();

    for item in &items {
        progress.set_message(item.clone());

        let one = market
            .historical_series(
                domain,
                std::slice::from_ref(item),
                start,
                end,
                &currency,
                kind,
            )
            .await;

        match one {
            Ok(partial) => response.merge(partial),
            Err(MarketError::MissingRate(code)) => {
                progress.finish_and_clear();
                println!(
                    "{}",
                    ui::warn_line(&format!("Exchange rate for {code} not available"))
                );
                return Ok(());
            }
            Err(e) => {
                // Reference behavior: the first hard failure aborts the
                // whole range query for this domain.
                progress.finish_and_clear();
                return Err(anyhow::Error::new(e).context(format!("Failed to get data for {item}")));
            }
        }

        progress.inc(1);
    }
    progress.finish_and_clear();

    for item in &response.missing {
        println!(
            "{}",
            ui::warn_line(&format!("No data found for selected interval for {item}"))
        );
    }

    if response.series.is_empty() {
        return Ok(());
    }

    let value_label = match kind {
        ValueKind::Price => format!("{currency} value"),
        ValueKind::Volume => "volume".to_string(),
    };

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Item"),
        ui::header_cell("Points"),
        ui::header_cell(&format!("First {value_label}")),
        ui::header_cell(&format!("Last {value_label}")),
        ui::header_cell("Low"),
        ui::header_cell("High"),
        ui::header_cell("Change"),
    ]);

    for item in &items {
        let Some(series) = response.series.get(item) else {
            continue;
        };

        let first = series[0].value;
        let last = series[series.len() - 1].value;
        let low = series.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let high = series
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut row = vec![
            comfy_table::Cell::new(item),
            ui::value_cell(series.len().to_string()),
            ui::value_cell(ui::format_value(first)),
            ui::value_cell(ui::format_value(last)),
            ui::value_cell(ui::format_value(low)),
            ui::value_cell(ui::format_value(high)),
        ];
        if first != 0.0 {
            row.push(ui::change_cell((last - first) / first * 100.0));
        } else {
            row.push(ui::value_cell("N/A".to_string()));
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}

async fn run_rate(market: &MarketData, code: &str) -> Result<()> {
    match market.exchange_rate(code).await {
        Ok(rate) => {
            println!("1 USD = {rate} {code}");
            Ok(())
        }
        Err(MarketError::MissingRate(code)) => {
            println!(
                "{}",
                ui::warn_line(&format!("Exchange rate for {code} not available"))
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_coins(market: &MarketData, filter: Option<&str>) -> Result<()> {
    let directory = market.available_coins().await?;

    let filter = filter.map(str::to_lowercase);
    let mut coins: Vec<(&String, &String)> = directory
        .iter()
        .filter(|(name, _)| {
            filter
                .as_ref()
                .is_none_or(|f| name.to_lowercase().contains(f))
        })
        .collect();
    coins.sort();

    if coins.is_empty() {
        println!("{}", ui::warn_line("No matching coins"));
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Name"), ui::header_cell("Identifier")]);
    for (name, id) in coins {
        table.add_row(vec![name, id]);
    }
    println!("{table}");
    Ok(())
}
