use super::ui;
use crate::core::portfolio::{MarketView, investor_fraction};
use crate::core::service::CoinService;
use anyhow::Result;
use chrono::{Local, TimeZone};
use comfy_table::Cell;
use std::time::Duration;
use tracing::debug;

fn format_epoch(epoch: Option<i64>) -> String {
    epoch
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map_or("never".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

impl MarketView {
    pub fn display_as_table(&self) -> String {
        if self.rows.is_empty() {
            return ui::style_text(
                "No market data yet. Add coins with `coinwatch add <coin>`.",
                ui::StyleType::Subtle,
            );
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Coin"),
            ui::header_cell("Price"),
            ui::header_cell("24h"),
            ui::header_cell("7d"),
            ui::header_cell("Circulating"),
            ui::header_cell("Market Cap"),
            ui::header_cell("Total Supply"),
            ui::header_cell("FDV"),
            ui::header_cell("Raised"),
            ui::header_cell("Investors"),
            ui::header_cell("Financing Price"),
            ui::header_cell("Income Price"),
            ui::header_cell("Tags"),
        ]);

        for (i, row) in self.rows.iter().enumerate() {
            let name = row.coin_name.clone().unwrap_or_else(|| row.coin_id.clone());
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(name),
                ui::format_optional_cell(row.price, ui::format_money),
                ui::change_cell(row.change_24h),
                ui::change_cell(row.change_7d),
                ui::format_optional_cell(row.current_supply, ui::format_amount),
                ui::format_optional_cell(row.current_market_cap, ui::format_money),
                ui::format_optional_cell(row.total_supply, ui::format_amount),
                ui::format_optional_cell(row.total_market_cap, ui::format_money),
                ui::format_optional_cell(row.found_raises, ui::format_money),
                ui::format_optional_cell(row.investor_percentage, |p| {
                    format!("{:.2}%", investor_fraction(p) * 100.0)
                }),
                ui::format_optional_cell(row.financing_based_price, ui::format_money),
                ui::format_optional_cell(row.income_based_price, ui::format_money),
                Cell::new(&row.tags),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Market Overview", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!(
                    "Last refresh: {}  Next refresh: {}",
                    format_epoch(self.last_refresh_epoch),
                    format_epoch(self.next_refresh_epoch)
                ),
                ui::StyleType::Subtle,
            )
        ));
        output
    }
}

async fn fetch_view(service: &CoinService) -> Result<MarketView> {
    let pb = ui::new_spinner("Fetching market data...");
    let view = service.market_view().await;
    pb.finish_and_clear();
    view
}

pub async fn run(service: &CoinService, json: bool) -> Result<()> {
    let view = fetch_view(service).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.display_as_table());
    }
    Ok(())
}

/// Re-renders the overview every `interval`. The caches live as long as
/// `service`, so most iterations are served without hitting the upstream.
pub async fn watch(service: &CoinService, interval: Duration, iterations: Option<u64>) -> Result<()> {
    let mut rendered = 0u64;
    loop {
        let view = fetch_view(service).await?;
        if rendered > 0 {
            ui::print_separator();
        }
        println!("{}", view.display_as_table());
        rendered += 1;
        debug!(rendered, "Rendered market overview");

        if iterations.is_some_and(|limit| rendered >= limit) {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}
