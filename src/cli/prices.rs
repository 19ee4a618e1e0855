use super::ui;
use crate::core::portfolio::PriceRow;
use crate::core::service::CoinService;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color};

fn profit_cell(profit: f64) -> Cell {
    let color = if profit >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(ui::format_money(profit))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

pub fn display_as_table(rows: &[PriceRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Coin"),
        ui::header_cell("Price"),
        ui::header_cell("Buy Price"),
        ui::header_cell("Amount"),
        ui::header_cell("Profit"),
    ]);

    for row in rows {
        let name = row.name.clone().unwrap_or_else(|| row.coin_id.clone());
        table.add_row(vec![
            Cell::new(name),
            ui::format_optional_cell(row.current_price, ui::format_money),
            ui::format_optional_cell(row.buy_price, ui::format_money),
            ui::format_optional_cell(row.amount, |a| format!("{a}")),
            profit_cell(row.profit),
        ]);
    }

    let total: f64 = rows.iter().map(|row| row.profit).sum();
    let total_style = if total >= 0.0 {
        ui::StyleType::Success
    } else {
        ui::StyleType::Error
    };

    format!(
        "{}\n\nTotal Profit: {}",
        table,
        ui::style_text(&ui::format_money(total), total_style)
    )
}

pub async fn run(service: &CoinService, json: bool) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let rows = service.price_view().await;
    pb.finish_and_clear();
    let rows = rows?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", display_as_table(&rows));
    }
    Ok(())
}
