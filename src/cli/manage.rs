use super::ui;
use crate::core::portfolio::{PortfolioRow, RowFields, seed_defaults};
use crate::core::service::{CoinService, POPULAR_IDENTIFIERS};
use anyhow::{Result, bail};
use comfy_table::Cell;

fn optional_text(text: &str) -> Cell {
    if text.is_empty() {
        Cell::new("-")
    } else {
        Cell::new(text)
    }
}

pub fn display_rows(rows: &[PortfolioRow]) -> String {
    if rows.is_empty() {
        return ui::style_text("No coins tracked yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Coin"),
        ui::header_cell("Buy Price"),
        ui::header_cell("Amount"),
        ui::header_cell("Raised"),
        ui::header_cell("Investors"),
        ui::header_cell("Tokenomics"),
        ui::header_cell("Vesting"),
        ui::header_cell("CEXs"),
        ui::header_cell("Tags"),
    ]);
    for row in rows {
        let fields = &row.fields;
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.coin_id),
            ui::format_optional_cell(fields.buy_price, ui::format_money),
            ui::format_optional_cell(fields.amount, |a| format!("{a}")),
            ui::format_optional_cell(fields.found_raises, ui::format_money),
            ui::format_optional_cell(fields.investor_percentage, |p| format!("{p}")),
            optional_text(&fields.tokenomics),
            optional_text(&fields.vesting),
            optional_text(&fields.cexs),
            optional_text(&fields.tags),
        ]);
    }
    table.to_string()
}

pub async fn list(service: &CoinService) -> Result<()> {
    let rows = service.store().list().await?;
    println!("{}", display_rows(&rows));
    Ok(())
}

pub async fn add(service: &CoinService, coin: &str, fields: RowFields) -> Result<()> {
    let pb = ui::new_spinner("Resolving coin id...");
    let result = service.submit(coin, fields).await;
    pb.finish_and_clear();

    let row = result?;
    println!(
        "{} {} (row {})",
        ui::style_text("Saved", ui::StyleType::Success),
        row.coin_id,
        row.id
    );
    Ok(())
}

pub async fn edit(service: &CoinService, id: u64, coin: &str, fields: RowFields) -> Result<()> {
    let pb = ui::new_spinner("Resolving coin id...");
    let result = service.edit(id, coin, fields).await;
    pb.finish_and_clear();

    let row = result?;
    println!(
        "{} row {} -> {}",
        ui::style_text("Updated", ui::StyleType::Success),
        row.id,
        row.coin_id
    );
    Ok(())
}

pub async fn remove(service: &CoinService, id: u64) -> Result<()> {
    if service.delete(id).await {
        println!("{} row {}", ui::style_text("Removed", ui::StyleType::Success), id);
    } else {
        println!(
            "{}",
            ui::style_text(&format!("No row with id {id}"), ui::StyleType::Subtle)
        );
    }
    Ok(())
}

pub async fn resolve(service: &CoinService, text: &str) -> Result<()> {
    let resolved = service.resolve(text).await;
    if resolved.is_empty() {
        bail!("Nothing to resolve");
    }

    let valid = service.valid_identifiers().await;
    let status = if valid.is_empty() {
        ui::style_text("(catalog unavailable, not validated)", ui::StyleType::Subtle)
    } else if valid.contains(&resolved) {
        ui::style_text("valid", ui::StyleType::Success)
    } else {
        ui::style_text("unknown coin id", ui::StyleType::Error)
    };
    println!("{} -> {} {}", text.trim(), resolved, status);
    Ok(())
}

pub fn popular() {
    for id in POPULAR_IDENTIFIERS {
        println!("{id}");
    }
}

pub async fn init(service: &CoinService) -> Result<()> {
    let added = seed_defaults(service.store()).await?;
    if added == 0 {
        println!("Portfolio already has coins, nothing seeded.");
    } else {
        println!("Seeded {added} coins.");
    }
    Ok(())
}
