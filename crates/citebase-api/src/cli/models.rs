//! `citebase models`: list the model catalog.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use crate::cli::display::format_tokens;
use crate::state::AppState;

pub async fn list_models(state: &AppState, json: bool) -> Result<()> {
    let service = state.service.lock().await;
    let active = service.active_model().name.clone();

    if json {
        let models: Vec<serde_json::Value> = service
            .catalog()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "max_context_tokens": m.max_context_tokens,
                    "description": m.description,
                    "default": m.name == active,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    if service.catalog().is_empty() {
        println!("\n  {}\n", style("No models configured.").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Model").fg(Color::White),
        Cell::new("Context").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for model in service.catalog().iter() {
        let name_cell = if model.name == active {
            Cell::new(format!("{} (default)", model.name)).fg(Color::Green)
        } else {
            Cell::new(&model.name).fg(Color::White)
        };
        table.add_row(vec![
            name_cell,
            Cell::new(format_tokens(u64::from(model.max_context_tokens))).fg(Color::Cyan),
            Cell::new(&model.description).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
