use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::App;
use crate::card::{Card, CardColor};
use crate::config::AppConfig;
use crate::sanitize;
use crate::storage::CardStore;

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the card (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Palette color token (white, red, orange, yellow, green, teal, blue, purple, pink)
    #[arg(long)]
    pub color: Option<String>,
    /// Checklist item text; repeat the flag for multiple items
    #[arg(long = "item")]
    pub items: Vec<String>,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn new_card(config: Arc<AppConfig>, mut store: CardStore, args: NewArgs) -> Result<()> {
    let title = match args.title {
        Some(title) => title,
        None => prompt_title()?,
    };
    let title = sanitize::sanitize_title(&title);

    let color = args
        .color
        .as_deref()
        .map(CardColor::from_token)
        .unwrap_or(config.default_color);

    let mut card = Card::empty(color).renamed(&title);
    let mut items = args.items.iter();
    if let Some(first) = items.next() {
        let id = card.todos[0].id;
        card = card.with_item_text(id, &sanitize::sanitize_task(first));
    }
    for text in items {
        card = card.with_new_item();
        if let Some(item) = card.todos.last() {
            let id = item.id;
            card = card.with_item_text(id, &sanitize::sanitize_task(text));
        }
    }

    let item_count = card.todos.len();
    store.upsert(card);
    println!(
        "Created card \"{}\" ({} item{}) with color {}",
        if title.is_empty() { "Untitled" } else { title.as_str() },
        item_count,
        if item_count == 1 { "" } else { "s" },
        color.token()
    );
    Ok(())
}

pub fn list_cards(store: CardStore) -> Result<()> {
    if store.is_empty() {
        println!("The board is empty.");
        return Ok(());
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for card in store.list() {
        let title = if card.title.trim().is_empty() {
            "Untitled card"
        } else {
            card.title.as_str()
        };
        writeln!(
            out,
            "{title} [{}] ({}/{})",
            card.background_color.token(),
            card.completed_count(),
            card.todos.len()
        )
        .context("writing card listing")?;
        for item in &card.todos {
            let marker = if item.completed { "x" } else { " " };
            writeln!(out, "  [{marker}] {}", item.task).context("writing card listing")?;
        }
    }
    Ok(())
}

fn prompt_title() -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        print!("Card title: ");
        io::stdout().flush().context("flushing prompt")?;
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading title from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
