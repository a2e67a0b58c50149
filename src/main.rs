use anyhow::Result;

mod app;
mod backend;
mod config;
mod controller;
mod handler;
mod transcript;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    // First readiness probe; the badge shows "Checking..." until it lands
    controller::run_status_probe(&mut app, &events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        // Feed the chat pane size into the app before drawing so scroll
        // math matches the layout; the renderer itself never mutates state
        let size = terminal.size()?;
        let (width, height) = ui::chat_viewport(app, ratatui::layout::Rect::new(0, 0, size.width, size.height));
        app.set_viewport(width, height);

        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            let tx = events.sender();
            handler::handle_event(app, event, &tx);
        } else {
            break;
        }
    }
    Ok(())
}
