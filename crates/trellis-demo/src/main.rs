//! Trellis Demo - Main Entry Point
//!
//! Builds a one-div document, prints what a selector query finds, then
//! drives the tick/render loop on the headless platform until the window
//! is asked to close.
//!
//! Usage: `trellis-demo [ticks]` (default 120)

use std::time::Duration;

use anyhow::{Context, Result};
use smol::Timer;
use tracing_subscriber::EnvFilter;
use trellis_engine::{Config, Engine, RenderStatus};

const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let budget: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("invalid tick count {arg:?}"))?,
        None => 120,
    };

    let (mut engine, platform) = Engine::headless(config);
    println!("Trellis Engine v{}", trellis_engine::VERSION);

    let app = engine.init_app()?;
    let win = engine.create_window("Hello", 400, 300)?;
    let doc = engine.create_document()?;
    let div = engine.create_element(doc, "div")?;
    let hello = engine.create_text_node(doc, "Hello")?;
    engine.append_child(div, hello)?;
    engine.append_child(doc, div)?;

    let found = engine
        .query_selector(doc, "div")?
        .context("query_selector found no div")?;
    println!("{}", engine.tag_name(found)?);
    println!("{} -> {}", div, engine.node_id(found)?);

    let renderer = engine.create_renderer(doc, win)?;
    let platform_id = engine.window(win)?.platform_id();

    let presented = smol::block_on(async {
        let mut presented = 0u64;
        while !engine.should_close(win)? {
            engine.tick(app)?;
            if engine.render(renderer)? == RenderStatus::Presented {
                presented += 1;
            }

            // stand-in for the user closing the window
            if engine.app(app)?.tick_count() >= budget {
                platform.request_close(platform_id);
            }
            Timer::after(FRAME).await;
        }
        anyhow::Ok(presented)
    })?;

    let app_state = engine.app(app)?;
    tracing::info!(
        "closed after {} ticks ({:?})",
        app_state.tick_count(),
        app_state.uptime()
    );
    println!("{} ticks, {} frames presented", app_state.tick_count(), presented);

    Ok(())
}
