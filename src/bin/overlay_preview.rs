use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use loadin_engine::api::overlay_api::{Environment, OverlayProps};
use loadin_engine::telemetry::init_tracing;
use loadin_engine::engine::driver::{DriverExit, OverlayDriver};
use loadin_engine::engine::odometer::Glyph;
use loadin_engine::engine::sequencer::{LoadInOverlay, OverlayView};
use loadin_engine::storage::session_flag::{MemorySessionStore, SessionStore};

/// Play the load-in overlay on the real clock and log every frame.
#[derive(Debug, Parser)]
#[command(name = "overlay-preview", version)]
struct Args {
    #[arg(long, default_value = "Robinhood")]
    company: String,

    #[arg(long, default_value = "HOOD")]
    ticker: String,

    #[arg(long, default_value = "$3.42")]
    price: String,

    #[arg(long, default_value_t = 1440)]
    width: u32,

    #[arg(long, default_value_t = 900)]
    height: u32,

    #[arg(long)]
    reduced_motion: bool,

    #[arg(long)]
    force_replay: bool,

    /// Mount the overlay this many times against one session.
    #[arg(long, default_value_t = 1)]
    replays: u32,

    #[arg(long)]
    seed: Option<u64>,
}

fn describe(view: &OverlayView) -> String {
    let price: String = view
        .glyphs
        .iter()
        .map(|g| match g {
            Glyph::Static(c) => *c,
            Glyph::Strip(strip) => char::from(b'0' + strip.target),
        })
        .collect();
    format!(
        "visible={} phase={:?} text={} price={} rolling={} day_change={} fading={} cells={}",
        view.visible,
        view.phase,
        view.text_visible,
        price,
        view.rolling,
        view.day_change.as_deref().unwrap_or("-"),
        view.fading_out,
        view.wipe.len()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let env = Environment {
        viewport_width: args.width,
        viewport_height: args.height,
        prefers_reduced_motion: args.reduced_motion,
    };

    for run in 1..=args.replays.max(1) {
        let props = OverlayProps::new(args.company.clone(), args.ticker.clone())
            .with_price(args.price.clone())
            .with_force_replay(args.force_replay);
        let mut overlay = LoadInOverlay::new(props, env, store.clone());
        if let Some(seed) = args.seed {
            overlay = overlay.with_seed(seed);
        }

        let driver = OverlayDriver::new(overlay);
        let unmount = driver.unmount_token();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = tokio::spawn(driver.run(tx));

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(view) => info!("run={} {}", run, describe(&view)),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    unmount.cancel();
                }
            }
        }

        let (overlay, exit) = handle.await?;
        info!(
            "run={} exit={:?} elapsed_ms={}",
            run,
            exit,
            overlay.now().as_millis()
        );
        if exit == DriverExit::Unmounted {
            break;
        }
    }
    Ok(())
}
