//! Native entry point. The browser build starts from `lumen_core::start` instead.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use log::{error, info};
#[cfg(not(target_arch = "wasm32"))]
use lumen_core::{load_configured_scene, App, Engine, EngineConfig, HeadlessSurface, DEFAULT_CONFIG_PATH};

/// Loads a scene and renders it in a window, or once into a recording surface.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Interchange document to load; overrides `scene.asset` from the configuration file.
    asset: Option<String>,

    /// Render a single frame without opening a window and log what was drawn.
    #[arg(long)]
    headless: bool,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    let args = Args::parse();

    let mut config = match EngineConfig::load_or_default(DEFAULT_CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read {DEFAULT_CONFIG_PATH}: {e}");
            std::process::exit(1);
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter)).init();

    if let Some(asset) = args.asset {
        config.scene.asset = Some(asset);
    }

    let result = if args.headless {
        run_headless(&config)
    } else {
        run_windowed(config)
    };
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

/// Renders one frame into the recording surface and logs what it would have drawn.
#[cfg(not(target_arch = "wasm32"))]
fn run_headless(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::new(HeadlessSurface::new());
    pollster::block_on(load_configured_scene(&mut engine, config))?;

    engine.resize(config.window.width, config.window.height);
    engine.update(lumen_core::Duration::ZERO);
    engine.render()?;

    let surface = engine.surface();
    info!(
        "Headless frame: {} buffers, {} surface calls, {} draws",
        surface.buffer_count(),
        surface.calls().len(),
        surface.draw_calls().count()
    );
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_windowed(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = winit::event_loop::EventLoop::builder().build()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn asset_and_headless_flag_are_parsed() {
        let args = Args::try_parse_from(["lumen", "assets/rings.gltf", "--headless"]).unwrap();

        assert_eq!(args.asset.as_deref(), Some("assets/rings.gltf"));
        assert!(args.headless);
    }

    #[test]
    fn no_arguments_opens_the_configured_scene() {
        let args = Args::try_parse_from(["lumen"]).unwrap();

        assert!(args.asset.is_none());
        assert!(!args.headless);
    }

    #[test]
    fn help_is_generated() {
        let err = Args::try_parse_from(["lumen", "--help"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn misspelled_flags_are_rejected() {
        let err = Args::try_parse_from(["lumen", "--headles"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        let err = Args::try_parse_from(["lumen", "a.gltf", "b.gltf"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
