use std::io;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use clap::{
    Arg, ArgAction, ArgMatches, Command, crate_version, value_parser,
};
use tracing::{error, info};
use geotheme::config::{Config as ConfigFile, ConfigError};
use geotheme::feature::load_json;
use geotheme::layer::LayerOptions;
use geotheme::logging::init_logging;
use geotheme::server::{Server, TileLayer};
use geotheme::tile::TileId;

const DEFAULT_CONFIG_PATH: &str = "/etc/geotheme.conf";
const DEFAULT_LISTEN: &str = "127.0.0.1:8080";


/// Something went wrong and has been logged already.
struct Failed;


struct Config {
    features: PathBuf,
    listen: SocketAddr,
    layer: LayerOptions,
    once: Option<TileId>,
}

impl Config {
    pub fn get() -> Result<Self, Failed> {
        let mut matches = Self::get_matches();
        init_logging(matches.get_flag("verbose"));

        let (config_path, insist) = match matches.remove_one::<PathBuf>(
            "config"
        ) {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let file = match ConfigFile::load(&config_path) {
            Ok(file) => file,
            Err(ConfigError::Io(err))
                if err.kind() == io::ErrorKind::NotFound && !insist
            => {
                ConfigFile::default()
            }
            Err(err) => {
                error!("{}: {}", config_path.display(), err);
                return Err(Failed)
            }
        };

        let mut config = Config {
            features: file.features.unwrap_or_default(),
            listen: match file.listen {
                Some(listen) => listen,
                None => DEFAULT_LISTEN.parse().map_err(|_| Failed)?,
            },
            layer: file.layer,
            once: None,
        };
        config.apply_matches(matches);

        if !config.features.is_file() {
            error!("Feature file not provided or does not exist.");
            return Err(Failed)
        }

        Ok(config)
    }

    fn get_matches() -> ArgMatches {
        Command::new("geotheme")
            .version(crate_version!())
            .about("serves thematic shapes for geo features")
            .arg(Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("the configuration file")
                .action(ArgAction::Set)
            )
            .arg(Arg::new("features")
                .short('f')
                .long("features")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("the JSON file with the features")
                .action(ArgAction::Set)
            )
            .arg(Arg::new("listen")
                .short('l')
                .long("listen")
                .value_name("ADDR")
                .value_parser(value_parser!(SocketAddr))
                .help("the addr to listen on")
                .action(ArgAction::Set)
            )
            .arg(Arg::new("once")
                .long("once")
                .value_name("ZOOM/X/Y")
                .value_parser(value_parser!(TileId))
                .help("print the shapes of a single tile and exit")
                .action(ArgAction::Set)
            )
            .arg(Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("log debug messages")
                .action(ArgAction::SetTrue)
            )
            .get_matches()
    }

    fn apply_matches(&mut self, mut matches: ArgMatches) {
        if let Some(features) = matches.remove_one("features") {
            self.features = features;
        }
        if let Some(addr) = matches.remove_one("listen") {
            self.listen = addr;
        }
        if let Some(tile) = matches.remove_one("once") {
            self.once = Some(tile);
        }
    }

    pub async fn run(self) -> Result<(), Failed> {
        let start = Instant::now();
        let features = match load_json(&self.features) {
            Ok(features) => features,
            Err(err) => {
                error!("{}: {}", self.features.display(), err);
                return Err(Failed)
            }
        };

        let mut layer = TileLayer::new(self.layer);
        let added = layer.add_features(features);
        info!(
            features = layer.features().len(),
            failed = added.failed.len(),
            "features loaded in {:.03}s",
            start.elapsed().as_secs_f32()
        );

        let server = Server::new(layer);
        match self.once {
            Some(tile) => {
                let body = server.render_tile(tile).map_err(|err| {
                    error!("failed to render tile {}: {}", tile, err);
                    Failed
                })?;
                let mut stdout = io::stdout().lock();
                stdout.write_all(&body).and_then(|_| {
                    stdout.write_all(b"\n")
                }).map_err(|err| {
                    error!("failed to write output: {}", err);
                    Failed
                })
            }
            None => {
                server.run(self.listen).await;
                Ok(())
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::get() {
        Ok(config) => config,
        Err(_) => std::process::exit(1),
    };

    if config.run().await.is_err() {
        std::process::exit(1)
    }
}
