use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use virtual_tourist::album::{AlbumSession, AlbumStatus, Materializer, PhotoCell};
use virtual_tourist::flickr::FlickrClient;
use virtual_tourist::state::{MapRegion, PhotoId, PinId, Store};
use virtual_tourist::TouristConfig;

/// Drop pins and browse the cached Flickr album of each one
#[derive(Debug, Parser)]
#[command(name = "virtual-tourist", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drop a pin and load its first page of photos
    Drop {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
    /// List every pin
    Pins,
    /// Delete a pin and all of its photos
    DeletePin { pin: i64 },
    /// Open a pin's album and download every photo
    Album { pin: i64 },
    /// Replace a pin's photos with the next page of results
    NewCollection { pin: i64 },
    /// Remove individual photos from a pin's album
    RemovePhotos {
        pin: i64,
        #[arg(required = true)]
        photos: Vec<i64>,
    },
    /// Show or save the map region
    Region {
        #[arg(long, num_args = 4, allow_hyphen_values = true,
              value_names = ["LAT", "LON", "SPAN_LAT", "SPAN_LON"])]
        set: Option<Vec<f64>>,
    },
}

/// Catalog access, with the network side built only when a command needs it
struct App {
    config: TouristConfig,
    store: Store,
}

impl App {
    fn new(config: TouristConfig) -> anyhow::Result<Self> {
        let store = Store::open(&config.database_path).with_context(|| {
            format!("opening catalog at {}", config.database_path.display())
        })?;
        Ok(Self { config, store })
    }

    /// Flickr client plus the one materializer every album of this run shares
    fn albums(&self) -> anyhow::Result<Albums> {
        let client = Arc::new(FlickrClient::new(&self.config)?);
        let materializer = Materializer::new(self.store.clone(), client.clone());
        Ok(Albums {
            store: self.store.clone(),
            client,
            materializer,
        })
    }
}

struct Albums {
    store: Store,
    client: Arc<FlickrClient>,
    materializer: Materializer,
}

impl Albums {
    fn session(&self, pin: PinId) -> AlbumSession {
        AlbumSession::new(
            self.store.clone(),
            self.client.clone(),
            self.materializer.clone(),
            pin,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TouristConfig::from_env()?;
    info!(db = %config.database_path.display(), "Virtual Tourist ready");
    let app = App::new(config)?;

    match cli.command {
        Command::Drop { latitude, longitude } => {
            let albums = app.albums()?;
            let pin = app
                .store
                .perform(move |lib| lib.create_pin(latitude, longitude))
                .await?;
            println!("Dropped pin {} at ({}, {})", pin.id, pin.latitude, pin.longitude);

            let mut session = albums.session(pin.id);
            session.open().await?;
            print_status(&session);
        }
        Command::Pins => {
            let pins = app.store.perform(|lib| lib.all_pins()).await?;
            if pins.is_empty() {
                println!("No pins yet.");
            }
            for pin in pins {
                let id = pin.id;
                let photos = app.store.perform(move |lib| lib.photo_count(id)).await?;
                println!(
                    "{:>5}  {:>10.5} {:>11.5}  page {:<3} {} photos",
                    pin.id, pin.latitude, pin.longitude, pin.page, photos
                );
            }
        }
        Command::DeletePin { pin } => {
            let id = PinId(pin);
            app.store.perform(move |lib| lib.delete_pin(id)).await?;
            println!("Deleted pin {id}");
        }
        Command::Album { pin } => {
            let mut session = app.albums()?.session(PinId(pin));
            session.open().await?;
            print_status(&session);
            show_album(&app, &mut session).await?;
        }
        Command::NewCollection { pin } => {
            let mut session = app.albums()?.session(PinId(pin));
            session.open().await?;
            session.new_collection().await?;
            print_status(&session);
            show_album(&app, &mut session).await?;
        }
        Command::RemovePhotos { pin, photos } => {
            let mut session = app.albums()?.session(PinId(pin));
            session.open().await?;

            let ids = session.photo_ids();
            for photo in photos {
                let Some(position) = ids.iter().position(|id| *id == PhotoId(photo)) else {
                    bail!("photo {photo} does not belong to pin {pin}");
                };
                session.toggle_selection(position);
            }

            let removed = session
                .primary_action()
                .await?
                .map(|batch| batch.deletes())
                .unwrap_or(0);
            println!("Removed {removed} photos, {} left", session.len());
        }
        Command::Region { set } => match set.as_deref() {
            Some(&[center_latitude, center_longitude, span_latitude, span_longitude]) => {
                let region = MapRegion {
                    center_latitude,
                    center_longitude,
                    span_latitude,
                    span_longitude,
                };
                app.store.perform(move |lib| lib.save_region(&region)).await?;
                println!("Saved region {region:?}");
            }
            Some(_) => bail!("--set takes exactly four values"),
            None => match app.store.perform(|lib| lib.load_region()).await? {
                Some(region) => println!("{region:?}"),
                None => println!("No region saved yet."),
            },
        },
    }

    Ok(())
}

fn print_status(session: &AlbumSession) {
    match session.status() {
        AlbumStatus::Failed(message) => eprintln!("Could not load photos: {message}"),
        status => {
            if let Some(message) = status.message() {
                println!("{message}");
            }
        }
    }
}

/// Bind a cell to every photo, wait for the downloads and print a summary
async fn show_album(app: &App, session: &mut AlbumSession) -> anyhow::Result<()> {
    let cells: Vec<PhotoCell> = (0..session.len()).map(|_| PhotoCell::new()).collect();
    for (position, cell) in cells.iter().enumerate() {
        session.display(cell, position).await?;
    }
    session.wait_for_downloads().await;

    let pin_id = session.pin_id();
    let photos = app
        .store
        .perform(move |lib| lib.photos_for_pin(pin_id))
        .await?;

    for (photo, cell) in photos.iter().zip(&cells) {
        let state = if cell.snapshot().shows_placeholder() {
            "placeholder"
        } else {
            "downloaded"
        };
        println!("{:>6}  {:<11} {:>8} bytes  {}", photo.id, state, photo.image.len(), photo.url);
    }

    let downloaded = photos.iter().filter(|p| p.is_materialized()).count();
    println!("Pin {pin_id}: {downloaded}/{} photos downloaded", photos.len());
    Ok(())
}
