use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bus_booking_client::{
    filter_by_name, render, BookingForm, BookingService, BookingSession, ChatAssistant,
    ClientConfig, HttpBookingService, QueryClient, SearchCriteria,
};

/// Search, book and manage intercity bus tickets.
#[derive(Parser, Debug)]
#[command(name = "bus-booking", version, about, long_about = None)]
struct Cli {
    /// Booking service base URL (overrides BOOKING_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in milliseconds (overrides BOOKING_API_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List districts served by the network.
    Districts,
    /// Search buses between two districts.
    Search {
        from: String,
        to: String,
        #[arg(long)]
        max_price: Option<u32>,
    },
    /// Book the offer matching provider and dropping point.
    Book {
        from: String,
        to: String,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        dropping_point: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// Travel date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show all bookings for a phone number.
    Bookings { phone: String },
    /// Cancel a booking and show the refreshed list.
    Cancel { reference: String, phone: String },
    /// Browse bus providers.
    Providers {
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show one provider's details.
    Provider { name: String },
    /// Ask the assistant a question.
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

async fn run(command: Commands, service: Arc<dyn BookingService>) -> Result<()> {
    let query = QueryClient::new(service.clone());
    let session = BookingSession::new(service.clone());

    match command {
        Commands::Districts => {
            let districts = query.list_districts().await?;
            println!("{}", render::districts(&districts));
        }
        Commands::Search {
            from,
            to,
            max_price,
        } => {
            let mut criteria = SearchCriteria::new(&from, &to);
            criteria.max_price = max_price;

            let districts = query.list_districts().await?;
            criteria.check_known(&districts)?;

            let results = query.search(&criteria).await?;
            print!("{}", render::search_results(&results));
        }
        Commands::Book {
            from,
            to,
            provider,
            dropping_point,
            name,
            phone,
            date,
        } => {
            let results = query.search(&SearchCriteria::new(&from, &to)).await?;
            let Some(itinerary) = results
                .iter()
                .find(|r| r.provider == provider && r.dropping_point == dropping_point)
            else {
                bail!("no offer from {provider} to {dropping_point} on {from} -> {to}");
            };

            let form = BookingForm {
                customer_name: name,
                customer_phone: phone,
                travel_date: date,
            };
            let confirmation = session
                .book(itinerary, &form)
                .await
                .context("booking failed, you can submit again")?;
            println!("{}", confirmation.notice());
        }
        Commands::Bookings { phone } => {
            let bookings = session.list_mine(&phone).await?;
            print!("{}", render::bookings(&bookings));
        }
        Commands::Cancel { reference, phone } => {
            let bookings = session.cancel_and_refresh(&reference, &phone).await?;
            println!("Booking {reference} cancelled.\n");
            print!("{}", render::bookings(&bookings));
        }
        Commands::Providers { district, name } => {
            let providers = match district {
                Some(district) => query.list_providers_in(&district).await?,
                None => query.list_providers().await?,
            };
            let shown = filter_by_name(&providers, name.as_deref().unwrap_or_default());
            print!("{}", render::providers(&shown));
        }
        Commands::Provider { name } => {
            let details = query.provider_details(&name).await?;
            print!("{}", render::provider_details(&details));
        }
        Commands::Chat { message } => {
            let mut assistant = ChatAssistant::new(service);
            let reply = assistant.ask(&message.join(" ")).await?;
            println!("{reply}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    tracing::debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "client configured");

    let service: Arc<dyn BookingService> = Arc::new(HttpBookingService::new(&config)?);
    run(cli.command, service).await
}
