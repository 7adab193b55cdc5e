use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};

use crmdesk::config::Config;
use crmdesk::crm::{AppointmentInput, ContactInput, CrmClient};
use crmdesk::filter::{DateRange, FilterDescriptor, Pagination};

#[derive(Parser, Debug)]
#[command(name = "crmdesk")]
#[command(about = "Browse and edit an Airtable-backed real-estate CRM")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/crmdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List agents
  Agents {
    #[arg(short, long)]
    search: Option<String>,
  },
  /// List contacts
  Contacts {
    #[arg(short, long)]
    search: Option<String>,
  },
  /// List appointments, newest first
  Appointments {
    #[arg(short, long)]
    search: Option<String>,
    /// upcoming, completed or cancelled
    #[arg(long)]
    status: Option<String>,
    /// Agent record id; repeat for several
    #[arg(long = "agent")]
    agents: Vec<String>,
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 10)]
    page_size: usize,
  },
  /// Show one appointment
  Appointment { id: String },
  /// Today's figures and the latest appointments
  Dashboard,
  /// Add a contact
  CreateContact {
    #[arg(long)]
    name: String,
    #[arg(long)]
    surname: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
  },
  /// Book a property viewing
  CreateAppointment {
    /// RFC 3339 timestamp, e.g. 2025-06-01T09:30:00Z
    #[arg(long)]
    date: DateTime<Utc>,
    #[arg(long)]
    address: String,
    /// Contact record id
    #[arg(long)]
    contact: String,
    /// Agent record id
    #[arg(long)]
    agent: String,
  },
  /// Mark an appointment cancelled
  CancelAppointment { id: String },
  /// Remove an appointment permanently
  DeleteAppointment { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _guard = crmdesk::logging::init(&config.logging)?;

  let client = CrmClient::new(&config)?;
  run(&client, args.command).await
}

async fn run(client: &CrmClient, command: Command) -> Result<()> {
  match command {
    Command::Agents { search } => {
      let filter = search.map(|s| FilterDescriptor::new().with_search(s));
      for agent in client.list_agents(filter.as_ref()).await?.iter() {
        println!("{}\t{}\t{}\t{}", agent.id, agent.number, agent.name, agent.color);
      }
    }
    Command::Contacts { search } => {
      let filter = search.map(|s| FilterDescriptor::new().with_search(s));
      for contact in client.list_contacts(filter.as_ref()).await?.iter() {
        println!(
          "{}\t{}\t{}\t{}",
          contact.id, contact.full_name, contact.email, contact.phone
        );
      }
    }
    Command::Appointments {
      search,
      status,
      agents,
      from,
      to,
      page,
      page_size,
    } => {
      let mut filter = FilterDescriptor::new();
      if let Some(search) = search {
        filter = filter.with_search(search);
      }
      if let Some(status) = status {
        filter = filter.with_status(status);
      }
      for agent in agents {
        filter = filter.with_owner(agent);
      }
      if let Some(range) = date_range(from, to)? {
        filter = filter.with_date_range(range);
      }

      let appointments = client.list_appointments(Some(&filter)).await?;
      let pagination = Pagination::new(page, page_size);
      for apt in pagination.slice(appointments.as_slice()) {
        let date = apt
          .date
          .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
          .unwrap_or_else(|| "-".to_string());
        println!(
          "{}\t{}\t{}\t{}\t{}\t{}",
          apt.id, date, apt.status, apt.contact, apt.agent, apt.address
        );
      }
      println!(
        "page {}/{} ({} appointments)",
        pagination.page,
        pagination.total_pages(appointments.len()).max(1),
        appointments.len()
      );
    }
    Command::Appointment { id } => {
      let apt = client.get_appointment(&id).await?;
      let date = apt
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
      println!("{}\t{}\t{}", apt.id, date, apt.status);
      println!("Contact: {} {}", apt.contact, apt.contact_email);
      println!("Agent:   {}", apt.agent);
      println!("Address: {}", apt.address);
    }
    Command::CreateContact {
      name,
      surname,
      email,
      phone,
      address,
    } => {
      let input = ContactInput {
        contact_name: Some(name),
        contact_surname: Some(surname),
        contact_email: email,
        contact_phone: phone,
        contact_address: address,
      };
      let contact = client.create_contact(&input).await?;
      println!("created {}\t{}", contact.id, contact.full_name);
    }
    Command::Dashboard => {
      let dashboard = client.load_dashboard(Utc::now().date_naive()).await?;
      println!("Today's appointments: {}", dashboard.stats.today_appointments);
      println!("Contacts:             {}", dashboard.stats.total_contacts);
      println!("Agents:               {}", dashboard.stats.active_agents);
      println!();
      for apt in &dashboard.recent {
        println!(
          "[{}] {}\t{}\t{}\t{}",
          apt.initials, apt.contact_name, apt.time, apt.service, apt.status
        );
      }
    }
    Command::CreateAppointment {
      date,
      address,
      contact,
      agent,
    } => {
      let input = AppointmentInput {
        appointment_date: Some(date),
        appointment_address: Some(address),
        contact_id: Some(vec![contact]),
        agent_id: Some(vec![agent]),
        is_cancelled: Some(false),
      };
      let apt = client.create_appointment(&input).await?;
      println!("created {}", apt.id);
    }
    Command::CancelAppointment { id } => {
      let apt = client.cancel_appointment(&id).await?;
      println!("cancelled {}", apt.id);
    }
    Command::DeleteAppointment { id } => {
      client.delete_appointment(&id).await?;
      println!("deleted {}", id);
    }
  }
  Ok(())
}

/// Whole days from `from` through `to`, either end open.
fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Option<DateRange>> {
  if from.is_none() && to.is_none() {
    return Ok(None);
  }
  let start = match from {
    Some(day) => day.and_hms_opt(0, 0, 0),
    None => NaiveDate::MIN.and_hms_opt(0, 0, 0),
  };
  let end = match to {
    Some(day) => day.and_hms_opt(23, 59, 59),
    None => NaiveDate::MAX.and_hms_opt(23, 59, 59),
  };
  match (start, end) {
    (Some(start), Some(end)) if start <= end => {
      Ok(Some(DateRange::new(start.and_utc(), end.and_utc())))
    }
    _ => Err(eyre!("--from must not be after --to")),
  }
}
