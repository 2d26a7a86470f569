use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    session::{login_url, logout_url},
    CustomerDirectory, CustomerListController, HttpBackofficeClient, PageSize, SessionGate,
    SessionProbe,
};
use shared::{
    domain::{CustomerId, InternetPlanId, InvoiceId},
    validation::validate_customer_draft,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod edit;
mod render;
mod repl;

use config::{load_settings, ConsoleSettings};
use edit::{CustomerArgs, PlanArgs, SubscriptionArgs};

#[derive(Parser, Debug)]
#[command(name = "isp-console", about = "Back-office console for the ISP customer base")]
struct Cli {
    /// Base url of the back-office REST api, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Per-request timeout; 0 disables it.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the url that starts the OAuth login.
    LoginUrl {
        #[arg(long)]
        provider: Option<String>,
    },
    LogoutUrl,
    /// Show the signed-in user.
    Whoami,
    Customers {
        #[command(subcommand)]
        command: CustomersCommand,
    },
    Plans {
        #[command(subcommand)]
        command: PlansCommand,
    },
    Subscription {
        #[command(subcommand)]
        command: SubscriptionCommand,
    },
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CustomersCommand {
    /// Page through customers interactively.
    Browse {
        #[arg(long)]
        page_size: Option<u32>,
    },
    Show { id: String },
    /// Create a customer subscribed to an internet plan.
    Add {
        #[arg(long)]
        plan_id: String,
        #[command(flatten)]
        fields: CustomerArgs,
    },
    /// Change the given fields of a customer; an empty value clears optional ones.
    Edit {
        id: String,
        #[command(flatten)]
        fields: CustomerArgs,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum PlansCommand {
    List,
    Show { id: String },
    Add {
        #[command(flatten)]
        fields: PlanArgs,
    },
    Edit {
        id: String,
        #[command(flatten)]
        fields: PlanArgs,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum SubscriptionCommand {
    Show { customer_id: String },
    /// Switch plan, move the end date or change the status.
    Update {
        customer_id: String,
        #[command(flatten)]
        fields: SubscriptionArgs,
    },
    Cancel { customer_id: String },
}

#[derive(Subcommand, Debug)]
enum InvoicesCommand {
    List { customer_id: String },
    /// Pay the full amount due on an invoice.
    Pay { invoice_id: String },
}

fn settings_for(cli: &Cli) -> Result<ConsoleSettings> {
    let loaded = load_settings(cli.config.as_deref())?;
    let mut settings = loaded.settings;

    if let Some(v) = &cli.api_base_url {
        settings.api_base_url = client_core::api::normalize_base_url(v);
    }
    if let Some(v) = cli.timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = &cli.log_level {
        settings.log_level = v.clone();
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for warning in loaded.warnings {
        warn!("ignored setting {warning}");
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings_for(&cli)?;
    info!(api_base_url = %settings.api_base_url, "console starting");

    let client = HttpBackofficeClient::new(&settings.api_base_url, settings.request_timeout())
        .context("failed to create back-office client")?;

    match cli.command {
        Command::LoginUrl { provider } => {
            let provider = provider.unwrap_or_else(|| settings.login_provider.clone());
            println!("{}", login_url(&settings.api_base_url, &provider)?);
        }
        Command::LogoutUrl => {
            println!("{}", logout_url(&settings.api_base_url)?);
        }
        Command::Whoami => match client.current_user().await? {
            Some(user) => println!("{} ({:?})", user.username, user.role),
            None => println!("not signed in"),
        },
        Command::Customers { command } => customers(&settings, client, command).await?,
        Command::Plans { command } => match command {
            PlansCommand::List => {
                println!("{}", render::plan_table(&client.list_internet_plans().await?));
            }
            PlansCommand::Show { id } => {
                let plan = client.get_internet_plan(&InternetPlanId::new(id)).await?;
                println!("{}", render::plan_table(&[plan]));
            }
            PlansCommand::Add { fields } => {
                let plan = client.create_internet_plan(&fields.into_draft()?).await?;
                info!(plan_id = %plan.id, "internet plan created");
                println!("{}", render::plan_table(&[plan]));
            }
            PlansCommand::Edit { id, fields } => {
                let id = InternetPlanId::new(id);
                let current = client.get_internet_plan(&id).await?;
                let plan = client
                    .update_internet_plan(&id, &fields.draft_over(&current))
                    .await?;
                println!("{}", render::plan_table(&[plan]));
            }
            PlansCommand::Delete { id } => {
                client.delete_internet_plan(&InternetPlanId::new(id)).await?;
                println!("Internet plan deleted successfully");
            }
        },
        Command::Subscription { command } => subscription(client, command).await?,
        Command::Invoices { command } => match command {
            InvoicesCommand::List { customer_id } => {
                let invoices = client
                    .list_customer_invoices(&CustomerId::new(customer_id))
                    .await?;
                println!("{}", render::invoice_table(&invoices));
            }
            InvoicesCommand::Pay { invoice_id } => {
                let invoice = client.get_invoice(&InvoiceId::new(invoice_id)).await?;
                let invoice = client.mark_invoice_paid(&invoice).await?;
                println!("{}", render::invoice_table(&[invoice]));
            }
        },
    }

    Ok(())
}

async fn customers(
    settings: &ConsoleSettings,
    client: HttpBackofficeClient,
    command: CustomersCommand,
) -> Result<()> {
    match command {
        CustomersCommand::Browse { page_size } => {
            let page_size = match page_size {
                Some(v) => PageSize::try_from(v)?,
                None => settings.default_page_size,
            };
            let gate = SessionGate::new(Arc::new(client.clone()));
            let ctx = gate.confirm().await.with_context(|| {
                match login_url(&settings.api_base_url, &settings.login_provider) {
                    Ok(url) => format!("sign in at {url} first"),
                    Err(_) => "sign in first".to_string(),
                }
            })?;
            let controller = CustomerListController::mount(&ctx, Arc::new(client), page_size).await;
            repl::run(controller).await?;
        }
        CustomersCommand::Show { id } => {
            let customer = client.get_customer(&CustomerId::new(id)).await?;
            println!("{}", render::customer_detail(&customer));
        }
        CustomersCommand::Add { plan_id, fields } => {
            let draft = fields.into_draft()?;
            let customer = client
                .create_customer(&draft, &InternetPlanId::new(plan_id))
                .await?;
            info!(customer_id = %customer.id, "customer created");
            println!("{}", render::customer_detail(&customer));
        }
        CustomersCommand::Edit { id, fields } => {
            let mut customer = client.get_customer(&CustomerId::new(id)).await?;
            fields.apply_to(&mut customer);
            validate_customer_draft(&edit::draft_of(&customer))?;
            let customer = client.update_customer(&customer).await?;
            println!("{}", render::customer_detail(&customer));
        }
        CustomersCommand::Delete { id } => {
            client.delete_customer(&CustomerId::new(id)).await?;
            println!("{}", client_core::controller::DELETE_SUCCEEDED_MESSAGE);
        }
    }
    Ok(())
}

async fn subscription(client: HttpBackofficeClient, command: SubscriptionCommand) -> Result<()> {
    let today = chrono::Utc::now().date_naive();
    match command {
        SubscriptionCommand::Show { customer_id } => {
            let (subscription, plans) = client
                .load_subscription_editor(&CustomerId::new(customer_id))
                .await?;
            println!(
                "{}",
                render::subscription_summary(&subscription, &plans, today)
            );
        }
        SubscriptionCommand::Update {
            customer_id,
            fields,
        } => {
            let (current, plans) = client
                .load_subscription_editor(&CustomerId::new(customer_id))
                .await?;
            let update = fields.update_for(&current)?;
            if !plans.iter().any(|plan| plan.id == update.internet_plan_id) {
                warn!(plan_id = %update.internet_plan_id, "plan is not in the plan list");
            }
            let subscription = client.update_subscription(&update).await?;
            println!(
                "{}",
                render::subscription_summary(&subscription, &plans, today)
            );
        }
        SubscriptionCommand::Cancel { customer_id } => {
            client
                .delete_subscription(&CustomerId::new(customer_id))
                .await?;
            println!("Subscription deleted successfully");
        }
    }
    Ok(())
}
