use clap::Subcommand;
use leadscout_core::{PlanCatalog, QuotaLedger};
use leadscout_db::PgQuotaLedger;

/// Sub-commands available under `user`.
#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// Create a user on the default plan
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Switch a user's plan; usage resets and a new cycle starts now
    Upgrade {
        #[arg(long)]
        email: String,
        /// Target plan id (e.g., pro)
        #[arg(long)]
        plan: String,
    },
    /// Show a user's most recent searches
    History {
        #[arg(long)]
        email: String,
        /// Maximum number of entries to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

pub(crate) async fn run_user(command: UserCommands) -> anyhow::Result<()> {
    let (config, pool) = crate::connect().await?;
    match command {
        UserCommands::Create { email, name } => {
            let plans = leadscout_core::load_plans(&config.plans_path)?;
            run_user_create(&pool, &plans, &email, &name).await
        }
        UserCommands::Upgrade { email, plan } => {
            let plans = leadscout_core::load_plans(&config.plans_path)?;
            run_user_upgrade(&pool, &plans, &email, &plan).await
        }
        UserCommands::History { email, limit } => run_user_history(&pool, &email, limit).await,
    }
}

async fn find_user(pool: &sqlx::PgPool, email: &str) -> anyhow::Result<leadscout_db::UserRow> {
    leadscout_db::get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user '{email}' not found; run `user create` first"))
}

async fn run_user_create(
    pool: &sqlx::PgPool,
    plans: &PlanCatalog,
    email: &str,
    name: &str,
) -> anyhow::Result<()> {
    let plan = plans
        .default_plan()
        .ok_or_else(|| anyhow::anyhow!("plan catalog has no default plan"))?;
    let user = leadscout_db::create_user(pool, email, name, plan).await?;
    println!(
        "created {} ({}) on plan {} with {} leads",
        user.email, user.id, user.plan_id, user.leads_limit
    );
    Ok(())
}

async fn run_user_upgrade(
    pool: &sqlx::PgPool,
    plans: &PlanCatalog,
    email: &str,
    plan_id: &str,
) -> anyhow::Result<()> {
    let plan = plans.find(plan_id).ok_or_else(|| {
        let known: Vec<&str> = plans.plans.iter().map(|p| p.id.as_str()).collect();
        anyhow::anyhow!("unknown plan '{plan_id}'; expected one of {}", known.join(", "))
    })?;
    let user = find_user(pool, email).await?;

    let ledger = PgQuotaLedger::new(pool.clone());
    let quota = ledger.reset_on_plan_change(user.id, plan).await?;
    println!(
        "{} is now on {} ({} leads, cycle ends {})",
        user.email,
        plan.name,
        quota.limit_count,
        quota.cycle_ends_at().format("%Y-%m-%d")
    );
    Ok(())
}

async fn run_user_history(pool: &sqlx::PgPool, email: &str, limit: i64) -> anyhow::Result<()> {
    let user = find_user(pool, email).await?;
    let rows = leadscout_db::list_recent_history(pool, user.id, limit.clamp(1, 100)).await?;

    if rows.is_empty() {
        println!("no searches recorded for {}", user.email);
        return Ok(());
    }

    println!("{:<18}{:>7}  QUERY", "WHEN", "LEADS");
    for row in &rows {
        println!(
            "{:<18}{:>7}  {}",
            row.created_at.format("%Y-%m-%d %H:%M").to_string(),
            row.result_count,
            row.query
        );
    }
    Ok(())
}
