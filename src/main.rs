//! ABS Waterfall CLI
//!
//! Command-line interface for projecting deals, solving break-even CDRs and
//! checking structural triggers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use abs_waterfall::assumptions::{load_rate_vector, load_scenario, DefaultCurve, PrepaymentCurve};
use abs_waterfall::breakeven::{self, BreakevenConfig};
use abs_waterfall::deal::{load_deal, templates, DealStructure};
use abs_waterfall::projection::{DistributionMode, ProjectionResult};
use abs_waterfall::{ScenarioAssumptions, ScenarioRunner};

/// Cash flow projection and waterfall engine for ABS/CLO deals
#[derive(Parser)]
#[command(name = "abs-waterfall", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Project collateral and tranche cash flows
    Project {
        #[command(flatten)]
        deal: DealArgs,
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Periods to print (0 = all)
        #[arg(long, default_value_t = 24)]
        periods: usize,
        /// Tranche price for yield, percent of par
        #[arg(long, default_value_t = 100.0)]
        price: f64,
    },
    /// Base case vs stress case tranche metrics
    Compare {
        #[command(flatten)]
        deal: DealArgs,
    },
    /// Break-even CDR for one tranche, or all rated tranches
    Breakeven {
        #[command(flatten)]
        deal: DealArgs,
        /// Tranche name; omit to solve every rated tranche
        #[arg(long)]
        tranche: Option<String>,
        #[arg(long, default_value_t = 0.40)]
        recovery: f64,
        #[arg(long, default_value_t = 0.15)]
        cpr: f64,
        #[arg(long, default_value_t = 0.50)]
        max_cdr: f64,
        #[arg(long, default_value_t = 0.001)]
        tolerance: f64,
    },
    /// Point-in-time trigger tests and structural ratios
    Triggers {
        #[command(flatten)]
        deal: DealArgs,
        #[arg(long, default_value_t = 0.0433)]
        index_rate: f64,
    },
    /// List available deal templates
    Templates,
}

#[derive(Args)]
struct DealArgs {
    /// Deal template name
    #[arg(long, default_value = "ACMAT 2025-4", conflicts_with = "deal")]
    template: String,
    /// JSON deal file
    #[arg(long)]
    deal: Option<PathBuf>,
}

impl DealArgs {
    fn load(&self) -> Result<DealStructure> {
        match &self.deal {
            Some(path) => {
                load_deal(path).with_context(|| format!("loading deal from {}", path.display()))
            }
            None => templates::by_name(&self.template).context("resolving deal template"),
        }
    }
}

#[derive(Args)]
struct ScenarioArgs {
    /// JSON scenario file; overrides the rate flags
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 0.15)]
    cpr: f64,
    #[arg(long, default_value_t = 0.03)]
    cdr: f64,
    #[arg(long, default_value_t = 0.40)]
    recovery: f64,
    #[arg(long, default_value_t = 0.0433)]
    index_rate: f64,
    #[arg(long, default_value_t = 60)]
    months: u32,
    /// Front-loaded default curve peaking at month 18
    #[arg(long)]
    stress: bool,
    /// CSV of per-period CPRs (period,rate)
    #[arg(long)]
    cpr_vector: Option<PathBuf>,
    /// CSV of per-period CDRs (period,rate)
    #[arg(long)]
    cdr_vector: Option<PathBuf>,
}

impl ScenarioArgs {
    fn build(&self) -> Result<ScenarioAssumptions> {
        if let Some(path) = &self.scenario {
            return load_scenario(path)
                .with_context(|| format!("loading scenario from {}", path.display()));
        }

        let mut scenario = if self.stress {
            ScenarioAssumptions::stress_case(self.cpr, self.cdr, self.recovery, self.index_rate, self.months)
        } else {
            ScenarioAssumptions::base_case(self.cpr, self.cdr, self.recovery, self.index_rate, self.months)
        };

        if let Some(path) = &self.cpr_vector {
            let rates = load_rate_vector(path)
                .with_context(|| format!("loading CPR vector from {}", path.display()))?;
            scenario.prepayment.curve = PrepaymentCurve::Vector { rates };
        }
        if let Some(path) = &self.cdr_vector {
            let rates = load_rate_vector(path)
                .with_context(|| format!("loading CDR vector from {}", path.display()))?;
            scenario.default.curve = DefaultCurve::Vector { rates };
        }

        Ok(scenario)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Project {
            deal,
            scenario,
            periods,
            price,
        } => run_project(deal.load()?, scenario.build()?, periods, price, cli.json),
        Commands::Compare { deal } => run_compare(deal.load()?, cli.json),
        Commands::Breakeven {
            deal,
            tranche,
            recovery,
            cpr,
            max_cdr,
            tolerance,
        } => {
            let config = BreakevenConfig {
                recovery_rate: recovery,
                cpr,
                max_cdr,
                tolerance,
                ..Default::default()
            };
            run_breakeven(deal.load()?, tranche.as_deref(), &config, cli.json)
        }
        Commands::Triggers { deal, index_rate } => run_triggers(deal.load()?, index_rate, cli.json),
        Commands::Templates => {
            for name in templates::TEMPLATE_NAMES {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn run_project(
    deal: DealStructure,
    scenario: ScenarioAssumptions,
    periods: usize,
    price: f64,
    json: bool,
) -> Result<()> {
    let runner = ScenarioRunner::new(deal)?;
    let result = runner.run(&scenario)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} / {}", result.deal_name, result.scenario_name);
    println!("{}", "=".repeat(60));
    print_periods(&result, periods);

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Periods: {}", summary.periods_run);
    println!("  Total Collections: ${:.2}", summary.total_collections);
    println!("  Total Fees: ${:.2}", summary.total_fees);
    println!("  Cumulative Losses: ${:.2}", summary.cumulative_losses);
    println!("  Unreleased Recoveries: ${:.2}", summary.unreleased_recoveries);
    println!("  Final CNL: {:.2}%", summary.final_cnl);
    println!("  Final Collateral: ${:.2}", summary.final_collateral_balance);
    println!("  Periods in Breach: {}", summary.breached_periods);

    print_tranches(&result, price);
    Ok(())
}

fn print_periods(result: &ProjectionResult, limit: usize) {
    println!(
        "{:>4} {:>16} {:>14} {:>14} {:>12} {:>12} {:>16} {:>8} {:>5}",
        "Per", "Begin Bal", "Sched Prin", "Prepay", "Defaults", "Losses", "End Bal", "OC %", "Mode"
    );
    println!("{}", "-".repeat(110));

    let shown = if limit == 0 { result.periods.len() } else { limit };
    for row in result.periods.iter().take(shown) {
        println!(
            "{:>4} {:>16.2} {:>14.2} {:>14.2} {:>12.2} {:>12.2} {:>16.2} {:>8.2} {:>5}",
            row.period,
            row.beginning_balance,
            row.scheduled_principal,
            row.prepayments,
            row.defaults,
            row.losses,
            row.ending_balance,
            row.oc_ratio,
            match row.distribution_mode {
                DistributionMode::Sequential => "SEQ",
                DistributionMode::ProRata => "PRO",
            },
        );
    }
    if result.periods.len() > shown {
        println!("... ({} more periods)", result.periods.len() - shown);
    }
}

fn print_tranches(result: &ProjectionResult, price: f64) {
    println!("\nTranches (price {:.2}):", price);
    println!(
        "{:<12} {:>16} {:>16} {:>14} {:>6} {:>8} {:>9} {:>9}",
        "Tranche", "Start Bal", "Final Bal", "Interest", "WAL", "Paid %", "Yield", "CF Yield"
    );
    for t in result.tranche_summaries(price) {
        println!(
            "{:<12} {:>16.2} {:>16.2} {:>14.2} {:>6.2} {:>8.1} {:>8.2}% {:>9}",
            t.name,
            t.starting_balance,
            t.final_balance,
            t.interest_paid,
            t.wal,
            t.paid_down_pct,
            t.approximate_yield * 100.0,
            t.cash_flow_yield
                .map(|y| format!("{:.2}%", y * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
        );
    }
}

fn run_compare(deal: DealStructure, json: bool) -> Result<()> {
    let runner = ScenarioRunner::new(deal)?;
    let comparison = runner.base_vs_stress()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    for scenario in &comparison {
        println!(
            "\n{}: CNL {:.2}%, losses ${:.2}",
            scenario.scenario_name, scenario.summary.final_cnl, scenario.summary.cumulative_losses
        );
        for t in &scenario.tranches {
            println!(
                "  {:<12} WAL {:>5.2}  paid {:>5.1}%  shortfall ${:.2}",
                t.name, t.wal, t.paid_down_pct, t.principal_shortfall
            );
        }
    }
    Ok(())
}

fn run_breakeven(
    deal: DealStructure,
    tranche: Option<&str>,
    config: &BreakevenConfig,
    json: bool,
) -> Result<()> {
    let results = match tranche {
        Some(name) => vec![breakeven::solve(&deal, name, config)?],
        None => breakeven::solve_all(&deal, config)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("{} break-even CDR (recovery {:.0}%)", deal.deal_name, config.recovery_rate * 100.0);
    for result in &results {
        println!(
            "  {:<12} {:>7.2}%{}",
            result.tranche,
            result.cdr * 100.0,
            if result.converged { "" } else { " (iteration cap)" }
        );
    }
    Ok(())
}

fn run_triggers(deal: DealStructure, index_rate: f64, json: bool) -> Result<()> {
    deal.validate()?;
    let results = deal.evaluate_triggers(index_rate, 0.0);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("{}", deal.deal_name);
    println!("  OC: {:.2}%", deal.overcollateralization(None)?);
    println!("  IC: {:.2}x", deal.interest_coverage(index_rate));
    for tranche in &deal.tranches {
        println!(
            "  CE {:<12} {:.2}%",
            tranche.name,
            deal.credit_enhancement(&tranche.name)?
        );
    }
    println!();
    for result in &results {
        println!(
            "  {:<24} {:>4} {:>10.2} {} {:<8.2} {}",
            result.name,
            if result.passed { "PASS" } else { "FAIL" },
            result.current_value,
            result.comparison.symbol(),
            result.threshold,
            result.consequence.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}
