use clap::Parser;
use homecfg::engine::PriceBreakdown;
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Show the price breakdown of the current selection")]
pub struct Price {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Price {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let session = workspace.load()?;
        let breakdown = session.price();

        match self.output {
            OutputFormat::Table => Self::output_table(&breakdown),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
        }
        Ok(())
    }

    fn output_table(breakdown: &PriceBreakdown) {
        let rows = [
            ("Base house", breakdown.base_house),
            ("Elevation", breakdown.elevation),
            ("Selections", breakdown.selections),
            ("Non-standard selections", breakdown.non_standard_selections),
            ("Lot premium", breakdown.lot_premium),
            ("Price adjustments", breakdown.price_adjustments),
            ("Sales program discount", -breakdown.sales_program_discount),
        ];
        for (label, amount) in rows {
            println!("  {label:<26}{:>16}", amount.to_string());
        }
        println!("  {:<26}{:>16}", "Total", breakdown.total.to_string());
        if !breakdown.closing_incentive.is_zero() {
            println!(
                "{}",
                format!("  Closing incentive (not deducted): {}", breakdown.closing_incentive)
                    .dim()
            );
        }
    }
}
