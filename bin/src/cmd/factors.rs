//! Factor listing command implementation.

use anyhow::{Result, bail};
use ronda_signals::{FactorCategory, FactorRegistry};

/// List available factors, optionally filtered by category.
pub(crate) fn list_factors(category: Option<String>, verbose: bool) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Available Factors                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let registry = FactorRegistry::with_defaults();
    let filter = category.map(|c| c.to_lowercase());

    let mut shown = 0;
    for cat in registry.categories() {
        let cat_name = format!("{cat:?}");
        if let Some(ref f) = filter
            && !cat_name.to_lowercase().contains(f)
        {
            continue;
        }

        println!("{cat_name}: {}", cat.description());
        println!("{}", "-".repeat(60));
        for factor in registry.by_category(cat) {
            if verbose {
                println!(
                    "  {:20} - {} (window: {}, lookback: {} bars)",
                    factor.name,
                    factor.description,
                    factor.params.window(),
                    factor.lookback
                );
            } else {
                println!("  {}", factor.name);
            }
            shown += 1;
        }
        println!();
    }

    if shown == 0 {
        let known: Vec<String> = FactorCategory::all().iter().map(|c| format!("{c:?}")).collect();
        bail!("no factors in category; known categories: {}", known.join(", "));
    }

    if !verbose {
        println!("Use --verbose for detailed factor descriptions.\n");
    }
    println!("Append a window to any name to override it, e.g. momentum_60 or rsi_21.\n");

    Ok(())
}
