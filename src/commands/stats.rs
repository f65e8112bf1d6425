//! Store summary command

use anyhow::Result;
use std::path::PathBuf;

use crate::store::ResultStore;

/// Print a summary of a result store file.
pub fn stats(store_path: PathBuf) -> Result<()> {
    if !store_path.exists() {
        println!("Store not found: {}", store_path.display());
        println!("Run a resolve first to create it.");
        return Ok(());
    }

    let store = ResultStore::load(&store_path)?;

    println!("Resolution Statistics");
    println!("=====================");
    println!("Store: {}", store_path.display());
    println!();
    println!("Total records: {}", store.len());

    for tag in store.providers() {
        let answered = store.entries().filter(|e| e.is_answered(tag)).count();
        let resolved = store
            .entries()
            .filter(|e| e.coordinate(tag).is_some())
            .count();
        println!(
            "  {tag}: {resolved} resolved, {} without result, {} pending",
            answered - resolved,
            store.len() - answered
        );
    }

    if let Some(worst) = store
        .entries()
        .max_by(|a, b| a.discrepancy().total_cmp(&b.discrepancy()))
    {
        println!();
        println!(
            "Largest discrepancy: {:.6} degrees (id {}, '{}')",
            worst.discrepancy(),
            worst.id(),
            worst.address()
        );
    }

    Ok(())
}
